use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::Path;
use thiserror::Error;

/// Failures while writing a report to disk.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write the forecast report: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to create the report file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("{0}")]
    Forecast(#[from] ForecastError),
}

/// One named per-year probability series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorSeries {
    pub name: String,
    pub values: Vec<f64>,
}

/// The evaluated forecast: input factor series (in table order) and the outcome series.
///
/// Deserialisation rejects reports whose series do not have one value per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedReport")]
pub struct ForecastReport {
    pub outcome: String,
    pub years: Vec<i32>,
    pub factors: Vec<FactorSeries>,
    pub outcome_probabilities: Vec<f64>,
}

/// Wire form of [`ForecastReport`] before its shape is checked.
#[derive(Deserialize)]
pub struct UncheckedReport {
    outcome: String,
    years: Vec<i32>,
    factors: Vec<FactorSeries>,
    outcome_probabilities: Vec<f64>,
}

impl TryFrom<UncheckedReport> for ForecastReport {
    type Error = ForecastError;

    fn try_from(raw: UncheckedReport) -> Result<Self, Self::Error> {
        let report = ForecastReport {
            outcome: raw.outcome,
            years: raw.years,
            factors: raw.factors,
            outcome_probabilities: raw.outcome_probabilities,
        };
        report.validate()?;
        Ok(report)
    }
}

impl ForecastReport {
    /// Checks that every factor series and the outcome series hold one value per year.
    pub fn validate(&self) -> Result<(), ForecastError> {
        let expected = self.years.len();
        let series = self
            .factors
            .iter()
            .map(|f| (f.name.as_str(), f.values.len()))
            .chain(std::iter::once((
                self.outcome.as_str(),
                self.outcome_probabilities.len(),
            )));
        for (name, found) in series {
            if found != expected {
                return Err(ForecastError::MisalignedSeries {
                    name: name.to_string(),
                    found,
                    expected,
                });
            }
        }
        Ok(())
    }

    fn column_names(&self) -> impl Iterator<Item = &str> {
        self.factors
            .iter()
            .map(|f| f.name.as_str())
            .chain(std::iter::once(self.outcome.as_str()))
    }

    /// Cells of one year; `None` where a series is too short.
    fn row(&self, index: usize) -> impl Iterator<Item = Option<f64>> + '_ {
        self.factors
            .iter()
            .map(move |f| f.values.get(index).copied())
            .chain(std::iter::once(
                self.outcome_probabilities.get(index).copied(),
            ))
    }

    /// Writes one tab-separated row per year with raw probabilities.
    pub fn write_tsv_to<W: Write>(&self, writer: W) -> Result<(), ReportError> {
        self.validate()?;
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);

        let mut header = vec!["year"];
        header.extend(self.column_names());
        wtr.write_record(&header)?;

        for (index, year) in self.years.iter().enumerate() {
            let mut record = vec![year.to_string()];
            record.extend(self.row(index).flatten().map(|p| p.to_string()));
            wtr.write_record(&record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn write_tsv(&self, path: &Path) -> Result<(), ReportError> {
        self.validate()?;
        let file = std::fs::File::create(path)?;
        self.write_tsv_to(std::io::BufWriter::new(file))?;
        log::info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Fixed-width table with percentages to two decimals. Cells missing from a
/// malformed report render as `-`.
impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths: Vec<usize> = self.column_names().map(|name| name.len().max(8)).collect();

        write!(f, "{:<6}", "year")?;
        for (name, width) in self.column_names().zip(widths.iter().copied()) {
            write!(f, "  {name:>width$}")?;
        }
        writeln!(f)?;

        for (index, year) in self.years.iter().enumerate() {
            write!(f, "{year:<6}")?;
            for (p, width) in self.row(index).zip(widths.iter().copied()) {
                let cell = p.map_or_else(|| "-".to_string(), |p| format!("{:.2}%", p * 100.0));
                write!(f, "  {cell:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
