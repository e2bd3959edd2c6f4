use crate::error::{ForecastError, check_probability};
use crate::odds::{UnitPolicy, aggregate_odds};
use ndarray::{Array2, Axis};

/// Several forecasters' year-by-year probability series.
/// Shape: [n_sources, n_years]. Every cell is a probability in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastMatrix {
    values: Array2<f64>,
}

impl ForecastMatrix {
    /// Builds the matrix from one row per source.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ForecastError> {
        let first = rows
            .first()
            .ok_or(ForecastError::EmptyInput("forecast sources"))?;
        let n_years = first.len();
        if n_years == 0 {
            return Err(ForecastError::EmptyInput("forecast years"));
        }

        for (row, values) in rows.iter().enumerate() {
            if values.len() != n_years {
                return Err(ForecastError::RaggedMatrix {
                    row,
                    found: values.len(),
                    expected: n_years,
                });
            }
            for (col, &value) in values.iter().enumerate() {
                check_probability(value, &format!("source {row}, year {col}"))?;
            }
        }

        let values = Array2::from_shape_fn((rows.len(), n_years), |(row, col)| rows[row][col]);
        Ok(Self { values })
    }

    pub fn n_sources(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_years(&self) -> usize {
        self.values.ncols()
    }

    /// Per-year consensus by geometric mean of odds.
    pub fn geometric_mean_odds(&self, policy: UnitPolicy) -> Result<Vec<f64>, ForecastError> {
        self.values
            .axis_iter(Axis(1))
            .map(|column| aggregate_odds(&column.to_vec(), policy))
            .collect()
    }

    /// Per-year plain average across sources.
    pub fn arithmetic_mean(&self) -> Vec<f64> {
        self.values
            .mean_axis(Axis(0))
            .map(|means| means.to_vec())
            .unwrap_or_default()
    }
}
