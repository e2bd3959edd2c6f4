//! # Scenario Configuration
//!
//! A scenario is a TOML document that names the forecast years, derives one
//! probability series per risk factor, and declares the outcome table that
//! combines them. Survey numbers live in scenario files, never in the library.
//!
//! Series are derived in declaration order, so a series may refer to any
//! series declared before it.

use crate::cpt::ConditionalProbabilityTable;
use crate::ensemble::ForecastMatrix;
use crate::error::{ForecastError, check_probability};
use crate::evaluate::LockInForecast;
use crate::interpolate::linear_series;
use crate::logistic::{LogisticAnchor, exact_anchor_growth_rate};
use crate::odds::{UnitPolicy, aggregate_odds};
use crate::report::ForecastReport;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Custom error type for loading, saving and running scenarios.
#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read or write scenario file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML scenario file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize scenario to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("{0}")]
    Forecast(#[from] ForecastError),
    #[error("Series '{name}' could not be derived: {source}")]
    SeriesFailed {
        name: String,
        #[source]
        source: ForecastError,
    },
    #[error("Series '{0}' is referenced but never declared before its use.")]
    UnknownSeries(String),
    #[error("Series '{0}' is declared more than once.")]
    DuplicateSeries(String),
    #[error("Series '{name}' is invalid: {reason}")]
    InvalidSeries { name: String, reason: String },
}

/// The complete description of one forecast run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub years: Vec<i32>,
    /// Treatment of estimates of exactly 1 in every aggregation of this scenario.
    #[serde(default)]
    pub unit_policy: UnitPolicy,
    #[serde(default)]
    pub series: Vec<SeriesSpec>,
    pub outcome: OutcomeSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub name: String,
    #[serde(flatten)]
    pub source: SeriesSource,
}

/// How a series obtains one probability per forecast year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesSource {
    /// Literal per-year probabilities.
    Values(Vec<f64>),
    Aggregate(AggregateSpec),
    Logistic(LogisticSpec),
    /// Interpolated inside the sampled years and extrapolated past the last one.
    Linear(LinearSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateSpec {
    /// Per-year geometric mean of odds over literal source rows.
    Sources(Vec<Vec<f64>>),
    /// Per-year arithmetic mean over literal source rows.
    Mean(Vec<Vec<f64>>),
    /// Per-year geometric mean of odds over earlier series.
    Series(Vec<String>),
    /// Geometric mean of odds of a list of estimates, constant across years.
    Scalars(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticSpec {
    pub anchor_year: i32,
    /// Literal anchor probability. Exactly one of this and `anchor_from` is required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_probability: Option<f64>,
    /// Name of an earlier scalar aggregate to anchor on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor_from: Option<String>,
    /// Defaults to the growth rate that passes exactly through the anchor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearSpec {
    pub years: Vec<i32>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSpec {
    pub name: String,
    /// Table factor order; each name must be a declared series.
    pub factors: Vec<String>,
    pub table: TableSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableSpec {
    /// One weight per factor, summed over the true factors of each assignment.
    Additive(Vec<f64>),
    /// Every assignment listed explicitly.
    Entries(Vec<EntrySpec>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntrySpec {
    pub when: Vec<bool>,
    pub probability: f64,
}

/// Series derived from a scenario, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DerivedSeries {
    pub series: HashMap<String, Vec<f64>>,
    /// Constant aggregates, usable as logistic anchors.
    pub scalars: HashMap<String, f64>,
}

impl Scenario {
    pub fn from_toml(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        let scenario = Self::from_toml(&text)?;
        log::info!(
            "Loaded scenario '{}' from {} ({} series, {} years)",
            scenario.name,
            path.display(),
            scenario.series.len(),
            scenario.years.len()
        );
        Ok(scenario)
    }

    pub fn save(&self, path: &Path) -> Result<(), ScenarioError> {
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Derives every declared series, in declaration order.
    pub fn derive_series(&self) -> Result<DerivedSeries, ScenarioError> {
        let policy = self.unit_policy.validate()?;
        let mut derived = DerivedSeries::default();

        for spec in &self.series {
            if derived.series.contains_key(&spec.name) {
                return Err(ScenarioError::DuplicateSeries(spec.name.clone()));
            }
            let fail = |source: ForecastError| ScenarioError::SeriesFailed {
                name: spec.name.clone(),
                source,
            };

            let values = match &spec.source {
                SeriesSource::Values(values) => values.clone(),
                SeriesSource::Aggregate(AggregateSpec::Sources(rows)) => {
                    ForecastMatrix::from_rows(rows)
                        .and_then(|matrix| matrix.geometric_mean_odds(policy))
                        .map_err(fail)?
                }
                SeriesSource::Aggregate(AggregateSpec::Mean(rows)) => {
                    ForecastMatrix::from_rows(rows)
                        .map(|matrix| matrix.arithmetic_mean())
                        .map_err(fail)?
                }
                SeriesSource::Aggregate(AggregateSpec::Series(names)) => {
                    let rows = names
                        .iter()
                        .map(|name| {
                            derived
                                .series
                                .get(name)
                                .cloned()
                                .ok_or_else(|| ScenarioError::UnknownSeries(name.clone()))
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    ForecastMatrix::from_rows(&rows)
                        .and_then(|matrix| matrix.geometric_mean_odds(policy))
                        .map_err(fail)?
                }
                SeriesSource::Aggregate(AggregateSpec::Scalars(estimates)) => {
                    let value = aggregate_odds(estimates, policy).map_err(fail)?;
                    derived.scalars.insert(spec.name.clone(), value);
                    vec![value; self.years.len()]
                }
                SeriesSource::Logistic(logistic) => {
                    let curve = self.logistic_curve(&spec.name, logistic, &derived)?;
                    curve
                        .forecast(&self.years)
                        .into_iter()
                        .map(|point| point.probability)
                        .collect()
                }
                SeriesSource::Linear(linear) => {
                    let xs: Vec<f64> = linear.years.iter().map(|&y| f64::from(y)).collect();
                    linear_series(&self.years, &xs, &linear.values).map_err(fail)?
                }
            };

            if values.len() != self.years.len() {
                return Err(fail(ForecastError::MisalignedSeries {
                    name: spec.name.clone(),
                    found: values.len(),
                    expected: self.years.len(),
                }));
            }
            for (index, &p) in values.iter().enumerate() {
                check_probability(p, &format!("year {}", self.years[index])).map_err(fail)?;
            }

            log::debug!("Derived series '{}': {:?}", spec.name, values);
            derived.series.insert(spec.name.clone(), values);
        }

        log::info!("Derived {} series", derived.series.len());
        Ok(derived)
    }

    fn logistic_curve(
        &self,
        name: &str,
        spec: &LogisticSpec,
        derived: &DerivedSeries,
    ) -> Result<LogisticAnchor, ScenarioError> {
        let anchor_probability = match (spec.anchor_probability, &spec.anchor_from) {
            (Some(p), None) => p,
            (None, Some(source)) => match derived.scalars.get(source) {
                Some(&p) => p,
                None if derived.series.contains_key(source) => {
                    return Err(ScenarioError::InvalidSeries {
                        name: name.to_string(),
                        reason: format!("anchor series '{source}' is not a scalar aggregate"),
                    });
                }
                None => return Err(ScenarioError::UnknownSeries(source.clone())),
            },
            _ => {
                return Err(ScenarioError::InvalidSeries {
                    name: name.to_string(),
                    reason: "exactly one of anchor_probability and anchor_from is required"
                        .to_string(),
                });
            }
        };

        let growth_rate = spec.growth_rate.unwrap_or_else(exact_anchor_growth_rate);
        let curve = LogisticAnchor::new(spec.anchor_year, anchor_probability, growth_rate)
            .map_err(|source| ScenarioError::SeriesFailed {
                name: name.to_string(),
                source,
            })?;
        Ok(match spec.base_year {
            Some(base_year) => curve.with_base_year(base_year),
            None => curve,
        })
    }

    /// Builds the outcome table declared by the scenario.
    pub fn build_table(&self) -> Result<ConditionalProbabilityTable, ScenarioError> {
        let factors = self.outcome.factors.clone();
        let table = match &self.outcome.table {
            TableSpec::Additive(weights) => {
                ConditionalProbabilityTable::from_additive_weights(factors, weights)?
            }
            TableSpec::Entries(entries) => ConditionalProbabilityTable::from_entries(
                factors,
                entries.iter().map(|e| (e.when.clone(), e.probability)),
            )?,
        };
        Ok(table)
    }

    /// Derives the series, evaluates the outcome table and returns the report.
    pub fn run(&self) -> Result<ForecastReport, ScenarioError> {
        let table = self.build_table()?;
        let mut derived = self.derive_series()?;

        let mut marginals = HashMap::with_capacity(table.n_factors());
        for factor in table.factors() {
            let values = derived
                .series
                .remove(factor)
                .ok_or_else(|| ScenarioError::UnknownSeries(factor.clone()))?;
            marginals.insert(factor.clone(), values);
        }

        let forecast = LockInForecast::new(self.years.clone())?;
        let report = forecast.generate(&self.outcome.name, &marginals, &table)?;
        log::info!(
            "Scenario '{}': evaluated '{}' over {} factors",
            self.name,
            self.outcome.name,
            table.n_factors()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use tempfile::tempdir;

    const SMALL: &str = r#"
name = "small"
years = [2030, 2080]

[[series]]
name = "agi"
aggregate = { sources = [[0.2, 0.6], [0.4, 0.8]] }

[[series]]
name = "expert_view"
aggregate = { scalars = [0.5, 0.5] }

[[series]]
name = "war"
logistic = { anchor_year = 2080, anchor_from = "expert_view" }

[[series]]
name = "gov"
linear = { years = [2030, 2055], values = [0.1, 0.2] }

[outcome]
name = "lock_in"
factors = ["agi", "war", "gov"]
table = { additive = [0.5, 0.25, 0.25] }
"#;

    #[test]
    fn parses_every_series_kind() {
        let scenario = Scenario::from_toml(SMALL).unwrap();
        assert_eq!(scenario.unit_policy, UnitPolicy::Reject);
        assert_eq!(scenario.series.len(), 4);
        assert!(matches!(
            scenario.series[0].source,
            SeriesSource::Aggregate(AggregateSpec::Sources(..))
        ));
        assert!(matches!(scenario.series[2].source, SeriesSource::Logistic(..)));
        assert!(matches!(scenario.outcome.table, TableSpec::Additive(..)));
    }

    #[test]
    fn derives_series_in_order() {
        let derived = Scenario::from_toml(SMALL).unwrap().derive_series().unwrap();
        assert_abs_diff_eq!(derived.scalars["expert_view"], 0.5, epsilon = 1e-12);
        assert_eq!(derived.series["expert_view"], vec![0.5, 0.5]);

        // The default growth rate makes the curve pass through its anchor.
        assert_abs_diff_eq!(derived.series["war"][1], 0.5, epsilon = 1e-12);

        let gov = &derived.series["gov"];
        assert_abs_diff_eq!(gov[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(gov[1], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn run_evaluates_the_outcome() {
        let scenario = Scenario::from_toml(SMALL).unwrap();
        let derived = scenario.derive_series().unwrap();
        let report = scenario.run().unwrap();
        assert_eq!(report.outcome, "lock_in");
        assert_eq!(report.factors.len(), 3);
        for (index, got) in report.outcome_probabilities.iter().enumerate() {
            let expected = 0.5 * derived.series["agi"][index]
                + 0.25 * derived.series["war"][index]
                + 0.25 * derived.series["gov"][index];
            assert_abs_diff_eq!(*got, expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn save_and_load_preserve_the_scenario() {
        let scenario = Scenario::from_toml(SMALL).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join("scenario.toml");
        scenario.save(&path).unwrap();
        assert_eq!(Scenario::load(&path).unwrap(), scenario);
    }

    #[test]
    fn series_aggregate_combines_earlier_series() {
        let text = r#"
name = "combined"
years = [2030, 2055]
unit_policy = { saturate = 1000.0 }

[[series]]
name = "a"
values = [0.2, 1.0]

[[series]]
name = "b"
values = [0.8, 1.0]

[[series]]
name = "ab"
aggregate = { series = ["a", "b"] }

[outcome]
name = "out"
factors = ["ab"]
table = { entries = [
    { when = [true], probability = 1.0 },
    { when = [false], probability = 0.0 },
] }
"#;
        let scenario = Scenario::from_toml(text).unwrap();
        assert_eq!(scenario.unit_policy, UnitPolicy::Saturate(1000.0));
        let report = scenario.run().unwrap();
        assert_abs_diff_eq!(report.outcome_probabilities[0], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(
            report.outcome_probabilities[1],
            1000.0 / 1001.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn references_must_point_backwards() {
        let text = SMALL.replace("anchor_from = \"expert_view\"", "anchor_from = \"later\"");
        let err = Scenario::from_toml(&text).unwrap().derive_series().unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownSeries(name) if name == "later"));

        let text = SMALL.replace("anchor_from = \"expert_view\"", "anchor_from = \"agi\"");
        let err = Scenario::from_toml(&text).unwrap().derive_series().unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidSeries { .. }));

        let text = SMALL.replace(
            "anchor_from = \"expert_view\"",
            "anchor_from = \"expert_view\", anchor_probability = 0.2",
        );
        let err = Scenario::from_toml(&text).unwrap().derive_series().unwrap_err();
        assert!(matches!(err, ScenarioError::InvalidSeries { .. }));
    }

    #[test]
    fn invalid_series_report_their_name() {
        let text = SMALL.replace("values = [0.1, 0.2]", "values = [0.1, 0.9]");
        let err = Scenario::from_toml(&text).unwrap().derive_series().unwrap_err();
        match err {
            ScenarioError::SeriesFailed { name, source } => {
                assert_eq!(name, "gov");
                assert!(matches!(source, ForecastError::ProbabilityOutOfRange { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }

        let text = SMALL.replace("name = \"war\"", "name = \"agi\"");
        assert!(matches!(
            Scenario::from_toml(&text).unwrap().derive_series(),
            Err(ScenarioError::DuplicateSeries(..))
        ));
    }

    #[test]
    fn outcome_factors_must_be_declared() {
        let text = SMALL.replace(
            "factors = [\"agi\", \"war\", \"gov\"]",
            "factors = [\"agi\", \"war\", \"missing\"]",
        );
        let err = Scenario::from_toml(&text).unwrap().run().unwrap_err();
        assert!(matches!(err, ScenarioError::UnknownSeries(name) if name == "missing"));
    }
}
