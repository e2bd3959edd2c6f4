//! # Marginalisation over Independent Risk Factors
//!
//! Computes P(outcome) for each forecast year by brute-force enumeration of
//! all 2^N truth assignments of the table's factors:
//!
//! `P(outcome) = sum over assignments a of P(a) * P(outcome | a)`, where
//! `P(a)` is the product of `p_i` for true factors and `1 - p_i` for false ones.
//!
//! The product form assumes the factors are independent in every year. That is
//! a modelling simplification, not a property of the data. Years are evaluated
//! independently of each other. The cost is O(2^N) per year, which is why
//! tables are capped at [`crate::cpt::MAX_FACTORS`] factors.

use crate::cpt::ConditionalProbabilityTable;
use crate::error::{ForecastError, check_probability};
use crate::report::{FactorSeries, ForecastReport};
use std::collections::HashMap;

/// Per-year marginal probability of the table's outcome.
///
/// `marginals` maps each factor name to one probability per forecast year. It
/// must name exactly the table's factors, and all series must have the same length.
pub fn evaluate_cpt(
    marginals: &HashMap<String, Vec<f64>>,
    cpt: &ConditionalProbabilityTable,
) -> Result<Vec<f64>, ForecastError> {
    let series = align_marginals(marginals, cpt)?;
    let n_years = series.first().map_or(0, |s| s.len());
    log::debug!(
        "Enumerating {} assignments for each of {} years",
        cpt.len(),
        n_years
    );
    Ok((0..n_years)
        .map(|year| marginalise_year(&series, year, cpt))
        .collect())
}

/// Orders the supplied series like the table's factors and validates them.
fn align_marginals<'a>(
    marginals: &'a HashMap<String, Vec<f64>>,
    cpt: &ConditionalProbabilityTable,
) -> Result<Vec<&'a [f64]>, ForecastError> {
    if let Some(unknown) = marginals
        .keys()
        .filter(|name| !cpt.factors().contains(*name))
        .min()
    {
        return Err(ForecastError::UnknownFactor(unknown.clone()));
    }

    let mut series = Vec::with_capacity(cpt.n_factors());
    for factor in cpt.factors() {
        let values = marginals
            .get(factor)
            .ok_or_else(|| ForecastError::MissingFactor(factor.clone()))?;
        series.push(values.as_slice());
    }

    let expected = series[0].len();
    for (factor, values) in cpt.factors().iter().zip(&series) {
        if values.len() != expected {
            return Err(ForecastError::MisalignedSeries {
                name: factor.clone(),
                found: values.len(),
                expected,
            });
        }
        for (year, &p) in values.iter().enumerate() {
            check_probability(p, &format!("marginals of '{factor}', year {year}"))?;
        }
    }
    Ok(series)
}

fn marginalise_year(series: &[&[f64]], year: usize, cpt: &ConditionalProbabilityTable) -> f64 {
    (0..cpt.len())
        .map(|index| {
            let joint: f64 = series
                .iter()
                .enumerate()
                .map(|(bit, values)| {
                    let p = values[year];
                    if index & (1usize << bit) != 0 { p } else { 1.0 - p }
                })
                .product();
            joint * cpt.entry(index)
        })
        .sum()
}

/// Evaluates an outcome table over a fixed set of forecast years.
#[derive(Debug, Clone, PartialEq)]
pub struct LockInForecast {
    years: Vec<i32>,
}

impl LockInForecast {
    pub fn new(years: Vec<i32>) -> Result<Self, ForecastError> {
        if years.is_empty() {
            return Err(ForecastError::EmptyInput("forecast years"));
        }
        Ok(Self { years })
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Evaluates `cpt` and bundles the inputs and the outcome series into a report.
    ///
    /// Every supplied series must carry exactly one value per forecast year.
    pub fn generate(
        &self,
        outcome: &str,
        marginals: &HashMap<String, Vec<f64>>,
        cpt: &ConditionalProbabilityTable,
    ) -> Result<ForecastReport, ForecastError> {
        let mut names: Vec<&String> = marginals.keys().collect();
        names.sort();
        for name in names {
            let found = marginals[name].len();
            if found != self.years.len() {
                return Err(ForecastError::MisalignedSeries {
                    name: name.clone(),
                    found,
                    expected: self.years.len(),
                });
            }
        }

        let outcome_probabilities = evaluate_cpt(marginals, cpt)?;
        let factors = cpt
            .factors()
            .iter()
            .map(|name| FactorSeries {
                name: name.clone(),
                values: marginals[name].clone(),
            })
            .collect();

        Ok(ForecastReport {
            outcome: outcome.to_string(),
            years: self.years.clone(),
            factors,
            outcome_probabilities,
        })
    }
}
