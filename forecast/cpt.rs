//! # Conditional Probability Tables
//!
//! A table gives P(outcome | assignment) for every one of the 2^N truth
//! assignments of N boolean factors. The table is total by construction:
//! every constructor validates eagerly and refuses to build a table with a
//! missing, duplicated, extra or wrongly-sized assignment. Lookups after
//! construction therefore cannot miss.
//!
//! Assignments are stored densely. Factor `i` being true sets bit `i` of the
//! entry index.

use crate::error::{ForecastError, check_probability};
use itertools::Itertools;
use std::collections::HashSet;

/// Largest supported number of factors (65 536 assignments).
pub const MAX_FACTORS: usize = 16;

/// Tolerance on the sum of additive weights, absorbing rounding in sums like 0.1 * 10.
const WEIGHT_SUM_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalProbabilityTable {
    factors: Vec<String>,
    entries: Vec<f64>,
}

impl ConditionalProbabilityTable {
    /// Builds a table from explicit (assignment, probability) pairs.
    ///
    /// `assignment[i]` is the truth value of `factors[i]`.
    pub fn from_entries<I>(factors: Vec<String>, entries: I) -> Result<Self, ForecastError>
    where
        I: IntoIterator<Item = (Vec<bool>, f64)>,
    {
        validate_factors(&factors)?;
        let n = factors.len();
        let expected_entries = 1usize << n;

        let entries: Vec<(Vec<bool>, f64)> = entries.into_iter().collect();
        if entries.len() > expected_entries {
            return Err(ForecastError::ExtraAssignments {
                found: entries.len(),
                expected: n,
                expected_entries,
            });
        }

        let mut dense: Vec<Option<f64>> = vec![None; expected_entries];
        for (assignment, probability) in entries {
            let label = format_assignment(&assignment);
            if assignment.len() != n {
                return Err(ForecastError::UnexpectedAssignment {
                    assignment: label,
                    found: assignment.len(),
                    expected: n,
                });
            }
            let probability = check_probability(probability, &format!("table entry {label}"))?;
            let slot = &mut dense[encode(&assignment)];
            if slot.is_some() {
                return Err(ForecastError::DuplicateAssignment(label));
            }
            *slot = Some(probability);
        }

        let entries = dense
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                entry.ok_or_else(|| {
                    ForecastError::MissingAssignment(format_assignment(&decode(index, n)))
                })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        log::debug!(
            "Built conditional probability table over {} factors ({} assignments)",
            n,
            expected_entries
        );
        Ok(Self { factors, entries })
    }

    /// Builds the "sum of applicable weights" table: each true factor adds its
    /// weight to the outcome probability.
    ///
    /// Weights must be non-negative and sum to at most 1 so every entry is a probability.
    pub fn from_additive_weights(
        factors: Vec<String>,
        weights: &[f64],
    ) -> Result<Self, ForecastError> {
        validate_factors(&factors)?;
        if weights.len() != factors.len() {
            return Err(ForecastError::WeightCount {
                found: weights.len(),
                expected: factors.len(),
            });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(ForecastError::NonFinite("additive weights".to_string()));
        }
        let sum: f64 = weights.iter().sum();
        let min = weights.iter().copied().fold(f64::INFINITY, f64::min);
        if min < 0.0 || sum > 1.0 + WEIGHT_SUM_TOLERANCE {
            return Err(ForecastError::InvalidWeights { sum, min });
        }

        let n = factors.len();
        let entries = (0..1usize << n)
            .map(|index| {
                let total: f64 = weights
                    .iter()
                    .enumerate()
                    .filter(|&(bit, _)| index & (1usize << bit) != 0)
                    .map(|(_, w)| w)
                    .sum();
                total.min(1.0)
            })
            .collect();
        Ok(Self { factors, entries })
    }

    pub fn factors(&self) -> &[String] {
        &self.factors
    }

    pub fn n_factors(&self) -> usize {
        self.factors.len()
    }

    /// Number of assignments, always `2^n_factors`.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up P(outcome | assignment). `None` only when the arity is wrong.
    pub fn get(&self, assignment: &[bool]) -> Option<f64> {
        (assignment.len() == self.factors.len()).then(|| self.entries[encode(assignment)])
    }

    /// The entry stored under a dense index, for callers that enumerate by bitmask.
    pub(crate) fn entry(&self, index: usize) -> f64 {
        self.entries[index]
    }

    /// Every (assignment, probability) pair, ordered by dense index.
    pub fn assignments(&self) -> impl Iterator<Item = (Vec<bool>, f64)> + '_ {
        let n = self.factors.len();
        self.entries
            .iter()
            .enumerate()
            .map(move |(index, &p)| (decode(index, n), p))
    }
}

fn validate_factors(factors: &[String]) -> Result<(), ForecastError> {
    if factors.is_empty() {
        return Err(ForecastError::NoFactors);
    }
    if factors.len() > MAX_FACTORS {
        return Err(ForecastError::TooManyFactors {
            found: factors.len(),
            max: MAX_FACTORS,
        });
    }
    let mut seen = HashSet::with_capacity(factors.len());
    for name in factors {
        if !seen.insert(name.as_str()) {
            return Err(ForecastError::DuplicateFactor(name.clone()));
        }
    }
    Ok(())
}

fn encode(assignment: &[bool]) -> usize {
    assignment
        .iter()
        .enumerate()
        .fold(0, |index, (bit, &value)| {
            if value { index | (1usize << bit) } else { index }
        })
}

fn decode(index: usize, n: usize) -> Vec<bool> {
    (0..n).map(|bit| index & (1usize << bit) != 0).collect()
}

fn format_assignment(assignment: &[bool]) -> String {
    format!("({})", assignment.iter().join(", "))
}
