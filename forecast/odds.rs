//! # Geometric Mean of Odds
//!
//! Combines several independent estimates of the same event into one
//! consensus probability by averaging multiplicatively in odds space.
//!
//! The aggregation is split into two steps because some callers feed the
//! odds-space result into a later stage while others want a final probability:
//! [`geometric_mean_odds`] stops in odds space and [`aggregate_odds`] converts
//! back with [`odds_to_probability`].
//!
//! A probability of exactly 1 has unbounded odds. How that case is treated is
//! never implicit: every aggregation takes a [`UnitPolicy`].

use crate::error::{ForecastError, check_probability};
use serde::{Deserialize, Serialize};

/// Treatment of estimates that are exactly 1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPolicy {
    /// Fail with [`ForecastError::CertainEstimate`].
    #[default]
    Reject,
    /// Substitute the given finite odds value for the unbounded odds of certainty.
    Saturate(f64),
}

impl UnitPolicy {
    /// Builds a saturating policy, rejecting sentinels that would reintroduce
    /// infinities or collapse the product.
    pub fn saturate(odds: f64) -> Result<Self, ForecastError> {
        if !odds.is_finite() || odds <= 0.0 {
            return Err(ForecastError::InvalidSentinel(odds));
        }
        Ok(Self::Saturate(odds))
    }

    pub(crate) fn validate(self) -> Result<Self, ForecastError> {
        match self {
            Self::Reject => Ok(self),
            Self::Saturate(odds) => Self::saturate(odds),
        }
    }
}

/// Converts a probability to odds, `p / (1 - p)`.
pub fn to_odds(probability: f64, policy: UnitPolicy) -> Result<f64, ForecastError> {
    odds_of_estimate(0, probability, policy.validate()?)
}

/// Converts odds back to a probability, `o / (1 + o)`.
pub fn odds_to_probability(odds: f64) -> Result<f64, ForecastError> {
    if !odds.is_finite() || odds < 0.0 {
        return Err(ForecastError::UnboundedOdds(odds));
    }
    Ok(odds / (1.0 + odds))
}

/// Aggregates estimates in odds space: the n-th root of the product of their odds.
pub fn geometric_mean_odds(
    probabilities: &[f64],
    policy: UnitPolicy,
) -> Result<f64, ForecastError> {
    if probabilities.is_empty() {
        return Err(ForecastError::EmptyInput("probability estimates"));
    }
    let policy = policy.validate()?;

    let odds = probabilities
        .iter()
        .enumerate()
        .map(|(index, &p)| odds_of_estimate(index, p, policy))
        .collect::<Result<Vec<f64>, _>>()?;
    log::debug!("Aggregating {} estimates with odds {:?}", odds.len(), odds);

    // A single confident "no" zeroes the product.
    if odds.iter().any(|&o| o == 0.0) {
        return Ok(0.0);
    }

    // Summing logarithms keeps long lists of large odds from overflowing the product.
    let mean_log = odds.iter().map(|o| o.ln()).sum::<f64>() / odds.len() as f64;
    Ok(mean_log.exp())
}

/// Aggregates estimates into one consensus probability.
pub fn aggregate_odds(probabilities: &[f64], policy: UnitPolicy) -> Result<f64, ForecastError> {
    odds_to_probability(geometric_mean_odds(probabilities, policy)?)
}

fn odds_of_estimate(index: usize, probability: f64, policy: UnitPolicy) -> Result<f64, ForecastError> {
    let p = check_probability(probability, &format!("estimate {index}"))?;
    if p < 1.0 {
        return Ok(p / (1.0 - p));
    }
    match policy {
        UnitPolicy::Reject => Err(ForecastError::CertainEstimate { index }),
        UnitPolicy::Saturate(sentinel) => {
            log::warn!(
                "Estimate {} is exactly 1; substituting saturation odds {}",
                index,
                sentinel
            );
            Ok(sentinel)
        }
    }
}
