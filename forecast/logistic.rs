//! # Logistic Anchoring
//!
//! Produces a smooth probability-over-time curve from one known
//! (year, probability) point and a growth-rate constant.
//!
//! The curve is `p(y) = L / (1 + exp(-k * (t - t0)))` with
//! - ceiling `L = 1.2 * anchor_probability`, so the anchor sits below saturation;
//! - midpoint `x0 = anchor_year - 100`, the year the curve reaches `L / 2`;
//! - `t` and `t0` measured in years from a reference epoch.
//!
//! This is an approximation tool, not an interpolant: `p(anchor_year)` equals
//! the anchor probability only when `k` is [`exact_anchor_growth_rate`]. For any
//! other growth rate the value at the anchor year drifts from the anchor; use
//! [`LogisticAnchor::anchor_error`] to see by how much.

use crate::error::ForecastError;
use serde::{Deserialize, Serialize};

/// Ratio between the curve's ceiling and the anchor probability.
pub const CEILING_FACTOR: f64 = 1.2;
/// Years between the curve's midpoint and the anchor year.
pub const MIDPOINT_OFFSET_YEARS: i32 = 100;
/// Zero point of the time axis.
pub const DEFAULT_BASE_YEAR: i32 = 2000;

/// One evaluated year of a forecast curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub year: i32,
    pub probability: f64,
    /// `probability * 100`, for display.
    pub probability_percentage: f64,
}

impl ForecastPoint {
    pub fn new(year: i32, probability: f64) -> Self {
        Self {
            year,
            probability,
            probability_percentage: probability * 100.0,
        }
    }
}

/// A validated logistic curve anchored on one (year, probability) point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticAnchor {
    anchor_year: i32,
    anchor_probability: f64,
    growth_rate: f64,
    base_year: i32,
    ceiling: f64,
}

impl LogisticAnchor {
    pub fn new(
        anchor_year: i32,
        anchor_probability: f64,
        growth_rate: f64,
    ) -> Result<Self, ForecastError> {
        if !anchor_probability.is_finite() || anchor_probability <= 0.0 || anchor_probability > 1.0
        {
            return Err(ForecastError::InvalidAnchorProbability(anchor_probability));
        }
        if !growth_rate.is_finite() || growth_rate <= 0.0 {
            return Err(ForecastError::InvalidGrowthRate(growth_rate));
        }

        let mut ceiling = anchor_probability * CEILING_FACTOR;
        if ceiling > 1.0 {
            log::warn!(
                "Ceiling {:.4} for anchor probability {:.4} exceeds 1; clamping to 1",
                ceiling,
                anchor_probability
            );
            ceiling = 1.0;
        }

        log::debug!(
            "Logistic curve: anchor ({}, {}), k = {}, ceiling = {}, midpoint = {}",
            anchor_year,
            anchor_probability,
            growth_rate,
            ceiling,
            i64::from(anchor_year) - i64::from(MIDPOINT_OFFSET_YEARS)
        );

        Ok(Self {
            anchor_year,
            anchor_probability,
            growth_rate,
            base_year: DEFAULT_BASE_YEAR,
            ceiling,
        })
    }

    /// Moves the zero point of the time axis. The curve itself is unaffected.
    pub fn with_base_year(mut self, base_year: i32) -> Self {
        self.base_year = base_year;
        self
    }

    pub fn anchor_year(&self) -> i32 {
        self.anchor_year
    }

    pub fn anchor_probability(&self) -> f64 {
        self.anchor_probability
    }

    pub fn growth_rate(&self) -> f64 {
        self.growth_rate
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    /// Asymptotic value `L` the curve approaches as the year grows.
    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Year at which the curve reaches half its ceiling. Widened so that
    /// anchors near `i32::MIN` stay representable.
    pub fn midpoint_year(&self) -> i64 {
        i64::from(self.anchor_year) - i64::from(MIDPOINT_OFFSET_YEARS)
    }

    /// Evaluates the curve. Year offsets are taken in `f64`, so any `i32` year is valid.
    pub fn probability_at(&self, year: i32) -> f64 {
        let base = f64::from(self.base_year);
        let t = f64::from(year) - base;
        let t0 = self.midpoint_year() as f64 - base;
        self.ceiling / (1.0 + (-self.growth_rate * (t - t0)).exp())
    }

    pub fn forecast(&self, years: &[i32]) -> Vec<ForecastPoint> {
        years
            .iter()
            .map(|&year| ForecastPoint::new(year, self.probability_at(year)))
            .collect()
    }

    /// Relative deviation of the curve from the anchor at the anchor year.
    pub fn anchor_error(&self) -> f64 {
        (self.probability_at(self.anchor_year) - self.anchor_probability) / self.anchor_probability
    }
}

/// The growth rate for which the curve passes exactly through its anchor:
/// `ln(1 / (CEILING_FACTOR - 1)) / MIDPOINT_OFFSET_YEARS`, i.e. `ln 5 / 100`.
///
/// Exactness assumes the ceiling was not clamped to 1.
pub fn exact_anchor_growth_rate() -> f64 {
    (1.0 / (CEILING_FACTOR - 1.0)).ln() / f64::from(MIDPOINT_OFFSET_YEARS)
}

/// Evaluates the anchored logistic curve at each query year.
pub fn logistic_forecast(
    years: &[i32],
    anchor_year: i32,
    anchor_probability: f64,
    growth_rate: f64,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    Ok(LogisticAnchor::new(anchor_year, anchor_probability, growth_rate)?.forecast(years))
}
