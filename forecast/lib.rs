#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod cpt;
pub mod ensemble;
pub mod error;
pub mod evaluate;
pub mod interpolate;
pub mod logistic;
pub mod odds;
pub mod report;
pub mod scenario;

pub use cpt::ConditionalProbabilityTable;
pub use error::{ErrorKind, ForecastError};
pub use evaluate::{LockInForecast, evaluate_cpt};
pub use logistic::{ForecastPoint, LogisticAnchor, logistic_forecast};
pub use odds::{UnitPolicy, aggregate_odds, geometric_mean_odds, odds_to_probability, to_odds};
