use thiserror::Error;

/// The three failure classes every numeric routine reports through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A value lies outside its mathematical domain.
    Domain,
    /// Sequences or tables do not line up with each other.
    Shape,
    /// The input is empty or pins an estimate to certainty under the reject policy.
    DegenerateInput,
}

/// A comprehensive error type for the probability-combination core.
///
/// All routines fail fast: nothing is computed past the first invalid input
/// and no partial results are returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Probability {value} in {context} lies outside [0, 1].")]
    ProbabilityOutOfRange { value: f64, context: String },

    #[error("Non-finite value (NaN or Infinity) found in {0}.")]
    NonFinite(String),

    #[error("Growth rate must be finite and strictly positive, but was {0}.")]
    InvalidGrowthRate(f64),

    #[error("Anchor probability must lie in (0, 1], but was {0}.")]
    InvalidAnchorProbability(f64),

    #[error("Odds must be finite and non-negative, but were {0}.")]
    UnboundedOdds(f64),

    #[error("The saturation sentinel must be finite and strictly positive, but was {0}.")]
    InvalidSentinel(f64),

    #[error(
        "Table weights must be non-negative and sum to at most 1; weight sum was {sum} (smallest weight {min})."
    )]
    InvalidWeights { sum: f64, min: f64 },

    #[error("Cannot aggregate an empty list of {0}.")]
    EmptyInput(&'static str),

    #[error(
        "Estimate {index} is exactly 1. Certain estimates have unbounded odds and are rejected under the current policy."
    )]
    CertainEstimate { index: usize },

    #[error("A conditional probability table needs at least one factor.")]
    NoFactors,

    #[error("A table over {found} factors is too large; at most {max} factors are supported.")]
    TooManyFactors { found: usize, max: usize },

    #[error("Factor '{0}' is named more than once.")]
    DuplicateFactor(String),

    #[error("The conditional probability table has no entry for assignment {0}.")]
    MissingAssignment(String),

    #[error("Assignment {assignment} has {found} values but the table has {expected} factors.")]
    UnexpectedAssignment {
        assignment: String,
        found: usize,
        expected: usize,
    },

    #[error("Assignment {0} appears more than once in the conditional probability table.")]
    DuplicateAssignment(String),

    #[error("The table holds {found} entries but {expected} factors admit only {expected_entries}.")]
    ExtraAssignments {
        found: usize,
        expected: usize,
        expected_entries: usize,
    },

    #[error("Series '{name}' has {found} values, but {expected} were expected.")]
    MisalignedSeries {
        name: String,
        found: usize,
        expected: usize,
    },

    #[error("Marginals were supplied for '{0}', which is not a factor of the table.")]
    UnknownFactor(String),

    #[error("No marginals were supplied for table factor '{0}'.")]
    MissingFactor(String),

    #[error("Row {row} has {found} columns, but row 0 has {expected}.")]
    RaggedMatrix {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("Sample points must be strictly increasing; {previous} is followed by {next}.")]
    UnsortedAbscissa { previous: f64, next: f64 },

    #[error("At least {required} sample points are needed, but {found} were given.")]
    TooFewSamples { found: usize, required: usize },

    #[error("Got {found} additive weights for a table over {expected} factors.")]
    WeightCount { found: usize, expected: usize },
}

impl ForecastError {
    /// Maps a concrete failure onto its taxonomy class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ProbabilityOutOfRange { .. }
            | Self::NonFinite(..)
            | Self::InvalidGrowthRate(..)
            | Self::InvalidAnchorProbability(..)
            | Self::UnboundedOdds(..)
            | Self::InvalidSentinel(..)
            | Self::InvalidWeights { .. } => ErrorKind::Domain,
            Self::EmptyInput(..) | Self::CertainEstimate { .. } => ErrorKind::DegenerateInput,
            Self::NoFactors
            | Self::TooManyFactors { .. }
            | Self::DuplicateFactor(..)
            | Self::MissingAssignment(..)
            | Self::UnexpectedAssignment { .. }
            | Self::DuplicateAssignment(..)
            | Self::ExtraAssignments { .. }
            | Self::MisalignedSeries { .. }
            | Self::UnknownFactor(..)
            | Self::MissingFactor(..)
            | Self::RaggedMatrix { .. }
            | Self::UnsortedAbscissa { .. }
            | Self::TooFewSamples { .. }
            | Self::WeightCount { .. } => ErrorKind::Shape,
        }
    }
}

/// Rejects anything that is not a finite probability in [0, 1].
pub(crate) fn check_probability(value: f64, context: &str) -> Result<f64, ForecastError> {
    if !value.is_finite() {
        return Err(ForecastError::NonFinite(context.to_string()));
    }
    if !(0.0..=1.0).contains(&value) {
        return Err(ForecastError::ProbabilityOutOfRange {
            value,
            context: context.to_string(),
        });
    }
    Ok(value)
}
