//! Engine error taxonomy
//!
//! Range and data-integrity failures are hard errors. Missing metrics are
//! not errors at all: they degrade the classification (see `risk::DataGap`).
//! An unavailable simulation is `None`, also not an error.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Requested day lies outside the trajectory. Never clamped.
    #[error("day {day} is outside the trajectory (valid days: 1..={len})")]
    OutOfRange { day: u32, len: usize },

    /// Synthetic/demo rows found alongside real observations.
    #[error(
        "data integrity violation: synthetic observation(s) on day(s) {days:?} mixed into a real trajectory"
    )]
    SyntheticMixedIn { days: Vec<u32> },

    #[error("trajectory length mismatch: expected curve has {expected} points, actual has {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("expected curve covers {expected} day(s) but {observed} observation(s) are recorded")]
    ExpectedCurveTooShort { expected: usize, observed: usize },

    #[error("no observations recorded")]
    EmptyHistory,

    #[error("{series} area on day {day} must be finite and >= 0 (got {value})")]
    InvalidTrajectoryPoint {
        series: &'static str,
        day: u32,
        value: f64,
    },

    #[error("observation for day {got} is out of sequence (next day is {expected})")]
    DayOutOfSequence { expected: u32, got: u32 },

    #[error("invalid observation on day {day}: {reason}")]
    InvalidObservation { day: u32, reason: String },
}

impl EngineError {
    /// True for the fatal precondition class (mixed synthetic/real history).
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, EngineError::SyntheticMixedIn { .. })
    }
}
