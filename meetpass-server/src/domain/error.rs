//! Domain error types.
//!
//! These errors reject malformed datasets and mutation requests. Incomplete
//! data (missing running times, unknown station references) is not an error:
//! it degrades the affected train only and is reported as a value.

/// Dataset-level validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DomainError {
    /// A station row has an empty name
    #[error("station name cannot be empty")]
    EmptyStationName,

    /// A station position is NaN or infinite
    #[error("station {0} has a non-finite position")]
    InvalidPosition(String),

    /// Two station rows normalize to the same name
    #[error("duplicate station: {0}")]
    DuplicateStation(String),

    /// Two train rows share an id
    #[error("duplicate train id: {0}")]
    DuplicateTrain(String),

    /// A mutation referenced a train that is not loaded
    #[error("unknown train: {0}")]
    UnknownTrain(String),

    /// A running time row carries a negative duration
    #[error("negative running time between {from} and {to}")]
    NegativeRuntime { from: String, to: String },

    /// A running time row is longer than a whole day
    #[error("running time {minutes} between {from} and {to} exceeds 1440 minutes")]
    RuntimeTooLong {
        from: String,
        to: String,
        minutes: i64,
    },

    /// A dwell value is negative
    #[error("negative dwell for train {train} at {station}")]
    NegativeDwell { train: String, station: String },

    /// A dwell value is longer than a whole day
    #[error("dwell {minutes} for train {train} at {station} exceeds 1440 minutes")]
    DwellTooLong {
        train: String,
        station: String,
        minutes: i64,
    },

    /// A requested start lies outside the day
    #[error("start {start} of train {train} is outside 0..=1440")]
    StartOutOfRange { train: String, start: i64 },
}
