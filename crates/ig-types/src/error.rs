use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("invalid time range: from {from} is after to {to}")]
    InvalidTimeRange { from: String, to: String },

    #[error("unknown diff action: {0}")]
    UnknownAction(String),

    #[error("unknown property type: {0}")]
    UnknownPropertyType(String),
}
