//! Error types for the diff crate.

use ig_store::{RecordId, StoreError};
use ig_types::TypeError;

/// Errors that can occur during diff storage operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A tracking-id lookup found no root. Recoverable: callers decide the fallback.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// The graph store failed to read or write.
    #[error("persistence error: {0}")]
    Persistence(#[from] StoreError),

    /// The input was rejected before any store I/O.
    #[error("validation error: {0}")]
    Validation(String),

    /// A persisted record could not be decoded.
    #[error("corrupt diff record {id}: {reason}")]
    CorruptRecord { id: RecordId, reason: String },

    /// Repository configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),
}

impl DiffError {
    /// Returns `true` for the recoverable not-found kind.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ResourceNotFound(_))
    }
}

impl From<TypeError> for DiffError {
    fn from(err: TypeError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
