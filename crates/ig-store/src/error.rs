use crate::record::RecordId;

/// Errors from graph store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An edge endpoint does not exist in the store or earlier in the batch.
    #[error("dangling edge {kind}: {source_id} -> {target_id}")]
    DanglingEdge {
        kind: String,
        source_id: RecordId,
        target_id: RecordId,
    },

    /// The referenced record does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// A record with this id already exists.
    #[error("duplicate record: {0}")]
    DuplicateRecord(RecordId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The storage backend failed or is unavailable.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
