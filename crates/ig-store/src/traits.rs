use async_trait::async_trait;

use crate::batch::WriteBatch;
use crate::error::StoreResult;
use crate::record::{GraphEdge, GraphRecord, RecordId, RecordQuery};

/// Async labeled-record graph store.
///
/// All implementations must satisfy these invariants:
/// - [`apply`](GraphStore::apply) is atomic: either every op in the batch
///   takes effect or none does.
/// - Every stored edge points at two live records.
/// - Deleting a record removes every edge touching it.
/// - Readers never observe a partially applied batch.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Apply a batch of mutations atomically.
    async fn apply(&self, batch: WriteBatch) -> StoreResult<()>;

    /// Read a record by id. Returns `Ok(None)` if it does not exist.
    async fn record(&self, id: &RecordId) -> StoreResult<Option<GraphRecord>>;

    /// All records matching `query`, in id order.
    async fn find(&self, query: &RecordQuery) -> StoreResult<Vec<GraphRecord>>;

    /// Outgoing edges of `id`, optionally restricted to one kind.
    async fn edges_from(&self, id: &RecordId, kind: Option<&str>) -> StoreResult<Vec<GraphEdge>>;

    /// Incoming edges of `id`, optionally restricted to one kind.
    async fn edges_to(&self, id: &RecordId, kind: Option<&str>) -> StoreResult<Vec<GraphEdge>>;

    /// Read several records, silently skipping missing ids.
    ///
    /// Default implementation calls `record()` for each id. Backends may
    /// override for fewer round-trips.
    async fn records(&self, ids: &[RecordId]) -> StoreResult<Vec<GraphRecord>> {
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(record) = self.record(id).await? {
                found.push(record);
            }
        }
        Ok(found)
    }
}
