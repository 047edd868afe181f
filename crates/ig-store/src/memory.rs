use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::debug;

use crate::batch::{WriteBatch, WriteOp};
use crate::error::{StoreError, StoreResult};
use crate::record::{GraphEdge, GraphRecord, RecordId, RecordQuery};
use crate::traits::GraphStore;

/// In-memory, HashMap-based graph store.
///
/// Intended for tests and embedding. Records and edges live behind a single
/// `RwLock`, so a batch becomes visible to readers in one step.
pub struct InMemoryGraphStore {
    inner: RwLock<GraphState>,
}

#[derive(Default)]
struct GraphState {
    records: HashMap<RecordId, GraphRecord>,
    by_label: HashMap<String, BTreeSet<RecordId>>,
    outgoing: HashMap<RecordId, Vec<GraphEdge>>,
    incoming: HashMap<RecordId, Vec<GraphEdge>>,
}

impl InMemoryGraphStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphState::default()),
        }
    }

    fn read_state(&self) -> StoreResult<RwLockReadGuard<'_, GraphState>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    fn write_state(&self) -> StoreResult<RwLockWriteGuard<'_, GraphState>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Backend(format!("lock poisoned: {e}")))
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.read_state().map(|s| s.records.len()).unwrap_or(0)
    }

    /// Returns `true` if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of edges currently stored.
    pub fn edge_count(&self) -> usize {
        self.read_state()
            .map(|s| s.outgoing.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    /// Number of records carrying `label`.
    pub fn count_label(&self, label: &str) -> usize {
        self.read_state()
            .map(|s| s.by_label.get(label).map_or(0, BTreeSet::len))
            .unwrap_or(0)
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphState {
    /// Dry-run the batch against the current state without mutating it.
    fn validate(&self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut created: HashSet<RecordId> = HashSet::new();
        let mut deleted: HashSet<RecordId> = HashSet::new();
        let live = |id: &RecordId, created: &HashSet<RecordId>, deleted: &HashSet<RecordId>| {
            created.contains(id) || (self.records.contains_key(id) && !deleted.contains(id))
        };

        for op in ops {
            match op {
                WriteOp::PutRecord(record) => {
                    if live(&record.id, &created, &deleted) {
                        return Err(StoreError::DuplicateRecord(record.id));
                    }
                    created.insert(record.id);
                    deleted.remove(&record.id);
                }
                WriteOp::PutEdge(edge) => {
                    if !live(&edge.source, &created, &deleted)
                        || !live(&edge.target, &created, &deleted)
                    {
                        return Err(StoreError::DanglingEdge {
                            kind: edge.kind.clone(),
                            source_id: edge.source,
                            target_id: edge.target,
                        });
                    }
                }
                WriteOp::SetProperty { id, .. } => {
                    if !live(id, &created, &deleted) {
                        return Err(StoreError::RecordNotFound(*id));
                    }
                }
                WriteOp::DeleteRecord(id) => {
                    created.remove(id);
                    deleted.insert(*id);
                }
            }
        }
        Ok(())
    }

    fn insert_record(&mut self, record: GraphRecord) {
        self.by_label
            .entry(record.label.clone())
            .or_default()
            .insert(record.id);
        self.records.insert(record.id, record);
    }

    fn insert_edge(&mut self, edge: GraphEdge) {
        let out = self.outgoing.entry(edge.source).or_default();
        if out.contains(&edge) {
            return;
        }
        out.push(edge.clone());
        self.incoming.entry(edge.target).or_default().push(edge);
    }

    fn remove_record(&mut self, id: &RecordId) {
        let Some(record) = self.records.remove(id) else {
            return;
        };
        if let Some(ids) = self.by_label.get_mut(&record.label) {
            ids.remove(id);
        }
        for edge in self.outgoing.remove(id).unwrap_or_default() {
            if let Some(edges) = self.incoming.get_mut(&edge.target) {
                edges.retain(|e| e != &edge);
            }
        }
        for edge in self.incoming.remove(id).unwrap_or_default() {
            if let Some(edges) = self.outgoing.get_mut(&edge.source) {
                edges.retain(|e| e != &edge);
            }
        }
    }

    fn apply_op(&mut self, op: WriteOp) {
        match op {
            WriteOp::PutRecord(record) => self.insert_record(record),
            WriteOp::PutEdge(edge) => self.insert_edge(edge),
            WriteOp::SetProperty { id, key, value } => {
                if let Some(record) = self.records.get_mut(&id) {
                    record.properties.insert(key, value);
                }
            }
            WriteOp::DeleteRecord(id) => self.remove_record(&id),
        }
    }
}

fn filter_kind(edges: Option<&Vec<GraphEdge>>, kind: Option<&str>) -> Vec<GraphEdge> {
    edges
        .map(|edges| {
            edges
                .iter()
                .filter(|e| kind.map_or(true, |k| e.kind == k))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut state = self.write_state()?;
        state.validate(batch.ops())?;

        let (records, edges) = (batch.record_count(), batch.edge_count());
        for op in batch.into_ops() {
            state.apply_op(op);
        }
        debug!(records, edges, "applied write batch");
        Ok(())
    }

    async fn record(&self, id: &RecordId) -> StoreResult<Option<GraphRecord>> {
        Ok(self.read_state()?.records.get(id).cloned())
    }

    async fn find(&self, query: &RecordQuery) -> StoreResult<Vec<GraphRecord>> {
        let state = self.read_state()?;
        let Some(ids) = state.by_label.get(&query.label) else {
            return Ok(Vec::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|record| query.matches(record))
            .cloned()
            .collect())
    }

    async fn edges_from(&self, id: &RecordId, kind: Option<&str>) -> StoreResult<Vec<GraphEdge>> {
        Ok(filter_kind(self.read_state()?.outgoing.get(id), kind))
    }

    async fn edges_to(&self, id: &RecordId, kind: Option<&str>) -> StoreResult<Vec<GraphEdge>> {
        Ok(filter_kind(self.read_state()?.incoming.get(id), kind))
    }

    async fn records(&self, ids: &[RecordId]) -> StoreResult<Vec<GraphRecord>> {
        let state = self.read_state()?;
        Ok(ids
            .iter()
            .filter_map(|id| state.records.get(id).cloned())
            .collect())
    }
}

impl std::fmt::Debug for InMemoryGraphStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGraphStore")
            .field("record_count", &self.len())
            .field("edge_count", &self.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Predicate;

    fn two_linked() -> (WriteBatch, RecordId, RecordId) {
        let mut batch = WriteBatch::new();
        let a = batch.put_record(GraphRecord::new("Parent").with("name", "a"));
        let b = batch.put_record(GraphRecord::new("Child").with("name", "b"));
        batch.put_edge("HAS_CHILD", a, b);
        (batch, a, b)
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn apply_and_read_back() {
        let store = InMemoryGraphStore::new();
        let (batch, a, b) = two_linked();
        store.apply(batch).await.unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.edge_count(), 1);
        let rec = store.record(&a).await.unwrap().expect("should exist");
        assert_eq!(rec.get_str("name"), Some("a"));

        let out = store.edges_from(&a, Some("HAS_CHILD")).await.unwrap();
        assert_eq!(out, vec![GraphEdge::new("HAS_CHILD", a, b)]);
        let inc = store.edges_to(&b, None).await.unwrap();
        assert_eq!(inc.len(), 1);
        assert!(store.edges_from(&a, Some("OTHER")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_filters_by_label_and_predicate() {
        let store = InMemoryGraphStore::new();
        let (batch, _, b) = two_linked();
        store.apply(batch).await.unwrap();

        let found = store
            .find(&RecordQuery::label("Child").filter(Predicate::equals("name", "b")))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, b);

        let none = store.find(&RecordQuery::label("Missing")).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn set_property_overwrites() {
        let store = InMemoryGraphStore::new();
        let (batch, a, _) = two_linked();
        store.apply(batch).await.unwrap();

        let mut update = WriteBatch::new();
        update.set_property(a, "name", "renamed");
        store.apply(update).await.unwrap();

        let rec = store.record(&a).await.unwrap().unwrap();
        assert_eq!(rec.get_str("name"), Some("renamed"));
    }

    // -----------------------------------------------------------------------
    // Atomicity
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn dangling_edge_rejects_whole_batch() {
        let store = InMemoryGraphStore::new();
        let mut batch = WriteBatch::new();
        let a = batch.put_record(GraphRecord::new("Parent"));
        batch.put_edge("HAS_CHILD", a, RecordId::new());

        let err = store.apply(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::DanglingEdge { .. }));
        assert!(store.is_empty());
        assert_eq!(store.edge_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_record_rejected() {
        let store = InMemoryGraphStore::new();
        let record = GraphRecord::new("Parent");
        let mut first = WriteBatch::new();
        first.put_record(record.clone());
        store.apply(first).await.unwrap();

        let mut second = WriteBatch::new();
        second.put_record(GraphRecord::new("Other"));
        second.put_record(record);
        let err = store.apply(second).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateRecord(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.count_label("Other"), 0);
    }

    #[tokio::test]
    async fn set_property_on_missing_record_fails() {
        let store = InMemoryGraphStore::new();
        let mut batch = WriteBatch::new();
        batch.set_property(RecordId::new(), "k", 1);
        let err = store.apply(batch).await.unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound(_)));
    }

    #[tokio::test]
    async fn edge_to_record_deleted_earlier_in_batch_fails() {
        let store = InMemoryGraphStore::new();
        let (batch, a, b) = two_linked();
        store.apply(batch).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete_record(b);
        batch.put_edge("HAS_CHILD", a, b);
        assert!(store.apply(batch).await.is_err());
        assert_eq!(store.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn delete_detaches_edges() {
        let store = InMemoryGraphStore::new();
        let (batch, a, b) = two_linked();
        store.apply(batch).await.unwrap();

        let mut delete = WriteBatch::new();
        delete.delete_record(b);
        store.apply(delete).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.edge_count(), 0);
        assert!(store.edges_from(&a, None).await.unwrap().is_empty());
        assert_eq!(store.count_label("Child"), 0);
    }

    #[tokio::test]
    async fn delete_missing_record_is_noop() {
        let store = InMemoryGraphStore::new();
        let mut delete = WriteBatch::new();
        delete.delete_record(RecordId::new());
        store.apply(delete).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn duplicate_edges_are_stored_once() {
        let store = InMemoryGraphStore::new();
        let (mut batch, a, b) = two_linked();
        batch.put_edge("HAS_CHILD", a, b);
        store.apply(batch).await.unwrap();
        assert_eq!(store.edge_count(), 1);
    }

    #[tokio::test]
    async fn batch_read_skips_missing() {
        let store = InMemoryGraphStore::new();
        let (batch, a, b) = two_linked();
        store.apply(batch).await.unwrap();
        let found = store.records(&[a, RecordId::new(), b]).await.unwrap();
        assert_eq!(found.len(), 2);
    }
}
