use serde_json::Value;

use crate::record::{GraphEdge, GraphRecord, RecordId};

/// One mutation inside a [`WriteBatch`].
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    /// Insert a new record. Fails if the id is already taken.
    PutRecord(GraphRecord),
    /// Insert an edge. Both endpoints must exist after the preceding ops.
    PutEdge(GraphEdge),
    /// Overwrite a single property of an existing record.
    SetProperty {
        id: RecordId,
        key: String,
        value: Value,
    },
    /// Remove a record and detach all of its edges. Absent ids are a no-op.
    DeleteRecord(RecordId),
}

/// An ordered set of mutations applied all-or-nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_record(&mut self, record: GraphRecord) -> RecordId {
        let id = record.id;
        self.ops.push(WriteOp::PutRecord(record));
        id
    }

    pub fn put_edge(&mut self, kind: impl Into<String>, source: RecordId, target: RecordId) {
        self.ops
            .push(WriteOp::PutEdge(GraphEdge::new(kind, source, target)));
    }

    pub fn set_property(&mut self, id: RecordId, key: impl Into<String>, value: impl Into<Value>) {
        self.ops.push(WriteOp::SetProperty {
            id,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete_record(&mut self, id: RecordId) {
        self.ops.push(WriteOp::DeleteRecord(id));
    }

    /// Append all ops of `other` after the ops of `self`.
    pub fn extend(&mut self, other: WriteBatch) {
        self.ops.extend(other.ops);
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Number of records this batch inserts.
    pub fn record_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::PutRecord(_)))
            .count()
    }

    /// Number of edges this batch inserts.
    pub fn edge_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, WriteOp::PutEdge(_)))
            .count()
    }
}
