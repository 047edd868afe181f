//! Labeled-record graph storage for Infragraph.
//!
//! The store holds two kinds of entries: [`GraphRecord`]s, each carrying a
//! label and a flat property map, and directed [`GraphEdge`]s of a named
//! kind between two records. Higher layers (the diff repository) decide what
//! labels and edge kinds mean; the store never interprets them.
//!
//! # Storage Backends
//!
//! All backends implement the async [`GraphStore`] trait:
//!
//! - [`InMemoryGraphStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Writes go through a [`WriteBatch`] that is applied all-or-nothing.
//! 2. A batch is validated completely before the first mutation.
//! 3. Every edge endpoint resolves to a live record.
//! 4. Deleting a record detaches all of its edges.
//! 5. Reads never observe a half-applied batch.

pub mod batch;
pub mod error;
pub mod memory;
pub mod record;
pub mod traits;

pub use batch::{WriteBatch, WriteOp};
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryGraphStore;
pub use record::{GraphEdge, GraphRecord, Predicate, RecordId, RecordQuery};
pub use traits::GraphStore;
