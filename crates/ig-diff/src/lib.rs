//! Enriched diff storage for Infragraph.
//!
//! An enriched diff records how the data graph of one branch moved against
//! another over a time window, down to individual attribute properties and
//! relationship peers, with conflicts marked where both branches changed the
//! same element. This crate persists those diffs into a [`GraphStore`],
//! finds them again by branch and window, and keeps named handles on them.
//!
//! # Key Types
//!
//! - [`EnrichedDiffRoot`] -- one diff; owns a node arena keyed by uuid
//! - [`EnrichedDiffNode`] / [`EnrichedDiffAttribute`] / [`EnrichedRelationshipGroup`] -- nested changes
//! - [`DiffRepository`] -- save, get, get_one, delete over a store
//! - [`DiffTracker`] -- resolve branch and snapshot tracking ids
//!
//! # Retrieval Rules
//!
//! 1. A root matches a window when the two half-open ranges intersect.
//! 2. Of several roots on the same branch pair, a root whose window lies
//!    strictly inside another's is dropped.
//! 3. With a node-id filter, requested nodes come back in full and their
//!    ancestors as thin placeholders.
//!
//! [`GraphStore`]: ig_store::GraphStore

pub mod config;
pub mod deserializer;
pub mod error;
pub mod model;
pub mod overlap;
pub mod projection;
pub mod query;
pub mod records;
pub mod repository;
pub mod serializer;
pub mod tracking;

#[cfg(test)]
mod testing;

pub use config::DiffRepositoryConfig;
pub use deserializer::{deserialize, EnrichedDiffDeserializer};
pub use error::{DiffError, DiffResult};
pub use model::{
    ConflictSelection, DiffRootMetadata, DiffSummary, EnrichedDiffAttribute, EnrichedDiffConflict,
    EnrichedDiffNode, EnrichedDiffProperty, EnrichedDiffRoot, EnrichedRelationshipElement,
    EnrichedRelationshipGroup, TrackingId,
};
pub use overlap::drop_superseded;
pub use projection::project_nodes;
pub use repository::{DiffRepository, GetDiffsRequest};
pub use serializer::serialize_root;
pub use tracking::DiffTracker;
