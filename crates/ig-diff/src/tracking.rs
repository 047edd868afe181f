//! Named handles onto diff roots.
//!
//! A tracking id is a mutable pointer to the latest diff of a kind, held by
//! at most one root per diff branch:
//!
//! - `branch:<name>` is the rolling diff of a branch against its base
//! - `name:<name>` is a caller-chosen snapshot label

use crate::error::DiffResult;
use crate::model::{EnrichedDiffRoot, TrackingId};
use crate::repository::DiffRepository;

/// Resolves tracking ids to diff roots through a [`DiffRepository`].
#[derive(Clone, Debug)]
pub struct DiffTracker {
    repository: DiffRepository,
}

impl DiffTracker {
    pub fn new(repository: DiffRepository) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &DiffRepository {
        &self.repository
    }

    /// Uuid of the root holding `tracking_id` on `diff_branch_name`.
    ///
    /// Fails with `ResourceNotFound` when no root holds it.
    pub async fn resolve(&self, tracking_id: &TrackingId, diff_branch_name: &str) -> DiffResult<String> {
        Ok(self
            .repository
            .resolve_tracking_id(tracking_id, diff_branch_name)
            .await?
            .uuid)
    }

    /// The rolling diff of `branch`.
    pub async fn current_for_branch(&self, branch: &str) -> DiffResult<EnrichedDiffRoot> {
        self.repository
            .get_one(&TrackingId::branch(branch), branch)
            .await
    }

    /// The diff saved under snapshot label `name` on `diff_branch_name`.
    pub async fn snapshot(&self, name: &str, diff_branch_name: &str) -> DiffResult<EnrichedDiffRoot> {
        self.repository
            .get_one(&TrackingId::named(name), diff_branch_name)
            .await
    }

    /// Tracking ids held on `diff_branch_name` with their root uuids, in
    /// canonical order.
    pub async fn list(&self, diff_branch_name: &str) -> DiffResult<Vec<(TrackingId, String)>> {
        Ok(self
            .repository
            .list_tracked(Some(diff_branch_name))
            .await?
            .into_iter()
            .filter_map(|h| Some((h.tracking_id?, h.uuid)))
            .collect())
    }
}
