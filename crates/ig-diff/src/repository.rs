//! Persistence and retrieval of enriched diffs over a [`GraphStore`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use ig_store::{GraphRecord, GraphStore, WriteBatch};
use ig_types::{TimeRange, Timestamp};

use crate::config::DiffRepositoryConfig;
use crate::deserializer::deserialize;
use crate::error::{DiffError, DiffResult};
use crate::model::{DiffRootMetadata, EnrichedDiffRoot, TrackingId};
use crate::overlap::drop_superseded_by;
use crate::projection::project_nodes;
use crate::query::{self, RootFilter};
use crate::records::{self, field};
use crate::serializer::serialize_root;

/// Parameters of [`DiffRepository::get`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GetDiffsRequest {
    pub base_branch_name: String,
    /// Matches roots on any of these branches. Empty matches nothing.
    pub diff_branch_names: Vec<String>,
    pub from_time: Timestamp,
    pub to_time: Timestamp,
    /// Restrict each root to these node uuids and their ancestors.
    pub ids: Option<BTreeSet<String>>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl GetDiffsRequest {
    pub fn new(
        base_branch_name: impl Into<String>,
        diff_branch_names: impl IntoIterator<Item = impl Into<String>>,
        from_time: Timestamp,
        to_time: Timestamp,
    ) -> Self {
        Self {
            base_branch_name: base_branch_name.into(),
            diff_branch_names: diff_branch_names.into_iter().map(Into::into).collect(),
            from_time,
            to_time,
            ids: None,
            limit: None,
            offset: 0,
        }
    }

    pub fn with_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// A root header selected for loading, with its optional node scope.
struct Selected {
    record: GraphRecord,
    header: DiffRootMetadata,
    scope: Option<BTreeSet<String>>,
}

/// Saves, finds and deletes enriched diffs.
///
/// Cheap to clone; clones share the underlying store.
#[derive(Clone)]
pub struct DiffRepository {
    store: Arc<dyn GraphStore>,
    config: DiffRepositoryConfig,
}

impl fmt::Debug for DiffRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffRepository")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl DiffRepository {
    pub fn new(store: Arc<dyn GraphStore>, config: DiffRepositoryConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &DiffRepositoryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    /// Persist `root` and its whole node graph in one atomic batch.
    ///
    /// When the root carries a tracking id, earlier roots holding the same
    /// id on the same diff branch lose it in that batch.
    pub async fn save(&self, root: &EnrichedDiffRoot) -> DiffResult<()> {
        root.validate()?;

        let mut batch = WriteBatch::new();
        if let Some(tracking_id) = &root.tracking_id {
            let previous =
                query::find_tracked_roots(self.store.as_ref(), tracking_id, Some(&root.diff_branch_name))
                    .await?;
            for record in &previous {
                batch.set_property(record.id, field::TRACKING_ID, Value::Null);
            }
            if !previous.is_empty() {
                debug!(tracking_id = %tracking_id, cleared = previous.len(), "tracking id moved");
            }
        }
        let nodes = root.nodes.len();
        let payload = serialize_root(root);
        let records = payload.record_count();
        batch.extend(payload);

        self.store.apply(batch).await?;
        info!(
            root = %root.uuid,
            base = %root.base_branch_name,
            diff = %root.diff_branch_name,
            nodes,
            records,
            "diff root saved"
        );
        Ok(())
    }

    /// Roots matching `request`, after overlap deduplication, pagination and
    /// node-id projection, in root uuid order.
    pub async fn get(&self, request: &GetDiffsRequest) -> DiffResult<Vec<EnrichedDiffRoot>> {
        let selected = self.select(request).await?;
        let mut roots = self.load(selected).await?;
        if let Some(ids) = &request.ids {
            let max_depth = self.config.max_depth_search_hierarchy;
            roots = roots
                .iter()
                .filter_map(|root| project_nodes(root, ids, max_depth))
                .collect();
        }
        info!(
            base = %request.base_branch_name,
            diff_branches = ?request.diff_branch_names,
            returned = roots.len(),
            "diff roots loaded"
        );
        Ok(roots)
    }

    /// Headers of the roots [`get`](Self::get) would return, without their nodes.
    pub async fn get_roots_metadata(&self, request: &GetDiffsRequest) -> DiffResult<Vec<DiffRootMetadata>> {
        Ok(self
            .select(request)
            .await?
            .into_iter()
            .map(|s| s.header)
            .collect())
    }

    /// The root on `diff_branch_name` currently holding `tracking_id`.
    pub async fn get_one(&self, tracking_id: &TrackingId, diff_branch_name: &str) -> DiffResult<EnrichedDiffRoot> {
        let record = self.tracked_record(tracking_id, diff_branch_name).await?;
        let header = records::decode_root(&record)?;
        let root_uuid = header.uuid.clone();
        self.load(vec![Selected {
            record,
            header,
            scope: None,
        }])
        .await?
        .pop()
        .ok_or_else(|| DiffError::ResourceNotFound(format!("diff root {root_uuid}")))
    }

    /// Header of the root on `diff_branch_name` currently holding `tracking_id`.
    pub async fn resolve_tracking_id(
        &self,
        tracking_id: &TrackingId,
        diff_branch_name: &str,
    ) -> DiffResult<DiffRootMetadata> {
        let record = self.tracked_record(tracking_id, diff_branch_name).await?;
        records::decode_root(&record)
    }

    /// Headers of every tracked root, optionally on one diff branch, ordered
    /// by canonical tracking id.
    pub async fn list_tracked(&self, diff_branch_name: Option<&str>) -> DiffResult<Vec<DiffRootMetadata>> {
        let mut headers = query::find_all_tracked_roots(self.store.as_ref(), diff_branch_name)
            .await?
            .iter()
            .map(records::decode_root)
            .collect::<DiffResult<Vec<_>>>()?;
        headers.sort_by_key(|h| {
            (
                h.tracking_id.as_ref().map(TrackingId::canonical),
                h.diff_branch_name.clone(),
            )
        });
        Ok(headers)
    }

    /// Delete the given roots and everything they exclusively own.
    ///
    /// Unknown uuids are ignored. Returns the number of records removed.
    pub async fn delete_diff_roots(&self, root_uuids: &[String]) -> DiffResult<usize> {
        let roots = query::find_roots_by_uuid(self.store.as_ref(), root_uuids).await?;
        let mut doomed = BTreeSet::new();
        for root in &roots {
            doomed.extend(query::owned_subgraph(self.store.as_ref(), root).await?);
        }
        if doomed.is_empty() {
            debug!(requested = root_uuids.len(), "no diff roots to delete");
            return Ok(0);
        }

        let mut batch = WriteBatch::new();
        for id in &doomed {
            batch.delete_record(*id);
        }
        self.store.apply(batch).await?;
        info!(
            requested = root_uuids.len(),
            roots = roots.len(),
            records = doomed.len(),
            "diff roots deleted"
        );
        Ok(doomed.len())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn tracked_record(&self, tracking_id: &TrackingId, diff_branch_name: &str) -> DiffResult<GraphRecord> {
        tracking_id.validate()?;
        let holders = query::find_tracked_roots(self.store.as_ref(), tracking_id, Some(diff_branch_name)).await?;
        if holders.len() > 1 {
            warn!(
                tracking_id = %tracking_id,
                diff = diff_branch_name,
                holders = holders.len(),
                "tracking id held by several roots, using the latest"
            );
        }
        holders
            .into_iter()
            .max_by_key(|r| r.id)
            .ok_or_else(|| {
                DiffError::ResourceNotFound(format!(
                    "no diff with tracking id {tracking_id} on branch {diff_branch_name}"
                ))
            })
    }

    /// Filter, deduplicate, scope and paginate root headers.
    async fn select(&self, request: &GetDiffsRequest) -> DiffResult<Vec<Selected>> {
        let range = TimeRange::new(request.from_time, request.to_time)?;
        if request.diff_branch_names.is_empty() {
            debug!("no diff branches requested");
            return Ok(Vec::new());
        }

        let filter = RootFilter {
            base_branch_name: &request.base_branch_name,
            diff_branch_names: &request.diff_branch_names,
            range,
        };
        let mut candidates = Vec::new();
        for record in query::fetch_root_headers(self.store.as_ref(), &filter).await? {
            let header = records::decode_root(&record)?;
            candidates.push(Selected {
                record,
                header,
                scope: None,
            });
        }
        let matched = candidates.len();
        candidates.sort_by_key(|s| s.record.id);
        let mut candidates = drop_superseded_by(candidates, |s| &s.header);
        if candidates.len() < matched {
            debug!(matched, kept = candidates.len(), "superseded diff roots dropped");
        }
        candidates.sort_by(|a, b| (&a.header.uuid, a.record.id).cmp(&(&b.header.uuid, b.record.id)));

        if let Some(ids) = &request.ids {
            let max_depth = self.config.max_depth_search_hierarchy;
            let mut scoped = Vec::with_capacity(candidates.len());
            for mut candidate in candidates {
                let closure = query::node_closure(self.store.as_ref(), &candidate.record, ids, max_depth).await?;
                if !closure.is_empty() {
                    candidate.scope = Some(closure);
                    scoped.push(candidate);
                }
            }
            candidates = scoped;
        }

        let limit = request.limit.or(self.config.default_limit).unwrap_or(usize::MAX);
        Ok(candidates
            .into_iter()
            .skip(request.offset)
            .take(limit)
            .collect())
    }

    async fn load(&self, selected: Vec<Selected>) -> DiffResult<Vec<EnrichedDiffRoot>> {
        let mut rows = Vec::new();
        for s in &selected {
            rows.extend(query::fetch_rows(self.store.as_ref(), &s.record, s.scope.as_ref()).await?);
        }
        let headers: Vec<GraphRecord> = selected.into_iter().map(|s| s.record).collect();
        deserialize(&headers, &rows)
    }
}
