//! Read-side queries over persisted diff records.
//!
//! Roots are located by their header properties. Their node graphs are read
//! back as flat [`DiffRow`]s, one per leaf path, which the deserializer
//! folds into the nested model.

use std::collections::{BTreeSet, VecDeque};

use ig_store::{GraphRecord, GraphStore, Predicate, RecordId, RecordQuery};
use ig_types::TimeRange;
use tracing::debug;

use crate::error::DiffResult;
use crate::model::TrackingId;
use crate::records::{edge, field, label, required_str};

/// Header-level selection of diff roots.
#[derive(Clone, Debug)]
pub struct RootFilter<'a> {
    pub base_branch_name: &'a str,
    pub diff_branch_names: &'a [String],
    pub range: TimeRange,
}

/// Roots on the given branches whose window overlaps `filter.range`
/// (`root.from < range.to && root.to > range.from`).
pub async fn fetch_root_headers(store: &dyn GraphStore, filter: &RootFilter<'_>) -> DiffResult<Vec<GraphRecord>> {
    if filter.diff_branch_names.is_empty() {
        return Ok(Vec::new());
    }
    let query = RecordQuery::label(label::ROOT)
        .filter(Predicate::equals(field::BASE_BRANCH, filter.base_branch_name))
        .filter(Predicate::is_in(
            field::DIFF_BRANCH,
            filter.diff_branch_names.iter().map(String::as_str),
        ))
        .filter(Predicate::lt(field::FROM_TIME, filter.range.to.as_micros()))
        .filter(Predicate::gt(field::TO_TIME, filter.range.from.as_micros()));
    let roots = store.find(&query).await?;
    debug!(
        base = filter.base_branch_name,
        diff_branches = filter.diff_branch_names.len(),
        matched = roots.len(),
        "diff roots matched"
    );
    Ok(roots)
}

/// Root records with any of the given uuids.
pub async fn find_roots_by_uuid(store: &dyn GraphStore, uuids: &[String]) -> DiffResult<Vec<GraphRecord>> {
    if uuids.is_empty() {
        return Ok(Vec::new());
    }
    let query = RecordQuery::label(label::ROOT)
        .filter(Predicate::is_in(field::UUID, uuids.iter().map(String::as_str)));
    Ok(store.find(&query).await?)
}

/// Root records carrying `tracking_id`, optionally restricted to one diff branch.
pub async fn find_tracked_roots(
    store: &dyn GraphStore,
    tracking_id: &TrackingId,
    diff_branch_name: Option<&str>,
) -> DiffResult<Vec<GraphRecord>> {
    let mut query = RecordQuery::label(label::ROOT)
        .filter(Predicate::equals(field::TRACKING_ID, tracking_id.canonical()));
    if let Some(branch) = diff_branch_name {
        query = query.filter(Predicate::equals(field::DIFF_BRANCH, branch));
    }
    Ok(store.find(&query).await?)
}

/// Every tracked root, optionally restricted to one diff branch.
pub async fn find_all_tracked_roots(
    store: &dyn GraphStore,
    diff_branch_name: Option<&str>,
) -> DiffResult<Vec<GraphRecord>> {
    let mut query = RecordQuery::label(label::ROOT);
    if let Some(branch) = diff_branch_name {
        query = query.filter(Predicate::equals(field::DIFF_BRANCH, branch));
    }
    let mut roots = store.find(&query).await?;
    roots.retain(|r| r.get(field::TRACKING_ID).is_some());
    Ok(roots)
}

async fn children(store: &dyn GraphStore, id: RecordId, kind: &str) -> DiffResult<Vec<GraphRecord>> {
    let targets: Vec<RecordId> = store
        .edges_from(&id, Some(kind))
        .await?
        .into_iter()
        .map(|e| e.target)
        .collect();
    Ok(store.records(&targets).await?)
}

async fn first_child(store: &dyn GraphStore, id: RecordId, kind: &str) -> DiffResult<Option<GraphRecord>> {
    Ok(children(store, id, kind).await?.into_iter().next())
}

// ---------------------------------------------------------------------------
// Flat rows
// ---------------------------------------------------------------------------

/// A property record with its optional conflict.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyRow {
    pub property: GraphRecord,
    pub conflict: Option<GraphRecord>,
}

/// A relationship element with its optional conflict and one of its properties.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementRow {
    pub element: GraphRecord,
    pub conflict: Option<GraphRecord>,
    pub property: Option<PropertyRow>,
}

/// The deepest entity a row reaches below its node.
#[derive(Clone, Debug, PartialEq)]
pub enum RowLeaf {
    /// The node has no attributes and no relationship groups.
    Bare,
    Attribute {
        attribute: GraphRecord,
        property: Option<PropertyRow>,
    },
    Relationship {
        group: GraphRecord,
        element: Option<ElementRow>,
    },
    /// A relationship group's link to a peer node, by uuid.
    Peer { group: GraphRecord, peer_uuid: String },
}

/// One path from a diff node down to a leaf.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffRow {
    pub root_uuid: String,
    pub node: GraphRecord,
    pub node_conflict: Option<GraphRecord>,
    pub leaf: RowLeaf,
}

/// Read the node graph below `root` as flat rows.
///
/// With `scope`, only nodes whose uuid is in the set are read.
pub async fn fetch_rows(
    store: &dyn GraphStore,
    root: &GraphRecord,
    scope: Option<&BTreeSet<String>>,
) -> DiffResult<Vec<DiffRow>> {
    let root_uuid = required_str(root, field::UUID)?;
    let mut rows = Vec::new();

    for node in children(store, root.id, edge::HAS_NODE).await? {
        if let Some(scope) = scope {
            let in_scope = node.get_str(field::UUID).is_some_and(|u| scope.contains(u));
            if !in_scope {
                continue;
            }
        }
        let node_conflict = first_child(store, node.id, edge::HAS_CONFLICT).await?;
        let mut leaves = Vec::new();

        for attribute in children(store, node.id, edge::HAS_ATTRIBUTE).await? {
            let properties = property_rows(store, attribute.id).await?;
            if properties.is_empty() {
                leaves.push(RowLeaf::Attribute {
                    attribute,
                    property: None,
                });
                continue;
            }
            for property in properties {
                leaves.push(RowLeaf::Attribute {
                    attribute: attribute.clone(),
                    property: Some(property),
                });
            }
        }

        for group in children(store, node.id, edge::HAS_RELATIONSHIP).await? {
            let elements = children(store, group.id, edge::HAS_ELEMENT).await?;
            let peers = children(store, group.id, edge::HAS_PEER).await?;
            if elements.is_empty() && peers.is_empty() {
                leaves.push(RowLeaf::Relationship {
                    group,
                    element: None,
                });
                continue;
            }
            for element in elements {
                let conflict = first_child(store, element.id, edge::HAS_CONFLICT).await?;
                let properties = property_rows(store, element.id).await?;
                if properties.is_empty() {
                    leaves.push(RowLeaf::Relationship {
                        group: group.clone(),
                        element: Some(ElementRow {
                            element,
                            conflict,
                            property: None,
                        }),
                    });
                    continue;
                }
                for property in properties {
                    leaves.push(RowLeaf::Relationship {
                        group: group.clone(),
                        element: Some(ElementRow {
                            element: element.clone(),
                            conflict: conflict.clone(),
                            property: Some(property),
                        }),
                    });
                }
            }
            for peer in peers {
                leaves.push(RowLeaf::Peer {
                    group: group.clone(),
                    peer_uuid: required_str(&peer, field::UUID)?,
                });
            }
        }

        if leaves.is_empty() {
            leaves.push(RowLeaf::Bare);
        }
        rows.extend(leaves.into_iter().map(|leaf| DiffRow {
            root_uuid: root_uuid.clone(),
            node: node.clone(),
            node_conflict: node_conflict.clone(),
            leaf,
        }));
    }

    debug!(root = %root_uuid, rows = rows.len(), scoped = scope.is_some(), "diff rows fetched");
    Ok(rows)
}

async fn property_rows(store: &dyn GraphStore, owner: RecordId) -> DiffResult<Vec<PropertyRow>> {
    let mut rows = Vec::new();
    for property in children(store, owner, edge::HAS_PROPERTY).await? {
        let conflict = first_child(store, property.id, edge::HAS_CONFLICT).await?;
        rows.push(PropertyRow { property, conflict });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Traversals
// ---------------------------------------------------------------------------

/// Uuids of the requested nodes present in `root` plus every node reachable
/// from them through relationship-group peers within `max_depth` hops.
///
/// Empty when none of `ids` is in the root.
pub async fn node_closure(
    store: &dyn GraphStore,
    root: &GraphRecord,
    ids: &BTreeSet<String>,
    max_depth: usize,
) -> DiffResult<BTreeSet<String>> {
    let root_uuid = required_str(root, field::UUID)?;
    let query = RecordQuery::label(label::NODE)
        .filter(Predicate::equals(field::ROOT_UUID, root_uuid.as_str()))
        .filter(Predicate::is_in(field::UUID, ids.iter().map(String::as_str)));
    let start = store.find(&query).await?;

    let mut visited: BTreeSet<RecordId> = start.iter().map(|r| r.id).collect();
    let mut closure = BTreeSet::new();
    let mut queue: VecDeque<(GraphRecord, usize)> = start.into_iter().map(|r| (r, 0)).collect();

    while let Some((node, depth)) = queue.pop_front() {
        closure.insert(required_str(&node, field::UUID)?);
        if depth >= max_depth {
            continue;
        }
        for group in children(store, node.id, edge::HAS_RELATIONSHIP).await? {
            for peer in children(store, group.id, edge::HAS_PEER).await? {
                if visited.insert(peer.id) {
                    queue.push_back((peer, depth + 1));
                }
            }
        }
    }
    Ok(closure)
}

/// Records exclusively owned by `root` and safe to delete with it.
///
/// Starts from everything reachable over ownership edges, then keeps any
/// record that a record outside that set links to, along with whatever
/// hangs below it.
pub async fn owned_subgraph(store: &dyn GraphStore, root: &GraphRecord) -> DiffResult<BTreeSet<RecordId>> {
    let mut reachable = BTreeSet::from([root.id]);
    let mut queue = VecDeque::from([root.id]);
    while let Some(current) = queue.pop_front() {
        for e in store.edges_from(&current, None).await? {
            if edge::OWNERSHIP.contains(&e.kind.as_str()) && reachable.insert(e.target) {
                queue.push_back(e.target);
            }
        }
    }

    let mut shared = BTreeSet::new();
    for id in &reachable {
        let incoming = store.edges_to(id, None).await?;
        if incoming.iter().any(|e| !reachable.contains(&e.source)) {
            shared.insert(*id);
        }
    }
    let mut queue: VecDeque<RecordId> = shared.iter().copied().collect();
    while let Some(current) = queue.pop_front() {
        for e in store.edges_from(&current, None).await? {
            if reachable.contains(&e.target) && shared.insert(e.target) {
                queue.push_back(e.target);
            }
        }
    }

    if !shared.is_empty() {
        debug!(root = %root.id, kept = shared.len(), "shared diff records kept");
    }
    Ok(reachable.difference(&shared).copied().collect())
}
