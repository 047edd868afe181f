//! Node-id projection of a root onto the requested nodes and their ancestors.
//!
//! A relationship group's peers are the owning node's hierarchical parents.
//! Requested nodes come back in full; ancestors reached through group peers
//! come back as thin placeholders carrying just enough structure to
//! reconnect the requested nodes to the top of the hierarchy.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::model::{EnrichedDiffNode, EnrichedDiffRoot};

/// Uuids of `ids` present in `root` plus every node reachable from them
/// through group peers within `max_depth` hops.
pub fn included_nodes(root: &EnrichedDiffRoot, ids: &BTreeSet<String>, max_depth: usize) -> BTreeSet<String> {
    let mut included = BTreeSet::new();
    let mut queue: VecDeque<(&EnrichedDiffNode, usize)> = VecDeque::new();
    for id in ids {
        if let Some(node) = root.nodes.get(id) {
            included.insert(node.uuid.clone());
            queue.push_back((node, 0));
        }
    }
    while let Some((node, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for peer in node.peer_uuids() {
            let Some(peer_node) = root.nodes.get(peer) else {
                continue;
            };
            if included.insert(peer.clone()) {
                queue.push_back((peer_node, depth + 1));
            }
        }
    }
    included
}

/// Restrict `root` to the nodes in `ids` and their ancestors.
///
/// Returns `None` when the root holds none of the requested ids. Every peer
/// reference in the result resolves inside the result's arena.
pub fn project_nodes(
    root: &EnrichedDiffRoot,
    ids: &BTreeSet<String>,
    max_depth: usize,
) -> Option<EnrichedDiffRoot> {
    let included = included_nodes(root, ids, max_depth);
    if included.is_empty() {
        return None;
    }

    let mut nodes = BTreeMap::new();
    for uuid in &included {
        let Some(node) = root.nodes.get(uuid) else {
            continue;
        };
        let projected = if ids.contains(uuid) {
            let mut full = node.clone();
            for group in full.relationships.values_mut() {
                group.nodes.retain(|peer| included.contains(peer));
            }
            full
        } else {
            let mut thin = node.thin();
            for (name, group) in &node.relationships {
                let peers: BTreeSet<String> = group
                    .nodes
                    .iter()
                    .filter(|peer| included.contains(*peer))
                    .cloned()
                    .collect();
                if !peers.is_empty() {
                    thin.relationships.insert(name.clone(), group.thin(peers));
                }
            }
            thin
        };
        nodes.insert(uuid.clone(), projected);
    }

    Some(EnrichedDiffRoot {
        uuid: root.uuid.clone(),
        base_branch_name: root.base_branch_name.clone(),
        diff_branch_name: root.diff_branch_name.clone(),
        from_time: root.from_time,
        to_time: root.to_time,
        tracking_id: root.tracking_id.clone(),
        nodes,
    })
}
