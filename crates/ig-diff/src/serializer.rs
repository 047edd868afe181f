//! Flattening an [`EnrichedDiffRoot`] into a single atomic [`WriteBatch`].

use std::collections::BTreeMap;

use ig_store::{RecordId, WriteBatch};

use crate::model::{EnrichedDiffConflict, EnrichedDiffProperty, EnrichedDiffRoot};
use crate::records::{self, edge};

/// Build the batch that persists `root` as a fresh record graph.
///
/// Node records are written first so relationship groups can link to their
/// peers by record id. Peer edges go last; every peer must be in the arena,
/// which [`EnrichedDiffRoot::validate`] guarantees.
pub fn serialize_root(root: &EnrichedDiffRoot) -> WriteBatch {
    let mut batch = WriteBatch::new();
    let root_uuid = root.uuid.as_str();
    let root_id = batch.put_record(records::encode_root(&root.metadata()));

    let mut node_ids: BTreeMap<&str, RecordId> = BTreeMap::new();
    for node in root.nodes.values() {
        let node_id = batch.put_record(records::encode_node(root_uuid, node));
        batch.put_edge(edge::HAS_NODE, root_id, node_id);
        node_ids.insert(node.uuid.as_str(), node_id);
    }

    let mut peer_links: Vec<(RecordId, &str)> = Vec::new();
    for node in root.nodes.values() {
        let node_id = node_ids[node.uuid.as_str()];
        if let Some(conflict) = &node.conflict {
            put_conflict(&mut batch, root_uuid, node_id, conflict);
        }

        for attribute in node.attributes.values() {
            let attribute_id = batch.put_record(records::encode_attribute(root_uuid, attribute));
            batch.put_edge(edge::HAS_ATTRIBUTE, node_id, attribute_id);
            for property in attribute.properties.values() {
                put_property(&mut batch, root_uuid, attribute_id, property);
            }
        }

        for group in node.relationships.values() {
            let group_id = batch.put_record(records::encode_relationship(root_uuid, group));
            batch.put_edge(edge::HAS_RELATIONSHIP, node_id, group_id);
            for element in group.relationships.values() {
                let element_id = batch.put_record(records::encode_element(root_uuid, element));
                batch.put_edge(edge::HAS_ELEMENT, group_id, element_id);
                if let Some(conflict) = &element.conflict {
                    put_conflict(&mut batch, root_uuid, element_id, conflict);
                }
                for property in element.properties.values() {
                    put_property(&mut batch, root_uuid, element_id, property);
                }
            }
            peer_links.extend(group.nodes.iter().map(|peer| (group_id, peer.as_str())));
        }
    }

    for (group_id, peer) in peer_links {
        if let Some(&peer_id) = node_ids.get(peer) {
            batch.put_edge(edge::HAS_PEER, group_id, peer_id);
        }
    }
    batch
}

fn put_property(
    batch: &mut WriteBatch,
    root_uuid: &str,
    owner: RecordId,
    property: &EnrichedDiffProperty,
) {
    let property_id = batch.put_record(records::encode_property(root_uuid, property));
    batch.put_edge(edge::HAS_PROPERTY, owner, property_id);
    if let Some(conflict) = &property.conflict {
        put_conflict(batch, root_uuid, property_id, conflict);
    }
}

fn put_conflict(
    batch: &mut WriteBatch,
    root_uuid: &str,
    owner: RecordId,
    conflict: &EnrichedDiffConflict,
) {
    let conflict_id = batch.put_record(records::encode_conflict(root_uuid, conflict));
    batch.put_edge(edge::HAS_CONFLICT, owner, conflict_id);
}
