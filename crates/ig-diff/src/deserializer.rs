//! Folding flat [`DiffRow`]s back into nested [`EnrichedDiffRoot`]s.
//!
//! The same node, group, element or property arrives once per row that
//! passes through it. Each is decoded the first time it is seen and merged
//! on every later sighting, so a node repeated with different depths of
//! detail ends up with the union of what all rows carried.

use std::collections::BTreeMap;

use ig_store::GraphRecord;

use crate::error::{DiffError, DiffResult};
use crate::model::{
    EnrichedDiffAttribute, EnrichedDiffConflict, EnrichedDiffNode, EnrichedDiffProperty,
    EnrichedDiffRoot, EnrichedRelationshipElement, EnrichedRelationshipGroup,
};
use crate::query::{DiffRow, ElementRow, PropertyRow, RowLeaf};
use crate::records;

/// Accumulates roots and rows, then yields the assembled roots.
#[derive(Debug, Default)]
pub struct EnrichedDiffDeserializer {
    roots: BTreeMap<String, EnrichedDiffRoot>,
}

impl EnrichedDiffDeserializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a root header. Roots with no rows come back with an empty arena.
    pub fn read_root(&mut self, record: &GraphRecord) -> DiffResult<()> {
        let meta = records::decode_root(record)?;
        self.roots.entry(meta.uuid.clone()).or_insert_with(|| {
            let root = EnrichedDiffRoot::new(
                meta.base_branch_name,
                meta.diff_branch_name,
                meta.from_time,
                meta.to_time,
            )
            .with_uuid(meta.uuid);
            match meta.tracking_id {
                Some(tracking_id) => root.with_tracking_id(tracking_id),
                None => root,
            }
        });
        Ok(())
    }

    /// Merge one row into its root, which must have been registered.
    pub fn read_row(&mut self, row: &DiffRow) -> DiffResult<()> {
        let root = self.roots.get_mut(&row.root_uuid).ok_or_else(|| DiffError::CorruptRecord {
            id: row.node.id,
            reason: format!("row references unknown diff root {}", row.root_uuid),
        })?;

        let decoded = records::decode_node(&row.node)?;
        let node = root
            .nodes
            .entry(decoded.uuid.clone())
            .or_insert(decoded);
        if node.conflict.is_none() {
            node.conflict = row.node_conflict.as_ref().map(records::decode_conflict).transpose()?;
        }

        match &row.leaf {
            RowLeaf::Bare => {}
            RowLeaf::Attribute { attribute, property } => {
                let decoded = records::decode_attribute(attribute)?;
                let attribute = node.attributes.entry(decoded.name.clone()).or_insert(decoded);
                if let Some(property) = property {
                    merge_property(&mut attribute.properties, property)?;
                }
            }
            RowLeaf::Relationship { group, element } => {
                let group = group_entry(node, group)?;
                if let Some(element) = element {
                    merge_element(group, element)?;
                }
            }
            RowLeaf::Peer { group, peer_uuid } => {
                group_entry(node, group)?.nodes.insert(peer_uuid.clone());
            }
        }
        Ok(())
    }

    /// Assembled roots in uuid order.
    pub fn finish(self) -> Vec<EnrichedDiffRoot> {
        self.roots.into_values().collect()
    }
}

fn group_entry<'a>(
    node: &'a mut EnrichedDiffNode,
    record: &GraphRecord,
) -> DiffResult<&'a mut EnrichedRelationshipGroup> {
    let decoded = records::decode_relationship(record)?;
    Ok(node.relationships.entry(decoded.name.clone()).or_insert(decoded))
}

fn merge_element(group: &mut EnrichedRelationshipGroup, row: &ElementRow) -> DiffResult<()> {
    let decoded = records::decode_element(&row.element)?;
    let element: &mut EnrichedRelationshipElement =
        group.relationships.entry(decoded.peer_id.clone()).or_insert(decoded);
    merge_conflict(&mut element.conflict, row.conflict.as_ref())?;
    if let Some(property) = &row.property {
        merge_property(&mut element.properties, property)?;
    }
    Ok(())
}

fn merge_property(
    properties: &mut BTreeMap<ig_types::PropertyType, EnrichedDiffProperty>,
    row: &PropertyRow,
) -> DiffResult<()> {
    let decoded = records::decode_property(&row.property)?;
    let property = properties.entry(decoded.property_type).or_insert(decoded);
    merge_conflict(&mut property.conflict, row.conflict.as_ref())
}

fn merge_conflict(
    slot: &mut Option<EnrichedDiffConflict>,
    record: Option<&GraphRecord>,
) -> DiffResult<()> {
    if slot.is_none() {
        *slot = record.map(records::decode_conflict).transpose()?;
    }
    Ok(())
}

/// Assemble roots from their headers and rows.
pub fn deserialize(roots: &[GraphRecord], rows: &[DiffRow]) -> DiffResult<Vec<EnrichedDiffRoot>> {
    let mut deserializer = EnrichedDiffDeserializer::new();
    for root in roots {
        deserializer.read_root(root)?;
    }
    for row in rows {
        deserializer.read_row(row)?;
    }
    Ok(deserializer.finish())
}
