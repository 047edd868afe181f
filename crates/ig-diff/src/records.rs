//! Mapping between diff entities and labeled graph-store records.
//!
//! Every entity becomes one record. Nesting is expressed with typed edges:
//!
//! ```text
//! DiffRoot -DIFF_HAS_NODE-> DiffNode -DIFF_HAS_ATTRIBUTE-> DiffAttribute -DIFF_HAS_PROPERTY-> DiffProperty
//!                              |
//!                              +-DIFF_HAS_RELATIONSHIP-> DiffRelationship -DIFF_HAS_ELEMENT-> DiffRelationshipElement
//!                                                          |                                    -DIFF_HAS_PROPERTY-> ...
//!                                                          +-DIFF_HAS_PEER-> DiffNode
//! DiffNode | DiffRelationshipElement | DiffProperty -DIFF_HAS_CONFLICT-> DiffConflict
//! ```
//!
//! Every record carries `root_uuid`. Timestamps are stored as integer
//! microseconds so the store can range-compare them; absent optionals are
//! stored as JSON null.

use serde_json::Value;

use ig_store::GraphRecord;
use ig_types::{DiffAction, PropertyType, Timestamp};

use crate::error::{DiffError, DiffResult};
use crate::model::{
    ConflictSelection, DiffRootMetadata, EnrichedDiffAttribute, EnrichedDiffConflict,
    EnrichedDiffNode, EnrichedDiffProperty, EnrichedRelationshipElement,
    EnrichedRelationshipGroup, TrackingId,
};

pub mod label {
    pub const ROOT: &str = "DiffRoot";
    pub const NODE: &str = "DiffNode";
    pub const ATTRIBUTE: &str = "DiffAttribute";
    pub const PROPERTY: &str = "DiffProperty";
    pub const RELATIONSHIP: &str = "DiffRelationship";
    pub const ELEMENT: &str = "DiffRelationshipElement";
    pub const CONFLICT: &str = "DiffConflict";
}

pub mod edge {
    pub const HAS_NODE: &str = "DIFF_HAS_NODE";
    pub const HAS_ATTRIBUTE: &str = "DIFF_HAS_ATTRIBUTE";
    pub const HAS_PROPERTY: &str = "DIFF_HAS_PROPERTY";
    pub const HAS_RELATIONSHIP: &str = "DIFF_HAS_RELATIONSHIP";
    pub const HAS_ELEMENT: &str = "DIFF_HAS_ELEMENT";
    pub const HAS_PEER: &str = "DIFF_HAS_PEER";
    pub const HAS_CONFLICT: &str = "DIFF_HAS_CONFLICT";

    /// Edges whose target belongs to the source's diff root.
    pub const OWNERSHIP: [&str; 7] = [
        HAS_NODE,
        HAS_ATTRIBUTE,
        HAS_PROPERTY,
        HAS_RELATIONSHIP,
        HAS_ELEMENT,
        HAS_PEER,
        HAS_CONFLICT,
    ];
}

pub mod field {
    pub const UUID: &str = "uuid";
    pub const ROOT_UUID: &str = "root_uuid";
    pub const BASE_BRANCH: &str = "base_branch";
    pub const DIFF_BRANCH: &str = "diff_branch";
    pub const FROM_TIME: &str = "from_time";
    pub const TO_TIME: &str = "to_time";
    pub const TRACKING_ID: &str = "tracking_id";
    pub const KIND: &str = "kind";
    pub const LABEL: &str = "label";
    pub const NAME: &str = "name";
    pub const ACTION: &str = "action";
    pub const CHANGED_AT: &str = "changed_at";
    pub const PATH_IDENTIFIER: &str = "path_identifier";
    pub const PROPERTY_TYPE: &str = "property_type";
    pub const PREVIOUS_VALUE: &str = "previous_value";
    pub const NEW_VALUE: &str = "new_value";
    pub const PEER_ID: &str = "peer_id";
    pub const BASE_BRANCH_ACTION: &str = "base_branch_action";
    pub const BASE_BRANCH_VALUE: &str = "base_branch_value";
    pub const BASE_BRANCH_CHANGED_AT: &str = "base_branch_changed_at";
    pub const DIFF_BRANCH_ACTION: &str = "diff_branch_action";
    pub const DIFF_BRANCH_VALUE: &str = "diff_branch_value";
    pub const DIFF_BRANCH_CHANGED_AT: &str = "diff_branch_changed_at";
    pub const SELECTED_BRANCH: &str = "selected_branch";
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn ts_value(ts: Option<Timestamp>) -> Value {
    ts.map_or(Value::Null, |t| Value::from(t.as_micros()))
}

fn opt_value(s: Option<&String>) -> Value {
    s.map_or(Value::Null, |s| Value::from(s.as_str()))
}

fn owned(label: &str, root_uuid: &str) -> GraphRecord {
    GraphRecord::new(label).with(field::ROOT_UUID, root_uuid)
}

pub fn encode_root(meta: &DiffRootMetadata) -> GraphRecord {
    GraphRecord::new(label::ROOT)
        .with(field::UUID, meta.uuid.as_str())
        .with(field::ROOT_UUID, meta.uuid.as_str())
        .with(field::BASE_BRANCH, meta.base_branch_name.as_str())
        .with(field::DIFF_BRANCH, meta.diff_branch_name.as_str())
        .with(field::FROM_TIME, meta.from_time.as_micros())
        .with(field::TO_TIME, meta.to_time.as_micros())
        .with(
            field::TRACKING_ID,
            meta.tracking_id
                .as_ref()
                .map_or(Value::Null, |t| Value::from(t.canonical())),
        )
}

pub fn encode_node(root_uuid: &str, node: &EnrichedDiffNode) -> GraphRecord {
    owned(label::NODE, root_uuid)
        .with(field::UUID, node.uuid.as_str())
        .with(field::KIND, node.kind.as_str())
        .with(field::LABEL, node.label.as_str())
        .with(field::ACTION, node.action.as_str())
        .with(field::CHANGED_AT, ts_value(node.changed_at))
        .with(field::PATH_IDENTIFIER, node.path_identifier.as_str())
}

pub fn encode_attribute(root_uuid: &str, attribute: &EnrichedDiffAttribute) -> GraphRecord {
    owned(label::ATTRIBUTE, root_uuid)
        .with(field::NAME, attribute.name.as_str())
        .with(field::ACTION, attribute.action.as_str())
        .with(field::CHANGED_AT, ts_value(attribute.changed_at))
        .with(field::PATH_IDENTIFIER, attribute.path_identifier.as_str())
}

pub fn encode_property(root_uuid: &str, property: &EnrichedDiffProperty) -> GraphRecord {
    owned(label::PROPERTY, root_uuid)
        .with(field::PROPERTY_TYPE, property.property_type.as_str())
        .with(field::PREVIOUS_VALUE, opt_value(property.previous_value.as_ref()))
        .with(field::NEW_VALUE, opt_value(property.new_value.as_ref()))
        .with(field::ACTION, property.action.as_str())
        .with(field::CHANGED_AT, ts_value(property.changed_at))
        .with(field::PATH_IDENTIFIER, property.path_identifier.as_str())
}

pub fn encode_relationship(root_uuid: &str, group: &EnrichedRelationshipGroup) -> GraphRecord {
    owned(label::RELATIONSHIP, root_uuid)
        .with(field::NAME, group.name.as_str())
        .with(field::LABEL, group.label.as_str())
        .with(field::ACTION, group.action.as_str())
        .with(field::CHANGED_AT, ts_value(group.changed_at))
        .with(field::PATH_IDENTIFIER, group.path_identifier.as_str())
}

pub fn encode_element(root_uuid: &str, element: &EnrichedRelationshipElement) -> GraphRecord {
    owned(label::ELEMENT, root_uuid)
        .with(field::PEER_ID, element.peer_id.as_str())
        .with(field::ACTION, element.action.as_str())
        .with(field::CHANGED_AT, ts_value(element.changed_at))
        .with(field::PATH_IDENTIFIER, element.path_identifier.as_str())
}

pub fn encode_conflict(root_uuid: &str, conflict: &EnrichedDiffConflict) -> GraphRecord {
    owned(label::CONFLICT, root_uuid)
        .with(field::UUID, conflict.uuid.as_str())
        .with(field::PATH_IDENTIFIER, conflict.path_identifier.as_str())
        .with(field::BASE_BRANCH_ACTION, conflict.base_branch_action.as_str())
        .with(field::BASE_BRANCH_VALUE, opt_value(conflict.base_branch_value.as_ref()))
        .with(field::BASE_BRANCH_CHANGED_AT, ts_value(conflict.base_branch_changed_at))
        .with(field::DIFF_BRANCH_ACTION, conflict.diff_branch_action.as_str())
        .with(field::DIFF_BRANCH_VALUE, opt_value(conflict.diff_branch_value.as_ref()))
        .with(field::DIFF_BRANCH_CHANGED_AT, ts_value(conflict.diff_branch_changed_at))
        .with(
            field::SELECTED_BRANCH,
            conflict
                .selected_branch
                .map_or(Value::Null, |s| Value::from(s.as_str())),
        )
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn corrupt(record: &GraphRecord, reason: impl Into<String>) -> DiffError {
    DiffError::CorruptRecord {
        id: record.id,
        reason: reason.into(),
    }
}

fn expect_label(record: &GraphRecord, expected: &str) -> DiffResult<()> {
    if record.label != expected {
        return Err(corrupt(
            record,
            format!("expected label {expected}, got {}", record.label),
        ));
    }
    Ok(())
}

pub(crate) fn required_str(record: &GraphRecord, key: &str) -> DiffResult<String> {
    record
        .get_str(key)
        .map(str::to_string)
        .ok_or_else(|| corrupt(record, format!("missing string field {key}")))
}

fn optional_str(record: &GraphRecord, key: &str) -> DiffResult<Option<String>> {
    match record.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(corrupt(record, format!("field {key} is not a string: {other}"))),
    }
}

fn required_ts(record: &GraphRecord, key: &str) -> DiffResult<Timestamp> {
    optional_ts(record, key)?.ok_or_else(|| corrupt(record, format!("missing timestamp {key}")))
}

fn optional_ts(record: &GraphRecord, key: &str) -> DiffResult<Option<Timestamp>> {
    match record.get(key) {
        None => Ok(None),
        Some(value) => {
            let micros = value
                .as_i64()
                .ok_or_else(|| corrupt(record, format!("field {key} is not an integer")))?;
            Timestamp::from_micros(micros)
                .map(Some)
                .map_err(|e| corrupt(record, e.to_string()))
        }
    }
}

fn action(record: &GraphRecord, key: &str) -> DiffResult<DiffAction> {
    required_str(record, key)?
        .parse()
        .map_err(|e: ig_types::TypeError| corrupt(record, e.to_string()))
}

pub fn decode_root(record: &GraphRecord) -> DiffResult<DiffRootMetadata> {
    expect_label(record, label::ROOT)?;
    let tracking_id = optional_str(record, field::TRACKING_ID)?
        .map(|s| TrackingId::parse(&s).map_err(|e| corrupt(record, e.to_string())))
        .transpose()?;
    Ok(DiffRootMetadata {
        uuid: required_str(record, field::UUID)?,
        base_branch_name: required_str(record, field::BASE_BRANCH)?,
        diff_branch_name: required_str(record, field::DIFF_BRANCH)?,
        from_time: required_ts(record, field::FROM_TIME)?,
        to_time: required_ts(record, field::TO_TIME)?,
        tracking_id,
    })
}

/// Decode the scalar fields of a node; children start empty.
pub fn decode_node(record: &GraphRecord) -> DiffResult<EnrichedDiffNode> {
    expect_label(record, label::NODE)?;
    Ok(EnrichedDiffNode {
        changed_at: optional_ts(record, field::CHANGED_AT)?,
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        ..EnrichedDiffNode::new(
            required_str(record, field::UUID)?,
            required_str(record, field::KIND)?,
            required_str(record, field::LABEL)?,
            action(record, field::ACTION)?,
        )
    })
}

pub fn decode_attribute(record: &GraphRecord) -> DiffResult<EnrichedDiffAttribute> {
    expect_label(record, label::ATTRIBUTE)?;
    Ok(EnrichedDiffAttribute {
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        changed_at: optional_ts(record, field::CHANGED_AT)?,
        ..EnrichedDiffAttribute::new(
            required_str(record, field::NAME)?,
            action(record, field::ACTION)?,
        )
    })
}

pub fn decode_property(record: &GraphRecord) -> DiffResult<EnrichedDiffProperty> {
    expect_label(record, label::PROPERTY)?;
    let property_type: PropertyType = required_str(record, field::PROPERTY_TYPE)?
        .parse()
        .map_err(|e: ig_types::TypeError| corrupt(record, e.to_string()))?;
    Ok(EnrichedDiffProperty {
        previous_value: optional_str(record, field::PREVIOUS_VALUE)?,
        new_value: optional_str(record, field::NEW_VALUE)?,
        changed_at: optional_ts(record, field::CHANGED_AT)?,
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        ..EnrichedDiffProperty::new(property_type, action(record, field::ACTION)?)
    })
}

pub fn decode_relationship(record: &GraphRecord) -> DiffResult<EnrichedRelationshipGroup> {
    expect_label(record, label::RELATIONSHIP)?;
    Ok(EnrichedRelationshipGroup {
        label: required_str(record, field::LABEL)?,
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        changed_at: optional_ts(record, field::CHANGED_AT)?,
        ..EnrichedRelationshipGroup::new(
            required_str(record, field::NAME)?,
            action(record, field::ACTION)?,
        )
    })
}

pub fn decode_element(record: &GraphRecord) -> DiffResult<EnrichedRelationshipElement> {
    expect_label(record, label::ELEMENT)?;
    Ok(EnrichedRelationshipElement {
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        changed_at: optional_ts(record, field::CHANGED_AT)?,
        ..EnrichedRelationshipElement::new(
            required_str(record, field::PEER_ID)?,
            action(record, field::ACTION)?,
        )
    })
}

pub fn decode_conflict(record: &GraphRecord) -> DiffResult<EnrichedDiffConflict> {
    expect_label(record, label::CONFLICT)?;
    let selected_branch = optional_str(record, field::SELECTED_BRANCH)?
        .map(|s| {
            s.parse::<ConflictSelection>()
                .map_err(|e| corrupt(record, e.to_string()))
        })
        .transpose()?;
    Ok(EnrichedDiffConflict {
        uuid: required_str(record, field::UUID)?,
        path_identifier: required_str(record, field::PATH_IDENTIFIER)?,
        base_branch_action: action(record, field::BASE_BRANCH_ACTION)?,
        base_branch_value: optional_str(record, field::BASE_BRANCH_VALUE)?,
        base_branch_changed_at: optional_ts(record, field::BASE_BRANCH_CHANGED_AT)?,
        diff_branch_action: action(record, field::DIFF_BRANCH_ACTION)?,
        diff_branch_value: optional_str(record, field::DIFF_BRANCH_VALUE)?,
        diff_branch_changed_at: optional_ts(record, field::DIFF_BRANCH_CHANGED_AT)?,
        selected_branch,
    })
}
