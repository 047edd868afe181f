//! Enriched diff entity model.
//!
//! A diff root owns every node of the diff in a single arena keyed by node
//! uuid. Relationship groups never own their peer nodes; they hold peer
//! uuids that resolve into the root's arena. That keeps nodes shared by
//! several groups (and cycles between them) to exactly one instance.
//!
//! All nested collections are ordered maps keyed by natural identity, so
//! structural equality does not depend on insertion order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use ig_types::{DiffAction, PropertyType, TimeRange, Timestamp};

use crate::error::{DiffError, DiffResult};

// ---------------------------------------------------------------------------
// Tracking ids
// ---------------------------------------------------------------------------

/// Logical identity of a diff that resolves to its current root.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TrackingId {
    /// The continuously updated diff of a branch.
    Branch { name: String },
    /// A named, frozen snapshot.
    Name { name: String },
}

impl TrackingId {
    const BRANCH_PREFIX: &'static str = "branch:";
    const NAME_PREFIX: &'static str = "name:";

    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch { name: name.into() }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Name { name: name.into() }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Branch { name } | Self::Name { name } => name,
        }
    }

    pub fn is_branch(&self) -> bool {
        matches!(self, Self::Branch { .. })
    }

    /// Persisted form: `branch:<name>` or `name:<name>`.
    pub fn canonical(&self) -> String {
        match self {
            Self::Branch { name } => format!("{}{name}", Self::BRANCH_PREFIX),
            Self::Name { name } => format!("{}{name}", Self::NAME_PREFIX),
        }
    }

    /// Parse the persisted form produced by [`canonical`](Self::canonical).
    pub fn parse(s: &str) -> DiffResult<Self> {
        let id = if let Some(name) = s.strip_prefix(Self::BRANCH_PREFIX) {
            Self::branch(name)
        } else if let Some(name) = s.strip_prefix(Self::NAME_PREFIX) {
            Self::named(name)
        } else {
            return Err(DiffError::Validation(format!("unknown tracking id form: {s:?}")));
        };
        id.validate()?;
        Ok(id)
    }

    pub fn validate(&self) -> DiffResult<()> {
        if self.name().trim().is_empty() {
            return Err(DiffError::Validation("tracking id name must not be empty".into()));
        }
        Ok(())
    }
}

impl FromStr for TrackingId {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TrackingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

// ---------------------------------------------------------------------------
// Conflicts
// ---------------------------------------------------------------------------

/// Which side a user picked when resolving a conflict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictSelection {
    BaseBranch,
    DiffBranch,
}

impl ConflictSelection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseBranch => "base_branch",
            Self::DiffBranch => "diff_branch",
        }
    }
}

impl FromStr for ConflictSelection {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base_branch" => Ok(Self::BaseBranch),
            "diff_branch" => Ok(Self::DiffBranch),
            other => Err(DiffError::Validation(format!("unknown conflict selection: {other}"))),
        }
    }
}

/// An element changed concurrently on both branches.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDiffConflict {
    pub uuid: String,
    pub path_identifier: String,
    pub base_branch_action: DiffAction,
    pub base_branch_value: Option<String>,
    pub base_branch_changed_at: Option<Timestamp>,
    pub diff_branch_action: DiffAction,
    pub diff_branch_value: Option<String>,
    pub diff_branch_changed_at: Option<Timestamp>,
    pub selected_branch: Option<ConflictSelection>,
}

impl EnrichedDiffConflict {
    pub fn new(
        path_identifier: impl Into<String>,
        base_branch_action: DiffAction,
        diff_branch_action: DiffAction,
    ) -> Self {
        Self {
            uuid: uuid::Uuid::now_v7().to_string(),
            path_identifier: path_identifier.into(),
            base_branch_action,
            base_branch_value: None,
            base_branch_changed_at: None,
            diff_branch_action,
            diff_branch_value: None,
            diff_branch_changed_at: None,
            selected_branch: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.selected_branch.is_some()
    }
}

// ---------------------------------------------------------------------------
// Leaf entities
// ---------------------------------------------------------------------------

/// Change of a single typed edge of an attribute or relationship element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDiffProperty {
    pub property_type: PropertyType,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub action: DiffAction,
    pub changed_at: Option<Timestamp>,
    pub path_identifier: String,
    pub conflict: Option<EnrichedDiffConflict>,
}

impl EnrichedDiffProperty {
    pub fn new(property_type: PropertyType, action: DiffAction) -> Self {
        Self {
            property_type,
            previous_value: None,
            new_value: None,
            action,
            changed_at: None,
            path_identifier: String::new(),
            conflict: None,
        }
    }
}

/// A named scalar field change on a node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDiffAttribute {
    pub name: String,
    pub path_identifier: String,
    pub action: DiffAction,
    pub changed_at: Option<Timestamp>,
    pub properties: BTreeMap<PropertyType, EnrichedDiffProperty>,
}

impl EnrichedDiffAttribute {
    pub fn new(name: impl Into<String>, action: DiffAction) -> Self {
        Self {
            name: name.into(),
            path_identifier: String::new(),
            action,
            changed_at: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, property: EnrichedDiffProperty) -> Self {
        self.properties.insert(property.property_type, property);
        self
    }
}

/// Property changes of one relationship instance, identified by its peer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRelationshipElement {
    pub peer_id: String,
    pub path_identifier: String,
    pub action: DiffAction,
    pub changed_at: Option<Timestamp>,
    pub conflict: Option<EnrichedDiffConflict>,
    pub properties: BTreeMap<PropertyType, EnrichedDiffProperty>,
}

impl EnrichedRelationshipElement {
    pub fn new(peer_id: impl Into<String>, action: DiffAction) -> Self {
        Self {
            peer_id: peer_id.into(),
            path_identifier: String::new(),
            action,
            changed_at: None,
            conflict: None,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, property: EnrichedDiffProperty) -> Self {
        self.properties.insert(property.property_type, property);
        self
    }
}

/// Changes of one relationship type on a node.
///
/// `nodes` holds the uuids of the peer nodes reached through this
/// relationship; they resolve into the owning root's node arena.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRelationshipGroup {
    pub name: String,
    pub label: String,
    pub path_identifier: String,
    pub action: DiffAction,
    pub changed_at: Option<Timestamp>,
    pub relationships: BTreeMap<String, EnrichedRelationshipElement>,
    pub nodes: BTreeSet<String>,
}

impl EnrichedRelationshipGroup {
    pub fn new(name: impl Into<String>, action: DiffAction) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            path_identifier: String::new(),
            action,
            changed_at: None,
            relationships: BTreeMap::new(),
            nodes: BTreeSet::new(),
        }
    }

    pub fn with_element(mut self, element: EnrichedRelationshipElement) -> Self {
        self.relationships.insert(element.peer_id.clone(), element);
        self
    }

    pub fn with_peer(mut self, node_uuid: impl Into<String>) -> Self {
        self.nodes.insert(node_uuid.into());
        self
    }

    /// Placeholder copy that keeps identity and the given peers only.
    pub fn thin(&self, nodes: BTreeSet<String>) -> Self {
        Self {
            name: self.name.clone(),
            label: self.label.clone(),
            path_identifier: String::new(),
            action: DiffAction::Unchanged,
            changed_at: None,
            relationships: BTreeMap::new(),
            nodes,
        }
    }
}

// ---------------------------------------------------------------------------
// Nodes
// ---------------------------------------------------------------------------

/// One graph node's change within the diff window.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDiffNode {
    pub uuid: String,
    pub kind: String,
    pub label: String,
    pub action: DiffAction,
    pub changed_at: Option<Timestamp>,
    pub path_identifier: String,
    pub conflict: Option<EnrichedDiffConflict>,
    pub attributes: BTreeMap<String, EnrichedDiffAttribute>,
    pub relationships: BTreeMap<String, EnrichedRelationshipGroup>,
}

impl EnrichedDiffNode {
    pub fn new(
        uuid: impl Into<String>,
        kind: impl Into<String>,
        label: impl Into<String>,
        action: DiffAction,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            kind: kind.into(),
            label: label.into(),
            action,
            changed_at: None,
            path_identifier: String::new(),
            conflict: None,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, attribute: EnrichedDiffAttribute) -> Self {
        self.attributes.insert(attribute.name.clone(), attribute);
        self
    }

    pub fn with_relationship(mut self, group: EnrichedRelationshipGroup) -> Self {
        self.relationships.insert(group.name.clone(), group);
        self
    }

    /// Uuids of every peer node referenced by this node's relationship groups.
    pub fn peer_uuids(&self) -> impl Iterator<Item = &String> {
        self.relationships.values().flat_map(|g| g.nodes.iter())
    }

    /// Placeholder copy: identity only, no relationship groups.
    pub fn thin(&self) -> Self {
        Self {
            uuid: self.uuid.clone(),
            kind: self.kind.clone(),
            label: self.label.clone(),
            action: DiffAction::Unchanged,
            changed_at: None,
            path_identifier: String::new(),
            conflict: None,
            attributes: BTreeMap::new(),
            relationships: BTreeMap::new(),
        }
    }

    /// Returns `true` if the node itself or anything beneath it is in conflict.
    pub fn has_conflict(&self) -> bool {
        self.conflict.is_some()
            || self
                .attributes
                .values()
                .flat_map(|a| a.properties.values())
                .any(|p| p.conflict.is_some())
            || self.relationships.values().any(|g| {
                g.relationships.values().any(|e| {
                    e.conflict.is_some() || e.properties.values().any(|p| p.conflict.is_some())
                })
            })
    }
}

// ---------------------------------------------------------------------------
// Roots
// ---------------------------------------------------------------------------

/// Counts over the nodes of a root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub conflicts: usize,
}

/// Root header without its node graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffRootMetadata {
    pub uuid: String,
    pub base_branch_name: String,
    pub diff_branch_name: String,
    pub from_time: Timestamp,
    pub to_time: Timestamp,
    pub tracking_id: Option<TrackingId>,
}

impl DiffRootMetadata {
    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            from: self.from_time,
            to: self.to_time,
        }
    }
}

/// One computed diff between two branches over `[from_time, to_time)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedDiffRoot {
    pub uuid: String,
    pub base_branch_name: String,
    pub diff_branch_name: String,
    pub from_time: Timestamp,
    pub to_time: Timestamp,
    pub tracking_id: Option<TrackingId>,
    pub nodes: BTreeMap<String, EnrichedDiffNode>,
}

impl EnrichedDiffRoot {
    /// Create an empty root with a freshly generated uuid.
    pub fn new(
        base_branch_name: impl Into<String>,
        diff_branch_name: impl Into<String>,
        from_time: Timestamp,
        to_time: Timestamp,
    ) -> Self {
        Self {
            uuid: uuid::Uuid::now_v7().to_string(),
            base_branch_name: base_branch_name.into(),
            diff_branch_name: diff_branch_name.into(),
            from_time,
            to_time,
            tracking_id: None,
            nodes: BTreeMap::new(),
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: TrackingId) -> Self {
        self.tracking_id = Some(tracking_id);
        self
    }

    pub fn with_node(mut self, node: EnrichedDiffNode) -> Self {
        self.add_node(node);
        self
    }

    /// Insert or replace a node in the arena.
    pub fn add_node(&mut self, node: EnrichedDiffNode) {
        self.nodes.insert(node.uuid.clone(), node);
    }

    pub fn node(&self, uuid: &str) -> Option<&EnrichedDiffNode> {
        self.nodes.get(uuid)
    }

    pub fn time_range(&self) -> TimeRange {
        TimeRange {
            from: self.from_time,
            to: self.to_time,
        }
    }

    pub fn metadata(&self) -> DiffRootMetadata {
        DiffRootMetadata {
            uuid: self.uuid.clone(),
            base_branch_name: self.base_branch_name.clone(),
            diff_branch_name: self.diff_branch_name.clone(),
            from_time: self.from_time,
            to_time: self.to_time,
            tracking_id: self.tracking_id.clone(),
        }
    }

    /// Nodes whose relationship groups reference `uuid` as a peer.
    pub fn parents_of(&self, uuid: &str) -> Vec<&EnrichedDiffNode> {
        self.nodes
            .values()
            .filter(|n| n.peer_uuids().any(|p| p == uuid))
            .collect()
    }

    /// Nodes not referenced as a peer by any relationship group.
    pub fn nodes_without_parents(&self) -> Vec<&EnrichedDiffNode> {
        let referenced: BTreeSet<&String> =
            self.nodes.values().flat_map(|n| n.peer_uuids()).collect();
        self.nodes
            .values()
            .filter(|n| !referenced.contains(&n.uuid))
            .collect()
    }

    /// Every node reachable from `uuid` through relationship-group peers,
    /// excluding `uuid` itself. Cycles are followed once.
    pub fn all_child_nodes(&self, uuid: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([uuid]);
        while let Some(current) = queue.pop_front() {
            let Some(node) = self.nodes.get(current) else {
                continue;
            };
            for peer in node.peer_uuids() {
                if peer != uuid && seen.insert(peer.clone()) {
                    queue.push_back(peer);
                }
            }
        }
        seen
    }

    pub fn has_conflicts(&self) -> bool {
        self.nodes.values().any(EnrichedDiffNode::has_conflict)
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        for node in self.nodes.values() {
            match node.action {
                DiffAction::Added => summary.added += 1,
                DiffAction::Updated => summary.updated += 1,
                DiffAction::Removed => summary.removed += 1,
                DiffAction::Unchanged => summary.unchanged += 1,
            }
            if node.has_conflict() {
                summary.conflicts += 1;
            }
        }
        summary
    }

    /// Structural checks performed before persisting.
    pub fn validate(&self) -> DiffResult<()> {
        TimeRange::new(self.from_time, self.to_time)?;
        if self.uuid.is_empty() {
            return Err(DiffError::Validation("diff root uuid must not be empty".into()));
        }
        if let Some(tracking_id) = &self.tracking_id {
            tracking_id.validate()?;
        }
        for (key, node) in &self.nodes {
            if key != &node.uuid {
                return Err(DiffError::Validation(format!(
                    "node stored under {key} has uuid {}",
                    node.uuid
                )));
            }
            for (name, group) in &node.relationships {
                if let Some(peer) = group.nodes.iter().find(|p| !self.nodes.contains_key(*p)) {
                    return Err(DiffError::Validation(format!(
                        "relationship {name} of node {key} references missing node {peer}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn chain_root() -> EnrichedDiffRoot {
        let parent = EnrichedDiffNode::new("parent", "Site", "p", DiffAction::Updated);
        let middle = EnrichedDiffNode::new("middle", "Device", "m", DiffAction::Added)
            .with_relationship(EnrichedRelationshipGroup::new("site", DiffAction::Added).with_peer("parent"));
        let leaf = EnrichedDiffNode::new("leaf", "Interface", "l", DiffAction::Removed)
            .with_relationship(EnrichedRelationshipGroup::new("device", DiffAction::Added).with_peer("middle"));
        EnrichedDiffRoot::new("main", "feature", ts("2024-06-15T18:35:20Z"), ts("2024-06-15T18:49:40Z"))
            .with_node(parent)
            .with_node(middle)
            .with_node(leaf)
    }

    #[test]
    fn tracking_id_canonical_roundtrip() {
        for id in [TrackingId::branch("feature/a"), TrackingId::named("release: 1.0")] {
            assert_eq!(TrackingId::parse(&id.canonical()).unwrap(), id);
        }
        assert_eq!(TrackingId::branch("x").to_string(), "branch:x");
    }

    #[test]
    fn tracking_id_rejects_bad_forms() {
        assert!(TrackingId::parse("tag:v1").is_err());
        assert!(TrackingId::parse("name:").is_err());
        assert!(TrackingId::branch("  ").validate().is_err());
    }

    #[test]
    fn new_root_gets_unique_uuid() {
        let t = ts("2024-06-15T18:35:20Z");
        let a = EnrichedDiffRoot::new("main", "x", t, t);
        let b = EnrichedDiffRoot::new("main", "x", t, t);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn hierarchy_helpers() {
        let root = chain_root();
        let tops: Vec<&str> = root
            .nodes_without_parents()
            .iter()
            .map(|n| n.uuid.as_str())
            .collect();
        assert_eq!(tops, vec!["leaf"]);
        assert_eq!(root.parents_of("parent").len(), 1);
        assert_eq!(
            root.all_child_nodes("leaf"),
            BTreeSet::from(["middle".to_string(), "parent".to_string()])
        );
        assert!(root.all_child_nodes("parent").is_empty());
    }

    #[test]
    fn all_child_nodes_survives_cycles() {
        let mut root = chain_root();
        let parent = root.nodes.remove("parent").unwrap().with_relationship(
            EnrichedRelationshipGroup::new("back", DiffAction::Added).with_peer("leaf"),
        );
        root.add_node(parent);
        assert_eq!(root.all_child_nodes("leaf").len(), 2);
    }

    #[test]
    fn validate_rejects_dangling_peer() {
        let root = chain_root().with_node(
            EnrichedDiffNode::new("orphan", "X", "o", DiffAction::Added)
                .with_relationship(EnrichedRelationshipGroup::new("r", DiffAction::Added).with_peer("ghost")),
        );
        let err = root.validate().unwrap_err();
        assert!(matches!(err, DiffError::Validation(msg) if msg.contains("ghost")));
    }

    #[test]
    fn validate_rejects_inverted_time_range() {
        let mut root = chain_root();
        std::mem::swap(&mut root.from_time, &mut root.to_time);
        assert!(matches!(root.validate(), Err(DiffError::Validation(_))));
        assert!(chain_root().validate().is_ok());
    }

    #[test]
    fn summary_and_conflicts() {
        let mut root = chain_root();
        assert!(!root.has_conflicts());

        let attr = EnrichedDiffAttribute::new("name", DiffAction::Updated).with_property(EnrichedDiffProperty {
            conflict: Some(EnrichedDiffConflict::new("p/name/value", DiffAction::Updated, DiffAction::Updated)),
            ..EnrichedDiffProperty::new(PropertyType::HasValue, DiffAction::Updated)
        });
        let parent = root.nodes.remove("parent").unwrap().with_attribute(attr);
        root.add_node(parent);

        let summary = root.summary();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.conflicts, 1);
        assert!(root.has_conflicts());
    }

    #[test]
    fn thin_copies_keep_identity_only() {
        let root = chain_root();
        let leaf = root.node("leaf").unwrap();
        let thin = leaf.thin();
        assert_eq!(thin.uuid, "leaf");
        assert_eq!(thin.kind, "Interface");
        assert_eq!(thin.action, DiffAction::Unchanged);
        assert!(thin.relationships.is_empty());

        let group = &leaf.relationships["device"];
        let thin_group = group.thin(group.nodes.clone());
        assert_eq!(thin_group.action, DiffAction::Unchanged);
        assert_eq!(thin_group.nodes, group.nodes);
    }
}
