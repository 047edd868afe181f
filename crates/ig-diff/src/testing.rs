//! Randomized builders for diff fixtures, shared by the unit tests.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use ig_types::{DiffAction, PropertyType, Timestamp};

use crate::model::{
    ConflictSelection, EnrichedDiffAttribute, EnrichedDiffConflict, EnrichedDiffNode,
    EnrichedDiffProperty, EnrichedDiffRoot, EnrichedRelationshipElement,
    EnrichedRelationshipGroup,
};

/// Route `tracing` output through the test harness's captured writer.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// 2024-06-15T18:00:00Z
pub(crate) fn epoch() -> Timestamp {
    Timestamp::from_micros(1_718_474_400_000_000).unwrap()
}

pub(crate) struct DiffFactory<R> {
    rng: R,
}

impl DiffFactory<StdRng> {
    pub(crate) fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub(crate) fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl<R: Rng> DiffFactory<R> {
    pub(crate) fn word(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect()
    }

    fn action(&mut self) -> DiffAction {
        *DiffAction::ALL.choose(&mut self.rng).unwrap_or(&DiffAction::Updated)
    }

    fn timestamp(&mut self) -> Timestamp {
        epoch().add_seconds(self.rng.gen_range(0..86_400))
    }

    fn maybe_timestamp(&mut self) -> Option<Timestamp> {
        self.rng.gen_bool(0.7).then(|| self.timestamp())
    }

    fn maybe_word(&mut self) -> Option<String> {
        self.rng.gen_bool(0.7).then(|| self.word())
    }

    fn maybe_conflict(&mut self) -> Option<EnrichedDiffConflict> {
        self.rng.gen_bool(0.2).then(|| self.conflict())
    }

    pub(crate) fn conflict(&mut self) -> EnrichedDiffConflict {
        let selected_branch = match self.rng.gen_range(0..3) {
            0 => None,
            1 => Some(ConflictSelection::BaseBranch),
            _ => Some(ConflictSelection::DiffBranch),
        };
        EnrichedDiffConflict {
            base_branch_value: self.maybe_word(),
            base_branch_changed_at: self.maybe_timestamp(),
            diff_branch_value: self.maybe_word(),
            diff_branch_changed_at: self.maybe_timestamp(),
            selected_branch,
            ..EnrichedDiffConflict::new(self.word(), self.action(), self.action())
        }
    }

    pub(crate) fn property(&mut self, property_type: PropertyType) -> EnrichedDiffProperty {
        EnrichedDiffProperty {
            previous_value: self.maybe_word(),
            new_value: self.maybe_word(),
            changed_at: self.maybe_timestamp(),
            path_identifier: self.word(),
            conflict: self.maybe_conflict(),
            ..EnrichedDiffProperty::new(property_type, self.action())
        }
    }

    fn property_types(&mut self, count: usize) -> Vec<PropertyType> {
        PropertyType::ALL
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect()
    }

    pub(crate) fn attribute(&mut self, num_sub_fields: usize) -> EnrichedDiffAttribute {
        let mut attribute = EnrichedDiffAttribute {
            path_identifier: self.word(),
            changed_at: self.maybe_timestamp(),
            ..EnrichedDiffAttribute::new(self.word(), self.action())
        };
        for property_type in self.property_types(num_sub_fields) {
            attribute = attribute.with_property(self.property(property_type));
        }
        attribute
    }

    pub(crate) fn element(&mut self, num_sub_fields: usize) -> EnrichedRelationshipElement {
        let mut element = EnrichedRelationshipElement {
            path_identifier: self.word(),
            changed_at: self.maybe_timestamp(),
            conflict: self.maybe_conflict(),
            ..EnrichedRelationshipElement::new(self.word(), self.action())
        };
        for property_type in self.property_types(num_sub_fields) {
            element = element.with_property(self.property(property_type));
        }
        element
    }

    pub(crate) fn group(&mut self, num_sub_fields: usize) -> EnrichedRelationshipGroup {
        let mut group = EnrichedRelationshipGroup {
            label: self.word(),
            path_identifier: self.word(),
            changed_at: self.maybe_timestamp(),
            ..EnrichedRelationshipGroup::new(self.word(), self.action())
        };
        for _ in 0..num_sub_fields {
            group = group.with_element(self.element(num_sub_fields));
        }
        group
    }

    /// A detailed node without relationship groups.
    pub(crate) fn bare_node(&mut self, num_sub_fields: usize) -> EnrichedDiffNode {
        let mut node = EnrichedDiffNode {
            changed_at: self.maybe_timestamp(),
            path_identifier: self.word(),
            conflict: self.maybe_conflict(),
            ..EnrichedDiffNode::new(uuid::Uuid::new_v4().to_string(), self.word(), self.word(), self.action())
        };
        for _ in 0..num_sub_fields {
            node = node.with_attribute(self.attribute(num_sub_fields));
        }
        node
    }

    /// A node with `num_sub_fields` groups. The first group links to
    /// `num_sub_fields - 1` generated peers, recursively. Returns the node
    /// followed by every peer it pulled in.
    pub(crate) fn node_tree(&mut self, num_sub_fields: usize) -> Vec<EnrichedDiffNode> {
        let mut node = self.bare_node(num_sub_fields);
        let mut peers = Vec::new();
        for index in 0..num_sub_fields {
            let mut group = self.group(num_sub_fields);
            if index == 0 && num_sub_fields > 1 {
                for _ in 0..num_sub_fields - 1 {
                    let subtree = self.node_tree(num_sub_fields - 1);
                    group = group.with_peer(subtree[0].uuid.clone());
                    peers.extend(subtree);
                }
            }
            node = node.with_relationship(group);
        }
        let mut all = vec![node];
        all.extend(peers);
        all
    }

    pub(crate) fn root(
        &mut self,
        base_branch_name: &str,
        diff_branch_name: &str,
        from_time: Timestamp,
        to_time: Timestamp,
        num_nodes: usize,
        num_sub_fields: usize,
    ) -> EnrichedDiffRoot {
        let mut root = EnrichedDiffRoot::new(base_branch_name, diff_branch_name, from_time, to_time);
        for _ in 0..num_nodes {
            for node in self.node_tree(num_sub_fields) {
                root.add_node(node);
            }
        }
        root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_roots_are_valid() {
        let mut factory = DiffFactory::seeded(7);
        let root = factory.root("main", "diff", epoch(), epoch().add_minutes(10), 3, 2);
        // each tree: one node plus one peer
        assert_eq!(root.nodes.len(), 6);
        assert!(root.validate().is_ok());
    }

    #[test]
    fn seeds_are_reproducible_apart_from_ids() {
        let a = DiffFactory::seeded(11).attribute(2);
        let b = DiffFactory::seeded(11).attribute(2);
        assert_eq!(a, b);
    }
}
