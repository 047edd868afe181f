//! Collapsing diffs whose windows are covered by a wider diff of the same
//! branch pair.

use std::collections::BTreeMap;

use crate::model::DiffRootMetadata;

/// Drop every header whose range is strictly contained in the range of
/// another header with the same `(base, diff)` branch pair.
///
/// Of several headers with identical ranges only the last one in input
/// order survives, so callers pass headers oldest first. The relative order
/// of surviving headers is preserved.
pub fn drop_superseded(headers: Vec<DiffRootMetadata>) -> Vec<DiffRootMetadata> {
    drop_superseded_by(headers, |h| h)
}

/// [`drop_superseded`] over any items that carry a root header.
pub fn drop_superseded_by<T>(items: Vec<T>, header: impl Fn(&T) -> &DiffRootMetadata) -> Vec<T> {
    let superseded = {
        let mut by_pair: BTreeMap<(&str, &str), Vec<usize>> = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            let h = header(item);
            by_pair
                .entry((h.base_branch_name.as_str(), h.diff_branch_name.as_str()))
                .or_default()
                .push(index);
        }

        let mut superseded = vec![false; items.len()];
        for members in by_pair.values() {
            for &candidate in members {
                let range = header(&items[candidate]).time_range();
                superseded[candidate] = members.iter().any(|&other| {
                    let cover = header(&items[other]).time_range();
                    cover.strictly_contains(&range) || (other > candidate && cover == range)
                });
            }
        }
        superseded
    };

    items
        .into_iter()
        .zip(superseded)
        .filter_map(|(item, dropped)| (!dropped).then_some(item))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ig_types::Timestamp;
    use proptest::prelude::*;

    fn header(uuid: &str, diff: &str, from: i64, to: i64) -> DiffRootMetadata {
        let t0 = Timestamp::parse("2024-06-15T18:00:00Z").unwrap();
        DiffRootMetadata {
            uuid: uuid.into(),
            base_branch_name: "main".into(),
            diff_branch_name: diff.into(),
            from_time: t0.add_minutes(from),
            to_time: t0.add_minutes(to),
            tracking_id: None,
        }
    }

    fn uuids(headers: &[DiffRootMetadata]) -> Vec<&str> {
        headers.iter().map(|h| h.uuid.as_str()).collect()
    }

    #[test]
    fn incremental_is_replaced_by_superseding() {
        let kept = drop_superseded(vec![header("inc", "f1", 0, 5), header("sup", "f1", 0, 10)]);
        assert_eq!(uuids(&kept), ["sup"]);
    }

    #[test]
    fn other_branch_never_supersedes() {
        let kept = drop_superseded(vec![header("a", "f1", 2, 5), header("b", "f2", 0, 10)]);
        assert_eq!(uuids(&kept), ["a", "b"]);
    }

    #[test]
    fn identical_ranges_keep_the_last() {
        let kept = drop_superseded(vec![
            header("old", "f1", 0, 5),
            header("other", "f2", 0, 5),
            header("new", "f1", 0, 5),
        ]);
        assert_eq!(uuids(&kept), ["other", "new"]);
    }

    #[test]
    fn partial_overlap_keeps_both() {
        let kept = drop_superseded(vec![header("a", "f1", 0, 6), header("b", "f1", 4, 10)]);
        assert_eq!(uuids(&kept), ["a", "b"]);
    }

    #[test]
    fn nested_chain_keeps_outermost() {
        let kept = drop_superseded(vec![
            header("inner", "f1", 3, 4),
            header("outer", "f1", 0, 10),
            header("middle", "f1", 2, 6),
        ]);
        assert_eq!(uuids(&kept), ["outer"]);
    }

    proptest! {
        #[test]
        fn survivors_never_share_coverage(
            spans in prop::collection::vec((0i64..50, 0i64..50, 0usize..2), 0..12)
        ) {
            let headers: Vec<_> = spans
                .iter()
                .enumerate()
                .map(|(i, &(a, b, branch))| {
                    header(&i.to_string(), ["f1", "f2"][branch], a.min(b), a.max(b))
                })
                .collect();
            let kept = drop_superseded(headers.clone());

            for survivor in &kept {
                let range = survivor.time_range();
                let covered = headers.iter().any(|h| {
                    h.diff_branch_name == survivor.diff_branch_name
                        && h.time_range().strictly_contains(&range)
                });
                prop_assert!(!covered);
                let duplicated = kept.iter().any(|k| {
                    k != survivor
                        && k.diff_branch_name == survivor.diff_branch_name
                        && k.time_range() == range
                });
                prop_assert!(!duplicated);
            }
            // a dropped header always has a surviving cover
            for dropped in headers.iter().filter(|h| !kept.contains(h)) {
                let range = dropped.time_range();
                let covered = kept.iter().any(|k| {
                    k.diff_branch_name == dropped.diff_branch_name && k.time_range().contains(&range)
                });
                prop_assert!(covered);
            }
        }
    }
}
