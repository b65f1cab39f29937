//! Property-based tests for Treap.
//!
//! Each property drives random upsert/delete sequences against a `BTreeMap` model and checks the
//! tree's invariants and contents.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use ptreap::{Natural, NodePool, Treap};

#[derive(Debug, Clone)]
enum Op {
    Upsert(i32, u64),
    Delete(i32),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (-40..40i32, 0..64u64).prop_map(|(k, p)| Op::Upsert(k, p)),
        1 => (-40..40i32).prop_map(Op::Delete),
    ]
}

fn apply(treap: &Treap<i32>, op: &Op) -> Treap<i32> {
    match op {
        Op::Upsert(k, p) => treap.upsert(*k, *p),
        Op::Delete(k) => treap.delete(k),
    }
}

fn arbitrary_treap(max_size: usize) -> impl Strategy<Value = Treap<i32>> {
    prop::collection::vec((-40..40i32, any::<u64>()), 0..max_size)
        .prop_map(|entries| entries.into_iter().fold(Treap::new(), |t, (k, p)| t.upsert(k, p)))
}

fn contents(treap: &Treap<i32>) -> Vec<i32> {
    treap.iter().copied().collect()
}

type Entry = (i32, u32);

fn by_key(a: &Entry, b: &Entry) -> Ordering {
    a.0.cmp(&b.0)
}

fn entry_treap(entries: &[(i32, u32, u64)]) -> Treap<Entry, fn(&Entry, &Entry) -> Ordering> {
    entries.iter().fold(
        Treap::with_comparator(by_key as fn(&Entry, &Entry) -> Ordering),
        |t, &(k, v, p)| t.upsert((k, v), p),
    )
}

// =============================================================================
// Invariants and model agreement
// =============================================================================

proptest! {
    #[test]
    fn prop_every_version_is_a_valid_treap(ops in prop::collection::vec(op(), 0..80)) {
        let mut treap = Treap::new();
        let mut model = BTreeSet::new();
        for op in &ops {
            treap = apply(&treap, op);
            match op {
                Op::Upsert(k, _) => { model.insert(*k); }
                Op::Delete(k) => { model.remove(k); }
            }
            prop_assert!(treap.check_invariants().is_ok());
            prop_assert_eq!(contents(&treap), model.iter().copied().collect::<Vec<_>>());
            prop_assert_eq!(treap.min(), model.first());
            prop_assert_eq!(treap.max(), model.last());
        }
    }

    #[test]
    fn prop_old_versions_are_unaffected(ops in prop::collection::vec(op(), 1..60)) {
        let mut versions = vec![Treap::new()];
        let mut snapshots = vec![Vec::new()];
        for op in &ops {
            let next = apply(versions.last().unwrap(), op);
            snapshots.push(contents(&next));
            versions.push(next);
        }
        for (version, snapshot) in versions.iter().zip(&snapshots) {
            prop_assert_eq!(&contents(version), snapshot);
            prop_assert!(version.check_invariants().is_ok());
            for k in -40..40 {
                prop_assert_eq!(version.get(&k).is_some(), snapshot.contains(&k));
            }
        }
    }

    #[test]
    fn prop_pooled_old_versions_are_unaffected(
        ops in prop::collection::vec(op(), 1..60),
        capacity in 1..32usize,
    ) {
        let pool = Arc::new(NodePool::<i32>::builder().capacity(capacity).build().unwrap());
        let mut versions = vec![Treap::with_pool(Natural, pool.clone())];
        let mut snapshots = vec![Vec::new()];
        for (i, op) in ops.iter().enumerate() {
            let next = apply(versions.last().unwrap(), op);
            snapshots.push(contents(&next));
            versions.push(next);
            // drop an older version now and then so its nodes are recycled
            if i % 4 == 3 {
                versions.remove(versions.len() / 2);
                snapshots.remove(snapshots.len() / 2);
            }
        }
        for (version, snapshot) in versions.iter().zip(&snapshots) {
            prop_assert_eq!(&contents(version), snapshot);
            prop_assert!(version.check_invariants().is_ok());
        }
    }
}

// =============================================================================
// Priorities
// =============================================================================

proptest! {
    #[test]
    fn prop_first_priority_is_retained(
        treap in arbitrary_treap(40),
        key in -40..40i32,
        first: u64,
        second: u64,
    ) {
        let treap = treap.delete(&key).upsert(key, first);
        let updated = treap.upsert(key, second);
        prop_assert_eq!(updated.priority_of(&key), Some(first));
        prop_assert!(updated.check_invariants().is_ok());
    }

    #[test]
    fn prop_delete_then_upsert_changes_priority(
        treap in arbitrary_treap(40),
        key in -40..40i32,
        first: u64,
        second: u64,
    ) {
        let treap = treap.upsert(key, first);
        let reinserted = treap.delete(&key).upsert(key, second);
        prop_assert_eq!(reinserted.priority_of(&key), Some(second));
    }

    #[test]
    fn prop_upsert_replaces_value(
        entries in prop::collection::vec((-20..20i32, any::<u32>(), any::<u64>()), 0..30),
        key in -20..20i32,
        value: u32,
        priority: u64,
    ) {
        let treap = entry_treap(&entries);
        let updated = treap.upsert((key, value), priority);
        prop_assert_eq!(updated.get(&(key, 0)), Some(&(key, value)));
        prop_assert!(updated.check_invariants().is_ok());
    }
}

// =============================================================================
// Delete
// =============================================================================

proptest! {
    #[test]
    fn prop_delete_undoes_fresh_upsert(treap in arbitrary_treap(40), key in -40..40i32, priority: u64) {
        prop_assume!(!treap.contains(&key));
        let round_trip = treap.upsert(key, priority).delete(&key);
        prop_assert_eq!(contents(&round_trip), contents(&treap));
        prop_assert!(round_trip.check_invariants().is_ok());
    }

    #[test]
    fn prop_delete_absent_is_identity(treap in arbitrary_treap(40), key in -40..40i32) {
        prop_assume!(!treap.contains(&key));
        let deleted = treap.delete(&key);
        prop_assert_eq!(contents(&deleted), contents(&treap));
        prop_assert!(deleted.check_invariants().is_ok());
    }
}

// =============================================================================
// Traversal
// =============================================================================

proptest! {
    #[test]
    fn prop_visit_ascend_matches_sorted_filter(treap in arbitrary_treap(60), pivot in -45..45i32) {
        let mut visited = Vec::new();
        treap.visit_ascend(&pivot, |&k| {
            visited.push(k);
            true
        });
        let expected: Vec<i32> = contents(&treap).into_iter().filter(|&k| k >= pivot).collect();
        prop_assert!(visited.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(&visited, &expected);
        prop_assert_eq!(treap.range_from(&pivot).copied().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn prop_visit_ascend_stops_when_asked(treap in arbitrary_treap(60), pivot in -45..45i32, take in 0..10usize) {
        let mut visited = Vec::new();
        treap.visit_ascend(&pivot, |&k| {
            visited.push(k);
            visited.len() <= take
        });
        let expected: Vec<i32> = treap.range_from(&pivot).copied().take(take + 1).collect();
        prop_assert_eq!(visited, expected);
    }
}

// =============================================================================
// Split and union
// =============================================================================

proptest! {
    #[test]
    fn prop_split_partitions(treap in arbitrary_treap(60), pivot in -45..45i32) {
        let (less, middle, greater) = treap.split(&pivot);
        let all = contents(&treap);
        prop_assert_eq!(contents(&less), all.iter().copied().filter(|&k| k < pivot).collect::<Vec<_>>());
        prop_assert_eq!(contents(&greater), all.iter().copied().filter(|&k| k > pivot).collect::<Vec<_>>());
        prop_assert_eq!(middle, treap.get(&pivot).copied());
        prop_assert!(less.check_invariants().is_ok());
        prop_assert!(greater.check_invariants().is_ok());
        prop_assert_eq!(contents(&treap), all);
    }

    #[test]
    fn prop_union_prefers_argument(
        left in prop::collection::vec((-20..20i32, any::<u32>(), any::<u64>()), 0..30),
        right in prop::collection::vec((-20..20i32, any::<u32>(), any::<u64>()), 0..30),
    ) {
        let this = entry_treap(&left);
        let that = entry_treap(&right);
        let merged = this.union(&that);

        let mut model: BTreeMap<i32, u32> = this.iter().copied().collect();
        model.extend(that.iter().copied());
        prop_assert_eq!(merged.iter().copied().collect::<Vec<_>>(), model.into_iter().collect::<Vec<_>>());
        prop_assert!(merged.check_invariants().is_ok());

        // a merged key carries the higher of the two priorities
        for &(k, _) in merged.iter() {
            let probe = (k, 0);
            let expected = this.priority_of(&probe).max(that.priority_of(&probe));
            prop_assert_eq!(merged.priority_of(&probe), expected);
        }
    }
}
