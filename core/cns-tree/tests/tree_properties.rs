//! Property-based tests for the tree operations.
//!
//! These verify the laws the sync coordinator relies on:
//! - `difference(A, A)` is empty
//! - applying `difference(A, B)` to A (merge, then purge) reproduces B
//! - the diff of a merge reproduces exactly the merged-in changes
//! - anything merged in is contained in the result
//! - merge is idempotent and purge leaves no tombstones

use cns_tree::{contains, difference, is_empty, merge, merged, purge};
use proptest::prelude::*;
use serde_json::{Map, Value};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "d", "name", "status"]).prop_map(str::to_string)
}

fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-50i64..50).prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
        prop::collection::vec((0i64..5).prop_map(Value::from), 0..4).prop_map(Value::Array),
    ]
}

/// Trees without tombstones.
fn tree_strategy() -> impl Strategy<Value = Value> {
    let leaf = leaf_strategy();
    leaf.prop_recursive(4, 48, 5, |inner| {
        prop::collection::btree_map(key_strategy(), inner, 0..5)
            .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>()))
    })
    .prop_map(|v| match v {
        Value::Object(_) => v,
        other => {
            let mut root = Map::new();
            root.insert("root".to_string(), other);
            Value::Object(root)
        }
    })
}

fn has_tombstone(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().any(|v| v.is_null() || has_tombstone(v)),
        _ => false,
    }
}

// =============================================================================
// DIFF PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn diff_of_self_is_empty(a in tree_strategy()) {
        prop_assert!(is_empty(&difference(&a, &a)));
    }

    #[test]
    fn applying_diff_reproduces_target(a in tree_strategy(), b in tree_strategy()) {
        let diff = difference(&a, &b).unwrap();
        let mut applied = merged(&a, &diff);
        purge(&mut applied);
        prop_assert_eq!(applied, b);
    }

    #[test]
    fn diff_of_merge_reproduces_merge(a in tree_strategy(), b in tree_strategy()) {
        let target = merged(&a, &b);
        let diff = difference(&a, &target).unwrap();
        prop_assert!(!has_tombstone(&diff));
        prop_assert_eq!(merged(&a, &diff), target);
    }

    #[test]
    fn diff_never_mutates_inputs(a in tree_strategy(), b in tree_strategy()) {
        let (a_copy, b_copy) = (a.clone(), b.clone());
        let _ = difference(&a, &b);
        prop_assert_eq!(a, a_copy);
        prop_assert_eq!(b, b_copy);
    }
}

// =============================================================================
// MERGE / CONTAINMENT / PURGE PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn merge_is_idempotent(a in tree_strategy()) {
        prop_assert_eq!(merged(&a, &a), a);
    }

    #[test]
    fn merge_with_nothing_is_copy(a in tree_strategy()) {
        prop_assert_eq!(merge(&[&a]), a.clone());
        prop_assert_eq!(merged(&a, &Value::Object(Map::new())), a);
    }

    #[test]
    fn merged_in_tree_is_contained(a in tree_strategy(), b in tree_strategy()) {
        prop_assert!(contains(&merged(&a, &b), &b));
        prop_assert!(contains(&a, &a));
    }

    #[test]
    fn new_key_is_never_contained(a in tree_strategy()) {
        let mut candidate = a.clone();
        candidate
            .as_object_mut()
            .unwrap()
            .insert("__unknown__".to_string(), Value::from(1));
        prop_assert!(!contains(&a, &candidate));
    }

    #[test]
    fn tombstone_deletes_key(a in tree_strategy()) {
        let keys: Vec<String> = a.as_object().unwrap().keys().cloned().collect();
        for key in keys {
            let mut update = Map::new();
            update.insert(key.clone(), Value::Null);
            let update = Value::Object(update);

            let mut next = merged(&a, &update);
            purge(&mut next);
            prop_assert!(next.get(&key).is_none());
            prop_assert_eq!(difference(&a, &next), Some(update));
        }
    }

    #[test]
    fn purge_leaves_no_tombstones(a in tree_strategy(), b in tree_strategy()) {
        let diff = difference(&a, &b).unwrap();
        let mut next = merged(&a, &diff);
        purge(&mut next);
        prop_assert!(!has_tombstone(&next));
        prop_assert_eq!(purge(&mut next), 0);
    }
}
