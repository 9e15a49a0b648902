use cns_tree::{difference, is_empty, values_equal};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn after_not_object_is_none() {
    assert_eq!(difference(&json!({"a": 1}), &json!("x")), None);
    assert_eq!(difference(&json!({"a": 1}), &json!(null)), None);
}

#[test]
fn before_not_object_is_full_replacement() {
    let after = json!({"a": 1});
    assert_eq!(difference(&json!(null), &after), Some(after.clone()));
    assert_eq!(difference(&json!([1]), &after), Some(after));
}

#[test]
fn identical_trees_have_empty_diff() {
    let tree = json!({"a": {"b": [1, 2]}, "c": "x", "d": null});
    let diff = difference(&tree, &tree);
    assert_eq!(diff, Some(json!({})));
    assert!(is_empty(&diff));
}

#[test]
fn removed_key_is_tombstoned() {
    let diff = difference(&json!({"a": 1, "b": 2}), &json!({"a": 1}));
    assert_eq!(diff, Some(json!({"b": null})));
}

#[test]
fn added_key_is_emitted() {
    let diff = difference(&json!({"a": 1}), &json!({"a": 1, "b": {"c": 2}}));
    assert_eq!(diff, Some(json!({"b": {"c": 2}})));
}

#[test]
fn changed_scalar_is_emitted() {
    let diff = difference(&json!({"a": "up"}), &json!({"a": "down"}));
    assert_eq!(diff, Some(json!({"a": "down"})));
}

#[test]
fn nested_change_emits_only_changed_leaf() {
    let before = json!({
        "name": "n1",
        "capabilities": {"cap1": {"scope": "s", "connections": {"c1": {"status": "up"}}}}
    });
    let after = json!({
        "name": "n1",
        "capabilities": {"cap1": {"scope": "s", "connections": {"c1": {"status": "down"}}}}
    });
    assert_eq!(
        difference(&before, &after),
        Some(json!({"capabilities": {"cap1": {"connections": {"c1": {"status": "down"}}}}}))
    );
}

#[test]
fn kind_change_emits_new_value_whole() {
    let diff = difference(&json!({"a": {"b": 1}}), &json!({"a": [1]}));
    assert_eq!(diff, Some(json!({"a": [1]})));

    let diff = difference(&json!({"a": [1]}), &json!({"a": {"b": 1}}));
    assert_eq!(diff, Some(json!({"a": {"b": 1}})));

    let diff = difference(&json!({"a": 1}), &json!({"a": {"b": 1}}));
    assert_eq!(diff, Some(json!({"a": {"b": 1}})));
}

#[test]
fn array_any_difference_emits_whole_array() {
    let diff = difference(&json!({"a": [1, 2, 3]}), &json!({"a": [1, 2, 4]}));
    assert_eq!(diff, Some(json!({"a": [1, 2, 4]})));

    let diff = difference(&json!({"a": [1, 2]}), &json!({"a": [1, 2, 3]}));
    assert_eq!(diff, Some(json!({"a": [1, 2, 3]})));
}

#[test]
fn equal_arrays_are_unchanged() {
    let diff = difference(&json!({"a": [1, {"x": 2}]}), &json!({"a": [1, {"x": 2}]}));
    assert_eq!(diff, Some(json!({})));
}

#[test]
fn no_numeric_coercion_between_types() {
    let diff = difference(&json!({"a": 1}), &json!({"a": "1"}));
    assert_eq!(diff, Some(json!({"a": "1"})));

    let diff = difference(&json!({"a": true}), &json!({"a": 1}));
    assert_eq!(diff, Some(json!({"a": 1})));
}

#[test]
fn numeric_representation_does_not_matter() {
    let diff = difference(&json!({"a": 1}), &json!({"a": 1.0}));
    assert_eq!(diff, Some(json!({})));
}

#[test]
fn null_to_value_is_emitted() {
    let diff = difference(&json!({"a": null}), &json!({"a": 3}));
    assert_eq!(diff, Some(json!({"a": 3})));
}

#[test]
fn empty_nested_object_diff_is_omitted() {
    let diff = difference(&json!({"a": {"b": {}}}), &json!({"a": {"b": {}}}));
    assert_eq!(diff, Some(json!({})));
}

#[test]
fn inputs_are_not_mutated() {
    let before = json!({"a": 1, "b": {"c": 2}});
    let after = json!({"b": {"c": 3}});
    let (b, a) = (before.clone(), after.clone());
    let _ = difference(&before, &after);
    assert_eq!(before, b);
    assert_eq!(after, a);
}

#[test]
fn is_empty_cases() {
    assert!(is_empty(&None));
    assert!(is_empty(&Some(json!({}))));
    assert!(!is_empty(&Some(json!({"a": null}))));
}

#[test]
fn values_equal_rules() {
    assert!(values_equal(&json!(2), &json!(2.0)));
    assert!(!values_equal(&json!(2), &json!("2")));
    assert!(values_equal(&json!([1, "a"]), &json!([1, "a"])));
    assert!(!values_equal(&json!([1, "a"]), &json!(["a", 1])));
    assert!(values_equal(&json!({"x": 1}), &json!({"x": 1.0})));
    assert!(!values_equal(&json!(null), &json!(false)));
}
