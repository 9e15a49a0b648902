use cns_tree::{lookup, resolve, resolve_mut};
use serde_json::json;

fn keys(path: &str) -> Vec<String> {
    path.split('/').map(str::to_string).collect()
}

#[test]
fn resolve_existing_leaf() {
    let tree = json!({"a": {"b": {"c": 1}}});
    let path = keys("a/b/c");
    let loc = resolve(&tree, &path).unwrap();
    assert_eq!(loc.key, "c");
    assert_eq!(loc.value(), Some(&json!(1)));
}

#[test]
fn resolve_absent_terminal_is_a_target() {
    let tree = json!({"a": {"b": {}}});
    let path = keys("a/b/new");
    let loc = resolve(&tree, &path).unwrap();
    assert_eq!(loc.key, "new");
    assert!(loc.value().is_none());
}

#[test]
fn resolve_absent_intermediate_is_not_found() {
    let tree = json!({"a": {"b": {}}});
    assert!(resolve(&tree, &keys("a/x/c")).is_none());
}

#[test]
fn resolve_through_scalar_is_not_found() {
    let tree = json!({"a": {"b": "leaf"}});
    assert!(resolve(&tree, &keys("a/b/c")).is_none());
}

#[test]
fn resolve_empty_path_is_not_found() {
    let tree = json!({"a": 1});
    let empty: Vec<String> = Vec::new();
    assert!(resolve(&tree, &empty).is_none());
}

#[test]
fn resolve_on_non_object_root() {
    assert!(resolve(&json!([1, 2]), &keys("0")).is_none());
}

#[test]
fn resolve_mut_sets_value() {
    let mut tree = json!({"a": {"b": 1}});
    let path = keys("a/c");
    let loc = resolve_mut(&mut tree, &path).unwrap();
    assert!(loc.value().is_none());
    assert_eq!(loc.set(json!("x")), None);
    assert_eq!(tree, json!({"a": {"b": 1, "c": "x"}}));
}

#[test]
fn resolve_mut_returns_previous() {
    let mut tree = json!({"a": {"b": 1}});
    let path = keys("a/b");
    let loc = resolve_mut(&mut tree, &path).unwrap();
    assert_eq!(loc.set(json!(2)), Some(json!(1)));
    assert_eq!(tree["a"]["b"], json!(2));
}

#[test]
fn lookup_requires_terminal() {
    let tree = json!({"a": {"b": null}});
    assert_eq!(lookup(&tree, &keys("a/b")), Some(&json!(null)));
    assert!(lookup(&tree, &keys("a/c")).is_none());
}

#[test]
fn lookup_empty_path_is_root() {
    let tree = json!({"a": 1});
    let empty: [&str; 0] = [];
    assert_eq!(lookup(&tree, &empty), Some(&tree));
}

#[test]
fn lookup_does_not_index_arrays() {
    let tree = json!({"a": [1, 2, 3]});
    assert!(lookup(&tree, &["a", "0"]).is_none());
}
