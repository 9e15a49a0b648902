//! Deep merge.

use serde_json::Value;

use crate::Tree;

/// Deep-merges `trees` left to right into a new object.
///
/// When both the accumulated value and the incoming value at a key are
/// objects they are merged recursively; otherwise the incoming value replaces
/// the accumulated one outright. Arrays are replaced whole, never merged by
/// element. Arguments that are not objects are skipped.
///
/// Inputs are never mutated, so `merge(&[&snapshot])` doubles as a deep copy.
pub fn merge(trees: &[&Value]) -> Value {
    let mut acc = Tree::new();
    for tree in trees {
        if let Value::Object(source) = tree {
            merge_into(&mut acc, source);
        }
    }
    Value::Object(acc)
}

/// Two-argument form of [`merge`].
pub fn merged(base: &Value, overlay: &Value) -> Value {
    merge(&[base, overlay])
}

fn merge_into(acc: &mut Tree, source: &Tree) {
    for (key, incoming) in source {
        if let (Some(Value::Object(current)), Value::Object(nested)) = (acc.get_mut(key), incoming)
        {
            merge_into(current, nested);
            continue;
        }
        acc.insert(key.clone(), incoming.clone());
    }
}
