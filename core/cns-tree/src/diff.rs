//! Minimal diff between two trees.
//!
//! The diff of `before` → `after` is itself a tree: every present key is a
//! changed or added value and a literal `null` marks a deleted key. Arrays are
//! compared as atomic units: any difference emits the whole new array.

use serde_json::Value;

use crate::{Kind, Tree};

/// Computes the changes that turn `before` into `after`.
///
/// Returns `None` when `after` is not an object (no comparison possible) and
/// a copy of `after` when `before` is not an object (full replacement).
pub fn difference(before: &Value, after: &Value) -> Option<Value> {
    let after = after.as_object()?;
    match before.as_object() {
        Some(before) => Some(Value::Object(diff_objects(before, after))),
        None => Some(Value::Object(after.clone())),
    }
}

/// Whether a diff carries no change.
pub fn is_empty(diff: &Option<Value>) -> bool {
    match diff {
        None => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(_) => false,
    }
}

fn diff_objects(before: &Tree, after: &Tree) -> Tree {
    let mut changes = Tree::new();

    for (key, old) in before {
        let Some(new) = after.get(key) else {
            changes.insert(key.clone(), Value::Null);
            continue;
        };

        match (old, new) {
            (Value::Object(old), Value::Object(new)) => {
                let nested = diff_objects(old, new);
                if !nested.is_empty() {
                    changes.insert(key.clone(), Value::Object(nested));
                }
            }
            _ if Kind::of(old) != Kind::of(new) => {
                changes.insert(key.clone(), new.clone());
            }
            _ => {
                if !values_equal(old, new) {
                    changes.insert(key.clone(), new.clone());
                }
            }
        }
    }

    for (key, new) in after {
        if !before.contains_key(key) {
            changes.insert(key.clone(), new.clone());
        }
    }

    changes
}

/// Strict value equality.
///
/// Numbers compare by numeric value regardless of integer or float
/// representation; values of different types never compare equal. Arrays
/// compare by length and position.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(x, y)| values_equal(x, y))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| values_equal(v, w)))
        }
        _ => a == b,
    }
}
