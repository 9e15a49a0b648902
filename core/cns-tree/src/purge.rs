//! Tombstone removal.

use serde_json::Value;

/// Removes every key holding `null`, at every object depth.
///
/// A removed key takes its subtree with it. Arrays are left untouched: a
/// `null` element is data, not a tombstone. Returns the number of keys
/// removed.
pub fn purge(tree: &mut Value) -> usize {
    let Value::Object(map) = tree else {
        return 0;
    };

    let before = map.len();
    map.retain(|_, value| !value.is_null());
    let mut removed = before - map.len();

    for value in map.values_mut() {
        removed += purge(value);
    }
    removed
}
