//! Structural containment.

use serde_json::Value;

/// Whether every key of `candidate` already exists in `reference`.
///
/// Object-valued candidate keys are checked recursively. Scalar and array
/// values only need their key to exist; their contents are not compared. A
/// non-empty object against a non-object reference is never contained.
pub fn contains(reference: &Value, candidate: &Value) -> bool {
    let Some(candidate) = candidate.as_object() else {
        return true;
    };
    if candidate.is_empty() {
        return true;
    }
    let Some(reference) = reference.as_object() else {
        return false;
    };

    candidate.iter().all(|(key, value)| match reference.get(key) {
        None => false,
        Some(existing) => !value.is_object() || contains(existing, value),
    })
}
