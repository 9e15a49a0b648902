//! Tree operations for the CNS node sync engine.
//!
//! A node tree is a `serde_json::Value` whose interior nodes are objects.
//! This crate provides the pure, side-effect free operations the sync
//! coordinator is built from:
//!
//! - [`resolve`] / [`lookup`]: walk a key path to a container and key
//! - [`merge`]: deep merge, later sources win
//! - [`difference`]: minimal diff with `null` tombstones
//! - [`contains`]: structural subset check
//! - [`purge`]: physical removal of tombstones
//!
//! The distinction between "absent" and "present with `null`" is load-bearing
//! everywhere: an absent key means "no change", a `null` key means "delete".
//!
//! # Example
//!
//! ```
//! use cns_tree::{difference, merged, purge};
//! use serde_json::json;
//!
//! let before = json!({"name": "n1", "caps": {"a": {"x": 1}, "b": {"x": 2}}});
//! let mut after = merged(&before, &json!({"caps": {"a": null}}));
//! purge(&mut after);
//!
//! assert_eq!(after, json!({"name": "n1", "caps": {"b": {"x": 2}}}));
//! assert_eq!(difference(&before, &after), Some(json!({"caps": {"a": null}})));
//! ```

mod contains;
mod diff;
mod merge;
mod path;
mod purge;

pub use contains::contains;
pub use diff::{difference, is_empty, values_equal};
pub use merge::{merge, merged};
pub use path::{lookup, resolve, resolve_mut, Location, LocationMut};
pub use purge::purge;

/// An object node of the tree.
pub type Tree = serde_json::Map<String, serde_json::Value>;

/// Shape of a value as far as merge and diff are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Object,
    Array,
    Scalar,
}

impl Kind {
    /// Classifies a value.
    pub fn of(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Object(_) => Kind::Object,
            serde_json::Value::Array(_) => Kind::Array,
            _ => Kind::Scalar,
        }
    }
}
