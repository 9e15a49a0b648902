//! Path resolution.

use serde_json::Value;

use crate::Tree;

/// A resolved read location: the object holding `key`.
#[derive(Debug, Clone, Copy)]
pub struct Location<'a> {
    pub container: &'a Tree,
    pub key: &'a str,
}

impl<'a> Location<'a> {
    /// The value at the location, if the terminal key exists.
    pub fn value(&self) -> Option<&'a Value> {
        self.container.get(self.key)
    }
}

/// A resolved write location.
#[derive(Debug)]
pub struct LocationMut<'a> {
    pub container: &'a mut Tree,
    pub key: &'a str,
}

impl LocationMut<'_> {
    /// The current value at the location, if any.
    pub fn value(&self) -> Option<&Value> {
        self.container.get(self.key)
    }

    /// Assigns `value` to the terminal key, returning the previous value.
    pub fn set(self, value: Value) -> Option<Value> {
        self.container.insert(self.key.to_string(), value)
    }
}

/// Resolves `path` to the object containing its last key.
///
/// Every intermediate key must exist and hold an object. The terminal key
/// does not have to exist, so the result doubles as an assignment target.
/// Returns `None` for an empty path.
pub fn resolve<'a, S: AsRef<str>>(tree: &'a Value, path: &'a [S]) -> Option<Location<'a>> {
    let (last, parents) = path.split_last()?;
    let mut current = tree.as_object()?;
    for key in parents {
        current = current.get(key.as_ref())?.as_object()?;
    }
    Some(Location {
        container: current,
        key: last.as_ref(),
    })
}

/// Mutable counterpart of [`resolve`].
pub fn resolve_mut<'a, S: AsRef<str>>(
    tree: &'a mut Value,
    path: &'a [S],
) -> Option<LocationMut<'a>> {
    let (last, parents) = path.split_last()?;
    let mut current = tree.as_object_mut()?;
    for key in parents {
        current = current.get_mut(key.as_ref())?.as_object_mut()?;
    }
    Some(LocationMut {
        container: current,
        key: last.as_ref(),
    })
}

/// Reads the value at `path`; the terminal key must exist.
///
/// An empty path yields `tree` itself.
pub fn lookup<'a, S: AsRef<str>>(tree: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(tree, |node, key| node.as_object()?.get(key.as_ref()))
}
