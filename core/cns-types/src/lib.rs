//! Core type definitions for the CNS node sync engine.
//!
//! This crate defines the small, transport-agnostic types shared by the tree
//! engine, the sync coordinator and the daemon:
//! - Context and node identifiers
//! - Slash-delimited node paths
//!
//! Tree values themselves are plain `serde_json::Value`s and live in
//! `cns-tree`.

mod ids;
mod path;

pub use ids::{ContextId, NodeId};
pub use path::{NodePath, PathError};

/// Root key of the node document.
pub const NODE_KEY: &str = "node";

/// Key under the node document holding one snapshot per context.
pub const CONTEXTS_KEY: &str = "contexts";

/// Root key of the profile cache in the node document.
pub const PROFILES_KEY: &str = "profiles";
