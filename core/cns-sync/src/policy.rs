//! Read-only region enforcement for local writes.
//!
//! The policy decides *where* a caller may write. Whether the write stays
//! within known structure is checked separately by the coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SyncError, SyncResult};
use crate::payload::Payload;

/// Decides whether a local write may touch a location.
pub trait WritePolicy: Send + Sync {
    /// Checks a write of `payload` at `path`, relative to the context root.
    fn check(&self, path: &[String], payload: &Payload) -> SyncResult<()>;
}

/// Allows every write. Useful for embedders that enforce their own rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllWrites;

impl WritePolicy for AllowAllWrites {
    fn check(&self, _path: &[String], _payload: &Payload) -> SyncResult<()> {
        Ok(())
    }
}

/// Layout of the writable region of a context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritePolicyConfig {
    /// Top-level fields that may be edited directly.
    #[serde(default = "default_top_level_fields")]
    pub top_level_fields: Vec<String>,
    /// The subtree holding capabilities.
    #[serde(default = "default_mutable_subtree")]
    pub mutable_subtree: String,
    /// Sections of a capability that may be edited.
    #[serde(default = "default_mutable_sections")]
    pub mutable_sections: Vec<String>,
    /// The section holding connections.
    #[serde(default = "default_connection_section")]
    pub connection_section: String,
    /// Connection fields owned by the upstream service.
    #[serde(default = "default_read_only_connection_fields")]
    pub read_only_connection_fields: Vec<String>,
}

fn default_top_level_fields() -> Vec<String> {
    vec!["title".to_string(), "comment".to_string()]
}

fn default_mutable_subtree() -> String {
    "capabilities".to_string()
}

fn default_mutable_sections() -> Vec<String> {
    vec!["properties".to_string(), "connections".to_string()]
}

fn default_connection_section() -> String {
    "connections".to_string()
}

fn default_read_only_connection_fields() -> Vec<String> {
    vec!["provider".to_string(), "consumer".to_string()]
}

impl Default for WritePolicyConfig {
    fn default() -> Self {
        Self {
            top_level_fields: default_top_level_fields(),
            mutable_subtree: default_mutable_subtree(),
            mutable_sections: default_mutable_sections(),
            connection_section: default_connection_section(),
            read_only_connection_fields: default_read_only_connection_fields(),
        }
    }
}

/// Confines writes to capability properties and connections.
///
/// A context looks like
/// `{name, title, comment, capabilities: {<cap>: {scope, required, properties, connections: {<id>: {provider, consumer, status, properties}}}}}`.
/// The payload is expanded into the full set of locations it assigns and
/// each one is checked, so an object written higher up the tree cannot carry
/// edits into a read-only region.
#[derive(Debug, Clone, Default)]
pub struct CapabilityWritePolicy {
    config: WritePolicyConfig,
}

impl CapabilityWritePolicy {
    /// Creates a policy with the given layout.
    pub fn new(config: WritePolicyConfig) -> Self {
        Self { config }
    }

    /// Returns the layout.
    pub fn config(&self) -> &WritePolicyConfig {
        &self.config
    }

    fn allows(&self, location: &[&str]) -> bool {
        let cfg = &self.config;
        let Some(first) = location.first() else {
            return false;
        };

        if cfg.top_level_fields.iter().any(|f| f == first) {
            return true;
        }
        if *first != cfg.mutable_subtree {
            return false;
        }

        // capabilities/<cap>/<section>/...
        let Some(section) = location.get(2) else {
            return false;
        };
        if !cfg.mutable_sections.iter().any(|s| s == section) {
            return false;
        }

        // capabilities/<cap>/connections/<id>/<field>
        if *section == cfg.connection_section {
            if let Some(field) = location.get(4) {
                return !cfg.read_only_connection_fields.iter().any(|f| f == field);
            }
        }
        true
    }
}

impl WritePolicy for CapabilityWritePolicy {
    fn check(&self, path: &[String], payload: &Payload) -> SyncResult<()> {
        let mut prefix: Vec<&str> = path.iter().map(String::as_str).collect();
        let mut denied = None;

        match payload.as_value() {
            Some(value) => self.visit(&mut prefix, value, &mut denied),
            None => {
                if !self.allows(&prefix) {
                    denied = Some(format!("/{}", prefix.join("/")));
                }
            }
        }

        match denied {
            Some(location) => Err(SyncError::ReadOnly(location)),
            None => Ok(()),
        }
    }
}

impl CapabilityWritePolicy {
    fn visit<'a>(&self, prefix: &mut Vec<&'a str>, value: &'a Value, denied: &mut Option<String>) {
        if denied.is_some() {
            return;
        }
        match value {
            Value::Object(map) if !map.is_empty() => {
                for (key, child) in map {
                    prefix.push(key);
                    self.visit(prefix, child, denied);
                    prefix.pop();
                }
            }
            _ => {
                if !self.allows(prefix) {
                    *denied = Some(format!("/{}", prefix.join("/")));
                }
            }
        }
    }
}
