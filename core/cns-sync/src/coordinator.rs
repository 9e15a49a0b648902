//! Sync coordinator: owns the per-context snapshots.
//!
//! Every mutation follows the same sequence: copy the pre-image, apply the
//! change, diff against the pre-image, and propagate the diff to the
//! channel(s) that did not originate it. Empty diffs are never propagated,
//! which is what keeps a message that round-trips unchanged from echoing
//! forever.
//!
//! Each context has two locks. The turn lock is held for a whole update,
//! propagation included, so diffs leave in the same order the snapshot
//! changed. The tree lock is held only while the change is committed, so
//! reads never wait on a slow channel. Propagation failures are logged and
//! counted; the committed snapshot stays as it is.

use std::collections::HashMap;
use std::sync::Arc;

use cns_tree::{contains, difference, is_empty, lookup, merged, purge, resolve, resolve_mut};
use cns_types::{ContextId, NodePath, CONTEXTS_KEY, NODE_KEY, PROFILES_KEY};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::payload::Payload;
use crate::policy::{CapabilityWritePolicy, WritePolicy};
use crate::profile::ProfileCache;
use crate::status::NodeStatus;
use crate::transport::{Broadcast, ProfileSource, Upstream};

/// Key under `node` holding the status counters.
const STATUS_KEY: &str = "status";

/// Configuration for the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// The only context local writes may target.
    pub context: ContextId,
    /// Version reported in the node document.
    pub version: String,
}

impl SyncConfig {
    /// Configuration for `context` with the crate version.
    pub fn new(context: impl Into<ContextId>) -> Self {
        Self {
            context: context.into(),
            ..Default::default()
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            context: ContextId::new(""),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// One attached context.
struct ContextSlot {
    /// Sequences updates, held until their diff has been propagated.
    turn: Mutex<()>,
    tree: RwLock<Value>,
}

impl ContextSlot {
    fn new(tree: Value) -> Self {
        Self {
            turn: Mutex::new(()),
            tree: RwLock::new(tree),
        }
    }
}

type Slot = Arc<ContextSlot>;

fn empty_diff() -> Value {
    Value::Object(Map::new())
}

/// How an upstream tree is folded into the snapshot.
#[derive(Clone, Copy)]
enum UpstreamUpdate<'a> {
    /// A partial tree, merged in; `null` deletes.
    Partial(&'a Value),
    /// The complete tree; anything missing from it is deleted.
    Full(&'a Value),
}

/// Owns the snapshots and sequences every change to them.
pub struct SyncCoordinator {
    config: SyncConfig,
    contexts: RwLock<HashMap<ContextId, Slot>>,
    upstream: Arc<dyn Upstream>,
    broadcast: Arc<dyn Broadcast>,
    profiles: ProfileCache,
    policy: Arc<dyn WritePolicy>,
    status: NodeStatus,
}

impl SyncCoordinator {
    /// Creates a coordinator with the default [`CapabilityWritePolicy`].
    pub fn new(
        config: SyncConfig,
        upstream: Arc<dyn Upstream>,
        broadcast: Arc<dyn Broadcast>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self::with_policy(
            config,
            upstream,
            broadcast,
            profiles,
            Arc::new(CapabilityWritePolicy::default()),
        )
    }

    /// Creates a coordinator with a custom write policy.
    pub fn with_policy(
        config: SyncConfig,
        upstream: Arc<dyn Upstream>,
        broadcast: Arc<dyn Broadcast>,
        profiles: Arc<dyn ProfileSource>,
        policy: Arc<dyn WritePolicy>,
    ) -> Self {
        Self {
            config,
            contexts: RwLock::new(HashMap::new()),
            upstream,
            broadcast,
            profiles: ProfileCache::new(profiles),
            policy,
            status: NodeStatus::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the status counters.
    pub fn status(&self) -> &NodeStatus {
        &self.status
    }

    /// Returns the upstream collaborator.
    pub fn upstream(&self) -> &Arc<dyn Upstream> {
        &self.upstream
    }

    /// Returns the broadcast collaborator.
    pub fn broadcast(&self) -> &Arc<dyn Broadcast> {
        &self.broadcast
    }

    /// Returns the profile cache.
    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    // ── Context management ───────────────────────────────────────

    /// Installs the initial snapshot of `context`, replacing any previous one.
    pub async fn attach(&self, context: ContextId, mut snapshot: Value) -> SyncResult<()> {
        if !snapshot.is_object() {
            return Err(SyncError::TypeMismatch(format!(
                "snapshot of context {context} is not an object"
            )));
        }
        purge(&mut snapshot);
        info!("Attached context {}", context);
        self.contexts
            .write()
            .await
            .insert(context, Arc::new(ContextSlot::new(snapshot)));
        Ok(())
    }

    /// Drops a context, returning its last snapshot.
    pub async fn detach(&self, context: &ContextId) -> Option<Value> {
        let slot = self.contexts.write().await.remove(context)?;
        let snapshot = slot.tree.read().await.clone();
        info!("Detached context {}", context);
        Some(snapshot)
    }

    /// Attached contexts.
    pub async fn contexts(&self) -> Vec<ContextId> {
        let mut ids: Vec<ContextId> = self.contexts.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// A copy of the current snapshot of `context`.
    pub async fn snapshot(&self, context: &ContextId) -> Option<Value> {
        let slot = self.contexts.read().await.get(context).cloned()?;
        let snapshot = slot.tree.read().await.clone();
        Some(snapshot)
    }

    async fn slot(&self, context: &ContextId) -> SyncResult<Slot> {
        self.contexts
            .read()
            .await
            .get(context)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("context {context}")))
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Reads the value at `path` in the node document.
    pub async fn read(&self, path: &str) -> SyncResult<Value> {
        let result = self.read_inner(path).await;
        match &result {
            Ok(_) => {
                debug!("Read {} OK", path);
                let status_path = format!("{NODE_KEY}/{STATUS_KEY}");
                if !path.trim_start_matches('/').starts_with(&status_path) {
                    self.status.record_read();
                }
            }
            Err(e) => {
                debug!("Read {} failed: {}", path, e);
                self.status.record_error();
            }
        }
        result
    }

    async fn read_inner(&self, raw: &str) -> SyncResult<Value> {
        let path = NodePath::parse(raw)?;
        let not_found = || SyncError::NotFound(path.to_string());

        match path.segments() {
            [] => Err(not_found()),
            [root, name, rest @ ..] if root == PROFILES_KEY => {
                let doc = self.profiles.get(name).await?;
                lookup(&doc, rest).cloned().ok_or_else(not_found)
            }
            [root, contexts, context, rest @ ..] if root == NODE_KEY && contexts == CONTEXTS_KEY => {
                let slot = self.slot(&ContextId::new(context.as_str())).await?;
                let snapshot = slot.tree.read().await;
                lookup(&snapshot, rest).cloned().ok_or_else(not_found)
            }
            segments => {
                let doc = self.node_document().await?;
                lookup(&doc, segments).cloned().ok_or_else(not_found)
            }
        }
    }

    /// Builds the full readable document: cached profiles plus the node with
    /// its status and every context snapshot.
    pub async fn node_document(&self) -> SyncResult<Value> {
        let slots: Vec<(ContextId, Slot)> = self
            .contexts
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();

        let mut contexts = Map::new();
        for (id, slot) in slots {
            contexts.insert(id.to_string(), slot.tree.read().await.clone());
        }

        Ok(json!({
            PROFILES_KEY: self.profiles.snapshot().await,
            NODE_KEY: {
                "version": self.config.version,
                "broker": self.upstream.name(),
                STATUS_KEY: serde_json::to_value(self.status.report())?,
                CONTEXTS_KEY: contexts,
            }
        }))
    }

    // ── Local writes ─────────────────────────────────────────────

    /// Writes a textual payload at `path` and returns the resulting diff.
    pub async fn write(&self, path: &str, payload: &str) -> SyncResult<Value> {
        self.write_payload(path, Payload::parse(payload)).await
    }

    /// Writes an already parsed payload at `path`.
    pub async fn write_payload(&self, path: &str, payload: Payload) -> SyncResult<Value> {
        let result = self.write_inner(path, payload).await;
        match &result {
            Ok(diff) => {
                info!("Write {} OK", path);
                debug!("Write {} diff {}", path, diff);
                self.status.record_write();
            }
            Err(e) => {
                warn!("Write {} failed: {}", path, e);
                self.status.record_error();
            }
        }
        result
    }

    async fn write_inner(&self, raw: &str, payload: Payload) -> SyncResult<Value> {
        let path = NodePath::parse(raw)?;
        let context = &self.config.context;

        if context.is_empty()
            || !path.starts_with(&[NODE_KEY, CONTEXTS_KEY, context.as_str()])
        {
            return Err(SyncError::ReadOnly(path.to_string()));
        }
        let rest = path.tail(3);
        self.policy.check(rest, &payload)?;

        let slot = self.slot(context).await?;
        let _turn = slot.turn.lock().await;
        let (diff, before, after) = {
            let mut snapshot = slot.tree.write().await;

            let existing = if rest.is_empty() {
                Some(&*snapshot)
            } else {
                resolve(&snapshot, rest)
                    .ok_or_else(|| SyncError::NotFound(path.to_string()))?
                    .value()
            };
            let Payload::Value(incoming) = &payload else {
                return Ok(empty_diff());
            };

            let next = match (existing, incoming) {
                (Some(current @ Value::Object(_)), Value::Object(_)) => {
                    if !contains(current, incoming) {
                        return Err(SyncError::ContainmentViolation(path.to_string()));
                    }
                    merged(current, incoming)
                }
                (Some(Value::Object(_)), _) => {
                    return Err(SyncError::TypeMismatch(path.to_string()));
                }
                // New structure may only come from upstream.
                (_, Value::Object(_)) => {
                    return Err(SyncError::ContainmentViolation(path.to_string()));
                }
                _ => incoming.clone(),
            };

            let before = snapshot.clone();
            if rest.is_empty() {
                *snapshot = next;
            } else {
                resolve_mut(&mut snapshot, rest)
                    .ok_or_else(|| SyncError::NotFound(path.to_string()))?
                    .set(next);
            }
            purge(&mut snapshot);

            let diff = difference(&before, &snapshot);
            if is_empty(&diff) {
                return Ok(empty_diff());
            }
            (diff.unwrap_or_else(empty_diff), before, snapshot.clone())
        };

        self.push_upstream(context, &diff, &before, &after).await;
        self.publish(context, &diff).await;
        Ok(diff)
    }

    // ── Upstream-origin updates ──────────────────────────────────

    /// Merges a partial tree from upstream into `context`.
    ///
    /// `null` values delete keys. The resulting diff goes to the broadcast
    /// channel only.
    pub async fn apply_upstream(&self, context: &ContextId, update: &Value) -> SyncResult<Value> {
        self.track_update(self.upstream_inner(context, UpstreamUpdate::Partial(update)).await)
    }

    /// Applies a complete tree from upstream to `context`.
    ///
    /// The tree is first reduced to its difference from the snapshot, so keys
    /// it no longer has become tombstones, then merged like
    /// [`apply_upstream`](Self::apply_upstream).
    pub async fn apply_upstream_snapshot(
        &self,
        context: &ContextId,
        tree: &Value,
    ) -> SyncResult<Value> {
        self.track_update(self.upstream_inner(context, UpstreamUpdate::Full(tree)).await)
    }

    async fn upstream_inner(
        &self,
        context: &ContextId,
        update: UpstreamUpdate<'_>,
    ) -> SyncResult<Value> {
        let slot = self.slot(context).await?;
        let _turn = slot.turn.lock().await;
        let (diff, purged) = {
            let mut snapshot = slot.tree.write().await;

            let partial = match update {
                UpstreamUpdate::Partial(tree) if tree.is_object() => tree.clone(),
                UpstreamUpdate::Full(tree) if tree.is_object() => {
                    difference(&snapshot, tree).unwrap_or_else(empty_diff)
                }
                _ => {
                    return Err(SyncError::TypeMismatch(format!(
                        "upstream update for context {context} is not an object"
                    )));
                }
            };

            let mut next = merged(&snapshot, &partial);
            let purged = purge(&mut next);
            let diff = difference(&snapshot, &next);
            *snapshot = next;
            if is_empty(&diff) {
                debug!("Upstream update for {} changed nothing", context);
                return Ok(empty_diff());
            }
            (diff.unwrap_or_else(empty_diff), purged)
        };

        info!("Upstream update for {} ({} removed)", context, purged);
        self.publish(context, &diff).await;
        Ok(diff)
    }

    // ── Broadcast-origin updates ─────────────────────────────────

    /// Applies a full-state payload received from the broadcast channel.
    ///
    /// The payload must stay within the snapshot's existing structure. If it
    /// differs from the snapshot it replaces it and the diff is forwarded
    /// upstream; otherwise nothing happens.
    pub async fn apply_broadcast(&self, context: &ContextId, payload: &Value) -> SyncResult<Value> {
        self.track_update(self.broadcast_inner(context, payload).await)
    }

    async fn broadcast_inner(&self, context: &ContextId, payload: &Value) -> SyncResult<Value> {
        if !payload.is_object() {
            return Err(SyncError::TypeMismatch(format!(
                "broadcast for context {context} is not an object"
            )));
        }

        let slot = self.slot(context).await?;
        let _turn = slot.turn.lock().await;
        let (diff, before, after) = {
            let mut snapshot = slot.tree.write().await;

            if !contains(&snapshot, payload) {
                return Err(SyncError::ContainmentViolation(format!(
                    "broadcast for context {context} introduces unknown keys"
                )));
            }

            let diff = difference(&snapshot, payload);
            if is_empty(&diff) {
                debug!("Broadcast for {} changed nothing", context);
                return Ok(empty_diff());
            }

            let mut next = payload.clone();
            purge(&mut next);
            let before = std::mem::replace(&mut *snapshot, next);
            (diff.unwrap_or_else(empty_diff), before, snapshot.clone())
        };

        info!("Broadcast update for {}", context);
        self.push_upstream(context, &diff, &before, &after).await;
        Ok(diff)
    }

    // ── Propagation ──────────────────────────────────────────────

    fn track_update(&self, result: SyncResult<Value>) -> SyncResult<Value> {
        self.status.record_update();
        if let Err(e) = &result {
            warn!("Update rejected: {}", e);
            self.status.record_error();
        }
        result
    }

    async fn push_upstream(&self, context: &ContextId, diff: &Value, before: &Value, after: &Value) {
        if let Err(e) = self.upstream.push_node(context, diff, before, after).await {
            warn!("Failed to push diff for {} upstream: {}", context, e);
            self.status.record_propagation_error();
        }
    }

    async fn publish(&self, context: &ContextId, diff: &Value) {
        let topic = context.topic();
        if let Err(e) = self.broadcast.publish(&topic, diff).await {
            warn!("Failed to publish diff on {}: {}", topic, e);
            self.status.record_propagation_error();
        }
    }
}
