//! Collaborator abstractions.
//!
//! The coordinator talks to the outside world through three traits:
//! [`Upstream`] (the authoritative service), [`Broadcast`] (the pub/sub bus)
//! and [`ProfileSource`] (profile documents). Subscriptions are delivered as
//! bounded channels of whole trees.

use async_trait::async_trait;
use cns_types::{ContextId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::SyncResult;

/// A stream of trees pushed by a collaborator.
pub type UpdateStream = mpsc::Receiver<Value>;

/// Default capacity of subscription channels.
pub const SUBSCRIPTION_CAPACITY: usize = 64;

/// The authoritative source of a context's node tree.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Short name reported as the node's broker.
    fn name(&self) -> &str;

    /// Fetches the whole tree of `context`.
    async fn fetch_node(&self, context: &ContextId) -> SyncResult<Value>;

    /// Pushes a local change. `before` and `after` are the full snapshots
    /// around `diff` for collaborators that need the surrounding state.
    async fn push_node(
        &self,
        context: &ContextId,
        diff: &Value,
        before: &Value,
        after: &Value,
    ) -> SyncResult<()>;

    /// Subscribes to whole-tree updates of `context`.
    async fn subscribe(&self, context: &ContextId) -> SyncResult<UpdateStream>;
}

/// The publish/subscribe channel.
#[async_trait]
pub trait Broadcast: Send + Sync {
    /// Publishes `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &Value) -> SyncResult<()>;

    /// Subscribes to `topic`. Messages published by this same client are
    /// not delivered back to it.
    async fn subscribe(&self, topic: &str) -> SyncResult<UpdateStream>;
}

/// Fetches profile documents by name.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn fetch_profile(&self, name: &str) -> SyncResult<Value>;
}

/// Wire envelope for broadcast payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastMessage {
    /// The node that published the message.
    pub origin: NodeId,
    /// The published tree.
    pub data: Value,
}

impl BroadcastMessage {
    pub fn new(origin: NodeId, data: Value) -> Self {
        Self { origin, data }
    }
}

/// Mock collaborators for testing.
pub mod mock {
    use super::*;
    use crate::error::SyncError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// One recorded `push_node` call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct PushRecord {
        pub context: ContextId,
        pub diff: Value,
        pub before: Value,
        pub after: Value,
    }

    /// An in-memory upstream that records pushes.
    #[derive(Debug, Default)]
    pub struct MockUpstream {
        nodes: Mutex<HashMap<ContextId, Value>>,
        profiles: Mutex<HashMap<String, Value>>,
        pushes: Mutex<Vec<PushRecord>>,
        subscribers: Mutex<Vec<(ContextId, mpsc::Sender<Value>)>>,
        profile_fetches: AtomicUsize,
        fail_push: AtomicBool,
    }

    impl MockUpstream {
        pub fn new() -> Self {
            Self::default()
        }

        /// Sets the tree returned by `fetch_node`.
        pub fn set_node(&self, context: impl Into<ContextId>, tree: Value) {
            self.nodes.lock().unwrap().insert(context.into(), tree);
        }

        /// Registers a profile document.
        pub fn set_profile(&self, name: impl Into<String>, doc: Value) {
            self.profiles.lock().unwrap().insert(name.into(), doc);
        }

        /// Makes subsequent pushes fail.
        pub fn fail_pushes(&self, fail: bool) {
            self.fail_push.store(fail, Ordering::SeqCst);
        }

        /// All pushes so far.
        pub fn pushes(&self) -> Vec<PushRecord> {
            self.pushes.lock().unwrap().clone()
        }

        /// Number of `fetch_profile` calls.
        pub fn profile_fetches(&self) -> usize {
            self.profile_fetches.load(Ordering::SeqCst)
        }

        /// Delivers `tree` to every subscriber of `context`.
        pub async fn emit(&self, context: &ContextId, tree: Value) -> usize {
            let senders: Vec<_> = self
                .subscribers
                .lock()
                .unwrap()
                .iter()
                .filter(|(c, _)| c == context)
                .map(|(_, tx)| tx.clone())
                .collect();
            let mut delivered = 0;
            for tx in senders {
                if tx.send(tree.clone()).await.is_ok() {
                    delivered += 1;
                }
            }
            delivered
        }

        /// Ends every subscription.
        pub fn close_subscriptions(&self) {
            self.subscribers.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Upstream for MockUpstream {
        fn name(&self) -> &str {
            "mock"
        }

        async fn fetch_node(&self, context: &ContextId) -> SyncResult<Value> {
            self.nodes
                .lock()
                .unwrap()
                .get(context)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(format!("context {context}")))
        }

        async fn push_node(
            &self,
            context: &ContextId,
            diff: &Value,
            before: &Value,
            after: &Value,
        ) -> SyncResult<()> {
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(SyncError::Network("push refused".into()));
            }
            self.pushes.lock().unwrap().push(PushRecord {
                context: context.clone(),
                diff: diff.clone(),
                before: before.clone(),
                after: after.clone(),
            });
            Ok(())
        }

        async fn subscribe(&self, context: &ContextId) -> SyncResult<UpdateStream> {
            let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
            self.subscribers.lock().unwrap().push((context.clone(), tx));
            Ok(rx)
        }
    }

    #[async_trait]
    impl ProfileSource for MockUpstream {
        async fn fetch_profile(&self, name: &str) -> SyncResult<Value> {
            self.profile_fetches.fetch_add(1, Ordering::SeqCst);
            self.profiles
                .lock()
                .unwrap()
                .get(name)
                .cloned()
                .ok_or_else(|| SyncError::NotFound(format!("profile {name}")))
        }
    }

    /// An in-memory broadcast channel that records publishes.
    #[derive(Debug, Default)]
    pub struct MockBroadcast {
        published: Mutex<Vec<(String, Value)>>,
        subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Value>>>>,
        fail_publish: AtomicBool,
    }

    impl MockBroadcast {
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes subsequent publishes fail.
        pub fn fail_publishes(&self, fail: bool) {
            self.fail_publish.store(fail, Ordering::SeqCst);
        }

        /// All `(topic, payload)` publishes so far.
        pub fn published(&self) -> Vec<(String, Value)> {
            self.published.lock().unwrap().clone()
        }

        /// Delivers a message from another participant to subscribers of `topic`.
        pub async fn deliver(&self, topic: &str, payload: Value) -> usize {
            let senders = self
                .subscribers
                .lock()
                .unwrap()
                .get(topic)
                .cloned()
                .unwrap_or_default();
            let mut delivered = 0;
            for tx in senders {
                if tx.send(payload.clone()).await.is_ok() {
                    delivered += 1;
                }
            }
            delivered
        }
    }

    #[async_trait]
    impl Broadcast for MockBroadcast {
        async fn publish(&self, topic: &str, payload: &Value) -> SyncResult<()> {
            if self.fail_publish.load(Ordering::SeqCst) {
                return Err(SyncError::Network("publish refused".into()));
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.clone()));
            Ok(())
        }

        async fn subscribe(&self, topic: &str) -> SyncResult<UpdateStream> {
            let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
            self.subscribers
                .lock()
                .unwrap()
                .entry(topic.to_string())
                .or_default()
                .push(tx);
            Ok(rx)
        }
    }
}
