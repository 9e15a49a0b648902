//! Node status counters.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Live counters for one sync node.
#[derive(Debug)]
pub struct NodeStatus {
    started: DateTime<Utc>,
    reads: AtomicU64,
    writes: AtomicU64,
    updates: AtomicU64,
    errors: AtomicU64,
    propagation_errors: AtomicU64,
    online: AtomicBool,
}

/// Point-in-time copy of [`NodeStatus`], as served under `node/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub started: DateTime<Utc>,
    pub reads: u64,
    pub writes: u64,
    pub updates: u64,
    pub errors: u64,
    pub propagation_errors: u64,
    pub connection: ConnectionState,
}

/// Whether the upstream subscription is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Online,
    Offline,
}

impl Default for NodeStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStatus {
    /// Creates counters starting now.
    pub fn new() -> Self {
        Self {
            started: Utc::now(),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            updates: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            propagation_errors: AtomicU64::new(0),
            online: AtomicBool::new(true),
        }
    }

    pub fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_update(&self) {
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_propagation_error(&self) {
        self.propagation_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks the upstream connection up or down.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }

    /// Takes a snapshot of the counters.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            started: self.started,
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            propagation_errors: self.propagation_errors.load(Ordering::Relaxed),
            connection: if self.online.load(Ordering::Relaxed) {
                ConnectionState::Online
            } else {
                ConnectionState::Offline
            },
        }
    }
}
