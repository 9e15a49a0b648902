//! Snapshot sync engine for CNS nodes.
//!
//! A node keeps one snapshot per context and sits between two channels:
//!
//! - an **upstream** service that owns the authoritative state and pushes
//!   updates, and
//! - a **broadcast** bus that other consumers read from and occasionally
//!   write back to.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Coordinator**: owns the snapshots and sequences every change
//! - **Transport**: the [`Upstream`], [`Broadcast`] and [`ProfileSource`] seams
//! - **Policy**: decides which parts of a context local writes may touch
//! - **Orchestrator**: feeds collaborator subscriptions into the coordinator
//!
//! ## Update flow
//!
//! 1. **Copy**: take the pre-image of the snapshot under the context lock
//! 2. **Apply**: merge or replace, then purge tombstones
//! 3. **Diff**: compute the minimal change against the pre-image
//! 4. **Propagate**: send a non-empty diff to the channel(s) that did not
//!    originate it
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use cns_sync::mock::{MockBroadcast, MockUpstream};
//! use cns_sync::{SyncConfig, SyncCoordinator};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), cns_sync::SyncError> {
//! let upstream = Arc::new(MockUpstream::new());
//! let broadcast = Arc::new(MockBroadcast::new());
//! let coordinator = SyncCoordinator::new(
//!     SyncConfig::new("ctx-1"),
//!     upstream.clone(),
//!     broadcast.clone(),
//!     upstream.clone(),
//! );
//!
//! coordinator
//!     .attach("ctx-1".into(), json!({"name": "n1", "title": "old"}))
//!     .await?;
//! let diff = coordinator.write("/node/contexts/ctx-1/title", "\"new\"").await?;
//!
//! assert_eq!(diff, json!({"title": "new"}));
//! assert_eq!(upstream.pushes().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod broadcast;
mod coordinator;
mod error;
mod orchestrator;
pub mod payload;
pub mod policy;
mod profile;
pub mod status;
pub mod transport;
pub mod upstream;

pub use broadcast::{HttpBroadcast, HttpBroadcastConfig, MemoryBus, MemoryBusClient};
pub use coordinator::{SyncConfig, SyncCoordinator};
pub use error::{SyncError, SyncResult};
pub use orchestrator::{OrchestratorHandle, SyncOrchestrator};
pub use payload::Payload;
pub use policy::{AllowAllWrites, CapabilityWritePolicy, WritePolicy, WritePolicyConfig};
pub use profile::ProfileCache;
pub use status::{ConnectionState, NodeStatus, StatusReport};
pub use transport::{
    mock, Broadcast, BroadcastMessage, ProfileSource, Upstream, UpdateStream,
    SUBSCRIPTION_CAPACITY,
};
pub use upstream::{HttpUpstream, HttpUpstreamConfig};
