//! Broadcast bus implementations.
//!
//! Both buses wrap payloads in a [`BroadcastMessage`](crate::transport::BroadcastMessage)
//! tagged with the publishing client's node id and drop that client's own
//! messages on the way back in.

pub mod http;
pub mod memory;

pub use http::{HttpBroadcast, HttpBroadcastConfig};
pub use memory::{MemoryBus, MemoryBusClient};
