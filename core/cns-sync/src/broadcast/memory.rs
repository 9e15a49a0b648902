//! In-process broadcast bus.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use cns_types::NodeId;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use crate::error::SyncResult;
use crate::transport::{Broadcast, BroadcastMessage, UpdateStream, SUBSCRIPTION_CAPACITY};

/// Default number of messages buffered per topic.
pub const DEFAULT_TOPIC_CAPACITY: usize = 256;

/// A hub of topics shared by any number of [`MemoryBusClient`]s.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    topics: Arc<Mutex<HashMap<String, broadcast::Sender<BroadcastMessage>>>>,
    capacity: usize,
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new(DEFAULT_TOPIC_CAPACITY)
    }
}

impl MemoryBus {
    /// Creates a bus buffering up to `capacity` messages per topic.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Connects a new participant with a fresh node id.
    pub fn client(&self) -> MemoryBusClient {
        self.client_with_origin(NodeId::new())
    }

    /// Connects a participant with a fixed node id.
    pub fn client_with_origin(&self, origin: NodeId) -> MemoryBusClient {
        MemoryBusClient {
            bus: self.clone(),
            origin,
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<BroadcastMessage> {
        let mut topics = self
            .topics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }
}

/// One participant's handle on a [`MemoryBus`].
#[derive(Debug, Clone)]
pub struct MemoryBusClient {
    bus: MemoryBus,
    origin: NodeId,
}

impl MemoryBusClient {
    /// This participant's node id.
    pub fn origin(&self) -> NodeId {
        self.origin
    }
}

#[async_trait]
impl Broadcast for MemoryBusClient {
    async fn publish(&self, topic: &str, payload: &Value) -> SyncResult<()> {
        let message = BroadcastMessage::new(self.origin, payload.clone());
        // No receivers is not an error: nobody is listening yet.
        if self.bus.sender(topic).send(message).is_err() {
            debug!("No subscribers on {}", topic);
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> SyncResult<UpdateStream> {
        let mut incoming = self.bus.sender(topic).subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let origin = self.origin;
        let topic = topic.to_string();

        tokio::spawn(async move {
            loop {
                match incoming.recv().await {
                    Ok(message) => {
                        if message.origin == origin {
                            continue;
                        }
                        if tx.send(message.data).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Subscriber on {} lagged, skipped {} messages", topic, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("Subscription to {} ended", topic);
        });

        Ok(rx)
    }
}
