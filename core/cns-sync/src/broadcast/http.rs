//! Broadcast through an HTTP pub/sub sidecar.
//!
//! Publishing posts the envelope to
//! `{base_url}/v1.0/publish/{pubsub}/{topic}`. Inbound messages arrive through
//! the host application's own HTTP route, which hands them to
//! [`HttpBroadcast::deliver`].

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use cns_types::NodeId;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};
use crate::transport::{Broadcast, BroadcastMessage, UpdateStream, SUBSCRIPTION_CAPACITY};

/// Sidecar connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpBroadcastConfig {
    /// Base URL of the sidecar (e.g. `http://localhost:3500`).
    pub base_url: String,
    /// Name of the pub/sub component.
    pub pubsub: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpBroadcastConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3500".to_string(),
            pubsub: "cns-pubsub".to_string(),
            timeout_secs: 30,
        }
    }
}

/// HTTP sidecar broadcast client.
pub struct HttpBroadcast {
    config: HttpBroadcastConfig,
    client: Client,
    origin: NodeId,
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Value>>>>,
}

impl HttpBroadcast {
    /// Creates a client with a fresh node id.
    pub fn new(config: HttpBroadcastConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            origin: NodeId::new(),
            subscribers: Mutex::new(HashMap::new()),
        })
    }

    /// This client's node id, stamped on every published message.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpBroadcastConfig {
        &self.config
    }

    fn publish_url(&self, topic: &str) -> String {
        format!(
            "{}/v1.0/publish/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.pubsub),
            urlencoding::encode(topic)
        )
    }

    /// Hands an inbound message to the subscribers of `topic`.
    ///
    /// Messages published by this client are dropped. Returns the number of
    /// subscribers the message reached.
    pub async fn deliver(&self, topic: &str, message: BroadcastMessage) -> usize {
        if message.origin == self.origin {
            debug!("Dropping own message on {}", topic);
            return 0;
        }

        let senders = {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let Some(list) = subscribers.get_mut(topic) else {
                return 0;
            };
            list.retain(|tx| !tx.is_closed());
            list.clone()
        };

        let mut delivered = 0;
        for tx in senders {
            if tx.send(message.data.clone()).await.is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait]
impl Broadcast for HttpBroadcast {
    async fn publish(&self, topic: &str, payload: &Value) -> SyncResult<()> {
        let message = BroadcastMessage::new(self.origin, payload.clone());
        info!("HTTP POST publish {}", topic);

        let resp = self
            .client
            .post(self.publish_url(topic))
            .json(&message)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(SyncError::Network(format!(
                "publish to {topic} failed: {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> SyncResult<UpdateStream> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(topic.to_string())
            .or_default()
            .push(tx);
        Ok(rx)
    }
}
