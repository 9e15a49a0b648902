//! JSON-over-HTTP upstream.
//!
//! Exchanges canonical node trees with a REST service:
//! - `GET  {api_base_url}/contexts/{context}` fetches a context tree
//! - `POST {api_base_url}/contexts/{context}` pushes a diff
//! - `GET  {profile_base_url}/profiles/{name}` fetches a profile document
//!
//! The service has no push channel of its own, so subscriptions poll the
//! context tree and forward it whenever it differs from the last delivery.

use std::time::Duration;

use async_trait::async_trait;
use cns_tree::{difference, is_empty};
use cns_types::ContextId;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::transport::{ProfileSource, UpdateStream, Upstream, SUBSCRIPTION_CAPACITY};

/// Upstream service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpUpstreamConfig {
    /// Base URL of the node API.
    pub api_base_url: String,
    /// Base URL of the profile server.
    pub profile_base_url: String,
    /// Bearer token for the node API.
    pub token: String,
    /// How often subscriptions poll the context tree (in seconds).
    pub poll_interval_secs: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpUpstreamConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            profile_base_url: "http://localhost:8080".to_string(),
            token: String::new(),
            poll_interval_secs: 5,
            timeout_secs: 30,
        }
    }
}

/// HTTP upstream client.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    config: HttpUpstreamConfig,
    client: Client,
}

impl HttpUpstream {
    /// Creates a client. Fails if no token is configured.
    pub fn new(config: HttpUpstreamConfig) -> SyncResult<Self> {
        if config.token.is_empty() {
            return Err(SyncError::Network("no token".to_string()));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpUpstreamConfig {
        &self.config
    }

    fn context_url(&self, context: &ContextId) -> String {
        format!(
            "{}/contexts/{}",
            self.config.api_base_url.trim_end_matches('/'),
            urlencoding::encode(context.as_str())
        )
    }

    fn profile_url(&self, name: &str) -> String {
        format!(
            "{}/profiles/{}",
            self.config.profile_base_url.trim_end_matches('/'),
            urlencoding::encode(name)
        )
    }

    async fn check(resp: Response, what: &str) -> SyncResult<Response> {
        match resp.status() {
            s if s.is_success() => Ok(resp),
            StatusCode::NOT_FOUND => Err(SyncError::NotFound(what.to_string())),
            s => {
                let body = resp.text().await.unwrap_or_default();
                Err(SyncError::Network(format!("{what}: {s} {body}")))
            }
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_node(&self, context: &ContextId) -> SyncResult<Value> {
        info!("HTTP GET context {}", context);

        let resp = self
            .client
            .get(self.context_url(context))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        let resp = Self::check(resp, &format!("context {context}")).await?;
        let tree: Value = resp.json().await?;

        if !tree.is_object() {
            return Err(SyncError::TypeMismatch(format!(
                "context {context} is not an object"
            )));
        }
        Ok(tree)
    }

    async fn push_node(
        &self,
        context: &ContextId,
        diff: &Value,
        _before: &Value,
        _after: &Value,
    ) -> SyncResult<()> {
        if diff.as_object().is_some_and(|m| m.is_empty()) {
            return Ok(());
        }
        info!("HTTP POST context {}", context);

        let resp = self
            .client
            .post(self.context_url(context))
            .bearer_auth(&self.config.token)
            .json(diff)
            .send()
            .await?;
        Self::check(resp, &format!("context {context}")).await?;
        Ok(())
    }

    async fn subscribe(&self, context: &ContextId) -> SyncResult<UpdateStream> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let upstream = self.clone();
        let context = context.clone();
        let period = Duration::from_secs(self.config.poll_interval_secs.max(1));

        info!("Polling context {} every {:?}", context, period);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Value> = None;

            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                match upstream.fetch_node(&context).await {
                    Ok(tree) => {
                        let unchanged = last
                            .as_ref()
                            .is_some_and(|prev| is_empty(&difference(prev, &tree)));
                        if unchanged {
                            continue;
                        }
                        last = Some(tree.clone());
                        if tx.send(tree).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Poll of context {} failed: {}", context, e),
                }
            }
            debug!("Stopped polling context {}", context);
        });

        Ok(rx)
    }
}

#[async_trait]
impl ProfileSource for HttpUpstream {
    async fn fetch_profile(&self, name: &str) -> SyncResult<Value> {
        info!("HTTP GET profile {}", name);

        let resp = self.client.get(self.profile_url(name)).send().await?;
        let resp = Self::check(resp, &format!("profile {name}")).await?;
        Ok(resp.json().await?)
    }
}
