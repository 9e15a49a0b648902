//! Command-line and environment configuration.

use anyhow::{bail, Result};
use clap::Parser;
use cns_sync::{HttpBroadcastConfig, HttpUpstreamConfig, SyncConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "cns-daemon")]
#[command(about = "CNS node sync daemon")]
pub struct Args {
    /// Context this node owns and may write
    #[arg(long, env = "CNS_CONTEXT", default_value = "")]
    pub context: String,

    /// Bearer token for the node API
    #[arg(long, env = "CNS_TOKEN", default_value = "", hide_env_values = true)]
    pub token: String,

    /// Base URL of the node API
    #[arg(long, env = "CNS_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Base URL of the profile server
    #[arg(long, env = "CNS_PROFILE_URL", default_value = "http://localhost:8080")]
    pub profile_url: String,

    /// Base URL of the pub/sub sidecar; broadcasts stay in-process when unset
    #[arg(long, env = "CNS_PUBSUB_URL")]
    pub pubsub_url: Option<String>,

    /// Name of the pub/sub component
    #[arg(long, env = "CNS_PUBSUB", default_value = "cns-pubsub")]
    pub pubsub: String,

    /// Address the HTTP API binds to
    #[arg(long, env = "CNS_SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP API listens on
    #[arg(short, long, env = "CNS_SERVER_PORT", default_value = "3000")]
    pub port: u16,

    /// Seconds between upstream polls
    #[arg(long, env = "CNS_POLL_INTERVAL", default_value = "5")]
    pub poll_interval: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Rejects configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.context.trim().is_empty() {
            bail!("No context configured (set --context or CNS_CONTEXT)");
        }
        if self.token.trim().is_empty() {
            bail!("No token configured (set --token or CNS_TOKEN)");
        }
        Ok(())
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig::new(self.context.trim())
    }

    pub fn upstream_config(&self) -> HttpUpstreamConfig {
        HttpUpstreamConfig {
            api_base_url: self.api_url.clone(),
            profile_base_url: self.profile_url.clone(),
            token: self.token.clone(),
            poll_interval_secs: self.poll_interval,
            ..Default::default()
        }
    }

    /// Sidecar settings, if a sidecar is configured.
    pub fn broadcast_config(&self) -> Option<HttpBroadcastConfig> {
        self.pubsub_url.as_ref().map(|url| HttpBroadcastConfig {
            base_url: url.clone(),
            pubsub: self.pubsub.clone(),
            ..Default::default()
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
