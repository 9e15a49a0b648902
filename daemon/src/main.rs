//! CNS node sync daemon
//!
//! Keeps one context of a node tree in sync between the upstream node API and
//! the pub/sub bus, and serves reads and writes over HTTP.
//!
//! Usage:
//!   cns-daemon --context ctx-1 --token $TOKEN --pubsub-url http://localhost:3500
//!
//! Every flag can also be set through its `CNS_*` environment variable.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cns_daemon::config::Args;
use cns_daemon::{build_router, AppState};
use cns_sync::{
    Broadcast, HttpBroadcast, HttpUpstream, MemoryBus, SyncCoordinator, SyncOrchestrator,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    args.validate()?;

    info!("CNS daemon starting...");

    let upstream = Arc::new(
        HttpUpstream::new(args.upstream_config()).context("Failed to create upstream client")?,
    );

    let (broadcast, inbound): (Arc<dyn Broadcast>, Option<Arc<HttpBroadcast>>) =
        match args.broadcast_config() {
            Some(config) => {
                let bus = Arc::new(
                    HttpBroadcast::new(config).context("Failed to create pub/sub client")?,
                );
                info!("Publishing through sidecar as node {}", bus.origin());
                let outbound: Arc<dyn Broadcast> = bus.clone();
                (outbound, Some(bus))
            }
            None => {
                warn!("No pub/sub sidecar configured, broadcasts stay in-process");
                let local: Arc<dyn Broadcast> = Arc::new(MemoryBus::default().client());
                (local, None)
            }
        };

    let coordinator = Arc::new(SyncCoordinator::new(
        args.sync_config(),
        upstream.clone(),
        broadcast,
        upstream,
    ));
    let handle = SyncOrchestrator::start(coordinator.clone())
        .await
        .with_context(|| format!("Failed to attach context {}", args.context))?;

    let app = build_router(Arc::new(AppState::new(coordinator).with_inbound(inbound)));
    let listener = tokio::net::TcpListener::bind(args.listen_addr())
        .await
        .with_context(|| format!("Failed to bind {}", args.listen_addr()))?;
    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    handle.shutdown().await;
    info!("CNS daemon stopped");
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
