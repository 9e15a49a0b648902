//! Wires a coordinator to its collaborators' subscriptions.

use std::sync::Arc;

use cns_types::ContextId;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::coordinator::SyncCoordinator;
use crate::error::SyncResult;
use crate::transport::UpdateStream;

/// Starts the listeners that feed a [`SyncCoordinator`].
pub struct SyncOrchestrator;

impl SyncOrchestrator {
    /// Fetches the configured context from upstream, attaches it, and spawns
    /// one listener per subscription.
    ///
    /// Upstream subscriptions deliver whole trees, which are applied with
    /// [`SyncCoordinator::apply_upstream_snapshot`]. Broadcast messages on the
    /// context topic go through [`SyncCoordinator::apply_broadcast`].
    pub async fn start(coordinator: Arc<SyncCoordinator>) -> SyncResult<OrchestratorHandle> {
        let context = coordinator.config().context.clone();

        let tree = coordinator.upstream().fetch_node(&context).await?;
        coordinator.attach(context.clone(), tree).await?;

        let upstream_rx = coordinator.upstream().subscribe(&context).await?;
        let topic = context.topic();
        let broadcast_rx = coordinator.broadcast().subscribe(&topic).await?;
        coordinator.status().set_online(true);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let upstream_task = tokio::spawn(Self::run_upstream(
            coordinator.clone(),
            context.clone(),
            upstream_rx,
            shutdown_rx.clone(),
        ));
        let broadcast_task = tokio::spawn(Self::run_broadcast(
            coordinator.clone(),
            context.clone(),
            broadcast_rx,
            shutdown_rx,
        ));

        info!(
            "Syncing context {} between {} and topic {}",
            context,
            coordinator.upstream().name(),
            topic
        );

        Ok(OrchestratorHandle {
            coordinator,
            shutdown_tx,
            tasks: vec![upstream_task, broadcast_task],
        })
    }

    async fn run_upstream(
        coordinator: Arc<SyncCoordinator>,
        context: ContextId,
        mut updates: UpdateStream,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                tree = updates.recv() => {
                    let Some(tree) = tree else {
                        warn!("Upstream subscription for {} ended", context);
                        coordinator.status().set_online(false);
                        break;
                    };
                    let result = coordinator.apply_upstream_snapshot(&context, &tree).await;
                    Self::log_outcome(&context, "upstream", result);
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Upstream listener for {} stopped", context);
    }

    async fn run_broadcast(
        coordinator: Arc<SyncCoordinator>,
        context: ContextId,
        mut messages: UpdateStream,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                payload = messages.recv() => {
                    let Some(payload) = payload else {
                        warn!("Broadcast subscription for {} ended", context);
                        break;
                    };
                    let result = coordinator.apply_broadcast(&context, &payload).await;
                    Self::log_outcome(&context, "broadcast", result);
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!("Broadcast listener for {} stopped", context);
    }

    fn log_outcome(context: &ContextId, source: &str, result: SyncResult<Value>) {
        match result {
            Ok(diff) => debug!("Applied {} update for {}: {}", source, context, diff),
            Err(e) => warn!("Dropped {} update for {}: {}", source, context, e),
        }
    }
}

/// Handle to a running orchestrator.
pub struct OrchestratorHandle {
    coordinator: Arc<SyncCoordinator>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl OrchestratorHandle {
    /// The coordinator being fed.
    pub fn coordinator(&self) -> &Arc<SyncCoordinator> {
        &self.coordinator
    }

    /// Stops the listeners and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Listener task failed: {}", e);
            }
        }
        info!("Orchestrator stopped");
    }
}
