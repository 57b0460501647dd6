//! Control Plane
//!
//! Runs the reconciliation core in one process:
//! - Deployment controller: rolling updates, rollback and scaling
//! - ReplicaSet controller: keeps the live Pod count at `spec.replicas`
//! - Scheduling pass: binds pending Pods to the least-loaded node
//!
//! All three share one in-memory object store and talk to it only through
//! versioned reads and writes and its watch bus.

mod backoff;
mod config;
mod controller;
mod error;
mod manifest;
mod queue;
mod reconcile_helpers;
mod reconciler;
#[cfg(test)]
mod test_utils;
mod watcher;

use crate::config::ControllerConfig;
use controller::Controller;
use scheduler::Scheduler;
use std::sync::Arc;
use store::{InMemoryStore, ObjectStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting control plane");

    let config = ControllerConfig::from_env()?;
    info!("Configuration:");
    info!("  Namespace: {}", config.namespace.as_deref().unwrap_or("all namespaces"));
    info!("  Workers per controller: {}", config.workers);
    info!("  Resync interval: {:?}", config.resync_interval);
    info!("  Nodes: {}", config.nodes.join(", "));

    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::new(config.watch_buffer));
    let scheduler = Arc::new(Scheduler::with_nodes(config.nodes.iter().cloned()));

    if let Some(path) = &config.seed_manifest {
        let applied = manifest::apply_manifest(store.as_ref(), path).await?;
        info!("Applied {} objects from {}", applied, path.display());
    }

    let controller = Controller::new(store, scheduler, &config);
    controller
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
