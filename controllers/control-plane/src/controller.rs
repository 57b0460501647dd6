//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the watchers,
//! the work queues and three worker pools (Deployments, ReplicaSets and the
//! scheduling pass) together, and tears them down on shutdown.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::queue::WorkQueue;
use crate::reconciler::{Action, Reconciler};
use crate::watcher::{Queues, Watcher};
use futures::future::join_all;
use objects::{Kind, ObjectKey};
use scheduler::Scheduler;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Which reconciliation a worker pool runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Deployment,
    ReplicaSet,
    Scheduling,
}

impl Pass {
    async fn run(self, reconciler: &Reconciler, key: &ObjectKey) -> Result<Action, ControllerError> {
        match self {
            Pass::Deployment => reconciler.reconcile_deployment(&key.namespace, &key.name).await,
            Pass::ReplicaSet => reconciler.reconcile_replica_set(&key.namespace, &key.name).await,
            Pass::Scheduling => reconciler.schedule_pod(&key.namespace, &key.name).await,
        }
    }
}

/// Main controller for the reconciliation core.
pub struct Controller {
    deployment_watcher: JoinHandle<Result<(), ControllerError>>,
    replica_set_watcher: JoinHandle<Result<(), ControllerError>>,
    pod_watcher: JoinHandle<Result<(), ControllerError>>,
    resync_timer: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    queues: Queues,
    shutdown: watch::Sender<bool>,
}

impl Controller {
    /// Spawn watchers, workers and the resync timer on the current runtime.
    pub fn new(
        store: Arc<dyn store::ObjectStore>,
        scheduler: Arc<Scheduler>,
        config: &ControllerConfig,
    ) -> Self {
        info!(
            "Initializing controllers ({} workers each, resync every {:?})",
            config.workers, config.resync_interval
        );

        let queue = |name| Arc::new(WorkQueue::new(name, config.backoff_min, config.backoff_max));
        let queues = Queues {
            deployments: queue("deployment"),
            replica_sets: queue("replicaset"),
            scheduling: queue("scheduling"),
        };
        let (shutdown, shutdown_rx) = watch::channel(false);

        let reconciler = Arc::new(Reconciler::new(Arc::clone(&store), scheduler));
        let watcher = Arc::new(Watcher::new(store, config.namespace.clone(), queues.clone()));

        let spawn_watcher = |kind: Kind| {
            let watcher = Arc::clone(&watcher);
            let shutdown = shutdown_rx.clone();
            tokio::spawn(async move { watcher.watch_kind(kind, shutdown).await })
        };
        let deployment_watcher = spawn_watcher(Kind::Deployment);
        let replica_set_watcher = spawn_watcher(Kind::ReplicaSet);
        let pod_watcher = spawn_watcher(Kind::Pod);

        let resync_timer = {
            let watcher = Arc::clone(&watcher);
            let mut shutdown = shutdown_rx.clone();
            let period = config.resync_interval;
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(period);
                // The first tick fires immediately; the watchers already listed everything.
                ticker.tick().await;
                loop {
                    tokio::select! {
                        _ = ticker.tick() => watcher.resync().await,
                        _ = shutdown.changed() => return,
                    }
                }
            })
        };

        let mut workers = Vec::new();
        for (pass, queue) in [
            (Pass::Deployment, &queues.deployments),
            (Pass::ReplicaSet, &queues.replica_sets),
            (Pass::Scheduling, &queues.scheduling),
        ] {
            for _ in 0..config.workers {
                workers.push(tokio::spawn(run_worker(
                    pass,
                    Arc::clone(queue),
                    Arc::clone(&reconciler),
                )));
            }
        }

        Self {
            deployment_watcher,
            replica_set_watcher,
            pod_watcher,
            resync_timer,
            workers,
            queues,
            shutdown,
        }
    }

    /// Run until `signal` completes or a watcher fails, then stop everything.
    ///
    /// Workers finish the pass they are in before exiting.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), ControllerError>
    where
        F: Future<Output = ()>,
    {
        info!("Controllers running");

        let result = tokio::select! {
            () = signal => {
                info!("Shutdown requested");
                Ok(())
            }
            result = &mut self.deployment_watcher => watcher_result("Deployment", result),
            result = &mut self.replica_set_watcher => watcher_result("ReplicaSet", result),
            result = &mut self.pod_watcher => watcher_result("Pod", result),
        };

        // Nobody may be listening any more; that is fine.
        let _ = self.shutdown.send(true);
        self.queues.shutdown();
        join_all(self.workers).await;
        for handle in [self.deployment_watcher, self.replica_set_watcher, self.pod_watcher] {
            if !handle.is_finished() {
                handle.abort();
            }
        }
        self.resync_timer.abort();
        info!("Controllers stopped");

        result
    }
}

fn watcher_result(
    kind: &str,
    result: Result<Result<(), ControllerError>, tokio::task::JoinError>,
) -> Result<(), ControllerError> {
    result
        .map_err(|e| ControllerError::Watch(format!("{kind} watcher panicked: {e}")))?
        .map_err(|e| ControllerError::Watch(format!("{kind} watcher error: {e}")))
}

/// Take keys from `queue` and reconcile them until the queue shuts down.
///
/// A failed pass never stops the worker: the key is requeued with backoff
/// if retrying can help, and dropped until its next event otherwise.
async fn run_worker(pass: Pass, queue: Arc<WorkQueue<ObjectKey>>, reconciler: Arc<Reconciler>) {
    while let Some(key) = queue.get().await {
        match pass.run(&reconciler, &key).await {
            Ok(Action::AwaitChange) => queue.forget(&key),
            Ok(Action::Requeue(delay)) => {
                queue.forget(&key);
                queue.add_after(key.clone(), delay);
            }
            Err(e) if e.is_retryable() => {
                let delay = queue.add_rate_limited(key.clone());
                warn!("{} pass for {} failed, retrying in {:?}: {}", queue.name(), key, delay, e);
            }
            Err(e) => {
                error!("{} pass for {} failed: {}", queue.name(), key, e);
                queue.forget(&key);
            }
        }
        queue.done(&key);
    }
}
