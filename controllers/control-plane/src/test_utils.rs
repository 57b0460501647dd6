//! Test utilities for unit testing reconcilers
//!
//! Builders for test objects and a `Harness` that drives the reconcilers
//! by hand against an in-memory store, with a fake node agent standing in
//! for the kubelet.

use crate::queue::WorkQueue;
use crate::reconciler::Reconciler;
use crate::watcher::Queues;
use objects::{
    Deployment, LabelSelector, ObjectMeta, Pod, PodPhase, PodTemplate, ReplicaSet,
};
use scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use store::{Api, InMemoryStore, ObjectStore};

pub const NAMESPACE: &str = "default";

/// Deployment `name` running `image`, labelled `app=<name>`.
pub fn deployment(name: &str, replicas: u32, image: &str) -> Deployment {
    Deployment::new(
        ObjectMeta::new(NAMESPACE, name),
        replicas,
        PodTemplate::new(image).with_label("app", name),
    )
}

/// Fresh, empty work queues.
pub fn queues() -> Queues {
    let queue = || Arc::new(WorkQueue::new("test", Duration::from_millis(1), Duration::from_millis(10)));
    Queues {
        deployments: queue(),
        replica_sets: queue(),
        scheduling: queue(),
    }
}

/// Reconcilers over an in-memory store, stepped by hand.
pub struct Harness {
    pub store: Arc<dyn ObjectStore>,
    pub scheduler: Arc<Scheduler>,
    pub reconciler: Reconciler,
}

impl Harness {
    /// Harness with three schedulable nodes.
    pub fn new() -> Self {
        Self::with_store(Arc::new(InMemoryStore::default()))
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        let scheduler = Arc::new(Scheduler::with_nodes(["node-1", "node-2", "node-3"]));
        let reconciler = Reconciler::new(Arc::clone(&store), Arc::clone(&scheduler));
        Self {
            store,
            scheduler,
            reconciler,
        }
    }

    pub fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(Arc::clone(&self.store), NAMESPACE)
    }

    pub fn replica_sets(&self) -> Api<ReplicaSet> {
        Api::namespaced(Arc::clone(&self.store), NAMESPACE)
    }

    pub fn pods(&self) -> Api<Pod> {
        Api::namespaced(Arc::clone(&self.store), NAMESPACE)
    }

    pub async fn deployment(&self, name: &str) -> Deployment {
        self.deployments().get(name).await.unwrap()
    }

    /// ReplicaSets owned by Deployment `name`, in name order.
    pub async fn replica_sets_of(&self, name: &str) -> Vec<ReplicaSet> {
        let d = self.deployment(name).await;
        self.replica_sets().list_owned_by(&d.metadata.uid).await
    }

    pub async fn all_pods(&self) -> Vec<Pod> {
        self.pods().list(&LabelSelector::everything()).await
    }

    pub async fn live_pods(&self) -> Vec<Pod> {
        self.all_pods().await.into_iter().filter(Pod::is_live).collect()
    }

    pub async fn reconcile_deployments(&self) {
        for d in self.deployments().list(&LabelSelector::everything()).await {
            self.reconciler
                .reconcile_deployment(NAMESPACE, &d.metadata.name)
                .await
                .unwrap();
        }
    }

    pub async fn reconcile_replica_sets(&self) {
        for rs in self.replica_sets().list(&LabelSelector::everything()).await {
            self.reconciler
                .reconcile_replica_set(NAMESPACE, &rs.metadata.name)
                .await
                .unwrap();
        }
    }

    pub async fn schedule_pods(&self) {
        for pod in self.all_pods().await.into_iter().filter(Pod::is_unscheduled) {
            self.reconciler
                .schedule_pod(NAMESPACE, &pod.metadata.name)
                .await
                .unwrap();
        }
    }

    /// Fake node agent: start up to `limit` Scheduled Pods, in name order.
    pub async fn start_pods(&self, limit: usize) -> usize {
        let scheduled: Vec<Pod> = self
            .all_pods()
            .await
            .into_iter()
            .filter(|p| p.status.phase == PodPhase::Scheduled)
            .take(limit)
            .collect();
        let started = scheduled.len();
        for mut pod in scheduled {
            pod.status.phase = PodPhase::Running;
            self.pods().replace(pod).await.unwrap();
        }
        started
    }

    /// Fake node agent: move Pod `name` to `phase`.
    pub async fn set_phase(&self, name: &str, phase: PodPhase) {
        let mut pod = self.pods().get(name).await.unwrap();
        pod.status.phase = phase;
        self.pods().replace(pod).await.unwrap();
    }

    /// One round of every controller followed by the node agent starting
    /// at most `start` Pods. `check` runs after every write phase.
    pub async fn step<F>(&self, start: usize, check: &F)
    where
        F: Fn(&[Pod]),
    {
        self.reconcile_deployments().await;
        check(&self.all_pods().await);
        self.reconcile_replica_sets().await;
        check(&self.all_pods().await);
        self.schedule_pods().await;
        self.start_pods(start).await;
        check(&self.all_pods().await);
        // Let the ReplicaSets observe the started Pods.
        self.reconcile_replica_sets().await;
    }

    /// Step until Deployment `name` reports a stable, observed rollout.
    pub async fn converge<F>(&self, name: &str, start_per_step: usize, check: F) -> usize
    where
        F: Fn(&[Pod]),
    {
        for round in 1..=100 {
            self.step(start_per_step, &check).await;
            self.reconcile_deployments().await;
            let d = self.deployment(name).await;
            if d.status.phase == objects::RolloutPhase::Stable
                && d.status.observed_generation == d.metadata.generation
            {
                return round;
            }
        }
        panic!("Deployment {name} did not converge");
    }
}
