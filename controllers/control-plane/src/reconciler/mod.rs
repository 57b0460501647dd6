//! Reconciliation logic.
//!
//! One pass per object key, each reading the current state from the store
//! and writing back the difference to the desired state:
//! - `replica_set`: keeps the live Pod count equal to `spec.replicas`
//! - `deployment`: rolls ReplicaSets over when the pod template changes
//! - `scheduling`: binds pending Pods to nodes
//!
//! Every pass starts by re-reading its object and exits early when it is
//! gone, so deleting an owner mid-rollout stops any further steps for it.

pub mod deployment;
pub mod replica_set;
pub mod scheduling;

use objects::Resource;
use scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use store::{Api, ObjectStore};

/// What to do with a key after a successful pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing pending: wait for the next watch event or resync
    AwaitChange,

    /// Look again after the given delay
    Requeue(Duration),
}

/// Reconciles Deployments, ReplicaSets and Pod placement.
pub struct Reconciler {
    pub(crate) store: Arc<dyn ObjectStore>,
    pub(crate) scheduler: Arc<Scheduler>,
    /// Serializes placement decisions so two workers never pick a node from the same snapshot
    binding: tokio::sync::Mutex<()>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ObjectStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            store,
            scheduler,
            binding: tokio::sync::Mutex::new(()),
        }
    }

    /// Typed handle for `K` in `namespace`.
    pub(crate) fn api<K: Resource>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(Arc::clone(&self.store), namespace)
    }
}

#[cfg(test)]
mod replica_set_test;
