//! Node selection
//!
//! The node pool is held in a `BTreeMap`, so iterating it yields nodes in
//! name order and the first minimum found is also the lowest-named one.

use crate::error::SchedulerError;
use crate::node::Node;
use objects::Pod;
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

/// Node pool plus the least-loaded placement policy.
#[derive(Debug, Default)]
pub struct Scheduler {
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl Scheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with one schedulable node per name.
    pub fn with_nodes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scheduler = Self::new();
        for name in names {
            scheduler.register_node(name);
        }
        scheduler
    }

    /// Add a schedulable node, or uncordon it if already registered.
    pub fn register_node(&self, name: impl Into<String>) {
        let node = Node::new(name);
        info!("Registering node {}", node.name);
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(node.name.clone(), node);
    }

    /// Remove a node from the pool. Pods already bound to it are left alone.
    pub fn remove_node(&self, name: &str) -> Result<Node, SchedulerError> {
        info!("Removing node {}", name);
        self.nodes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .ok_or_else(|| SchedulerError::NodeNotFound(name.to_string()))
    }

    /// Stop placing new Pods on `name`.
    pub fn cordon(&self, name: &str) -> Result<(), SchedulerError> {
        self.set_schedulable(name, false)
    }

    /// Allow new Pods on `name` again.
    pub fn uncordon(&self, name: &str) -> Result<(), SchedulerError> {
        self.set_schedulable(name, true)
    }

    fn set_schedulable(&self, name: &str, schedulable: bool) -> Result<(), SchedulerError> {
        let mut nodes = self.nodes.write().unwrap_or_else(PoisonError::into_inner);
        let node = nodes
            .get_mut(name)
            .ok_or_else(|| SchedulerError::NodeNotFound(name.to_string()))?;
        node.schedulable = schedulable;
        debug!("Node {} schedulable={}", name, schedulable);
        Ok(())
    }

    /// Snapshot of the pool in name order.
    #[must_use]
    pub fn nodes(&self) -> Vec<Node> {
        self.nodes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Pick a node for `pod` given every Pod currently stored.
    ///
    /// A Pod that already has a node keeps it. Otherwise the schedulable node
    /// with the fewest live Pods bound to it wins, lowest name on ties.
    pub fn assign_node(&self, pod: &Pod, pods: &[Pod]) -> Result<String, SchedulerError> {
        if let Some(node) = &pod.status.node_name {
            return Ok(node.clone());
        }

        let nodes = self.nodes.read().unwrap_or_else(PoisonError::into_inner);
        let mut load: BTreeMap<&str, usize> = nodes
            .values()
            .filter(|node| node.schedulable)
            .map(|node| (node.name.as_str(), 0))
            .collect();

        for other in pods.iter().filter(|p| p.is_live()) {
            if let Some(count) = other
                .status
                .node_name
                .as_deref()
                .and_then(|node| load.get_mut(node))
            {
                *count += 1;
            }
        }

        // min_by_key returns the first minimum, and the map is in name order.
        let (node, count) = load
            .into_iter()
            .min_by_key(|(_, count)| *count)
            .ok_or_else(|| SchedulerError::NoCapacity(pod.metadata.name.clone()))?;

        debug!(
            "Assigning pod {}/{} to node {} ({} live pods)",
            pod.metadata.namespace, pod.metadata.name, node, count
        );
        Ok(node.to_string())
    }
}
