//! Scheduling pass: binds pending Pods to nodes.

use super::{Action, Reconciler};
use crate::error::ControllerError;
use objects::{LabelSelector, Pod, PodPhase};
use store::Api;
use std::sync::Arc;
use tracing::{debug, info};

impl Reconciler {
    /// Assign a node to a Pending Pod and mark it Scheduled.
    ///
    /// With no usable node the Pod is left untouched and the `NoCapacity`
    /// error requeues the key with backoff.
    pub async fn schedule_pod(&self, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        let pods = self.api::<Pod>(namespace);
        let _binding = self.binding.lock().await;

        let Some(pod) = pods.get(name).await else {
            debug!("Pod {}/{} is gone, nothing to schedule", namespace, name);
            return Ok(Action::AwaitChange);
        };
        if !pod.is_unscheduled() {
            return Ok(Action::AwaitChange);
        }

        // Node load is counted across every namespace.
        let all_pods = Api::<Pod>::all(Arc::clone(&self.store))
            .list(&LabelSelector::everything())
            .await;
        let node = self.scheduler.assign_node(&pod, &all_pods)?;

        info!("Binding Pod {}/{} to node {}", namespace, name, node);
        let mut bound = pod;
        bound.status.node_name = Some(node);
        bound.status.phase = PodPhase::Scheduled;
        pods.replace(bound).await?;

        Ok(Action::AwaitChange)
    }
}
