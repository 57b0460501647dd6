//! ReplicaSet reconciliation

use super::{Action, Reconciler};
use crate::error::ControllerError;
use crate::reconcile_helpers::{rank_for_deletion, replica_set_status, status_needs_update};
use objects::{Kind, ObjectMeta, OwnerReference, Pod, ReplicaSet, generate_name};
use tracing::{debug, info};

/// Terminal Pods kept per ReplicaSet for inspection; older ones are deleted.
pub const TERMINAL_POD_HISTORY: usize = 3;

impl Reconciler {
    /// Create or delete Pods until `spec.replicas` of them are live, then
    /// record the observed counts in the ReplicaSet status.
    pub async fn reconcile_replica_set(&self, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        let replica_sets = self.api::<ReplicaSet>(namespace);
        let pods = self.api::<Pod>(namespace);

        let Some(rs) = replica_sets.get(name).await else {
            debug!("ReplicaSet {}/{} is gone, nothing to do", namespace, name);
            return Ok(Action::AwaitChange);
        };

        // Terminal Pods are replaced, never revived.
        let (mut live, terminal): (Vec<Pod>, Vec<Pod>) = pods
            .list_owned_by(&rs.metadata.uid)
            .await
            .into_iter()
            .partition(Pod::is_live);
        self.prune_terminal_pods(namespace, terminal).await?;

        let desired = usize::try_from(rs.spec.replicas).unwrap_or(usize::MAX);
        if live.len() < desired {
            let missing = desired - live.len();
            info!(
                "Scaling up ReplicaSet {}/{}: {} live, {} desired, creating {}",
                namespace, name, live.len(), desired, missing
            );
            for _ in 0..missing {
                let meta = ObjectMeta::new(namespace, generate_name(name))
                    .with_owner(OwnerReference::to(Kind::ReplicaSet, &rs.metadata));
                let pod = pods
                    .create(Pod::from_template(meta, &rs.spec.template))
                    .await?;
                debug!("Created Pod {}/{}", namespace, pod.metadata.name);
                live.push(pod);
            }
        } else if live.len() > desired {
            let excess = live.len() - desired;
            info!(
                "Scaling down ReplicaSet {}/{}: {} live, {} desired, deleting {}",
                namespace, name, live.len(), desired, excess
            );
            let mut ranked = rank_for_deletion(live);
            let keep = ranked.split_off(excess);
            for pod in ranked {
                match pods.delete(&pod.metadata.name, pod.metadata.resource_version).await {
                    Ok(()) => debug!("Deleted Pod {}/{}", namespace, pod.metadata.name),
                    Err(e) if e.is_not_found() => {
                        debug!("Pod {}/{} already gone", namespace, pod.metadata.name);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            live = keep;
        }

        let status = replica_set_status(&rs, &live);
        if status_needs_update(&rs.status, &status) {
            debug!(
                "Updating ReplicaSet {}/{} status: {} current, {} ready",
                namespace, name, status.current_replicas, status.ready_replicas
            );
            let mut updated = rs;
            updated.status = status;
            replica_sets.replace(updated).await?;
        }

        Ok(Action::AwaitChange)
    }

    /// Delete all but the newest `TERMINAL_POD_HISTORY` terminal Pods.
    async fn prune_terminal_pods(&self, namespace: &str, mut terminal: Vec<Pod>) -> Result<(), ControllerError> {
        if terminal.len() <= TERMINAL_POD_HISTORY {
            return Ok(());
        }
        terminal.sort_by(|a, b| {
            a.metadata
                .creation_timestamp
                .cmp(&b.metadata.creation_timestamp)
                .then_with(|| a.metadata.name.cmp(&b.metadata.name))
        });
        let excess = terminal.len() - TERMINAL_POD_HISTORY;
        let pods = self.api::<Pod>(namespace);
        for pod in terminal.into_iter().take(excess) {
            match pods.delete(&pod.metadata.name, pod.metadata.resource_version).await {
                Ok(()) => debug!("Deleted terminal Pod {}/{}", namespace, pod.metadata.name),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
