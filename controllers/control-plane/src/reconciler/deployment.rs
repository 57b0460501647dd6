//! Deployment reconciliation
//!
//! The ReplicaSet whose template hash matches the Deployment's template is
//! the new one; every other owned ReplicaSet is old. Each pass grows the new
//! ReplicaSet within the surge limit, shrinks old ones within the
//! availability floor, prunes drained revisions beyond the history limit and
//! reports progress in the status. Replica-only changes keep the hash, so
//! they just resize the current ReplicaSet.

use super::{Action, Reconciler};
use crate::error::ControllerError;
use crate::reconcile_helpers::{
    deployment_status, new_replica_set, replica_sets_to_prune, scale_down_plan, scale_up_target,
    split_replica_sets, status_needs_update,
};
use objects::{Deployment, ReplicaSet, RolloutPhase, template_hash};
use std::time::Duration;
use store::Api;
use tracing::{debug, info};

/// Safety net while a rollout is in progress, in case a ReplicaSet event is missed.
const ROLLOUT_RECHECK: Duration = Duration::from_secs(5);

impl Reconciler {
    /// Drive `namespace/name` one step towards running its current template.
    pub async fn reconcile_deployment(&self, namespace: &str, name: &str) -> Result<Action, ControllerError> {
        let deployments = self.api::<Deployment>(namespace);
        let replica_sets = self.api::<ReplicaSet>(namespace);

        let Some(deployment) = deployments.get(name).await else {
            debug!("Deployment {}/{} is gone, nothing to do", namespace, name);
            return Ok(Action::AwaitChange);
        };

        let hash = template_hash(&deployment.spec.template);
        let owned = replica_sets.list_owned_by(&deployment.metadata.uid).await;
        let (new_rs, mut old) = split_replica_sets(&hash, owned);

        let new_rs = match new_rs {
            Some(rs) => {
                let target = scale_up_target(&deployment, rs.spec.replicas, &old);
                if target == rs.spec.replicas {
                    Some(rs)
                } else {
                    Some(scale(&replica_sets, rs, target).await?)
                }
            }
            None if deployment.spec.replicas > 0 => {
                let replicas = scale_up_target(&deployment, 0, &old);
                let rs = new_replica_set(&deployment, &hash, replicas);
                info!(
                    "Creating ReplicaSet {}/{} for Deployment {} with {} replicas",
                    namespace, rs.metadata.name, name, replicas
                );
                let rs_name = rs.metadata.name.clone();
                match replica_sets.create(rs).await {
                    Ok(created) => Some(created),
                    Err(e) if e.is_conflict() => {
                        // The name is derived from the hash; someone else holds it.
                        return Err(ControllerError::Reconciliation(format!(
                            "ReplicaSet {namespace}/{rs_name} exists but is not owned by Deployment {name}"
                        )));
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            None => None,
        };

        for (index, replicas) in scale_down_plan(&deployment, new_rs.as_ref(), &old) {
            let rs = old[index].clone();
            old[index] = scale(&replica_sets, rs, replicas).await?;
        }

        for rs in replica_sets_to_prune(&deployment, &old) {
            info!(
                "Deleting old ReplicaSet {}/{} beyond revision history limit {}",
                namespace, rs.metadata.name, deployment.spec.revision_history_limit
            );
            match replica_sets.delete(&rs.metadata.name, rs.metadata.resource_version).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e.into()),
            }
            old.retain(|o| o.metadata.uid != rs.metadata.uid);
        }

        let status = deployment_status(&deployment, new_rs.as_ref(), &old);
        let action = match status.phase {
            RolloutPhase::Stable => Action::AwaitChange,
            RolloutPhase::RollingOut => Action::Requeue(ROLLOUT_RECHECK),
        };
        if status_needs_update(&deployment.status, &status) {
            debug!(
                "Updating Deployment {}/{} status: {} ready of {}, {:?}",
                namespace, name, status.available_replicas, deployment.spec.replicas, status.phase
            );
            let mut updated = deployment;
            updated.status = status;
            deployments.replace(updated).await?;
        }

        Ok(action)
    }
}

async fn scale(api: &Api<ReplicaSet>, mut rs: ReplicaSet, replicas: u32) -> Result<ReplicaSet, ControllerError> {
    info!(
        "Scaling ReplicaSet {}/{} from {} to {}",
        rs.metadata.namespace, rs.metadata.name, rs.spec.replicas, replicas
    );
    rs.spec.replicas = replicas;
    Ok(api.replace(rs).await?)
}
