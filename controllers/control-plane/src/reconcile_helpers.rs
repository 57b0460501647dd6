//! Helper functions for common reconciliation patterns
//!
//! Pure functions over observed objects: deletion ranking, status
//! derivation and the rollout arithmetic. The reconcilers read state, call
//! these, and write back the difference.

use objects::{
    Deployment, DeploymentStatus, Kind, ObjectMeta, OwnerReference, POD_TEMPLATE_HASH_LABEL, Pod,
    ReplicaSet, ReplicaSetStatus, RolloutPhase,
};
use std::cmp::Reverse;

/// Check if a status needs updating.
///
/// Status writes go through the same versioned Put as spec writes and every
/// write produces a watch event, so writing an unchanged status would make a
/// reconciler trigger itself forever.
pub fn status_needs_update<S: PartialEq>(current: &S, desired: &S) -> bool {
    current != desired
}

/// Order live Pods so the best candidates for deletion come first.
///
/// Pods that are not Running go first, then the ones with the most
/// restarts, then the oldest, then by name so the order is stable.
pub fn rank_for_deletion(mut pods: Vec<Pod>) -> Vec<Pod> {
    pods.sort_by(|a, b| {
        let key = |p: &Pod| {
            (
                p.is_ready(),
                Reverse(p.status.restart_count),
                p.metadata.creation_timestamp,
            )
        };
        key(a)
            .cmp(&key(b))
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
    pods
}

/// Status of `rs` given its live Pods.
pub fn replica_set_status(rs: &ReplicaSet, live_pods: &[Pod]) -> ReplicaSetStatus {
    ReplicaSetStatus {
        current_replicas: count(live_pods.len()),
        ready_replicas: count(live_pods.iter().filter(|p| p.is_ready()).count()),
        observed_generation: rs.metadata.generation,
    }
}

/// ReplicaSet that runs `deployment`'s current template.
///
/// Named `<deployment>-<hash>`; the hash label is added to its metadata,
/// its template and therefore its selector, so ReplicaSets of different
/// revisions never select each other's Pods.
pub fn new_replica_set(deployment: &Deployment, hash: &str, replicas: u32) -> ReplicaSet {
    let template = deployment
        .spec
        .template
        .clone()
        .with_label(POD_TEMPLATE_HASH_LABEL, hash);
    let mut meta = ObjectMeta::new(
        deployment.metadata.namespace.clone(),
        format!("{}-{}", deployment.metadata.name, hash),
    )
    .with_owner(OwnerReference::to(Kind::Deployment, &deployment.metadata));
    meta.labels = template.labels.clone();
    ReplicaSet::new(meta, replicas, template)
}

/// Split owned ReplicaSets into the one running template `hash` and the old ones.
///
/// Old ReplicaSets come back oldest first, which is the order they are
/// scaled down in.
pub fn split_replica_sets(hash: &str, owned: Vec<ReplicaSet>) -> (Option<ReplicaSet>, Vec<ReplicaSet>) {
    let (mut current, mut old): (Vec<_>, Vec<_>) = owned.into_iter().partition(|rs| {
        rs.metadata
            .labels
            .get(POD_TEMPLATE_HASH_LABEL)
            .is_some_and(|h| h == hash)
    });
    old.sort_by(|a, b| {
        a.metadata
            .creation_timestamp
            .cmp(&b.metadata.creation_timestamp)
            .then_with(|| a.metadata.name.cmp(&b.metadata.name))
    });
    // Names are derived from the hash, so there is at most one.
    (current.pop(), old)
}

/// Replica count the new ReplicaSet may grow to.
///
/// Never above `replicas`, and never so high that the Pods across all
/// ReplicaSets exceed `replicas + maxSurge`. An old ReplicaSet counts with
/// whichever is higher of its spec and the Pods it still reports, so Pods
/// awaiting deletion are not overtaken. A new ReplicaSet already above
/// `replicas` is brought down to it.
pub fn scale_up_target(deployment: &Deployment, new_replicas: u32, old: &[ReplicaSet]) -> u32 {
    let desired = deployment.spec.replicas;
    if new_replicas >= desired {
        return desired;
    }
    let old_total: u32 = old
        .iter()
        .map(|rs| rs.spec.replicas.max(rs.status.current_replicas))
        .sum();
    let total = new_replicas.saturating_add(old_total);
    let headroom = deployment.max_total().saturating_sub(total);
    new_replicas.saturating_add(headroom).min(desired)
}

/// New replica counts for old ReplicaSets, as `(index into old, replicas)`.
///
/// Pods an old ReplicaSet owns that are not ready can always go: they do not
/// count towards availability. Ready Pods are removed only while the ready
/// total across every ReplicaSet stays at or above `replicas -
/// maxUnavailable`, oldest ReplicaSet first.
pub fn scale_down_plan(deployment: &Deployment, new: Option<&ReplicaSet>, old: &[ReplicaSet]) -> Vec<(usize, u32)> {
    let ready_total: u32 = new
        .map(ReplicaSet::effective_ready)
        .into_iter()
        .chain(old.iter().map(ReplicaSet::effective_ready))
        .sum();
    let mut budget = ready_total.saturating_sub(deployment.min_available());

    let mut plan = Vec::new();
    for (index, rs) in old.iter().enumerate() {
        if rs.spec.replicas == 0 {
            continue;
        }
        let ready = rs.effective_ready();
        let unready = rs.spec.replicas - ready;
        let from_ready = ready.min(budget);
        budget -= from_ready;
        let reduction = unready + from_ready;
        if reduction > 0 {
            plan.push((index, rs.spec.replicas - reduction));
        }
    }
    plan
}

/// Drained old ReplicaSets beyond the revision history limit, newest kept.
///
/// A ReplicaSet counts as drained once its spec is 0 and its status, for
/// that spec, reports no live Pods.
pub fn replica_sets_to_prune(deployment: &Deployment, old: &[ReplicaSet]) -> Vec<ReplicaSet> {
    let mut drained: Vec<&ReplicaSet> = old
        .iter()
        .filter(|rs| {
            rs.spec.replicas == 0
                && rs.status.current_replicas == 0
                && rs.status.observed_generation >= rs.metadata.generation
        })
        .collect();
    drained.sort_by(|a, b| {
        b.metadata
            .creation_timestamp
            .cmp(&a.metadata.creation_timestamp)
            .then_with(|| b.metadata.name.cmp(&a.metadata.name))
    });
    let keep = usize::try_from(deployment.spec.revision_history_limit).unwrap_or(usize::MAX);
    drained.into_iter().skip(keep).cloned().collect()
}

/// Deployment status derived from its ReplicaSets.
pub fn deployment_status(deployment: &Deployment, new: Option<&ReplicaSet>, old: &[ReplicaSet]) -> DeploymentStatus {
    let all = || new.into_iter().chain(old.iter());
    let new_spec = new.map_or(0, |rs| rs.spec.replicas);
    let new_current = new.map_or(0, |rs| rs.status.current_replicas);
    let new_ready = new.map_or(0, ReplicaSet::effective_ready);
    let old_drained = old
        .iter()
        .all(|rs| rs.spec.replicas == 0 && rs.status.current_replicas == 0);

    let desired = deployment.spec.replicas;
    let phase = if old_drained && new_spec == desired && new_current == desired && new_ready == desired {
        RolloutPhase::Stable
    } else {
        RolloutPhase::RollingOut
    };

    DeploymentStatus {
        replicas: all().map(|rs| rs.spec.replicas).sum(),
        updated_replicas: new.map_or(0, |rs| rs.status.current_replicas),
        ready_replicas: all().map(|rs| rs.status.ready_replicas).sum(),
        available_replicas: all().map(ReplicaSet::effective_ready).sum(),
        observed_generation: deployment.metadata.generation,
        phase,
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
