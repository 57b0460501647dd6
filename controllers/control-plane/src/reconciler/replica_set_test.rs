//! ReplicaSet reconciliation scenarios

use crate::reconciler::Action;
use crate::reconciler::replica_set::TERMINAL_POD_HISTORY;
use crate::test_utils::{Harness, NAMESPACE};
use objects::{ObjectMeta, PodPhase, PodTemplate, ReplicaSet};
use std::sync::Arc;
use store::{FaultInjectingStore, InMemoryStore, ObjectStore};

fn replica_set(name: &str, replicas: u32) -> ReplicaSet {
    ReplicaSet::new(
        ObjectMeta::new(NAMESPACE, name),
        replicas,
        PodTemplate::new("nginx:1.25").with_label("app", "web"),
    )
}

async fn resize(h: &Harness, name: &str, replicas: u32) {
    let mut rs = h.replica_sets().get(name).await.unwrap();
    rs.spec.replicas = replicas;
    h.replica_sets().replace(rs).await.unwrap();
}

#[tokio::test]
async fn test_creates_missing_pods() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 3)).await.unwrap();

    let action = h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();
    assert_eq!(action, Action::AwaitChange);

    let rs = h.replica_sets().get("web").await.unwrap();
    let pods = h.all_pods().await;
    assert_eq!(pods.len(), 3);
    for pod in &pods {
        assert!(pod.metadata.name.starts_with("web-"));
        assert!(pod.metadata.is_owned_by(&rs.metadata.uid));
        assert_eq!(pod.metadata.labels.get("app").map(String::as_str), Some("web"));
        assert_eq!(pod.status.phase, PodPhase::Pending);
        assert_eq!(pod.spec.container_image, "nginx:1.25");
    }
    assert_eq!(rs.status.current_replicas, 3);
    assert_eq!(rs.status.ready_replicas, 0);
    assert_eq!(rs.status.observed_generation, rs.metadata.generation);
}

#[tokio::test]
async fn test_scale_down_deletes_pod_that_is_not_running() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 3)).await.unwrap();
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    let pods = h.all_pods().await;
    h.set_phase(&pods[0].metadata.name, PodPhase::Running).await;
    h.set_phase(&pods[2].metadata.name, PodPhase::Running).await;
    let pending = pods[1].metadata.name.clone();

    resize(&h, "web", 2).await;
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    let remaining: Vec<_> = h.all_pods().await.into_iter().map(|p| p.metadata.name).collect();
    assert_eq!(remaining.len(), 2);
    assert!(!remaining.contains(&pending));

    let rs = h.replica_sets().get("web").await.unwrap();
    assert_eq!(rs.status.current_replicas, 2);
    assert_eq!(rs.status.ready_replicas, 2);
}

#[tokio::test]
async fn test_scale_down_prefers_most_restarted_running_pod() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 3)).await.unwrap();
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    let pods = h.all_pods().await;
    for pod in &pods {
        h.set_phase(&pod.metadata.name, PodPhase::Running).await;
    }
    let mut flaky = h.pods().get(&pods[2].metadata.name).await.unwrap();
    flaky.status.restart_count = 3;
    h.pods().replace(flaky).await.unwrap();

    resize(&h, "web", 2).await;
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    assert!(h.pods().get(&pods[2].metadata.name).await.is_none());
    assert_eq!(h.live_pods().await.len(), 2);
}

#[tokio::test]
async fn test_terminal_pods_are_replaced_not_revived() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 2)).await.unwrap();
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    let failed = h.all_pods().await[0].metadata.name.clone();
    h.set_phase(&failed, PodPhase::Failed).await;
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    assert_eq!(h.all_pods().await.len(), 3);
    assert_eq!(h.live_pods().await.len(), 2);
    let failed = h.pods().get(&failed).await.unwrap();
    assert_eq!(failed.status.phase, PodPhase::Failed);
}

#[tokio::test]
async fn test_second_pass_is_a_no_op() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 2)).await.unwrap();
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();
    let before = h.replica_sets().get("web").await.unwrap();
    let pods_before = h.all_pods().await;

    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    assert_eq!(h.replica_sets().get("web").await.unwrap(), before);
    assert_eq!(h.all_pods().await, pods_before);
}

#[tokio::test]
async fn test_missing_replica_set_is_nothing_to_do() {
    let h = Harness::new();
    let action = h.reconciler.reconcile_replica_set(NAMESPACE, "ghost").await.unwrap();
    assert_eq!(action, Action::AwaitChange);
    assert!(h.all_pods().await.is_empty());
}

#[tokio::test]
async fn test_conflict_is_retryable_and_next_pass_converges() {
    let inner: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
    let faulty = FaultInjectingStore::new(inner);
    let h = Harness::with_store(Arc::new(faulty.clone()));
    h.replica_sets().create(replica_set("web", 2)).await.unwrap();

    faulty.fail_next_writes(1);
    let err = h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(h.all_pods().await.is_empty());

    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();
    assert_eq!(h.live_pods().await.len(), 2);
}

#[tokio::test]
async fn test_crash_looping_pods_do_not_pile_up() {
    let h = Harness::new();
    h.replica_sets().create(replica_set("web", 1)).await.unwrap();
    h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();

    for _ in 0..6 {
        let live = h.live_pods().await;
        assert_eq!(live.len(), 1);
        h.set_phase(&live[0].metadata.name, PodPhase::Failed).await;
        h.reconciler.reconcile_replica_set(NAMESPACE, "web").await.unwrap();
    }

    let pods = h.all_pods().await;
    let failed = pods.iter().filter(|p| p.status.phase == PodPhase::Failed).count();
    assert_eq!(failed, TERMINAL_POD_HISTORY);
    assert_eq!(h.live_pods().await.len(), 1);
    assert_eq!(pods.len(), TERMINAL_POD_HISTORY + 1);
}
