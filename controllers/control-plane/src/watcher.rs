//! Store watchers.
//!
//! One task per kind follows the watch bus and turns events into work-queue
//! keys. Events about dependents are routed to their owner's queue, so a
//! Pod change reconciles its ReplicaSet and a ReplicaSet change reconciles
//! its Deployment. A `Resync` event, and the periodic resync timer, enqueue
//! every object of every kind.

use crate::error::ControllerError;
use crate::queue::WorkQueue;
use objects::{Kind, LabelSelector, Object, ObjectKey};
use std::sync::Arc;
use store::{ObjectStore, WatchEvent};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Work queues fed by the watchers.
#[derive(Debug, Clone)]
pub struct Queues {
    pub deployments: Arc<WorkQueue<ObjectKey>>,
    pub replica_sets: Arc<WorkQueue<ObjectKey>>,
    pub scheduling: Arc<WorkQueue<ObjectKey>>,
}

impl Queues {
    pub fn shutdown(&self) {
        self.deployments.shutdown();
        self.replica_sets.shutdown();
        self.scheduling.shutdown();
    }
}

/// Watches the store for changes.
pub struct Watcher {
    store: Arc<dyn ObjectStore>,
    namespace: Option<String>,
    queues: Queues,
}

impl Watcher {
    pub fn new(store: Arc<dyn ObjectStore>, namespace: Option<String>, queues: Queues) -> Self {
        Self {
            store,
            namespace,
            queues,
        }
    }

    /// Follow `kind` until shutdown is signalled.
    ///
    /// The subscription is taken before the initial list, so nothing that
    /// happens in between is missed.
    pub async fn watch_kind(&self, kind: Kind, mut shutdown: watch::Receiver<bool>) -> Result<(), ControllerError> {
        info!("Starting {} watcher", kind);
        let mut events = self.store.subscribe(kind);
        self.enqueue_kind(kind).await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Stopping {} watcher", kind);
                        return Ok(());
                    }
                }
                event = events.recv() => match event {
                    Some(WatchEvent::Resync) => {
                        warn!("{} watch lost events, resyncing everything", kind);
                        self.resync().await;
                    }
                    Some(event) => self.route(&event),
                    None => {
                        return Err(ControllerError::Watch(format!("{kind} watch stream closed")));
                    }
                },
            }
        }
    }

    /// Enqueue every object of every kind.
    pub async fn resync(&self) {
        for kind in Kind::ALL {
            self.enqueue_kind(kind).await;
        }
    }

    async fn enqueue_kind(&self, kind: Kind) {
        let objects = self
            .store
            .list(kind, self.namespace.as_deref(), &LabelSelector::everything())
            .await;
        debug!("Enqueueing {} {} objects", objects.len(), kind);
        for object in &objects {
            self.enqueue(object, true);
        }
    }

    /// Route one event to the queues that care about it.
    pub fn route(&self, event: &WatchEvent) {
        let Some(object) = event.object() else {
            return;
        };
        let live = !matches!(event, WatchEvent::Deleted(_));
        self.enqueue(object, live);
    }

    fn enqueue(&self, object: &Object, live: bool) {
        let meta = object.meta();
        if self.namespace.as_deref().is_some_and(|ns| ns != meta.namespace) {
            return;
        }

        let owner = meta
            .owner_reference
            .as_ref()
            .map(|owner| owner.key(&meta.namespace));
        match object {
            Object::Deployment(_) => self.queues.deployments.add(object.key()),
            Object::ReplicaSet(_) => {
                self.queues.replica_sets.add(object.key());
                if let Some(owner) = owner {
                    self.queues.deployments.add(owner);
                }
            }
            Object::Pod(pod) => {
                if let Some(owner) = owner {
                    self.queues.replica_sets.add(owner);
                }
                if live && pod.is_unscheduled() {
                    self.queues.scheduling.add(object.key());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deployment, queues};
    use objects::{ObjectMeta, OwnerReference, Pod, PodPhase, PodTemplate};
    use store::InMemoryStore;

    fn drain(queue: &WorkQueue<ObjectKey>) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(key) = queue_pop(queue) {
            names.push(key.name);
        }
        names
    }

    fn queue_pop(queue: &WorkQueue<ObjectKey>) -> Option<ObjectKey> {
        if queue.is_empty() {
            return None;
        }
        let key = futures::executor::block_on(queue.get())?;
        queue.done(&key);
        Some(key)
    }

    fn pod(namespace: &str, name: &str, owner: Option<&str>) -> Pod {
        let mut meta = ObjectMeta::new(namespace, name);
        if let Some(owner) = owner {
            meta = meta.with_owner(OwnerReference::new(Kind::ReplicaSet, owner, "uid"));
        }
        Pod::from_template(meta, &PodTemplate::new("nginx:1.25"))
    }

    #[test]
    fn test_pod_events_route_to_owner_and_scheduler() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
        let queues = queues();
        let watcher = Watcher::new(store, None, queues.clone());

        watcher.route(&WatchEvent::Added(pod("default", "web-1-aaaaa", Some("web-1")).into()));
        assert_eq!(drain(&queues.replica_sets), vec!["web-1"]);
        assert_eq!(drain(&queues.scheduling), vec!["web-1-aaaaa"]);

        let mut running = pod("default", "web-1-bbbbb", Some("web-1"));
        running.status.phase = PodPhase::Running;
        running.status.node_name = Some("node-1".to_string());
        watcher.route(&WatchEvent::Modified(running.into()));
        assert_eq!(drain(&queues.replica_sets), vec!["web-1"]);
        assert!(queues.scheduling.is_empty());

        watcher.route(&WatchEvent::Deleted(pod("default", "web-1-ccccc", Some("web-1")).into()));
        assert_eq!(drain(&queues.replica_sets), vec!["web-1"]);
        assert!(queues.scheduling.is_empty());
    }

    #[test]
    fn test_replica_set_events_route_to_owner() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
        let queues = queues();
        let watcher = Watcher::new(store, None, queues.clone());

        let d = deployment("web", 3, "nginx:1.25");
        let mut rs = objects::ReplicaSet::new(
            ObjectMeta::new("default", "web-abc").with_owner(OwnerReference::new(Kind::Deployment, "web", "uid")),
            3,
            d.spec.template.clone(),
        );
        rs.status.ready_replicas = 1;
        watcher.route(&WatchEvent::Modified(rs.into()));
        assert_eq!(drain(&queues.replica_sets), vec!["web-abc"]);
        assert_eq!(drain(&queues.deployments), vec!["web"]);
    }

    #[test]
    fn test_other_namespaces_are_ignored() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
        let queues = queues();
        let watcher = Watcher::new(store, Some("prod".to_string()), queues.clone());

        watcher.route(&WatchEvent::Added(deployment("web", 1, "nginx:1.25").into()));
        assert!(queues.deployments.is_empty());

        let mut d = deployment("web", 1, "nginx:1.25");
        d.metadata.namespace = "prod".to_string();
        watcher.route(&WatchEvent::Added(d.into()));
        assert_eq!(drain(&queues.deployments), vec!["web"]);
    }

    #[tokio::test]
    async fn test_resync_enqueues_everything() {
        let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::default());
        store.apply(deployment("a", 1, "nginx:1.25").into(), 0).await.unwrap();
        store.apply(deployment("b", 1, "nginx:1.25").into(), 0).await.unwrap();
        store.apply(pod("default", "loose", None).into(), 0).await.unwrap();

        let queues = queues();
        let watcher = Watcher::new(store, None, queues.clone());
        watcher.resync().await;
        assert_eq!(queues.deployments.len(), 2);
        assert_eq!(queues.scheduling.len(), 1);
        assert!(queues.replica_sets.is_empty());
    }
}
