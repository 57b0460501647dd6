//! Object store behaviour through the public API

use objects::{
    Deployment, Kind, LabelSelector, Object, ObjectMeta, OwnerReference, Pod, PodTemplate,
    ReplicaSet, Resource, ValidationError,
};
use std::sync::Arc;
use store::{Api, InMemoryStore, ObjectStore, StoreError, WatchEvent};

fn template() -> PodTemplate {
    PodTemplate::new("nginx:1.25").with_label("app", "web")
}

fn deployment(name: &str) -> Deployment {
    Deployment::new(ObjectMeta::new("default", name), 3, template())
}

fn replica_set(name: &str, owner: &Deployment) -> ReplicaSet {
    ReplicaSet::new(
        ObjectMeta::new("default", name).with_owner(OwnerReference::to(Kind::Deployment, &owner.metadata)),
        2,
        template(),
    )
}

fn pod(name: &str, owner: &ReplicaSet) -> Pod {
    Pod::from_template(
        ObjectMeta::new("default", name).with_owner(OwnerReference::to(Kind::ReplicaSet, &owner.metadata)),
        &template(),
    )
}

fn setup() -> (Arc<InMemoryStore>, Arc<dyn ObjectStore>) {
    let store = Arc::new(InMemoryStore::new(16));
    let dyn_store: Arc<dyn ObjectStore> = store.clone();
    (store, dyn_store)
}

#[tokio::test]
async fn test_create_assigns_identity() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    let stored = deployments.create(deployment("web")).await.unwrap();
    assert_eq!(stored.metadata.resource_version, 1);
    assert_eq!(stored.metadata.generation, 1);
    assert!(!stored.metadata.uid.is_empty());
    assert!(stored.metadata.creation_timestamp.is_some());

    let read = deployments.get("web").await.unwrap();
    assert_eq!(read, stored);
}

#[tokio::test]
async fn test_create_twice_conflicts() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    deployments.create(deployment("web")).await.unwrap();
    let err = deployments.create(deployment("web")).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_stale_put_conflicts_without_mutation() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store.clone(), "default");

    let v1 = deployments.create(deployment("web")).await.unwrap();
    let mut winner = v1.clone();
    winner.spec.replicas = 5;
    let v2 = deployments.replace(winner).await.unwrap();
    assert_eq!(v2.metadata.resource_version, 2);

    let mut loser = v1;
    loser.spec.replicas = 1;
    let err = store
        .put(loser.into_object(), 1)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        StoreError::Conflict {
            key: v2.key(),
            expected: 1,
            actual: 2
        }
    );

    let current = deployments.get("web").await.unwrap();
    assert_eq!(current.spec.replicas, 5);
    assert_eq!(current.metadata.resource_version, 2);
}

#[tokio::test]
async fn test_put_returns_new_version() {
    let (_, store) = setup();
    let version = store.put(deployment("web").into(), 0).await.unwrap();
    assert_eq!(version, 1);

    let current = store.get(Kind::Deployment, "default", "web").await.unwrap();
    let version = store.put(current, 1).await.unwrap();
    assert_eq!(version, 2);
}

#[tokio::test]
async fn test_generation_tracks_spec_changes_only() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    let mut d = deployments.create(deployment("web")).await.unwrap();
    d.status.ready_replicas = 3;
    let d = deployments.replace(d).await.unwrap();
    assert_eq!(d.metadata.generation, 1);
    assert_eq!(d.metadata.resource_version, 2);

    let mut d = d;
    d.spec.template.spec.container_image = "nginx:1.26".to_string();
    let d = deployments.replace(d).await.unwrap();
    assert_eq!(d.metadata.generation, 2);
    assert_eq!(d.metadata.resource_version, 3);
}

#[tokio::test]
async fn test_invalid_spec_is_rejected() {
    let (store, dyn_store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(dyn_store, "default");

    let mut d = deployment("web");
    d.spec.template.spec.container_image.clear();
    let err = deployments.create(d).await.unwrap_err();
    assert_eq!(err, StoreError::InvalidSpec(ValidationError::MissingImage));
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_delete_requires_current_version() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    let d = deployments.create(deployment("web")).await.unwrap();
    assert!(deployments.delete("web", 7).await.unwrap_err().is_conflict());
    assert!(deployments.get("web").await.is_some());

    deployments.delete("web", d.metadata.resource_version).await.unwrap();
    assert!(deployments.get("web").await.is_none());
    assert!(deployments.delete("web", 1).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_cascades_to_dependents() {
    let (store, dyn_store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(dyn_store.clone(), "default");
    let replica_sets: Api<ReplicaSet> = Api::namespaced(dyn_store.clone(), "default");
    let pods: Api<Pod> = Api::namespaced(dyn_store, "default");

    let d = deployments.create(deployment("web")).await.unwrap();
    let rs = replica_sets.create(replica_set("web-1", &d)).await.unwrap();
    pods.create(pod("web-1-aaaaa", &rs)).await.unwrap();
    pods.create(pod("web-1-bbbbb", &rs)).await.unwrap();
    deployments.create(deployment("other")).await.unwrap();
    assert_eq!(store.len(), 5);

    deployments.delete("web", d.metadata.resource_version).await.unwrap();
    assert_eq!(store.len(), 1);
    assert!(replica_sets.get("web-1").await.is_none());
    assert!(pods.list(&LabelSelector::everything()).await.is_empty());
}

#[tokio::test]
async fn test_owner_must_exist() {
    let (_, store) = setup();
    let replica_sets: Api<ReplicaSet> = Api::namespaced(store.clone(), "default");
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    let mut ghost = deployment("web");
    ghost.metadata.uid = "missing".to_string();
    let err = replica_sets.create(replica_set("web-1", &ghost)).await.unwrap_err();
    assert!(err.is_not_found());

    // Re-created owner under the same name is a different incarnation.
    let first = deployments.create(deployment("web")).await.unwrap();
    deployments.delete("web", first.metadata.resource_version).await.unwrap();
    deployments.create(deployment("web")).await.unwrap();
    let err = replica_sets.create(replica_set("web-1", &first)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_write_with_previous_uid_conflicts() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");

    let first = deployments.create(deployment("web")).await.unwrap();
    deployments.delete("web", 1).await.unwrap();
    deployments.create(deployment("web")).await.unwrap();

    // Same version number, but it was read from the deleted incarnation.
    let err = deployments.replace(first).await.unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_list_filters_by_selector_and_namespace() {
    let (_, store) = setup();
    let all: Api<Pod> = Api::all(store.clone());
    let default_ns: Api<Pod> = Api::namespaced(store.clone(), "default");
    let other_ns: Api<Pod> = Api::namespaced(store, "other");

    for (name, app) in [("b", "web"), ("a", "web"), ("c", "api")] {
        let p = Pod::from_template(ObjectMeta::new("default", name), &PodTemplate::new("img").with_label("app", app));
        default_ns.create(p).await.unwrap();
    }
    let p = Pod::from_template(ObjectMeta::new("x", "a"), &PodTemplate::new("img").with_label("app", "web"));
    other_ns.create(p).await.unwrap();

    let web = LabelSelector::everything().with("app", "web");
    let names: Vec<_> = default_ns
        .list(&web)
        .await
        .into_iter()
        .map(|p| p.metadata.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    assert_eq!(all.list(&web).await.len(), 3);
    assert_eq!(all.list(&LabelSelector::everything()).await.len(), 4);
    assert_eq!(other_ns.list(&web).await[0].metadata.namespace, "other");
}

#[tokio::test]
async fn test_list_owned_uses_owner_uid() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store.clone(), "default");
    let replica_sets: Api<ReplicaSet> = Api::namespaced(store, "default");

    let web = deployments.create(deployment("web")).await.unwrap();
    let api = deployments.create(deployment("api")).await.unwrap();
    replica_sets.create(replica_set("web-1", &web)).await.unwrap();
    replica_sets.create(replica_set("web-2", &web)).await.unwrap();
    replica_sets.create(replica_set("api-1", &api)).await.unwrap();

    let owned = replica_sets.list_owned_by(&web.metadata.uid).await;
    let names: Vec<_> = owned.iter().map(|rs| rs.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["web-1", "web-2"]);
    assert!(replica_sets.list_owned_by("nobody").await.is_empty());
}

#[tokio::test]
async fn test_watch_delivers_events_in_order() {
    let (_, store) = setup();
    let deployments: Api<Deployment> = Api::namespaced(store, "default");
    let mut first = deployments.watch();
    let mut second = deployments.watch();

    let d = deployments.create(deployment("web")).await.unwrap();
    let mut d2 = d.clone();
    d2.spec.replicas = 4;
    let d2 = deployments.replace(d2).await.unwrap();
    deployments.delete("web", d2.metadata.resource_version).await.unwrap();

    for watch in [&mut first, &mut second] {
        let versions: Vec<_> = [watch.recv().await, watch.recv().await, watch.recv().await]
            .into_iter()
            .map(|event| match event.unwrap() {
                WatchEvent::Added(o) => ("added", o.meta().resource_version),
                WatchEvent::Modified(o) => ("modified", o.meta().resource_version),
                WatchEvent::Deleted(o) => ("deleted", o.meta().resource_version),
                WatchEvent::Resync => ("resync", 0),
            })
            .collect();
        assert_eq!(versions, vec![("added", 1), ("modified", 2), ("deleted", 2)]);
    }
}

#[tokio::test]
async fn test_watch_only_sees_its_kind() {
    let (_, store) = setup();
    let mut pods = store.subscribe(Kind::Pod);

    store.apply(deployment("web").into(), 0).await.unwrap();
    assert!(pods.try_recv().is_none());
}

#[tokio::test]
async fn test_slow_watcher_gets_resync() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::new(2));
    let mut watch = store.subscribe(Kind::Deployment);

    for name in ["a", "b", "c", "d", "e"] {
        store.apply(deployment(name).into(), 0).await.unwrap();
    }

    assert_eq!(watch.recv().await, Some(WatchEvent::Resync));
    // The newest events are retained after the drop.
    let names: Vec<_> = [watch.recv().await, watch.recv().await]
        .into_iter()
        .filter_map(|e| e.and_then(|e| e.object().map(|o: &Object| o.meta().name.clone())))
        .collect();
    assert_eq!(names, vec!["d", "e"]);
    assert!(watch.try_recv().is_none());
}
