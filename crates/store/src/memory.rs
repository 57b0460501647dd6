//! In-memory object store
//!
//! All state lives behind a single mutex, which makes every Put and Delete
//! atomic with respect to its version check. Events are published before
//! the lock is released, so watchers observe writes in commit order.

use crate::error::StoreError;
use crate::store_trait::ObjectStore;
use crate::watch::{Watch, WatchBus, WatchEvent};
use chrono::Utc;
use objects::{Kind, LabelSelector, Object, ObjectKey, OwnerReference, validate};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeMap<ObjectKey, Object>,
    /// uid -> key of the live incarnation
    uids: HashMap<String, ObjectKey>,
    /// owner uid -> keys of its dependents
    dependents: HashMap<String, BTreeSet<ObjectKey>>,
}

impl StoreState {
    fn index_owner(&mut self, owner: Option<&OwnerReference>, key: &ObjectKey) {
        if let Some(owner) = owner {
            self.dependents
                .entry(owner.uid.clone())
                .or_default()
                .insert(key.clone());
        }
    }

    fn unindex_owner(&mut self, owner: Option<&OwnerReference>, key: &ObjectKey) {
        if let Some(owner) = owner {
            if let Some(keys) = self.dependents.get_mut(&owner.uid) {
                keys.remove(key);
                if keys.is_empty() {
                    self.dependents.remove(&owner.uid);
                }
            }
        }
    }

    /// The owner must be stored, of the referenced kind and name, in the same namespace.
    fn owner_exists(&self, owner: &OwnerReference, namespace: &str) -> bool {
        self.uids
            .get(&owner.uid)
            .is_some_and(|key| *key == owner.key(namespace))
    }
}

/// Versioned in-memory store with an owner index and a watch bus.
#[derive(Debug)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    bus: WatchBus,
}

impl InMemoryStore {
    /// Create an empty store whose watchers buffer `watch_buffer` events each.
    #[must_use]
    pub fn new(watch_buffer: usize) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            bus: WatchBus::new(watch_buffer),
        }
    }

    /// Number of stored objects across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().objects.len()
    }

    /// Whether the store holds no objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().objects.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        // A panic while holding the lock cannot leave a half-applied write:
        // every mutation is applied after all checks pass.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_locked(
        &self,
        state: &mut StoreState,
        mut object: Object,
        expected_version: u64,
    ) -> Result<Object, StoreError> {
        validate(&object)?;
        let key = object.key();

        let event = match state.objects.get(&key) {
            None => {
                if expected_version != 0 {
                    return Err(StoreError::Conflict {
                        key,
                        expected: expected_version,
                        actual: 0,
                    });
                }
                if let Some(owner) = &object.meta().owner_reference {
                    if !state.owner_exists(owner, &key.namespace) {
                        return Err(StoreError::NotFound(format!(
                            "owner {} of {}",
                            owner.key(&key.namespace),
                            key
                        )));
                    }
                }

                let meta = object.meta_mut();
                meta.uid = uuid::Uuid::new_v4().to_string();
                meta.resource_version = 1;
                meta.generation = 1;
                meta.creation_timestamp = Some(Utc::now());

                state.uids.insert(meta.uid.clone(), key.clone());
                state.index_owner(meta.owner_reference.as_ref(), &key);
                WatchEvent::Added(object.clone())
            }
            Some(current) => {
                let current_meta = current.meta().clone();
                let actual = current_meta.resource_version;
                if expected_version != actual {
                    return Err(StoreError::Conflict {
                        key,
                        expected: expected_version,
                        actual,
                    });
                }
                // A write carrying the uid of a previous incarnation is stale too.
                let uid = &object.meta().uid;
                if !uid.is_empty() && *uid != current_meta.uid {
                    return Err(StoreError::Conflict {
                        key,
                        expected: expected_version,
                        actual,
                    });
                }
                let owner_changed = object.meta().owner_reference != current_meta.owner_reference;
                if owner_changed {
                    if let Some(owner) = &object.meta().owner_reference {
                        if !state.owner_exists(owner, &key.namespace) {
                            return Err(StoreError::NotFound(format!(
                                "owner {} of {}",
                                owner.key(&key.namespace),
                                key
                            )));
                        }
                    }
                }
                let generation = if object.same_spec(current) {
                    current_meta.generation
                } else {
                    current_meta.generation + 1
                };

                let meta = object.meta_mut();
                meta.uid = current_meta.uid.clone();
                meta.creation_timestamp = current_meta.creation_timestamp;
                meta.resource_version = actual + 1;
                meta.generation = generation;

                if owner_changed {
                    state.unindex_owner(current_meta.owner_reference.as_ref(), &key);
                    state.index_owner(object.meta().owner_reference.as_ref(), &key);
                }
                WatchEvent::Modified(object.clone())
            }
        };

        debug!(
            "Stored {} at version {}",
            key,
            object.meta().resource_version
        );
        state.objects.insert(key, object.clone());
        self.bus.publish(event);
        Ok(object)
    }

    /// Remove `key` and everything it transitively owns, publishing one event per object.
    fn remove_cascading(&self, state: &mut StoreState, key: &ObjectKey) -> usize {
        let Some(object) = state.objects.remove(key) else {
            return 0;
        };
        let meta = object.meta();
        state.uids.remove(&meta.uid);
        state.unindex_owner(meta.owner_reference.as_ref(), key);
        let dependents = state.dependents.remove(&meta.uid).unwrap_or_default();

        debug!("Deleted {}", key);
        self.bus.publish(WatchEvent::Deleted(object));

        let mut removed = 1;
        for dependent in &dependents {
            removed += self.remove_cascading(state, dependent);
        }
        removed
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(crate::watch::DEFAULT_WATCH_BUFFER)
    }
}

#[async_trait::async_trait]
impl ObjectStore for InMemoryStore {
    async fn apply(&self, object: Object, expected_version: u64) -> Result<Object, StoreError> {
        let mut state = self.lock();
        self.apply_locked(&mut state, object, expected_version)
    }

    async fn get(&self, kind: Kind, namespace: &str, name: &str) -> Option<Object> {
        self.lock()
            .objects
            .get(&ObjectKey::new(kind, namespace, name))
            .cloned()
    }

    async fn delete(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let key = ObjectKey::new(kind, namespace, name);
        let mut state = self.lock();
        let actual = match state.objects.get(&key) {
            Some(object) => object.meta().resource_version,
            None => return Err(StoreError::NotFound(key.to_string())),
        };
        if actual != expected_version {
            return Err(StoreError::Conflict {
                key,
                expected: expected_version,
                actual,
            });
        }

        let removed = self.remove_cascading(&mut state, &key);
        if removed > 1 {
            debug!("Deleting {} cascaded to {} dependents", key, removed - 1);
        }
        Ok(())
    }

    async fn list(&self, kind: Kind, namespace: Option<&str>, selector: &LabelSelector) -> Vec<Object> {
        self.lock()
            .objects
            .iter()
            .filter(|(key, _)| key.kind == kind)
            .filter(|(key, _)| namespace.is_none_or(|ns| key.namespace == ns))
            .filter(|(_, object)| selector.matches(&object.meta().labels))
            .map(|(_, object)| object.clone())
            .collect()
    }

    async fn list_owned(&self, kind: Kind, owner_uid: &str) -> Vec<Object> {
        let state = self.lock();
        state
            .dependents
            .get(owner_uid)
            .into_iter()
            .flatten()
            .filter(|key| key.kind == kind)
            .filter_map(|key| state.objects.get(key).cloned())
            .collect()
    }

    fn subscribe(&self, kind: Kind) -> Watch {
        self.bus.subscribe(kind)
    }
}
