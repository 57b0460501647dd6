//! Typed object access
//!
//! `Api<K>` wraps an `Arc<dyn ObjectStore>` and exposes the operations for a
//! single kind, scoped to one namespace or to all of them.

use crate::error::StoreError;
use crate::store_trait::ObjectStore;
use crate::watch::Watch;
use objects::{DEFAULT_NAMESPACE, LabelSelector, Object, Resource};
use std::marker::PhantomData;
use std::sync::Arc;

/// Handle for reading and writing objects of kind `K`.
pub struct Api<K> {
    store: Arc<dyn ObjectStore>,
    namespace: Option<String>,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for Api<K> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            namespace: self.namespace.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: Resource> Api<K> {
    /// Api scoped to one namespace.
    pub fn namespaced(store: Arc<dyn ObjectStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: Some(namespace.into()),
            _kind: PhantomData,
        }
    }

    /// Api spanning every namespace. Single-object calls use the object's own
    /// namespace, or "default" when addressed by name only.
    pub fn all(store: Arc<dyn ObjectStore>) -> Self {
        Self {
            store,
            namespace: None,
            _kind: PhantomData,
        }
    }

    fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE)
    }

    fn scoped(&self, mut object: K) -> K {
        if let Some(namespace) = &self.namespace {
            object.meta_mut().namespace.clone_from(namespace);
        }
        object
    }

    fn typed(object: Object) -> Result<K, StoreError> {
        let found = object.kind();
        K::from_object(object).ok_or(StoreError::KindMismatch {
            expected: K::KIND,
            found,
        })
    }

    /// Read `name`, `None` if it does not exist.
    pub async fn get(&self, name: &str) -> Option<K> {
        self.store
            .get(K::KIND, self.namespace(), name)
            .await
            .and_then(K::from_object)
    }

    /// Objects matching `selector`, in name order.
    pub async fn list(&self, selector: &LabelSelector) -> Vec<K> {
        self.store
            .list(K::KIND, self.namespace.as_deref(), selector)
            .await
            .into_iter()
            .filter_map(K::from_object)
            .collect()
    }

    /// Objects controlled by the owner with `uid`.
    pub async fn list_owned_by(&self, uid: &str) -> Vec<K> {
        self.store
            .list_owned(K::KIND, uid)
            .await
            .into_iter()
            .filter_map(K::from_object)
            .collect()
    }

    /// Create a new object; fails with `Conflict` if the name is taken.
    pub async fn create(&self, object: K) -> Result<K, StoreError> {
        let object = self.scoped(object);
        let stored = self.store.apply(object.into_object(), 0).await?;
        Self::typed(stored)
    }

    /// Replace an existing object, conditional on the version it was read at.
    pub async fn replace(&self, object: K) -> Result<K, StoreError> {
        let object = self.scoped(object);
        let expected = object.meta().resource_version;
        let stored = self.store.apply(object.into_object(), expected).await?;
        Self::typed(stored)
    }

    /// Delete `name` (and its dependents) if it is still at `resource_version`.
    pub async fn delete(&self, name: &str, resource_version: u64) -> Result<(), StoreError> {
        self.store
            .delete(K::KIND, self.namespace(), name, resource_version)
            .await
    }

    /// Subscribe to changes of this kind. Events are not namespace filtered.
    #[must_use]
    pub fn watch(&self) -> Watch {
        self.store.subscribe(K::KIND)
    }
}
