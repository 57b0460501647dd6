//! ObjectStore trait
//!
//! This trait is the client API of the reconciliation core. Controllers only
//! ever talk to an `Arc<dyn ObjectStore>`, which lets tests swap in the
//! in-memory store directly or wrap it with fault injection.

use crate::error::StoreError;
use crate::watch::Watch;
use objects::{Kind, LabelSelector, Object};

/// Versioned object store operations
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
/// Writes are compare-and-swap on `resourceVersion`: `expected_version` must
/// equal the stored version, or be 0 for an object that does not exist yet.
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `object` and return it as stored (with its new version, uid and generation).
    async fn apply(&self, object: Object, expected_version: u64) -> Result<Object, StoreError>;

    /// Write `object` and return its new resource version.
    async fn put(&self, object: Object, expected_version: u64) -> Result<u64, StoreError> {
        self.apply(object, expected_version)
            .await
            .map(|stored| stored.meta().resource_version)
    }

    /// Read one object, `None` if absent.
    async fn get(&self, kind: Kind, namespace: &str, name: &str) -> Option<Object>;

    /// Delete one object and, recursively, everything it owns.
    async fn delete(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Objects of `kind` whose labels satisfy `selector`, in key order.
    /// `namespace: None` lists across all namespaces.
    async fn list(&self, kind: Kind, namespace: Option<&str>, selector: &LabelSelector) -> Vec<Object>;

    /// Objects of `kind` whose owner reference points at `owner_uid`.
    async fn list_owned(&self, kind: Kind, owner_uid: &str) -> Vec<Object>;

    /// Subscribe to change events for `kind`.
    fn subscribe(&self, kind: Kind) -> Watch;
}
