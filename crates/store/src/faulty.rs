//! Fault-injecting store for unit testing
//!
//! Wraps another store and makes the next N writes fail with `Conflict`, as
//! if a concurrent writer had bumped the version in between read and write.

use crate::error::StoreError;
use crate::store_trait::ObjectStore;
use crate::watch::Watch;
use objects::{Kind, LabelSelector, Object, ObjectKey};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store wrapper that injects write conflicts.
#[derive(Clone)]
pub struct FaultInjectingStore {
    inner: Arc<dyn ObjectStore>,
    conflicts: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl fmt::Debug for FaultInjectingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultInjectingStore")
            .field("pending_conflicts", &self.conflicts.load(Ordering::SeqCst))
            .field("writes", &self.writes.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl FaultInjectingStore {
    /// Wrap `inner`; writes pass through until `fail_next_writes` is called.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Self {
        Self {
            inner,
            conflicts: Arc::new(AtomicUsize::new(0)),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fail the next `count` writes (apply or delete) with `Conflict`.
    pub fn fail_next_writes(&self, count: usize) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    /// Number of writes attempted so far, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn inject(&self, key: ObjectKey, expected: u64) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::Conflict {
                key,
                expected,
                actual: expected + 1,
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ObjectStore for FaultInjectingStore {
    async fn apply(&self, object: Object, expected_version: u64) -> Result<Object, StoreError> {
        self.inject(object.key(), expected_version)?;
        self.inner.apply(object, expected_version).await
    }

    async fn get(&self, kind: Kind, namespace: &str, name: &str) -> Option<Object> {
        self.inner.get(kind, namespace, name).await
    }

    async fn delete(
        &self,
        kind: Kind,
        namespace: &str,
        name: &str,
        expected_version: u64,
    ) -> Result<(), StoreError> {
        self.inject(ObjectKey::new(kind, namespace, name), expected_version)?;
        self.inner.delete(kind, namespace, name, expected_version).await
    }

    async fn list(&self, kind: Kind, namespace: Option<&str>, selector: &LabelSelector) -> Vec<Object> {
        self.inner.list(kind, namespace, selector).await
    }

    async fn list_owned(&self, kind: Kind, owner_uid: &str) -> Vec<Object> {
        self.inner.list_owned(kind, owner_uid).await
    }

    fn subscribe(&self, kind: Kind) -> Watch {
        self.inner.subscribe(kind)
    }
}
