//! Object store errors

use objects::{Kind, ObjectKey, ValidationError};
use thiserror::Error;

/// Errors that can occur when reading or writing the object store
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The caller's observed resource version is stale
    #[error("conflict on {key}: expected version {expected}, stored version {actual}")]
    Conflict {
        key: ObjectKey,
        expected: u64,
        actual: u64,
    },

    /// Object (or the owner it references) does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Object rejected at submission time
    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] ValidationError),

    /// Typed access found an object of another kind
    #[error("expected {expected}, found {found}")]
    KindMismatch { expected: Kind, found: Kind },
}

impl StoreError {
    /// Conflicts are always safe to retry after re-reading.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }

    /// The object or its owner vanished: nothing left to do.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
