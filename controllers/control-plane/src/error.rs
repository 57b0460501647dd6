//! Controller-specific error types.
//!
//! Library errors are wrapped via `#[from]`; the variants defined here cover
//! what only the binary can get wrong (configuration, manifests, watches).

use scheduler::SchedulerError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur in the control plane.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Object store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Seed manifest could not be read or parsed
    #[error("Invalid manifest: {0}")]
    Manifest(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Reconciliation failed
    #[error("Reconciliation failed: {0}")]
    Reconciliation(String),
}

impl ControllerError {
    /// Whether requeueing the key with backoff can make progress.
    ///
    /// Conflicts, vanished owners and full node pools resolve themselves; a
    /// rejected write would be rejected again until the object changes, and
    /// that change enqueues the key anyway.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ControllerError::Store(StoreError::InvalidSpec(_) | StoreError::KindMismatch { .. }) => false,
            ControllerError::Store(_) | ControllerError::Scheduler(_) | ControllerError::Reconciliation(_) => true,
            ControllerError::InvalidConfig(_) | ControllerError::Manifest(_) | ControllerError::Watch(_) => false,
        }
    }
}
