//! Scheduler errors

use thiserror::Error;

/// Errors returned by node selection and node pool management
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// No registered node can accept the Pod
    #[error("no schedulable node for pod {0}")]
    NoCapacity(String),

    /// The named node is not in the pool
    #[error("node {0} is not registered")]
    NodeNotFound(String),
}
