//! Pod Scheduler
//!
//! Assigns pending Pods to the registered node with the fewest live Pods.
//! Ties go to the lexicographically lowest node name; a Pod that cannot be
//! placed anywhere is reported as `NoCapacity` and stays pending.

pub mod error;
pub mod node;
pub mod scheduler;

pub use error::SchedulerError;
pub use node::Node;
pub use scheduler::Scheduler;
