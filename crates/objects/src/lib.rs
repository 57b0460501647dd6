//! Reconciliation Core Object Model
//!
//! Desired-state objects managed by the control loop: `Deployment`,
//! `ReplicaSet` and `Pod`, plus the metadata, owner references, selectors,
//! validation rules and template hashing they share.

pub mod deployment;
pub mod hash;
pub mod meta;
pub mod object;
pub mod pod;
pub mod references;
pub mod replica_set;
pub mod selector;
pub mod validation;

pub use deployment::*;
pub use hash::*;
pub use meta::*;
pub use object::*;
pub use pod::*;
pub use references::*;
pub use replica_set::*;
pub use selector::*;
pub use validation::*;
