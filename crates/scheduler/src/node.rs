//! Node registry entries

use serde::{Deserialize, Serialize};

/// A worker node that Pods can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    /// Cordoned nodes keep their Pods but receive no new ones
    pub schedulable: bool,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schedulable: true,
        }
    }
}
