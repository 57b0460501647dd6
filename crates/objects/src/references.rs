//! Owner references
//!
//! An owner reference is a foreign key from a dependent object to the object
//! that controls it. The store indexes them by `uid` to find dependents for
//! cascading deletion; controllers use them to find the objects they own.

use crate::meta::{Kind, ObjectKey, ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reference from a dependent object to its controlling owner.
///
/// The owner always lives in the same namespace as the dependent, so only
/// `kind`, `name` and `uid` are recorded. Matching is done on `uid`: a
/// re-created owner with the same name does not adopt old dependents.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    /// Kind of the owner (e.g., "Deployment", "ReplicaSet")
    pub kind: Kind,

    /// Name of the owner
    pub name: String,

    /// Uid of the owner incarnation
    pub uid: String,
}

impl OwnerReference {
    /// Create a new reference.
    pub fn new(kind: Kind, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            uid: uid.into(),
        }
    }

    /// Reference pointing at the object described by `kind` and `meta`.
    #[must_use]
    pub fn to(kind: Kind, meta: &ObjectMeta) -> Self {
        Self::new(kind, meta.name.clone(), meta.uid.clone())
    }

    /// Store key of the owner, given the dependent's namespace.
    #[must_use]
    pub fn key(&self, namespace: &str) -> ObjectKey {
        ObjectKey::new(self.kind, namespace, self.name.clone())
    }
}
