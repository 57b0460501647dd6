//! Object identity and metadata
//!
//! Every stored object is addressed by `Kind` + namespace + name and carries
//! an `ObjectMeta` with the bookkeeping the store maintains on its behalf.

use crate::references::OwnerReference;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Namespace used when an object does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// The kinds of object the store holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Kind {
    /// Declarative rollout of a pod template
    Deployment,
    /// Fixed-size set of identical Pods
    ReplicaSet,
    /// A single scheduled unit of work
    Pod,
}

impl Kind {
    /// All kinds, in owner-to-dependent order.
    pub const ALL: [Kind; 3] = [Kind::Deployment, Kind::ReplicaSet, Kind::Pod];

    /// The kind allowed to own objects of this kind, if any.
    #[must_use]
    pub fn owner_kind(self) -> Option<Kind> {
        match self {
            Kind::Deployment => None,
            Kind::ReplicaSet => Some(Kind::Deployment),
            Kind::Pod => Some(Kind::ReplicaSet),
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Deployment => "Deployment",
            Kind::ReplicaSet => "ReplicaSet",
            Kind::Pod => "Pod",
        };
        f.write_str(s)
    }
}

/// Store key of an object: kind + namespace + name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: Kind,
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    /// Create a key.
    pub fn new(kind: Kind, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Metadata common to all objects.
///
/// `uid`, `resource_version`, `generation` and `creation_timestamp` are owned
/// by the store: whatever a client puts there is overwritten on write.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Object name, unique per kind and namespace
    pub name: String,

    /// Namespace (defaults to "default")
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Unique id of this incarnation of the object
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,

    /// Incremented on every mutation; 0 means "never stored"
    #[serde(default)]
    pub resource_version: u64,

    /// Incremented whenever the spec changes
    #[serde(default)]
    pub generation: u64,

    /// Labels used by selectors
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Controlling object, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_reference: Option<OwnerReference>,

    /// Set by the store when the object is first created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl ObjectMeta {
    /// Metadata for a new object in `namespace`.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            ..Default::default()
        }
    }

    /// Builder-style label insertion.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Builder-style owner assignment.
    #[must_use]
    pub fn with_owner(mut self, owner: OwnerReference) -> Self {
        self.owner_reference = Some(owner);
        self
    }

    /// True if this object is controlled by the object with `uid`.
    #[must_use]
    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_reference
            .as_ref()
            .is_some_and(|owner| owner.uid == uid)
    }
}
