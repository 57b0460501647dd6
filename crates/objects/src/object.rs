//! Generic object envelope
//!
//! The store deals in `Object`, a tagged union over the three kinds.
//! Controllers work with the typed structs through the `Resource` trait.

use crate::deployment::Deployment;
use crate::meta::{Kind, ObjectKey, ObjectMeta};
use crate::pod::Pod;
use crate::replica_set::ReplicaSet;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Any stored object, tagged by `kind` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind")]
pub enum Object {
    /// A Deployment
    Deployment(Deployment),
    /// A ReplicaSet
    ReplicaSet(ReplicaSet),
    /// A Pod
    Pod(Pod),
}

impl Object {
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Object::Deployment(_) => Kind::Deployment,
            Object::ReplicaSet(_) => Kind::ReplicaSet,
            Object::Pod(_) => Kind::Pod,
        }
    }

    #[must_use]
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            Object::Deployment(d) => &d.metadata,
            Object::ReplicaSet(rs) => &rs.metadata,
            Object::Pod(p) => &p.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            Object::Deployment(d) => &mut d.metadata,
            Object::ReplicaSet(rs) => &mut rs.metadata,
            Object::Pod(p) => &mut p.metadata,
        }
    }

    #[must_use]
    pub fn key(&self) -> ObjectKey {
        let meta = self.meta();
        ObjectKey::new(self.kind(), meta.namespace.clone(), meta.name.clone())
    }

    /// Whether both objects are of the same kind with equal specs.
    ///
    /// The store bumps `generation` when this is false for an update.
    #[must_use]
    pub fn same_spec(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Deployment(a), Object::Deployment(b)) => a.spec == b.spec,
            (Object::ReplicaSet(a), Object::ReplicaSet(b)) => a.spec == b.spec,
            (Object::Pod(a), Object::Pod(b)) => a.spec == b.spec,
            _ => false,
        }
    }
}

/// Typed access to one kind of object.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Kind stored in the envelope.
    const KIND: Kind;

    fn meta(&self) -> &ObjectMeta;

    fn meta_mut(&mut self) -> &mut ObjectMeta;

    /// Wrap into the envelope.
    fn into_object(self) -> Object;

    /// Unwrap from the envelope, `None` if the kind differs.
    fn from_object(object: Object) -> Option<Self>;

    /// Store key of this object.
    fn key(&self) -> ObjectKey {
        let meta = self.meta();
        ObjectKey::new(Self::KIND, meta.namespace.clone(), meta.name.clone())
    }
}

macro_rules! impl_resource {
    ($ty:ident) => {
        impl Resource for $ty {
            const KIND: Kind = Kind::$ty;

            fn meta(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }

            fn into_object(self) -> Object {
                Object::$ty(self)
            }

            fn from_object(object: Object) -> Option<Self> {
                match object {
                    Object::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Object {
            fn from(value: $ty) -> Self {
                Object::$ty(value)
            }
        }
    };
}

impl_resource!(Deployment);
impl_resource!(ReplicaSet);
impl_resource!(Pod);
