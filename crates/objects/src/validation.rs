//! Admission-time validation
//!
//! The store runs `validate` on every Put and rejects the write with
//! `InvalidSpec` before touching any state.

use crate::hash::{POD_NAME_SUFFIX_LEN, TEMPLATE_HASH_LEN};
use crate::meta::{Kind, ObjectMeta};
use crate::object::Object;
use thiserror::Error;

const MAX_NAME_LEN: usize = 253;

/// Length of `-<template hash>` appended to a Deployment name.
const REPLICA_SET_SUFFIX_LEN: usize = 1 + TEMPLATE_HASH_LEN;

/// Length of `-<random suffix>` appended to a ReplicaSet name.
const POD_SUFFIX_LEN: usize = 1 + POD_NAME_SUFFIX_LEN;

/// Reasons an object is rejected at submission time.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Name or namespace is not a DNS-1123 subdomain
    #[error("invalid {field} '{value}': must be lowercase alphanumerics or '-', start and end alphanumeric, at most 253 characters")]
    InvalidName { field: &'static str, value: String },

    /// Name leaves no room for the names derived from it
    #[error("{kind} name '{name}' is longer than {max} characters, leaving no room for the names of its dependents")]
    NameTooLong { kind: Kind, name: String, max: usize },

    /// Pod template or Pod has no container image
    #[error("containerImage must not be empty")]
    MissingImage,

    /// Rollout parameters that can never make progress
    #[error("maxSurge and maxUnavailable cannot both be 0 when replicas > 0")]
    StalledRollout,

    /// ReplicaSet selector does not select its own template
    #[error("selector does not match template labels")]
    SelectorMismatch,

    /// Owner reference of the wrong kind
    #[error("{kind} cannot be owned by {owner}")]
    InvalidOwner { kind: Kind, owner: Kind },
}

/// Check that `object` is acceptable for storage.
pub fn validate(object: &Object) -> Result<(), ValidationError> {
    validate_meta(object.kind(), object.meta())?;

    match object {
        Object::Deployment(deployment) => {
            if deployment.spec.template.spec.container_image.is_empty() {
                return Err(ValidationError::MissingImage);
            }
            if deployment.spec.replicas > 0
                && deployment.spec.max_surge == 0
                && deployment.spec.max_unavailable == 0
            {
                return Err(ValidationError::StalledRollout);
            }
        }
        Object::ReplicaSet(rs) => {
            if rs.spec.template.spec.container_image.is_empty() {
                return Err(ValidationError::MissingImage);
            }
            if !rs.spec.selector.matches(&rs.spec.template.labels) {
                return Err(ValidationError::SelectorMismatch);
            }
        }
        Object::Pod(pod) => {
            if pod.spec.container_image.is_empty() {
                return Err(ValidationError::MissingImage);
            }
        }
    }

    Ok(())
}

fn validate_meta(kind: Kind, meta: &ObjectMeta) -> Result<(), ValidationError> {
    if !is_dns1123_subdomain(&meta.name) {
        return Err(ValidationError::InvalidName {
            field: "name",
            value: meta.name.clone(),
        });
    }
    let max = max_name_len(kind);
    if meta.name.len() > max {
        return Err(ValidationError::NameTooLong {
            kind,
            name: meta.name.clone(),
            max,
        });
    }
    if !is_dns1123_subdomain(&meta.namespace) {
        return Err(ValidationError::InvalidName {
            field: "namespace",
            value: meta.namespace.clone(),
        });
    }
    if let Some(owner) = &meta.owner_reference {
        if kind.owner_kind() != Some(owner.kind) {
            return Err(ValidationError::InvalidOwner {
                kind,
                owner: owner.kind,
            });
        }
    }
    Ok(())
}

/// Longest name a `kind` may have so that every name derived from it
/// (`<deployment>-<hash>`, then `<replicaset>-<suffix>`) is still valid.
#[must_use]
pub fn max_name_len(kind: Kind) -> usize {
    match kind {
        Kind::Deployment => MAX_NAME_LEN - REPLICA_SET_SUFFIX_LEN - POD_SUFFIX_LEN,
        Kind::ReplicaSet => MAX_NAME_LEN - POD_SUFFIX_LEN,
        Kind::Pod => MAX_NAME_LEN,
    }
}

fn is_dns1123_subdomain(value: &str) -> bool {
    let valid_char = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
    let alnum = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    !value.is_empty()
        && value.len() <= MAX_NAME_LEN
        && value.chars().all(valid_char)
        && value.chars().next().is_some_and(alnum)
        && value.chars().last().is_some_and(alnum)
}
