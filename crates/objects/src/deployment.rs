//! Deployment object
//!
//! Declares a pod template and a replica count. The Deployment controller
//! realises it through one ReplicaSet per distinct template and rolls
//! between them when the template changes.

use crate::meta::ObjectMeta;
use crate::pod::PodTemplate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Old ReplicaSets kept for rollback when the spec does not say otherwise.
pub const DEFAULT_REVISION_HISTORY_LIMIT: u32 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentSpec {
    pub template: PodTemplate,

    /// Desired number of Pods
    pub replicas: u32,

    /// Pods allowed above `replicas` during a rollout
    #[serde(default = "default_max_surge")]
    pub max_surge: u32,

    /// Pods allowed to be unavailable below `replicas` during a rollout
    #[serde(default)]
    pub max_unavailable: u32,

    /// Drained old ReplicaSets retained for rollback
    #[serde(default = "default_revision_history_limit")]
    pub revision_history_limit: u32,
}

fn default_max_surge() -> u32 {
    1
}

fn default_revision_history_limit() -> u32 {
    DEFAULT_REVISION_HISTORY_LIMIT
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
/// Rollout state of a Deployment
#[serde(rename_all = "PascalCase")]
pub enum RolloutPhase {
    /// One active ReplicaSet at the desired size, all Pods ready
    #[default]
    Stable,

    /// Scaling, or old and new ReplicaSets coexist
    RollingOut,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Replicas requested across all owned ReplicaSets
    #[serde(default)]
    pub replicas: u32,

    /// Live Pods of the ReplicaSet matching the current template
    #[serde(default)]
    pub updated_replicas: u32,

    /// Running Pods across all owned ReplicaSets
    #[serde(default)]
    pub ready_replicas: u32,

    /// Ready Pods counted towards the availability floor
    #[serde(default)]
    pub available_replicas: u32,

    /// Generation the status was computed for
    #[serde(default)]
    pub observed_generation: u64,

    #[serde(default)]
    pub phase: RolloutPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub metadata: ObjectMeta,
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
}

impl Deployment {
    /// A Deployment with default rollout parameters (maxSurge 1, maxUnavailable 0).
    #[must_use]
    pub fn new(metadata: ObjectMeta, replicas: u32, template: PodTemplate) -> Self {
        Self {
            metadata,
            spec: DeploymentSpec {
                template,
                replicas,
                max_surge: default_max_surge(),
                max_unavailable: 0,
                revision_history_limit: DEFAULT_REVISION_HISTORY_LIMIT,
            },
            status: DeploymentStatus::default(),
        }
    }

    /// Lowest number of ready Pods a rollout may leave behind.
    #[must_use]
    pub fn min_available(&self) -> u32 {
        self.spec.replicas.saturating_sub(self.spec.max_unavailable)
    }

    /// Highest number of Pods (across all ReplicaSets) a rollout may request.
    #[must_use]
    pub fn max_total(&self) -> u32 {
        self.spec.replicas.saturating_add(self.spec.max_surge)
    }
}
