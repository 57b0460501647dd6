//! Pod object
//!
//! The smallest unit the control loop manages. Pods are created by their
//! owning ReplicaSet, placed by the scheduler and driven through their
//! lifecycle by the node agent, which writes `status.phase` back.

use crate::meta::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequests {
    /// CPU in millicores
    #[serde(default)]
    pub cpu_millis: u64,

    /// Memory in mebibytes
    #[serde(default)]
    pub memory_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    /// Container image to run
    pub container_image: String,

    #[serde(default)]
    pub resource_requests: ResourceRequests,
}

/// Template from which ReplicaSets stamp out Pods.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplate {
    /// Labels copied onto every Pod created from this template
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    pub spec: PodSpec,
}

impl PodTemplate {
    /// Template running `image` with no labels and no resource requests.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            labels: BTreeMap::new(),
            spec: PodSpec {
                container_image: image.into(),
                resource_requests: ResourceRequests::default(),
            },
        }
    }

    /// Builder-style label insertion.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
/// Pod lifecycle phase
#[serde(rename_all = "PascalCase")]
pub enum PodPhase {
    /// Created, not yet placed on a node
    #[default]
    Pending,

    /// Assigned to a node, not yet started
    Scheduled,

    /// Running on its node
    Running,

    /// Terminated with an error
    Failed,

    /// Terminated successfully
    Succeeded,
}

impl PodPhase {
    /// Failed and Succeeded Pods are never resurrected.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, PodPhase::Failed | PodPhase::Succeeded)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub phase: PodPhase,

    /// Node the Pod is bound to (None until scheduled)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,

    /// Container restarts reported by the node agent
    #[serde(default)]
    pub restart_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pod {
    pub metadata: ObjectMeta,
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

impl Pod {
    /// A new Pending Pod built from `template`.
    #[must_use]
    pub fn from_template(metadata: ObjectMeta, template: &PodTemplate) -> Self {
        let mut metadata = metadata;
        metadata
            .labels
            .extend(template.labels.iter().map(|(k, v)| (k.clone(), v.clone())));
        Self {
            metadata,
            spec: template.spec.clone(),
            status: PodStatus::default(),
        }
    }

    /// Not in a terminal phase.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.status.phase.is_terminal()
    }

    /// Counted towards a ReplicaSet's `readyReplicas`.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status.phase == PodPhase::Running
    }

    /// Pending and not yet bound to a node.
    #[must_use]
    pub fn is_unscheduled(&self) -> bool {
        self.status.phase == PodPhase::Pending && self.status.node_name.is_none()
    }
}
