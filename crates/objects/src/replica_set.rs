//! ReplicaSet object
//!
//! Keeps `spec.replicas` live Pods stamped from `spec.template`.

use crate::meta::ObjectMeta;
use crate::pod::PodTemplate;
use crate::selector::LabelSelector;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSetSpec {
    /// Desired number of live Pods
    pub replicas: u32,

    /// Must match `template.labels`
    #[serde(default)]
    pub selector: LabelSelector,

    pub template: PodTemplate,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSetStatus {
    /// Live Pods owned after the last reconciliation
    #[serde(default)]
    pub current_replicas: u32,

    /// Owned Pods in phase Running
    #[serde(default)]
    pub ready_replicas: u32,

    /// Generation the status was computed for
    #[serde(default)]
    pub observed_generation: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaSet {
    pub metadata: ObjectMeta,
    pub spec: ReplicaSetSpec,
    #[serde(default)]
    pub status: ReplicaSetStatus,
}

impl ReplicaSet {
    /// A ReplicaSet whose selector is exactly the template labels.
    #[must_use]
    pub fn new(metadata: ObjectMeta, replicas: u32, template: PodTemplate) -> Self {
        Self {
            metadata,
            spec: ReplicaSetSpec {
                replicas,
                selector: LabelSelector::from_labels(&template.labels),
                template,
            },
            status: ReplicaSetStatus::default(),
        }
    }

    /// Ready replicas, never counting more than `spec.replicas`.
    ///
    /// After a scale-down the status may still report Pods the ReplicaSet
    /// controller is about to delete; they must not be counted as available.
    #[must_use]
    pub fn effective_ready(&self) -> u32 {
        self.status.ready_replicas.min(self.spec.replicas)
    }
}
