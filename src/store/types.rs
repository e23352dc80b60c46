//! Resource records held by the store.
//!
//! Records are the store's own view of cluster state, derived from
//! orchestration events. The API layer reads them and converts them to wire
//! models, it never mutates them.

use serde::{Deserialize, Serialize};

use crate::model::{ContainerInstanceModel, ModelError, TaskModel};
use crate::store::Resource;

/// Filter dimension on the resource's status.
pub const STATUS_DIMENSION: &str = "status";
/// Filter dimension on the owning cluster ARN.
pub const CLUSTER_DIMENSION: &str = "cluster";

/// A named resource amount reported by the container agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAmount {
    pub name: String,
    /// Value type, e.g. `INTEGER` or `STRINGSET`.
    pub kind: String,
    pub value: String,
}

/// A container instance registered with a cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInstance {
    pub arn: String,
    pub cluster_arn: String,
    pub status: String,
    #[serde(default)]
    pub ec2_instance_id: String,
    #[serde(default)]
    pub agent_connected: bool,
    #[serde(default)]
    pub registered_resources: Vec<ResourceAmount>,
    #[serde(default)]
    pub remaining_resources: Vec<ResourceAmount>,
    /// Monotonic version of the record as reported by the event source.
    #[serde(default)]
    pub version: u64,
}

/// A container belonging to a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub container_arn: String,
    pub last_status: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// A task placed on a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub arn: String,
    pub cluster_arn: String,
    #[serde(default)]
    pub container_instance_arn: String,
    #[serde(default)]
    pub task_definition_arn: String,
    pub last_status: String,
    #[serde(default)]
    pub desired_status: String,
    #[serde(default)]
    pub started_by: Option<String>,
    #[serde(default)]
    pub containers: Vec<Container>,
    #[serde(default)]
    pub version: u64,
}

impl Resource for ContainerInstance {
    type Model = ContainerInstanceModel;

    const KIND: &'static str = "instance";
    const COLLECTION: &'static str = "instances";
    const DIMENSIONS: &'static [&'static str] = &[STATUS_DIMENSION, CLUSTER_DIMENSION];

    fn id(&self) -> &str {
        &self.arn
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            STATUS_DIMENSION => Some(&self.status),
            CLUSTER_DIMENSION => Some(&self.cluster_arn),
            _ => None,
        }
    }

    fn to_model(&self) -> Result<Self::Model, ModelError> {
        ContainerInstanceModel::try_from(self)
    }
}

impl Resource for Task {
    type Model = TaskModel;

    const KIND: &'static str = "task";
    const COLLECTION: &'static str = "tasks";
    const DIMENSIONS: &'static [&'static str] = &[STATUS_DIMENSION];

    fn id(&self) -> &str {
        &self.arn
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn dimension(&self, name: &str) -> Option<&str> {
        match name {
            STATUS_DIMENSION => Some(&self.last_status),
            _ => None,
        }
    }

    fn to_model(&self) -> Result<Self::Model, ModelError> {
        TaskModel::try_from(self)
    }
}
