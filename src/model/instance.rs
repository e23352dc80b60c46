//! Container instance wire model.

use serde::{Deserialize, Serialize};

use crate::model::{require, ModelError};
use crate::store::{ContainerInstance, ResourceAmount};

const RESOURCE: &str = "container instance";

/// Resource value types reported by the container agent.
const RESOURCE_TYPES: &[&str] = &["INTEGER", "LONG", "DOUBLE", "STRINGSET"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceModel {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerInstanceModel {
    /// Container instance ARN.
    pub id: String,
    pub cluster_arn: String,
    pub status: String,
    pub ec2_instance_id: String,
    pub agent_connected: bool,
    pub registered_resources: Vec<ResourceModel>,
    pub remaining_resources: Vec<ResourceModel>,
    pub version: u64,
}

impl TryFrom<&ResourceAmount> for ResourceModel {
    type Error = ModelError;

    fn try_from(amount: &ResourceAmount) -> Result<Self, Self::Error> {
        let name = require(RESOURCE, "resource name", &amount.name)?;
        if !RESOURCE_TYPES.contains(&amount.kind.as_str()) {
            return Err(ModelError::InvalidField {
                resource: RESOURCE,
                field: "resource type",
                reason: format!("unknown type '{}' for resource '{}'", amount.kind, name),
            });
        }
        if matches!(amount.kind.as_str(), "INTEGER" | "LONG") && amount.value.parse::<i64>().is_err() {
            return Err(ModelError::InvalidField {
                resource: RESOURCE,
                field: "resource value",
                reason: format!("'{}' is not an integer for resource '{}'", amount.value, name),
            });
        }

        Ok(Self {
            name,
            kind: amount.kind.clone(),
            value: amount.value.clone(),
        })
    }
}

impl TryFrom<&ContainerInstance> for ContainerInstanceModel {
    type Error = ModelError;

    fn try_from(instance: &ContainerInstance) -> Result<Self, Self::Error> {
        Ok(Self {
            id: require(RESOURCE, "arn", &instance.arn)?,
            cluster_arn: require(RESOURCE, "cluster arn", &instance.cluster_arn)?,
            status: require(RESOURCE, "status", &instance.status)?,
            ec2_instance_id: instance.ec2_instance_id.clone(),
            agent_connected: instance.agent_connected,
            registered_resources: instance
                .registered_resources
                .iter()
                .map(ResourceModel::try_from)
                .collect::<Result<_, _>>()?,
            remaining_resources: instance
                .remaining_resources
                .iter()
                .map(ResourceModel::try_from)
                .collect::<Result<_, _>>()?,
            version: instance.version,
        })
    }
}
