//! Task wire model.

use serde::{Deserialize, Serialize};

use crate::model::{require, ModelError};
use crate::store::{Container, Task};

const RESOURCE: &str = "task";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerModel {
    pub name: String,
    pub container_arn: String,
    pub last_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskModel {
    /// Task ARN.
    pub id: String,
    pub cluster_arn: String,
    pub container_instance_arn: String,
    pub task_definition_arn: String,
    pub last_status: String,
    pub desired_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_by: Option<String>,
    pub containers: Vec<ContainerModel>,
    pub version: u64,
}

impl TryFrom<&Container> for ContainerModel {
    type Error = ModelError;

    fn try_from(container: &Container) -> Result<Self, Self::Error> {
        Ok(Self {
            name: require(RESOURCE, "container name", &container.name)?,
            container_arn: container.container_arn.clone(),
            last_status: container.last_status.clone(),
            exit_code: container.exit_code,
            reason: container.reason.clone(),
        })
    }
}

impl TryFrom<&Task> for TaskModel {
    type Error = ModelError;

    fn try_from(task: &Task) -> Result<Self, Self::Error> {
        Ok(Self {
            id: require(RESOURCE, "arn", &task.arn)?,
            cluster_arn: require(RESOURCE, "cluster arn", &task.cluster_arn)?,
            container_instance_arn: task.container_instance_arn.clone(),
            task_definition_arn: task.task_definition_arn.clone(),
            last_status: require(RESOURCE, "last status", &task.last_status)?,
            desired_status: task.desired_status.clone(),
            started_by: task.started_by.clone(),
            containers: task
                .containers
                .iter()
                .map(ContainerModel::try_from)
                .collect::<Result<_, _>>()?,
            version: task.version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_model_omits_absent_optionals() {
        let task = Task {
            arn: "t-1".into(),
            cluster_arn: "c-1".into(),
            container_instance_arn: "ci-1".into(),
            task_definition_arn: "td-1".into(),
            last_status: "STOPPED".into(),
            desired_status: "STOPPED".into(),
            started_by: None,
            containers: vec![Container {
                name: "web".into(),
                container_arn: "c/web".into(),
                last_status: "STOPPED".into(),
                exit_code: Some(137),
                reason: None,
            }],
            version: 3,
        };

        let json = serde_json::to_value(TaskModel::try_from(&task).unwrap()).unwrap();
        assert_eq!(json["lastStatus"], "STOPPED");
        assert!(json.get("startedBy").is_none());
        assert_eq!(json["containers"][0]["exitCode"], 137);
        assert!(json["containers"][0].get("reason").is_none());
    }

    #[test]
    fn test_unnamed_container_is_rejected() {
        let task = Task {
            arn: "t-1".into(),
            cluster_arn: "c-1".into(),
            container_instance_arn: String::new(),
            task_definition_arn: String::new(),
            last_status: "RUNNING".into(),
            desired_status: "RUNNING".into(),
            started_by: Some("ecs-svc/1".into()),
            containers: vec![Container {
                name: String::new(),
                container_arn: "c/anon".into(),
                last_status: "RUNNING".into(),
                exit_code: None,
                reason: None,
            }],
            version: 1,
        };
        assert!(TaskModel::try_from(&task).is_err());
    }
}
