//! Initial store contents loaded from a JSON snapshot.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::store::{ContainerInstance, MemoryStore, Task};

/// Error type for seed loading.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse seed file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Snapshot of cluster state used to populate the memory stores.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub instances: Vec<ContainerInstance>,
    pub tasks: Vec<Task>,
}

impl Snapshot {
    /// Read a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Apply every record to the stores. Returns the number of instances and
    /// tasks accepted.
    pub fn apply(
        self,
        instances: &MemoryStore<ContainerInstance>,
        tasks: &MemoryStore<Task>,
    ) -> (usize, usize) {
        let applied_instances = self
            .instances
            .into_iter()
            .filter(|record| instances.upsert(record.clone()))
            .count();
        let applied_tasks = self
            .tasks
            .into_iter()
            .filter(|record| tasks.upsert(record.clone()))
            .count();

        tracing::info!(
            instances = applied_instances,
            tasks = applied_tasks,
            "Seeded stores from snapshot"
        );
        (applied_instances, applied_tasks)
    }
}
