//! Wire models served by the API.
//!
//! Store records are converted into these types before serialization.
//! Conversion validates the record, so a malformed record surfaces as a
//! `ModelError` instead of a half-populated document.

pub mod error;
pub mod instance;
pub mod task;

use thiserror::Error;

pub use error::ErrorModel;
pub use instance::{ContainerInstanceModel, ResourceModel};
pub use task::{ContainerModel, TaskModel};

/// Errors converting a store record into its wire model.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("{resource} is missing required field '{field}'")]
    MissingField {
        resource: &'static str,
        field: &'static str,
    },

    #[error("{resource} field '{field}' is invalid: {reason}")]
    InvalidField {
        resource: &'static str,
        field: &'static str,
        reason: String,
    },
}

pub(crate) fn require(
    resource: &'static str,
    field: &'static str,
    value: &str,
) -> Result<String, ModelError> {
    if value.is_empty() {
        return Err(ModelError::MissingField { resource, field });
    }
    Ok(value.to_string())
}
