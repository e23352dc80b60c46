use serde::{Deserialize, Serialize};

/// Error document written for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorModel {
    /// HTTP status code the failure maps to.
    pub code: u16,
    pub message: String,
}

impl ErrorModel {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
