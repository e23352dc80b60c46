//! API error classification.
//!
//! Every failure a handler detects becomes an `ApiError` with an explicit
//! kind. The kind, together with the configured client-error policy, picks
//! the status line; the status and message are then written through
//! `http::response::error_response` so the two cannot diverge.

use axum::http::StatusCode;
use axum::response::Response;
use std::fmt;
use thiserror::Error;

use crate::config::ClientErrorStatus;
use crate::http::response::{error_document, error_response};
use crate::model::ModelError;
use crate::store::{BoxError, DomainErrorKind, StoreError};

/// Message sent for store and state failures. Details go to the log only.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal server error";
/// Message sent when a response could not be encoded.
pub const ENCODING_ERROR_MESSAGE: &str = "failed to encode response";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Missing identifier, zero or several filter dimensions.
    ClientInput,
    /// The store has no record for the identifier.
    NotFound,
    /// The store reported inconsistent orchestration state.
    InvalidState,
    /// Any other store failure.
    StoreFailure,
    /// Model conversion or serialization failed.
    EncodingFailure,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ApiErrorKind::ClientInput => "client_input",
            ApiErrorKind::NotFound => "not_found",
            ApiErrorKind::InvalidState => "invalid_state",
            ApiErrorKind::StoreFailure => "store_failure",
            ApiErrorKind::EncodingFailure => "encoding_failure",
        };
        f.write_str(name)
    }
}

/// A classified request failure.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self {
            kind,
            message: message.into(),
            source,
        }
    }

    pub fn client_input(detail: impl fmt::Display) -> Self {
        Self::new(
            ApiErrorKind::ClientInput,
            format!("invalid request: {}", detail),
            None,
        )
    }

    /// `"<kind> not found"`, e.g. `"instance not found"`.
    pub fn not_found(resource_kind: &str) -> Self {
        Self::new(
            ApiErrorKind::NotFound,
            format!("{} not found", resource_kind),
            None,
        )
    }

    pub fn encoding(source: impl Into<BoxError>) -> Self {
        Self::new(
            ApiErrorKind::EncodingFailure,
            ENCODING_ERROR_MESSAGE,
            Some(source.into()),
        )
    }

    /// Classify a store failure by its domain kind, if any.
    pub fn from_store(err: StoreError, resource_kind: &str) -> Self {
        match err.domain_kind() {
            Some(DomainErrorKind::BadRequest) => {
                let message = format!("invalid request: {}", err);
                Self::new(ApiErrorKind::ClientInput, message, Some(err.into()))
            }
            Some(DomainErrorKind::NotFound) => {
                let message = format!("{} not found", resource_kind);
                Self::new(ApiErrorKind::NotFound, message, Some(err.into()))
            }
            Some(DomainErrorKind::UnexpectedState) => Self::new(
                ApiErrorKind::InvalidState,
                INTERNAL_ERROR_MESSAGE,
                Some(err.into()),
            ),
            None => Self::new(
                ApiErrorKind::StoreFailure,
                INTERNAL_ERROR_MESSAGE,
                Some(err.into()),
            ),
        }
    }

    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    /// Client-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Status line for this error under the given client-error policy.
    pub fn status(&self, policy: ClientErrorStatus) -> StatusCode {
        match self.kind {
            ApiErrorKind::ClientInput => match policy {
                ClientErrorStatus::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                ClientErrorStatus::BadRequest => StatusCode::BAD_REQUEST,
            },
            ApiErrorKind::NotFound => StatusCode::NOT_FOUND,
            ApiErrorKind::InvalidState
            | ApiErrorKind::StoreFailure
            | ApiErrorKind::EncodingFailure => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Log the failure and write it as a complete error response.
    pub fn into_response_with(self, policy: ClientErrorStatus) -> Response {
        let status = self.status(policy);
        self.log(status);
        error_response(status, &self.message)
    }

    /// Log the failure and encode it as a bare document for a body whose
    /// status line has already been sent.
    pub fn into_document(self, policy: ClientErrorStatus) -> Option<bytes::Bytes> {
        let status = self.status(policy);
        self.log(status);
        error_document(status, &self.message)
    }

    fn log(&self, status: StatusCode) {
        let cause = self
            .source
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match self.kind {
            ApiErrorKind::ClientInput | ApiErrorKind::NotFound => tracing::warn!(
                kind = %self.kind,
                status = status.as_u16(),
                cause = %cause,
                "{}",
                self.message
            ),
            _ => tracing::error!(
                kind = %self.kind,
                status = status.as_u16(),
                cause = %cause,
                "{}",
                self.message
            ),
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::encoding(err)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::encoding(err)
    }
}
