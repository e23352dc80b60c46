//! Response encoding.
//!
//! # Responsibilities
//! - Serialize wire models into JSON responses
//! - Build error documents and their status line from one `StatusCode`
//! - Encode individual documents for streamed bodies
//!
//! # Design Decisions
//! - Content type is fixed to JSON; there is no negotiation
//! - The error document's `code` is always the status it is sent with
//! - A failure to encode an error document is logged and absorbed

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Serialize;

use crate::model::ErrorModel;

/// Content type of every JSON body the API writes.
pub const CONTENT_TYPE_JSON: &str = "application/json; charset=UTF-8";

/// Serialize `value` into a response with the given status.
pub fn json_response<T: Serialize + ?Sized>(
    status: StatusCode,
    value: &T,
) -> Result<Response, serde_json::Error> {
    let body = encode_document(value)?;
    Ok(with_json_body(status, body))
}

/// Write an error document and its status line.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    match error_document(status, message) {
        Some(body) => with_json_body(status, body),
        None => status.into_response(),
    }
}

/// Encode one JSON document.
pub fn encode_document<T: Serialize + ?Sized>(value: &T) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(value).map(Bytes::from)
}

/// Encode an error document, `None` if encoding itself failed.
pub fn error_document(status: StatusCode, message: &str) -> Option<Bytes> {
    let model = ErrorModel::new(status.as_u16(), message);
    match encode_document(&model) {
        Ok(body) => Some(body),
        Err(err) => {
            tracing::error!(error = %err, status = %status, "Failed to encode error document");
            None
        }
    }
}

fn with_json_body(status: StatusCode, body: Bytes) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
        body,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_error_response_code_matches_status() {
        let response = error_response(StatusCode::NOT_FOUND, "instance not found");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json; charset=UTF-8"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let model: ErrorModel = serde_json::from_slice(&body).unwrap();
        assert_eq!(model, ErrorModel::new(404, "instance not found"));
    }

    #[tokio::test]
    async fn test_json_response_array() {
        let response = json_response(StatusCode::OK, &Vec::<u32>::new()).unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"[]");
    }
}
