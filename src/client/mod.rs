//! HTTP client for the cluster state API.
//!
//! Used by `cluster-cli` and the integration tests.

pub mod decoder;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::model::ErrorModel;

pub use decoder::DocumentDecoder;

/// Errors returned by `ClusterClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("stream ended inside a document ({0} bytes pending)")]
    Truncated(usize),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

/// Resource collections served by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Instances,
    Tasks,
}

impl Collection {
    pub fn path(self) -> &'static str {
        match self {
            Collection::Instances => "instances",
            Collection::Tasks => "tasks",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Stream of decoded change documents.
pub type DocumentStream = BoxStream<'static, Result<Value, ClientError>>;

pub struct ClusterClient {
    client: reqwest::Client,
    base_url: String,
}

impl ClusterClient {
    /// `base_url` includes the API prefix, e.g. `http://localhost:3000/v1`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Append path segments to the base url. Segments are percent-encoded, so
    /// ARNs containing `/` stay a single segment.
    fn url(&self, segments: &[&str]) -> Result<reqwest::Url, ClientError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{}: {}", self.base_url, err)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetch one resource by identifier.
    pub async fn get(&self, collection: Collection, id: &str) -> Result<Value, ClientError> {
        let url = self.url(&[collection.path(), id])?;
        let response = checked(self.client.get(url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Fetch every resource in a collection.
    pub async fn list(&self, collection: Collection) -> Result<Vec<Value>, ClientError> {
        self.query(collection, &[]).await
    }

    /// Fetch resources matching one dimension.
    pub async fn filter(
        &self,
        collection: Collection,
        dimension: &str,
        value: &str,
    ) -> Result<Vec<Value>, ClientError> {
        self.query(collection, &[(dimension, value)]).await
    }

    /// Fetch a collection with raw query parameters.
    pub async fn query(
        &self,
        collection: Collection,
        params: &[(&str, &str)],
    ) -> Result<Vec<Value>, ClientError> {
        let url = self.url(&[collection.path()])?;
        let response = checked(self.client.get(url).query(params).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Subscribe to a collection's change stream.
    pub async fn stream(&self, collection: Collection) -> Result<DocumentStream, ClientError> {
        let url = self.url(&[collection.path(), "stream"])?;
        let response = checked(self.client.get(url).send().await?).await?;

        let state = StreamState {
            chunks: response.bytes_stream().boxed(),
            decoder: DocumentDecoder::new(),
            ready: VecDeque::new(),
        };
        Ok(stream::try_unfold(state, next_document).boxed())
    }
}

struct StreamState {
    chunks: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: DocumentDecoder,
    ready: VecDeque<Value>,
}

async fn next_document(mut state: StreamState) -> Result<Option<(Value, StreamState)>, ClientError> {
    loop {
        if let Some(document) = state.ready.pop_front() {
            return Ok(Some((document, state)));
        }
        match state.chunks.next().await {
            Some(chunk) => state.ready.extend(state.decoder.push(&chunk?)?),
            None if state.decoder.pending() > 0 => {
                return Err(ClientError::Truncated(state.decoder.pending()))
            }
            None => return Ok(None),
        }
    }
}

/// Turn non-success responses into `ClientError::Status`.
async fn checked(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorModel>(&text)
        .map(|model| model.message)
        .unwrap_or(text);
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}
