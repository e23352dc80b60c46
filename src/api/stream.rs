//! Change stream handler.
//!
//! # State Machine
//! ```text
//! Idle → Subscribed → Emitting → Completed | Failed
//! ```
//! - Idle → Subscribed: a child cancellation token is created and handed to
//!   the store. A failed subscription is answered with a normal error
//!   response and never commits a 200.
//! - Subscribed → Emitting: the 200 head is committed before the first item
//!   is read. From here on failures can only be reported in the body.
//! - Each record becomes one JSON document in its own body chunk, written as
//!   soon as it arrives.
//! - An error item ends the stream with a final error document; nothing after
//!   it is read.
//!
//! The subscription token is cancelled when the body is dropped, whichever
//! way emitting ends.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{stream, Stream, StreamExt};
use std::convert::Infallible;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::api::error::ApiError;
use crate::config::ClientErrorStatus;
use crate::http::response::{encode_document, CONTENT_TYPE_JSON};
use crate::observability::metrics;
use crate::store::{ChangeStream, Resource, ResourceStore};

const CONNECTION_KEEP_ALIVE: &str = "Keep-Alive";
const TRANSFER_ENCODING_CHUNKED: &str = "chunked";

/// Long-lived change feed for one resource type.
pub struct StreamHandler<R, S> {
    store: Arc<S>,
    policy: ClientErrorStatus,
    /// Parent of every subscription token; cancelled on server shutdown.
    shutdown: CancellationToken,
    _resource: PhantomData<fn() -> R>,
}

impl<R, S> Clone for StreamHandler<R, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            shutdown: self.shutdown.clone(),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource, S: ResourceStore<R>> StreamHandler<R, S> {
    pub fn new(store: Arc<S>, policy: ClientErrorStatus, shutdown: CancellationToken) -> Self {
        Self {
            store,
            policy,
            shutdown,
            _resource: PhantomData,
        }
    }

    /// Open a subscription and build the streaming response.
    pub async fn subscribe(&self) -> Response {
        let started = Instant::now();
        let scope = self.shutdown.child_token();

        let changes = match self.store.stream_changes(scope.clone()).await {
            Ok(changes) => changes,
            Err(err) => {
                scope.cancel();
                let response = ApiError::from_store(err, R::KIND).into_response_with(self.policy);
                metrics::record_request(R::KIND, "stream", response.status().as_u16(), started);
                return response;
            }
        };

        tracing::info!(kind = R::KIND, "Change stream opened");
        metrics::record_request(R::KIND, "stream", StatusCode::OK.as_u16(), started);

        let body = Body::from_stream(documents(changes, scope.drop_guard(), self.policy));
        (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON)),
                (header::CONNECTION, HeaderValue::from_static(CONNECTION_KEEP_ALIVE)),
                (
                    header::TRANSFER_ENCODING,
                    HeaderValue::from_static(TRANSFER_ENCODING_CHUNKED),
                ),
            ],
            body,
        )
            .into_response()
    }
}

/// `GET /{collection}/stream`
pub async fn stream_resources<R, S>(State(handler): State<StreamHandler<R, S>>) -> Response
where
    R: Resource,
    S: ResourceStore<R>,
{
    handler.subscribe().await
}

/// How an emitting stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Emitting,
    Completed,
    Failed,
}

/// Owns the subscription while the body is being written.
struct Emitter<R> {
    kind: &'static str,
    changes: ChangeStream<R>,
    policy: ClientErrorStatus,
    delivered: u64,
    outcome: Outcome,
    _scope: DropGuard,
}

impl<R> Drop for Emitter<R> {
    fn drop(&mut self) {
        metrics::stream_closed(self.kind, self.outcome.label());
        tracing::info!(
            kind = self.kind,
            delivered = self.delivered,
            outcome = self.outcome.label(),
            "Change stream closed"
        );
    }
}

impl Outcome {
    fn label(self) -> &'static str {
        match self {
            // Dropped mid-stream, the client went away or the server shut down.
            Outcome::Emitting => "disconnected",
            Outcome::Completed => "completed",
            Outcome::Failed => "failed",
        }
    }
}

/// Turn a change stream into body chunks, one JSON document per chunk.
///
/// Dropping the returned stream drops `scope`, cancelling the subscription.
fn documents<R: Resource>(
    changes: ChangeStream<R>,
    scope: DropGuard,
    policy: ClientErrorStatus,
) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    metrics::stream_opened(R::KIND);
    let emitter = Emitter {
        kind: R::KIND,
        changes,
        policy,
        delivered: 0,
        outcome: Outcome::Emitting,
        _scope: scope,
    };

    stream::unfold(Some(emitter), |state| async move {
        let mut emitter = state?;
        let item = match emitter.changes.next().await {
            Some(item) => item,
            None => {
                emitter.outcome = Outcome::Completed;
                return None;
            }
        };

        let encoded = item
            .map_err(|err| ApiError::from_store(err, R::KIND))
            .and_then(|record| Ok(record.to_model()?))
            .and_then(|model| Ok(encode_document(&model)?));

        match encoded {
            Ok(document) => {
                emitter.delivered += 1;
                metrics::record_stream_item(R::KIND);
                Some((Ok::<_, Infallible>(document), Some(emitter)))
            }
            Err(err) => {
                emitter.outcome = Outcome::Failed;
                let policy = emitter.policy;
                // Ends the subscription before the error document is written.
                drop(emitter);
                err.into_document(policy)
                    .map(|document| (Ok::<_, Infallible>(document), None))
            }
        }
    })
}
