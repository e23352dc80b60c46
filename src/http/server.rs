//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the resource API under the configured prefix
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Graceful shutdown that also ends open change streams

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::api::resource_routes;
use crate::config::ServiceConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::http::response::json_response;
use crate::lifecycle::shutdown;
use crate::store::{ContainerInstance, ResourceStore, Task};

/// HTTP server for the cluster state API.
pub struct ApiServer {
    router: Router,
    config: ServiceConfig,
    streams: CancellationToken,
}

impl ApiServer {
    /// Create a server over the given instance and task stores.
    pub fn new<I, T>(config: ServiceConfig, instances: Arc<I>, tasks: Arc<T>) -> Self
    where
        I: ResourceStore<ContainerInstance>,
        T: ResourceStore<Task>,
    {
        let streams = CancellationToken::new();
        let router = Self::build_router(&config, instances, tasks, streams.clone());
        Self {
            router,
            config,
            streams,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router<I, T>(
        config: &ServiceConfig,
        instances: Arc<I>,
        tasks: Arc<T>,
        streams: CancellationToken,
    ) -> Router
    where
        I: ResourceStore<ContainerInstance>,
        T: ResourceStore<Task>,
    {
        let policy = config.api.client_error_status;
        let timeout = Duration::from_secs(config.timeouts.request_secs);

        let api = Router::new()
            .merge(resource_routes::<ContainerInstance, I>(
                instances,
                policy,
                timeout,
                streams.clone(),
            ))
            .merge(resource_routes::<Task, T>(tasks, policy, timeout, streams));

        let router = Router::new().route("/ping", get(ping));
        let router = if config.api.prefix.is_empty() {
            router.merge(api)
        } else {
            router.nest(&config.api.prefix, api)
        };

        router.layer(
            ServiceBuilder::new()
                .layer(set_request_id_layer())
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request.headers()),
                        )
                    }),
                )
                .layer(propagate_request_id_layer()),
        )
    }

    /// The router, for serving or for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Run the server until `shutdown_rx` fires.
    ///
    /// On shutdown the listener stops accepting, every open change stream is
    /// cancelled, and in-flight requests are drained for at most
    /// `timeouts.shutdown_grace_secs`.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            prefix = %self.config.api.prefix,
            "HTTP server starting"
        );

        let streams = self.streams.clone();
        let grace = Duration::from_secs(self.config.timeouts.shutdown_grace_secs);
        let draining = self.streams.clone();

        let server = axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown::wait(shutdown_rx).await;
                tracing::info!("Closing change streams");
                streams.cancel();
            })
            .into_future();

        tokio::select! {
            result = server => result?,
            _ = async {
                draining.cancelled().await;
                tokio::time::sleep(grace).await;
            } => {
                tracing::warn!(
                    grace_secs = grace.as_secs(),
                    "Shutdown grace period elapsed, dropping open connections"
                );
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Liveness probe.
async fn ping() -> Response {
    let status = serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    json_response(StatusCode::OK, &status)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn server(prefix: &str) -> ApiServer {
        let mut config = ServiceConfig::default();
        config.api.prefix = prefix.to_string();
        ApiServer::new(
            config,
            Arc::new(MemoryStore::<ContainerInstance>::new(8)),
            Arc::new(MemoryStore::<Task>::new(8)),
        )
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_routes_nest_under_prefix() {
        let server = server("/api/v2");
        assert_eq!(server.config().api.prefix, "/api/v2");

        let (status, body) = get(server.router(), "/api/v2/instances").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));

        let (status, body) = get(server.router(), "/api/v2/tasks/t-missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "task not found");

        let (status, _) = get(server.router(), "/v1/instances").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get(server.router(), "/ping").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_empty_prefix_mounts_at_root() {
        let server = server("");
        let (status, body) = get(server.router(), "/tasks").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }
}
