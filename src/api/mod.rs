//! Resource query and stream API.
//!
//! # Data Flow
//! ```text
//! GET /{collection}/{id}     → resource.rs get_by_id  ─┐
//! GET /{collection}[?dim=v]  → resource.rs list/filter ├→ ResourceStore → model → response.rs
//! GET /{collection}/stream   → stream.rs subscribe    ─┘   (one flushed document per change)
//! ```
//!
//! # Design Decisions
//! - Handlers are generic over the resource type and the store; instances
//!   and tasks share one implementation
//! - Failures are classified once (`error.rs`) and written through one path
//! - Query store calls carry the request timeout and fail as store errors,
//!   stream routes never time out

pub mod error;
pub mod filter;
pub mod resource;
pub mod stream;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ClientErrorStatus;
use crate::store::{Resource, ResourceStore};

pub use error::{ApiError, ApiErrorKind};
pub use filter::{FilterError, QueryFilter};
pub use resource::ResourceQueryHandler;
pub use stream::StreamHandler;

/// Routes for one resource type, relative to the API prefix.
///
/// Query handlers bound each store call by `request_timeout`; stream routes
/// are never timed out.
pub fn resource_routes<R, S>(
    store: Arc<S>,
    policy: ClientErrorStatus,
    request_timeout: Duration,
    shutdown: CancellationToken,
) -> Router
where
    R: Resource,
    S: ResourceStore<R>,
{
    let collection = format!("/{}", R::COLLECTION);
    let item = format!("/{}/{{id}}", R::COLLECTION);
    let changes = format!("/{}/stream", R::COLLECTION);

    let queries = Router::new()
        .route(&collection, get(resource::list_resources::<R, S>))
        .route(&item, get(resource::get_resource::<R, S>))
        .with_state(ResourceQueryHandler::<R, S>::new(
            store.clone(),
            policy,
            request_timeout,
        ));

    let streams = Router::new()
        .route(&changes, get(stream::stream_resources::<R, S>))
        .with_state(StreamHandler::<R, S>::new(store, policy, shutdown));

    queries.merge(streams)
}
