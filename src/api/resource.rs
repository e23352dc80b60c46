//! Resource query handler.
//!
//! One generic handler serves point lookup, listing and single-dimension
//! filtering for any `Resource` against any `ResourceStore`. Each call is
//! independent; the handler holds no per-request state.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::api::error::ApiError;
use crate::api::filter::{names_dimension, QueryFilter};
use crate::config::ClientErrorStatus;
use crate::http::response::json_response;
use crate::observability::metrics;
use crate::store::{Resource, ResourceStore, StoreError, StoreResult};

/// Get/list/filter operations for one resource type.
pub struct ResourceQueryHandler<R, S> {
    store: Arc<S>,
    policy: ClientErrorStatus,
    /// Deadline for each store call.
    timeout: Duration,
    _resource: PhantomData<fn() -> R>,
}

impl<R, S> Clone for ResourceQueryHandler<R, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            policy: self.policy,
            timeout: self.timeout,
            _resource: PhantomData,
        }
    }
}

impl<R: Resource, S: ResourceStore<R>> ResourceQueryHandler<R, S> {
    pub fn new(store: Arc<S>, policy: ClientErrorStatus, timeout: Duration) -> Self {
        Self {
            store,
            policy,
            timeout,
            _resource: PhantomData,
        }
    }

    /// Run one store call under the request deadline.
    ///
    /// An elapsed deadline is a store failure like any other, so it is
    /// answered with an error document rather than a bare timeout status.
    async fn call<T>(
        &self,
        operation: impl Future<Output = StoreResult<T>>,
    ) -> Result<T, ApiError> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .unwrap_or_else(|_| Err(StoreError::Timeout(self.timeout)))
            .map_err(|err| ApiError::from_store(err, R::KIND))
    }

    /// Look up one record by identifier.
    pub async fn get_by_id(&self, id: &str) -> Result<R::Model, ApiError> {
        if id.is_empty() {
            return Err(ApiError::client_input(format!("{} identifier is required", R::KIND)));
        }

        let record = self
            .call(self.store.get(id))
            .await?
            .ok_or_else(|| ApiError::not_found(R::KIND))?;

        Ok(record.to_model()?)
    }

    /// Every record the store holds.
    pub async fn list_all(&self) -> Result<Vec<R::Model>, ApiError> {
        let records = self.call(self.store.list()).await?;
        to_models(&records)
    }

    /// Records matching the single dimension supplied in `params`.
    ///
    /// Fails before touching the store unless exactly one supported
    /// dimension is supplied.
    pub async fn filter(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<Vec<R::Model>, ApiError> {
        let filter = QueryFilter::from_query(params, R::DIMENSIONS).map_err(ApiError::client_input)?;
        self.filter_by(&filter).await
    }

    pub async fn filter_by(&self, filter: &QueryFilter) -> Result<Vec<R::Model>, ApiError> {
        let records = self
            .call(self.store.filter(filter.dimension, &filter.value))
            .await?;
        to_models(&records)
    }

    /// Write the outcome of an operation as a response.
    fn respond<T: serde::Serialize>(
        &self,
        operation: &'static str,
        started: Instant,
        result: Result<T, ApiError>,
    ) -> Response {
        let response = result
            .and_then(|value| json_response(StatusCode::OK, &value).map_err(ApiError::from))
            .unwrap_or_else(|err| err.into_response_with(self.policy));

        metrics::record_request(R::KIND, operation, response.status().as_u16(), started);
        response
    }
}

fn to_models<R: Resource>(records: &[R]) -> Result<Vec<R::Model>, ApiError> {
    records
        .iter()
        .map(|record| record.to_model().map_err(ApiError::from))
        .collect()
}

/// `GET /{collection}/{id}`
pub async fn get_resource<R, S>(
    State(handler): State<ResourceQueryHandler<R, S>>,
    Path(id): Path<String>,
) -> Response
where
    R: Resource,
    S: ResourceStore<R>,
{
    let started = Instant::now();
    tracing::debug!(kind = R::KIND, id = %id, "Get resource");
    let result = handler.get_by_id(&id).await;
    handler.respond("get", started, result)
}

/// `GET /{collection}` and `GET /{collection}?{dimension}={value}`
pub async fn list_resources<R, S>(
    State(handler): State<ResourceQueryHandler<R, S>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response
where
    R: Resource,
    S: ResourceStore<R>,
{
    let started = Instant::now();
    if names_dimension(&params, R::DIMENSIONS) {
        tracing::debug!(kind = R::KIND, params = ?params, "Filter resources");
        let result = handler.filter(&params).await;
        handler.respond("filter", started, result)
    } else {
        tracing::debug!(kind = R::KIND, "List resources");
        let result = handler.list_all().await;
        handler.respond("list", started, result)
    }
}
