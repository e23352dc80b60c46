//! Metrics collection and exposition.
//!
//! # Metrics
//! - `cluster_api_requests_total` (counter): requests by resource, operation, status
//! - `cluster_api_request_duration_seconds` (histogram): time to produce the response head
//! - `cluster_api_streams_active` (gauge): open change streams by resource
//! - `cluster_api_streams_closed_total` (counter): closed streams by resource, outcome
//! - `cluster_api_stream_items_total` (counter): documents written to change streams
//!
//! Recording is a no-op until `init_metrics` installs the Prometheus recorder.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to install metrics exporter"),
    }
}

/// Record a completed query or stream subscription.
pub fn record_request(resource: &'static str, operation: &'static str, status: u16, started: Instant) {
    counter!(
        "cluster_api_requests_total",
        "resource" => resource,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "cluster_api_request_duration_seconds",
        "resource" => resource,
        "operation" => operation
    )
    .record(started.elapsed().as_secs_f64());
}

pub fn stream_opened(resource: &'static str) {
    gauge!("cluster_api_streams_active", "resource" => resource).increment(1.0);
}

pub fn stream_closed(resource: &'static str, outcome: &'static str) {
    gauge!("cluster_api_streams_active", "resource" => resource).decrement(1.0);
    counter!(
        "cluster_api_streams_closed_total",
        "resource" => resource,
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_stream_item(resource: &'static str) {
    counter!("cluster_api_stream_items_total", "resource" => resource).increment(1);
}
