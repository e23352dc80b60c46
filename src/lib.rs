//! Cluster State API Library
//!
//! Read-only HTTP access to container instance and task state held by an
//! event-derived store: point lookup, listing, single-dimension filtering
//! and a push stream of changes.

pub mod api;
pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod store;

pub use config::ServiceConfig;
pub use http::ApiServer;
pub use lifecycle::Shutdown;
