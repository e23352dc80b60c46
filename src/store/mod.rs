//! Resource store subsystem.
//!
//! # Data Flow
//! ```text
//! orchestration events (seed file, upserts)
//!     → memory.rs (versioned records + change broadcast)
//!     → ResourceStore trait (get / list / filter / stream_changes)
//!     → api handlers
//! ```
//!
//! # Design Decisions
//! - The API layer only sees the `ResourceStore` capability set, never a
//!   concrete store
//! - Change streams are lazy `Stream`s bound to a `CancellationToken`; the
//!   store stops producing for a subscriber once its token is cancelled
//! - Stream items are `StoreResult<R>`; an error item is terminal

pub mod error;
pub mod memory;
pub mod seed;
pub mod types;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::model::ModelError;

pub use error::{BoxError, DomainError, DomainErrorKind, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use types::{Container, ContainerInstance, ResourceAmount, Task};

/// Stream of change items produced by a store for one subscriber.
pub type ChangeStream<R> = BoxStream<'static, StoreResult<R>>;

/// A resource type served by the API.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Wire representation of the record.
    type Model: Serialize + Send + 'static;

    /// Singular name used in messages and metric labels.
    const KIND: &'static str;

    /// Path segment of the collection endpoint.
    const COLLECTION: &'static str;

    /// Supported single-value filter dimensions.
    const DIMENSIONS: &'static [&'static str];

    fn id(&self) -> &str;

    fn version(&self) -> u64;

    /// Value of the record for a filter dimension, `None` if unsupported.
    fn dimension(&self, name: &str) -> Option<&str>;

    fn to_model(&self) -> Result<Self::Model, ModelError>;
}

/// Capability set a store exposes for one resource type.
#[async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync + 'static {
    /// Look up a record by identifier. `Ok(None)` when absent.
    async fn get(&self, id: &str) -> StoreResult<Option<R>>;

    /// All records currently held, in the store's native order.
    async fn list(&self) -> StoreResult<Vec<R>>;

    /// Records whose `dimension` equals `value`.
    async fn filter(&self, dimension: &str, value: &str) -> StoreResult<Vec<R>>;

    /// Subscribe to record changes until `cancel` fires.
    async fn stream_changes(&self, cancel: CancellationToken) -> StoreResult<ChangeStream<R>>;
}
