//! In-memory event-derived store.
//!
//! Records are kept in a `DashMap` keyed by identifier. Every accepted
//! upsert is published on a bounded broadcast channel that backs the change
//! streams handed to subscribers.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_util::sync::CancellationToken;

use crate::store::{
    ChangeStream, DomainError, Resource, ResourceStore, StoreError, StoreResult,
};

/// Largest per-subscriber change buffer a store will allocate.
pub const MAX_STREAM_BUFFER: usize = 1 << 20;

/// Thread-safe record store for a single resource type.
pub struct MemoryStore<R: Resource> {
    records: DashMap<String, R>,
    changes: broadcast::Sender<R>,
}

impl<R: Resource> MemoryStore<R> {
    /// Create an empty store whose change buffer holds `stream_buffer` events
    /// per subscriber before the subscriber is considered lagged. The size is
    /// clamped to `1..=MAX_STREAM_BUFFER`.
    pub fn new(stream_buffer: usize) -> Self {
        let (changes, _) = broadcast::channel(stream_buffer.clamp(1, MAX_STREAM_BUFFER));
        Self {
            records: DashMap::new(),
            changes,
        }
    }

    /// Apply a record derived from an orchestration event.
    ///
    /// Events older than the stored version are ignored. Returns whether the
    /// record was applied.
    pub fn upsert(&self, record: R) -> bool {
        // Check, write and publish under one shard lock so concurrent
        // upserts of the same id apply and broadcast in version order.
        match self.records.entry(record.id().to_string()) {
            Entry::Occupied(mut current) => {
                if current.get().version() > record.version() {
                    tracing::debug!(
                        kind = R::KIND,
                        id = %current.key(),
                        current = current.get().version(),
                        incoming = record.version(),
                        "Ignoring stale record"
                    );
                    return false;
                }
                current.insert(record.clone());
                self.publish(record);
            }
            Entry::Vacant(slot) => {
                let _stored = slot.insert(record.clone());
                self.publish(record);
            }
        }
        true
    }

    fn publish(&self, record: R) {
        // No subscribers is not an error.
        let _ = self.changes.send(record);
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of live change subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn sorted(&self, mut records: Vec<R>) -> Vec<R> {
        records.sort_by(|a, b| a.id().cmp(b.id()));
        records
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for MemoryStore<R> {
    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        Ok(self.records.get(id).map(|r| r.value().clone()))
    }

    async fn list(&self) -> StoreResult<Vec<R>> {
        let records = self.records.iter().map(|r| r.value().clone()).collect();
        Ok(self.sorted(records))
    }

    async fn filter(&self, dimension: &str, value: &str) -> StoreResult<Vec<R>> {
        if !R::DIMENSIONS.contains(&dimension) {
            return Err(DomainError::bad_request(format!(
                "unsupported {} filter '{}'",
                R::KIND,
                dimension
            ))
            .into());
        }

        let records = self
            .records
            .iter()
            .filter(|r| r.value().dimension(dimension) == Some(value))
            .map(|r| r.value().clone())
            .collect();
        Ok(self.sorted(records))
    }

    async fn stream_changes(&self, cancel: CancellationToken) -> StoreResult<ChangeStream<R>> {
        let receiver = self.changes.subscribe();
        tracing::debug!(
            kind = R::KIND,
            subscribers = self.changes.receiver_count(),
            "Change subscription opened"
        );

        let changes = BroadcastStream::new(receiver)
            .map(|item| {
                item.map_err(|BroadcastStreamRecvError::Lagged(skipped)| {
                    StoreError::Lagged(skipped)
                })
            })
            .take_until(cancel.cancelled_owned());
        Ok(changes.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ContainerInstance, DomainErrorKind};
    use std::time::Duration;

    fn instance(n: u32, status: &str, cluster: &str, version: u64) -> ContainerInstance {
        ContainerInstance {
            arn: format!("arn:aws:ecs:us-east-1:123456789012:container-instance/i-{:04}", n),
            cluster_arn: format!("arn:aws:ecs:us-east-1:123456789012:cluster/{}", cluster),
            status: status.to_string(),
            ec2_instance_id: format!("i-{:04}", n),
            agent_connected: true,
            registered_resources: Vec::new(),
            remaining_resources: Vec::new(),
            version,
        }
    }

    #[tokio::test]
    async fn test_upsert_ignores_stale_versions() {
        let store = MemoryStore::new(8);
        assert!(store.upsert(instance(1, "ACTIVE", "default", 2)));
        assert!(!store.upsert(instance(1, "DRAINING", "default", 1)));
        assert!(store.upsert(instance(1, "DRAINING", "default", 3)));

        let current = store.get(&instance(1, "", "", 0).arn).await.unwrap().unwrap();
        assert_eq!(current.status, "DRAINING");
        assert_eq!(current.version, 3);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_concurrent_upserts_keep_the_newest_version() {
        use std::sync::Barrier;

        for _ in 0..2_000 {
            let store = MemoryStore::new(8);
            let mut receiver = store.changes.subscribe();
            store.upsert(instance(1, "ACTIVE", "default", 1));

            let barrier = Barrier::new(2);
            std::thread::scope(|scope| {
                for version in [2, 3] {
                    let (store, barrier) = (&store, &barrier);
                    scope.spawn(move || {
                        barrier.wait();
                        store.upsert(instance(1, "ACTIVE", "default", version));
                    });
                }
            });

            let stored = store.records.get(&instance(1, "", "", 0).arn).unwrap();
            assert_eq!(stored.version, 3);

            let mut published = Vec::new();
            while let Ok(record) = receiver.try_recv() {
                published.push(record.version);
            }
            assert_eq!(published.last(), Some(&3));
            assert!(published.windows(2).all(|pair| pair[0] < pair[1]));
        }
    }

    #[tokio::test]
    async fn test_filter_by_dimension() {
        let store = MemoryStore::new(8);
        store.upsert(instance(1, "ACTIVE", "default", 1));
        store.upsert(instance(2, "DRAINING", "default", 1));
        store.upsert(instance(3, "ACTIVE", "batch", 1));

        let active = store.filter("status", "ACTIVE").await.unwrap();
        assert_eq!(active.len(), 2);
        assert!(active[0].arn < active[1].arn);

        let batch = store
            .filter("cluster", "arn:aws:ecs:us-east-1:123456789012:cluster/batch")
            .await
            .unwrap();
        assert_eq!(batch.len(), 1);

        let err = store.filter("family", "x").await.unwrap_err();
        assert_eq!(err.domain_kind(), Some(DomainErrorKind::BadRequest));
    }

    #[tokio::test]
    async fn test_stream_delivers_changes_in_order() {
        let store = MemoryStore::new(8);
        let cancel = CancellationToken::new();
        let mut changes = store.stream_changes(cancel.clone()).await.unwrap();

        store.upsert(instance(1, "ACTIVE", "default", 1));
        store.upsert(instance(2, "ACTIVE", "default", 1));

        let first = changes.next().await.unwrap().unwrap();
        let second = changes.next().await.unwrap().unwrap();
        assert!(first.arn.ends_with("i-0001"));
        assert!(second.arn.ends_with("i-0002"));
    }

    #[tokio::test]
    async fn test_stream_ends_on_cancel() {
        let store: MemoryStore<ContainerInstance> = MemoryStore::new(8);
        let cancel = CancellationToken::new();
        let mut changes = store.stream_changes(cancel.clone()).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);

        cancel.cancel();
        let next = tokio::time::timeout(Duration::from_secs(1), changes.next())
            .await
            .expect("stream should end promptly after cancel");
        assert!(next.is_none());

        drop(changes);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_gets_error_item() {
        let store = MemoryStore::new(2);
        let mut changes = store.stream_changes(CancellationToken::new()).await.unwrap();

        for n in 0..5 {
            store.upsert(instance(n, "ACTIVE", "default", 1));
        }

        match changes.next().await {
            Some(Err(StoreError::Lagged(skipped))) => assert_eq!(skipped, 3),
            other => panic!("expected lag error, got {:?}", other.map(|r| r.is_ok())),
        }
    }
}
