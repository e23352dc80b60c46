//! Shared utilities for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use cluster_state_api::client::ClusterClient;
use cluster_state_api::config::ServiceConfig;
use cluster_state_api::store::{
    ChangeStream, ContainerInstance, Resource, ResourceStore, StoreResult, Task,
};
use cluster_state_api::{ApiServer, Shutdown};

pub const CLUSTER: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/default";
pub const OTHER_CLUSTER: &str = "arn:aws:ecs:us-east-1:123456789012:cluster/batch";

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Arc<Shutdown>,
    pub handle: JoinHandle<Result<(), std::io::Error>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> ClusterClient {
        ClusterClient::new(&self.url("/v1"))
    }

    /// Trigger shutdown and wait for the server to stop.
    pub async fn stop(self) {
        self.shutdown.trigger();
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop in time");
        result.unwrap().unwrap();
    }
}

/// Boot an `ApiServer` over the given stores.
pub async fn start_server<I, T>(config: ServiceConfig, instances: Arc<I>, tasks: Arc<T>) -> TestServer
where
    I: ResourceStore<ContainerInstance>,
    T: ResourceStore<Task>,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let server = ApiServer::new(config, instances, tasks);
    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

pub fn instance(n: u32, status: &str, cluster: &str) -> ContainerInstance {
    ContainerInstance {
        arn: format!("arn:aws:ecs:us-east-1:123456789012:container-instance/i-{n:04}"),
        cluster_arn: cluster.into(),
        status: status.into(),
        ec2_instance_id: format!("i-{n:017x}"),
        agent_connected: true,
        registered_resources: Vec::new(),
        remaining_resources: Vec::new(),
        version: 1,
    }
}

pub fn task(n: u32, status: &str) -> Task {
    Task {
        arn: format!("arn:aws:ecs:us-east-1:123456789012:task/t-{n:04}"),
        cluster_arn: CLUSTER.into(),
        container_instance_arn: "arn:aws:ecs:us-east-1:123456789012:container-instance/i-0001"
            .into(),
        task_definition_arn: "arn:aws:ecs:us-east-1:123456789012:task-definition/web:3".into(),
        last_status: status.into(),
        desired_status: "RUNNING".into(),
        started_by: None,
        containers: Vec::new(),
        version: 1,
    }
}

/// Store with fixed contents and a scripted change stream. Counts every call.
pub struct ScriptedStore<R> {
    records: Vec<R>,
    changes: Mutex<Option<Vec<StoreResult<R>>>>,
    scope: Mutex<Option<CancellationToken>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl<R: Resource> ScriptedStore<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            changes: Mutex::new(None),
            scope: Mutex::new(None),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Make every get/list/filter call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Items the next subscription yields before ending.
    pub fn with_changes(self, changes: Vec<StoreResult<R>>) -> Self {
        *self.changes.lock().unwrap() = Some(changes);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn answer(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Cancellation scope handed to the last subscription.
    pub fn scope(&self) -> Option<CancellationToken> {
        self.scope.lock().unwrap().clone()
    }
}

#[async_trait]
impl<R: Resource> ResourceStore<R> for ScriptedStore<R> {
    async fn get(&self, id: &str) -> StoreResult<Option<R>> {
        self.answer().await;
        Ok(self.records.iter().find(|r| r.id() == id).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<R>> {
        self.answer().await;
        Ok(self.records.clone())
    }

    async fn filter(&self, dimension: &str, value: &str) -> StoreResult<Vec<R>> {
        self.answer().await;
        Ok(self
            .records
            .iter()
            .filter(|r| r.dimension(dimension) == Some(value))
            .cloned()
            .collect())
    }

    async fn stream_changes(&self, cancel: CancellationToken) -> StoreResult<ChangeStream<R>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.scope.lock().unwrap() = Some(cancel);
        let items = self.changes.lock().unwrap().take().unwrap_or_default();
        Ok(stream::iter(items).boxed())
    }
}
