//! Cluster State API (v1)
//!
//! Read-only HTTP access to container instances and tasks, built with Tokio
//! and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────┐
//!                     │                 CLUSTER STATE API                     │
//!                     │                                                       │
//!   Client Request    │  ┌─────────┐   ┌───────────────┐   ┌──────────────┐  │
//!   ──────────────────┼─▶│  http   │──▶│ api::resource │──▶│              │  │
//!                     │  │ server  │   │ get/list/filt │   │    store     │  │
//!                     │  └─────────┘   └───────────────┘   │ (memory, or  │  │
//!                     │       │        ┌───────────────┐   │  any Resource│  │
//!                     │       └───────▶│  api::stream  │──▶│  Store impl) │  │
//!                     │                │ change feed   │   └──────┬───────┘  │
//!                     │                └───────┬───────┘          │          │
//!                     │                        ▼                  ▼          │
//!   Client Response   │  ┌──────────────┐  ┌──────────┐   ┌──────────────┐  │
//!   ◀─────────────────┼──│   response   │◀─│  model   │◀──│   records    │  │
//!                     │  │ JSON / error │  │ to wire  │   │              │  │
//!                     │  └──────────────┘  └──────────┘   └──────────────┘  │
//!                     │                                                       │
//!                     │  config · observability · lifecycle                   │
//!                     └──────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use cluster_state_api::config::load_or_default;
use cluster_state_api::lifecycle::signals::spawn_signal_listener;
use cluster_state_api::observability::{logging, metrics};
use cluster_state_api::store::seed::Snapshot;
use cluster_state_api::store::{ContainerInstance, MemoryStore, Task};
use cluster_state_api::{ApiServer, Shutdown};

#[derive(Parser)]
#[command(name = "cluster-state-api", version, about = "Read-only cluster state API")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "CLUSTER_API_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!("cluster-state-api v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        prefix = %config.api.prefix,
        client_error_status = ?config.api.client_error_status,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // Validated at load time.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let instances = Arc::new(MemoryStore::<ContainerInstance>::new(config.store.stream_buffer));
    let tasks = Arc::new(MemoryStore::<Task>::new(config.store.stream_buffer));
    if let Some(path) = &config.store.seed_path {
        Snapshot::load(path.as_ref())?.apply(&instances, &tasks);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    spawn_signal_listener(shutdown.clone());

    let server = ApiServer::new(config, instances, tasks);
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
