use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skiff_core::{
    Config, Engine, EngineConfig, HttpGateway, InMemoryLeaseStore, InMemoryMetadataStore,
    ItemProcessor, LeaseQueue, Queue, SystemClock,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration error");
            std::process::exit(1);
        }
    };

    info!(table = %config.table, "SKIFF_TABLE");
    info!(namespace = %config.namespace, "SKIFF_QUEUE_NAMESPACE");
    info!(gateway = %config.gateway_url, "SKIFF_GATEWAY_URL");
    info!(poll_interval = ?config.poll_interval, "SKIFF_POLL_INTERVAL_SECS");
    info!(concurrency = config.concurrency, "SKIFF_CONCURRENCY");
    info!(lease_duration = ?config.lease_duration, "SKIFF_LEASE_DURATION_SECS");

    let gateway = match HttpGateway::new(&config.gateway_url) {
        Ok(gateway) => Arc::new(gateway),
        Err(err) => {
            error!(error = %err, "invalid gateway url");
            std::process::exit(1);
        }
    };

    // In-memory stores; a deployment against a real backend swaps in its own
    // LeaseStore/MetadataStore adapters for `config.table`.
    let lease_store = Arc::new(InMemoryLeaseStore::new());
    let metadata_store = Arc::new(InMemoryMetadataStore::new());

    let queue: Arc<dyn Queue> = Arc::new(LeaseQueue::new(
        config.namespace.clone(),
        config.lease_duration,
        lease_store,
        SystemClock,
    ));
    let processor = Arc::new(ItemProcessor::new(gateway, metadata_store));

    let engine = Engine::start(
        queue,
        processor,
        EngineConfig {
            poll_interval: config.poll_interval,
            concurrency: config.concurrency,
        },
    );

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
    }

    info!("shutting down");
    engine.shutdown_and_join().await;
    info!("all workers stopped");
}
