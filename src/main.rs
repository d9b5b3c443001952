//! Latency Monitor - periodic reachability latency for hosts and databases.

mod config;
mod probe;
mod scheduler;
mod store;
mod web;

use config::ServerConfig;
use probe::Prober;
use scheduler::Scheduler;
use store::{Store, StoreOptions};
use web::Server;

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("latency_monitor=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load();
    tracing::info!(
        "Configuration: CHECK_INTERVAL={}s, TCP_PORT={}, MAX_HISTORY={} data points ({} hours)",
        cfg.check_interval,
        cfg.tcp_port,
        cfg.max_history(),
        cfg.retention_hours()
    );
    tracing::info!("Using host file {}", cfg.host_file.display());

    let store = Arc::new(Store::open(StoreOptions::from(&cfg)));
    tracing::info!("Monitoring hosts: {}", store.list_hosts().join(", "));

    let database_enabled = probe::is_available();
    if database_enabled {
        tracing::info!("Database probing enabled");
    } else {
        tracing::info!("Database probing unavailable: built without the `oracle` feature");
    }
    let prober = Arc::new(Prober::new(cfg.tcp_port, database_enabled)?);

    // Start the poll loop
    let scheduler = Scheduler::new(store.clone(), prober.clone(), cfg.poll_interval());
    scheduler.start();

    // Start web server
    tracing::info!("Starting latency monitor on port {}...", cfg.http_port);
    let server = Server::new(cfg, store, prober);
    server.start().await?;

    Ok(())
}
