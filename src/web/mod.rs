//! Web server module.

mod handlers;

use crate::config::ServerConfig;
use crate::probe::Prober;
use crate::store::Store;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub store: Arc<Store>,
    pub prober: Arc<Prober>,
}

/// Web server exposing the latency API.
pub struct Server {
    state: AppState,
}

impl Server {
    /// Create a new server with the given dependencies.
    pub fn new(config: ServerConfig, store: Arc<Store>, prober: Arc<Prober>) -> Self {
        Self {
            state: AppState {
                config,
                store,
                prober,
            },
        }
    }

    /// Build the router with all routes.
    fn routes(&self) -> Router {
        let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any);

        Router::new()
            // Latency data
            .route("/api/latency", get(handlers::handle_get_latency))
            .route("/api/latency/{host}", get(handlers::handle_get_host_latency))
            .route("/api/current", get(handlers::handle_get_current))
            // Network hosts
            .route("/api/hosts", get(handlers::handle_get_hosts))
            .route("/api/hosts/add", post(handlers::handle_add_host))
            .route("/api/hosts/remove", post(handlers::handle_remove_host))
            // Databases
            .route("/api/databases", get(handlers::handle_get_databases))
            .route("/api/databases/add", post(handlers::handle_add_database))
            .route("/api/databases/remove", post(handlers::handle_remove_database))
            .route("/api/databases/test", post(handlers::handle_test_database))
            // Operations
            .route("/health", get(handlers::handle_health))
            .route("/debug", get(handlers::handle_debug))
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .layer(DefaultBodyLimit::max(64 * 1024))
            .with_state(self.state.clone())
    }

    /// Start the server on the configured port.
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.state.config.http_port));
        let router = self.routes();

        tracing::info!("Web server listening on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, router).await?;

        Ok(())
    }
}
