//! HTTP API
//!
//! axum router exposing the benchmark operations:
//!
//! - `POST /api/run-benchmark`
//! - `GET|POST /api/cached-snapshot`
//! - `GET|POST /api/cron/refresh` (bearer cron secret)
//! - `GET /api/models`, `GET /health`

pub mod error;
mod routes;

pub use error::ApiError;
pub use routes::{RefreshResponse, RunBenchmarkBody, StoreResponse};

use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::benchmark::BenchmarkService;
use crate::types::Result;

/// Shared state behind every handler
pub struct AppState {
    pub service: BenchmarkService,
    cron_secret: Option<SecretString>,
}

impl AppState {
    pub fn new(service: BenchmarkService, cron_secret: Option<&str>) -> Self {
        Self {
            service,
            cron_secret: cron_secret
                .filter(|s| !s.is_empty())
                .map(|s| SecretString::from(s.to_string())),
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    routes::routes()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn serve(state: AppState, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
