use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use super::error::ApiError;
use crate::benchmark::{RunRequest, Snapshot, secrets_match};
use crate::types::Category;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/models", get(list_models))
        .route("/api/run-benchmark", post(run_benchmark))
        .route(
            "/api/cached-snapshot",
            get(get_cached_snapshot).post(set_cached_snapshot),
        )
        .route("/api/cron/refresh", get(cron_refresh).post(cron_refresh))
}

// =============================================================================
// Request / Response Bodies
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RunBenchmarkBody {
    pub category: Category,
    pub models: Vec<String>,
    pub prompt: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StoreResponse {
    pub success: bool,
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub results_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo<'a> {
    id: &'a str,
    display_name: &'a str,
    provider: &'a str,
}

// =============================================================================
// Handlers
// =============================================================================

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<Value> {
    let catalog = state.service.runner().catalog();
    let mut grouped: BTreeMap<&str, Vec<ModelInfo<'_>>> = BTreeMap::new();

    for category in Category::ALL {
        let models = catalog
            .all()
            .iter()
            .filter(|m| m.category == category)
            .map(|m| ModelInfo {
                id: &m.id,
                display_name: &m.display_name,
                provider: m.provider.as_str(),
            })
            .collect();
        grouped.insert(category.as_str(), models);
    }

    Json(json!({ "models": grouped }))
}

/// Returns only this run's entries; the merged snapshot goes to the cache
async fn run_benchmark(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RunBenchmarkBody>, JsonRejection>,
) -> Result<Json<Snapshot>, ApiError> {
    let Json(body) = body?;

    let request = RunRequest {
        category: body.category,
        prompt: body.prompt,
        model_ids: body.models,
        password: body.password,
    };

    let report = state.service.run_benchmark(&request).await?;
    info!(
        "run-benchmark {}: {} entries (persisted: {})",
        request.category,
        report.outcome.entries.len(),
        report.persisted.is_persisted()
    );

    Ok(Json(report.outcome.fragment()))
}

async fn get_cached_snapshot(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.service.cached().await {
        Some(snapshot) => Json(json!(snapshot)),
        None => Json(json!({
            "results": null,
            "timestamp": null,
            "message": "No cached results available",
        })),
    }
}

async fn set_cached_snapshot(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Snapshot>, JsonRejection>,
) -> Result<Json<StoreResponse>, ApiError> {
    let Json(snapshot) = body?;
    let persisted = state.service.store(&snapshot).await;

    Ok(Json(StoreResponse {
        success: true,
        persisted: persisted.is_persisted(),
    }))
}

async fn cron_refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    authorize_cron(&state, &headers)?;

    let report = state.service.refresh_all().await?;

    Ok(Json(RefreshResponse {
        success: true,
        timestamp: report.timestamp,
        results_count: report.results_count,
    }))
}

/// `Authorization: Bearer <cron secret>`; no configured secret rejects all
fn authorize_cron(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.cron_secret.as_ref() else {
        return Err(ApiError::unauthorized("cron secret not configured"));
    };

    let given = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match given {
        Some(token) if secrets_match(token, expected.expose_secret()) => Ok(()),
        _ => Err(ApiError::unauthorized("invalid cron credentials")),
    }
}
