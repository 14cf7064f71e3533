//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Build identification captured by build.rs
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub git_hash: String,
    pub build_timestamp: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the prediction cache cannot be read
    pub status: String,
    /// Module name ("coughlab-ai")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    pub build: BuildInfo,
    /// Seconds since service started
    pub uptime_seconds: u64,
    /// Name of the active classifier
    pub classifier: String,
    /// "json" or "sqlite"
    pub cache_backend: String,
    /// Number of cached predictions
    pub predictions_cached: usize,
    /// Last server-side error message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let store = state.upload_handler.store();
    let (status, predictions_cached) = match store.len().await {
        Ok(count) => ("ok", count),
        Err(e) => {
            warn!(error = %e, "Prediction cache unavailable for health check");
            ("degraded", 0)
        }
    };

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: status.to_string(),
        module: "coughlab-ai".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: BuildInfo {
            git_hash: env!("GIT_HASH").to_string(),
            build_timestamp: env!("BUILD_TIMESTAMP").to_string(),
        },
        uptime_seconds,
        classifier: state.upload_handler.classifier_name().to_string(),
        cache_backend: store.backend().to_string(),
        predictions_cached,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
