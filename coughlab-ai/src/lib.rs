//! coughlab-ai library interface
//!
//! Exposes the router and pipeline pieces for integration testing.

pub mod api;
pub mod audio;
pub mod cache;
pub mod classifier;
pub mod error;
pub mod features;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::trace::TraceLayer;

use crate::services::UploadHandler;

/// Headroom for multipart boundaries and part headers on top of the file limit
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub upload_handler: Arc<UploadHandler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last server-side error, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(upload_handler: UploadHandler) -> Self {
        Self {
            upload_handler: Arc::new(upload_handler),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.upload_handler.max_upload_bytes() + MULTIPART_OVERHEAD;

    Router::new()
        .merge(api::upload_routes())
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
