//! Upload endpoint
//!
//! `POST /upload` takes a multipart form with the recording in the `audio`
//! field and responds with the prediction record plus a note saying whether
//! it came from the cache.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, warn};

use crate::error::{ApiError, ApiResult};
use crate::models::UploadResponse;
use crate::services::validate_filename;
use crate::AppState;

/// Multipart field carrying the recording
pub const AUDIO_FIELD: &str = "audio";

/// POST /upload
pub async fn upload_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<UploadResponse>> {
    match process_upload(&state, multipart).await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            if e.status().is_server_error() {
                error!(error = %e, "Upload failed");
                *state.last_error.write().await = Some(e.to_string());
            } else {
                warn!(status = %e.status(), error = %e, "Upload rejected");
            }
            Err(e)
        }
    }
}

async fn process_upload(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<UploadResponse> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::Validation(rejection.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();

        // Reject by name before pulling the body off the wire
        validate_filename(&original_name)?;

        let bytes = field.bytes().await.map_err(multipart_error)?;
        info!(filename = %original_name, bytes = bytes.len(), "Received upload");

        return state.upload_handler.handle(&original_name, bytes).await;
    }

    Err(ApiError::Validation("No audio file provided".to_string()))
}

/// Body-limit failures surface here as 413, everything else is malformed input
fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::Validation(err.body_text())
    }
}

/// Build upload routes
pub fn upload_routes() -> Router<AppState> {
    Router::new().route("/upload", post(upload_audio))
}
