//! Error types for coughlab-ai
//!
//! [`ApiError`] is the single point where failures become HTTP responses.
//! Every error body is `{"error": "<message>"}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::audio::AudioError;
use crate::classifier::ClassifierError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing file, empty filename or disallowed extension (400)
    #[error("{0}")]
    Validation(String),

    /// Upload over the size limit (413)
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Undecodable or empty audio (500)
    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// coughlab-common error
    #[error(transparent)]
    Common(#[from] coughlab_common::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Audio(_)
            | ApiError::Classifier(_)
            | ApiError::Internal(_)
            | ApiError::Io(_)
            | ApiError::Other(_)
            | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
