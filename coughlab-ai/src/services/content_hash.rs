//! Content hashing for the prediction cache key
//!
//! The key is the lowercase hex SHA-256 digest of the uploaded bytes, so
//! byte-identical uploads map to the same cached prediction.

use axum::body::Bytes;
use sha2::{Digest, Sha256};

use coughlab_common::{Error, Result};

/// Hex SHA-256 of an in-memory buffer
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// [`content_hash`] on the blocking pool; uploads run up to the body limit
pub async fn hash_upload(bytes: Bytes) -> Result<String> {
    let len = bytes.len();
    let hash = tokio::task::spawn_blocking(move || content_hash(&bytes))
        .await
        .map_err(|e| Error::Internal(format!("Hash task failed: {}", e)))?;

    tracing::debug!(bytes = len, hash = %hash, "Hashed upload");
    Ok(hash)
}
