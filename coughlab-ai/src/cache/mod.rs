//! Prediction cache keyed by content hash
//!
//! A hash maps to exactly one [`PredictionRecord`] once written. The upload
//! path goes through [`PredictionStore::insert_if_absent`] so concurrent
//! uploads of the same bytes all end up returning the first stored record.
//!
//! Neither backend evicts; the cache grows with every distinct upload.

pub mod json_file;
pub mod sqlite;

pub use json_file::JsonFileStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use coughlab_common::config::{CacheBackend, RootFolder};
use coughlab_common::Result;

use crate::models::PredictionRecord;

/// Result of [`PredictionStore::insert_if_absent`]
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The record passed in is now stored
    Inserted(PredictionRecord),
    /// Another record was already stored under the hash and is returned instead
    Existing(PredictionRecord),
}

/// Persistent content-hash → prediction mapping
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Backend identifier for logs
    fn backend(&self) -> &'static str;

    /// Stored record for `hash`, unchanged
    async fn get(&self, hash: &str) -> Result<Option<PredictionRecord>>;

    /// Insert or overwrite; persisted before returning
    async fn put(&self, hash: &str, record: &PredictionRecord) -> Result<()>;

    /// Insert unless `hash` is already present; persisted before returning
    async fn insert_if_absent(&self, hash: &str, record: PredictionRecord) -> Result<InsertOutcome>;

    /// Number of cached predictions
    async fn len(&self) -> Result<usize>;
}

/// Open the configured backend beneath `root`
pub async fn open_store(
    backend: CacheBackend,
    root: &RootFolder,
) -> Result<Arc<dyn PredictionStore>> {
    let store: Arc<dyn PredictionStore> = match backend {
        CacheBackend::Json => Arc::new(JsonFileStore::open(root.json_store_path()).await?),
        CacheBackend::Sqlite => Arc::new(SqliteStore::open(&root.sqlite_store_path()).await?),
    };
    tracing::info!(backend = store.backend(), "Prediction cache opened");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let root = RootFolder::new(dir.path());

        let json = open_store(CacheBackend::Json, &root).await.unwrap();
        assert_eq!(json.backend(), "json");

        let sqlite = open_store(CacheBackend::Sqlite, &root).await.unwrap();
        assert_eq!(sqlite.backend(), "sqlite");
        assert!(root.sqlite_store_path().exists());
    }
}
