//! JSON mapping file backend
//!
//! The whole mapping lives in memory behind an async `RwLock`. Writers hold
//! the write lock across the in-memory update and the file rewrite, so
//! concurrent inserts can never drop each other. The file is replaced via
//! write-to-temp, fsync, rename, leaving either the old or the new mapping on
//! disk. A failed replace removes the temp file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use coughlab_common::{Error, Result};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{InsertOutcome, PredictionStore};
use crate::models::PredictionRecord;

type Mapping = BTreeMap<String, PredictionRecord>;

pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<Mapping>,
}

impl JsonFileStore {
    /// Load the mapping file, or start empty if it does not exist
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Mapping::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::Config(format!(
                    "Prediction cache {} is not a valid mapping: {}",
                    path.display(),
                    e
                ))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Mapping::new(),
            Err(e) => return Err(Error::Io(e)),
        };

        info!(
            path = %path.display(),
            entries = entries.len(),
            "Loaded prediction cache"
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rewrite the mapping file; caller holds the write lock
    async fn persist(&self, entries: &Mapping) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec(entries)?;

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        tmp_name.push(".tmp");
        let tmp_path = self.path.with_file_name(tmp_name);

        let replaced = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = replaced {
            // The mapping file itself is untouched; only the temp copy goes
            if let Err(remove_err) = tokio::fs::remove_file(&tmp_path).await {
                if remove_err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp_path.display(), error = %remove_err, "Failed to remove temp cache file");
                }
            }
            return Err(Error::Io(e));
        }

        debug!(path = %self.path.display(), entries = entries.len(), "Persisted prediction cache");
        Ok(())
    }
}

#[async_trait]
impl PredictionStore for JsonFileStore {
    fn backend(&self) -> &'static str {
        "json"
    }

    async fn get(&self, hash: &str) -> Result<Option<PredictionRecord>> {
        Ok(self.entries.read().await.get(hash).cloned())
    }

    async fn put(&self, hash: &str, record: &PredictionRecord) -> Result<()> {
        let mut entries = self.entries.write().await;
        let previous = entries.insert(hash.to_string(), record.clone());

        if let Err(e) = self.persist(&entries).await {
            // Keep memory consistent with what is on disk
            match previous {
                Some(old) => entries.insert(hash.to_string(), old),
                None => entries.remove(hash),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn insert_if_absent(&self, hash: &str, record: PredictionRecord) -> Result<InsertOutcome> {
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(hash) {
            return Ok(InsertOutcome::Existing(existing.clone()));
        }

        entries.insert(hash.to_string(), record.clone());
        if let Err(e) = self.persist(&entries).await {
            entries.remove(hash);
            return Err(e);
        }
        Ok(InsertOutcome::Inserted(record))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::prediction::tests::sample_record;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("history.json")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.get("abc").await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_put_then_get_returns_record_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("history.json")).await.unwrap();
        let record = sample_record();

        store.put("abc", &record).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let record = sample_record();

        {
            let store = JsonFileStore::open(&path).await.unwrap();
            store.put("abc", &record).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.get("abc").await.unwrap(), Some(record));
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_file_is_plain_hash_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = JsonFileStore::open(&path).await.unwrap();
        store.put("deadbeef", &sample_record()).await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["deadbeef"]["disease"], "Bronchitis");
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("history.json")).await.unwrap();
        let first = sample_record();
        let mut second = sample_record();
        second.disease = "Healthy".to_string();

        store.put("abc", &first).await.unwrap();
        store.put("abc", &second).await.unwrap();

        assert_eq!(store.get("abc").await.unwrap().unwrap().disease, "Healthy");
        assert_eq!(store.len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("history.json")).await.unwrap();
        let first = sample_record();
        let mut second = sample_record();
        second.disease = "Healthy".to_string();

        let outcome = store.insert_if_absent("abc", first.clone()).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted(first.clone()));

        let outcome = store.insert_if_absent("abc", second).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Existing(first));
    }

    #[tokio::test]
    async fn test_concurrent_inserts_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = Arc::new(JsonFileStore::open(&path).await.unwrap());

        let mut handles = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert_if_absent(&format!("hash-{}", i), sample_record())
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.len().await.unwrap(), 32);
        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(reopened.len().await.unwrap(), 32);
    }

    #[tokio::test]
    async fn test_successful_persist_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("history.json")).await.unwrap();

        store.put("abc", &sample_record()).await.unwrap();

        assert!(dir.path().join("history.json").is_file());
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file_and_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        // A non-empty directory where the mapping file should be blocks the rename
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("occupied"), b"x").unwrap();

        let result = store.put("abc", &sample_record()).await;

        assert!(matches!(result, Err(Error::Io(_))), "got {:?}", result);
        assert!(!dir.path().join("history.json.tmp").exists());
        assert_eq!(store.len().await.unwrap(), 0);
        assert!(store.get("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = JsonFileStore::open(&path).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_empty_file_is_empty_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "\n").unwrap();

        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 0);
    }
}
