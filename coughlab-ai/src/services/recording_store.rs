//! Saved uploads
//!
//! Each upload is written as `recording_<YYYYMMDD_HHMMSS>.<ext>`. Two uploads
//! in the same second get `_1`, `_2`, ... suffixes instead of overwriting.

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use coughlab_common::time::recording_stamp;
use coughlab_common::{Error, Result};
use tokio::io::AsyncWriteExt;

const MAX_SAME_SECOND: u32 = 1000;

/// A recording written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedRecording {
    pub path: PathBuf,
    pub filename: String,
}

/// Directory of saved recordings
#[derive(Debug, Clone)]
pub struct RecordingStore {
    dir: PathBuf,
}

impl RecordingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `bytes` under a name derived from `at`
    ///
    /// `extension` must be plain ASCII alphanumerics since it becomes part of
    /// a path inside the recordings directory.
    pub async fn save<Tz>(&self, bytes: &[u8], extension: &str, at: &DateTime<Tz>) -> Result<SavedRecording>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidInput(format!(
                "Recording extension '{}' is not alphanumeric",
                extension
            )));
        }

        tokio::fs::create_dir_all(&self.dir).await?;

        let base = format!("recording_{}", recording_stamp(at));

        for attempt in 0..MAX_SAME_SECOND {
            let filename = if attempt == 0 {
                format!("{}.{}", base, extension)
            } else {
                format!("{}_{}.{}", base, attempt, extension)
            };
            let path = self.dir.join(&filename);

            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(Error::Io(e)),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.sync_all().await
            }
            .await;
            drop(file);
            keep_or_remove(&path, written).await?;

            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Saved recording");
            return Ok(SavedRecording { path, filename });
        }

        Err(Error::Internal(format!(
            "Too many recordings named {} in one second",
            base
        )))
    }
}

/// Remove a recording whose write failed, so no partial file is left behind
async fn keep_or_remove(path: &Path, written: std::io::Result<()>) -> Result<()> {
    let Err(e) = written else {
        return Ok(());
    };

    if let Err(remove_err) = tokio::fs::remove_file(path).await {
        tracing::warn!(
            path = %path.display(),
            error = %remove_err,
            "Failed to remove partial recording"
        );
    }
    Err(Error::Io(e))
}
