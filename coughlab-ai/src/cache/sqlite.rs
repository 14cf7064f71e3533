//! SQLite backend
//!
//! One row per hash; writes are single-statement upserts so there is no
//! read-modify-write window.

use std::path::Path;

use async_trait::async_trait;
use coughlab_common::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use super::{InsertOutcome, PredictionStore};
use crate::models::PredictionRecord;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) a database file
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // mode=rwc: read, write, create
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        tracing::debug!("Connecting to prediction database: {}", db_url);

        let pool = SqlitePool::connect(&db_url).await?;
        Self::from_pool(pool).await
    }

    /// Private in-memory database
    ///
    /// Pinned to a single long-lived connection: every new in-memory
    /// connection would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        init_tables(&pool).await?;
        Ok(Self { pool })
    }
}

/// Create the predictions table if it does not exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS predictions (
            hash TEXT PRIMARY KEY,
            record TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::debug!("Prediction table initialized");
    Ok(())
}

#[async_trait]
impl PredictionStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn get(&self, hash: &str) -> Result<Option<PredictionRecord>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT record FROM predictions WHERE hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, hash: &str, record: &PredictionRecord) -> Result<()> {
        let json = serde_json::to_string(record)?;

        sqlx::query(
            r#"
            INSERT INTO predictions (hash, record, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(hash) DO UPDATE SET record = excluded.record
            "#,
        )
        .bind(hash)
        .bind(json)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::debug!(hash = %hash, "Stored prediction");
        Ok(())
    }

    async fn insert_if_absent(&self, hash: &str, record: PredictionRecord) -> Result<InsertOutcome> {
        let json = serde_json::to_string(&record)?;

        let result = sqlx::query(
            r#"
            INSERT INTO predictions (hash, record, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(hash) DO NOTHING
            "#,
        )
        .bind(hash)
        .bind(json)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(InsertOutcome::Inserted(record));
        }

        match self.get(hash).await? {
            Some(existing) => Ok(InsertOutcome::Existing(existing)),
            None => Err(coughlab_common::Error::Internal(format!(
                "Prediction {} vanished after conflicting insert",
                hash
            ))),
        }
    }

    async fn len(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as usize)
    }
}
