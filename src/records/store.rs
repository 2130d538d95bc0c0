//! # Record Store
//!
//! Durable, append-only storage for transcription records.
//!
//! ## Contract:
//! - `append` assigns the id and timestamp and fails with a persistence error
//!   only when the underlying storage is unreachable
//! - `recent` is read-only, ordered newest first by `created_at` with ties
//!   broken by insertion order (newest insertion first)
//!
//! The SQLite implementation owns a connection pool created once at startup
//! and shared across requests; the pool handles its own synchronization.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::error::AppError;

use super::model::{NewTranscriptionRecord, TranscriptionRecord};

/// Storage contract for transcription outcomes.
///
/// Behind a trait so the pipeline and history service can be tested against
/// an in-memory fake.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a record, assigning its id and creation timestamp.
    async fn append(&self, record: NewTranscriptionRecord) -> Result<TranscriptionRecord, AppError>;

    /// Up to `limit` records, newest first.
    async fn recent(&self, limit: u32) -> Result<Vec<TranscriptionRecord>, AppError>;
}

/// SQLite-backed record store.
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Open (and create if missing) the database behind `url`.
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| AppError::ConfigError(format!("Invalid database URL: {}", e)))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| AppError::Persistence(format!("Failed to open record store: {}", e)))?;

        info!(url = %url, "Connected to record store");
        Ok(Self { pool })
    }

    /// Ensure the records table exists. Called once before serving.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transcription_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                audio_name TEXT NOT NULL,
                transcription_text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn append(&self, record: NewTranscriptionRecord) -> Result<TranscriptionRecord, AppError> {
        let created_at = Utc::now();

        let result = sqlx::query(
            "INSERT INTO transcription_records (audio_name, transcription_text, created_at) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(&record.audio_name)
        .bind(&record.transcription_text)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(TranscriptionRecord {
            id: result.last_insert_rowid(),
            audio_name: record.audio_name,
            transcription_text: record.transcription_text,
            created_at,
        })
    }

    async fn recent(&self, limit: u32) -> Result<Vec<TranscriptionRecord>, AppError> {
        let records = sqlx::query_as::<_, TranscriptionRecord>(
            "SELECT id, audio_name, transcription_text, created_at \
             FROM transcription_records \
             ORDER BY created_at DESC, id DESC \
             LIMIT ?1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

/// In-memory [`RecordStore`] fake shared by pipeline, history, and handler
/// tests.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemoryRecordStore {
        records: Mutex<Vec<TranscriptionRecord>>,
        fail_appends: bool,
    }

    impl MemoryRecordStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// A store whose `append` always reports the storage as unreachable.
        pub fn failing() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                fail_appends: true,
            }
        }

        pub fn snapshot(&self) -> Vec<TranscriptionRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RecordStore for MemoryRecordStore {
        async fn append(
            &self,
            record: NewTranscriptionRecord,
        ) -> Result<TranscriptionRecord, AppError> {
            if self.fail_appends {
                return Err(AppError::Persistence("record store offline".to_string()));
            }

            let mut records = self.records.lock().unwrap();
            let record = TranscriptionRecord {
                id: records.len() as i64 + 1,
                audio_name: record.audio_name,
                transcription_text: record.transcription_text,
                created_at: Utc::now(),
            };
            records.push(record.clone());
            Ok(record)
        }

        async fn recent(&self, limit: u32) -> Result<Vec<TranscriptionRecord>, AppError> {
            let mut records = self.records.lock().unwrap().clone();
            records.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then(b.id.cmp(&a.id))
            });
            records.truncate(limit as usize);
            Ok(records)
        }
    }
}
