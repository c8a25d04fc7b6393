//! SQLite-backed store via `sqlx`.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};

use super::{EmbeddingRow, KeywordHit, MemoryStore, RecordingRow, TranscriptRow};
use crate::types::{MemoryError, Result};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS recordings (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    created_at TEXT NOT NULL,
    duration_seconds REAL NOT NULL
);
CREATE TABLE IF NOT EXISTS transcripts (
    recording_id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    language TEXT NOT NULL,
    words TEXT NOT NULL,
    utterances TEXT
);
CREATE TABLE IF NOT EXISTS embeddings (
    id TEXT PRIMARY KEY,
    recording_id TEXT NOT NULL,
    chunk_text TEXT NOT NULL,
    chunk_index INTEGER NOT NULL,
    vector_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_embeddings_recording ON embeddings (recording_id);
"#;

pub struct SqliteMemoryStore {
    pool: SqlitePool,
}

impl SqliteMemoryStore {
    /// Open (creating if missing) a database at the given sqlx URL, e.g.
    /// `sqlite:memories.db`.
    pub async fn open(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(storage_err)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database, pinned to a single connection so the
    /// data survives across pool checkouts. Intended for tests.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(storage_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(storage_err)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(storage_err)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn storage_err(err: impl std::fmt::Display) -> MemoryError {
    MemoryError::Storage(err.to_string())
}

/// Escape LIKE metacharacters so the query matches as a literal substring.
fn escape_like(query: &str) -> String {
    query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn recording_from_row(row: &SqliteRow) -> Result<RecordingRow> {
    let created_at: String = row.try_get("created_at").map_err(storage_err)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(storage_err)?
        .with_timezone(&Utc);
    Ok(RecordingRow {
        id: row.try_get("id").map_err(storage_err)?,
        title: row.try_get("title").map_err(storage_err)?,
        created_at,
        duration_seconds: row.try_get("duration_seconds").map_err(storage_err)?,
    })
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn insert_recording(&self, recording: &RecordingRow) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO recordings (id, title, created_at, duration_seconds) \
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&recording.id)
        .bind(&recording.title)
        .bind(recording.created_at.to_rfc3339())
        .bind(recording.duration_seconds)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn recording(&self, id: &str) -> Result<Option<RecordingRow>> {
        let row = sqlx::query("SELECT id, title, created_at, duration_seconds FROM recordings WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(recording_from_row).transpose()
    }

    async fn insert_transcript(&self, transcript: &TranscriptRow) -> Result<()> {
        let words = serde_json::to_string(&transcript.words).map_err(storage_err)?;
        let utterances = transcript
            .utterances
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(storage_err)?;
        sqlx::query(
            "INSERT OR REPLACE INTO transcripts (recording_id, text, language, words, utterances) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&transcript.recording_id)
        .bind(&transcript.text)
        .bind(&transcript.language)
        .bind(words)
        .bind(utterances)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn transcript(&self, recording_id: &str) -> Result<Option<TranscriptRow>> {
        let row = sqlx::query(
            "SELECT recording_id, text, language, words, utterances FROM transcripts \
             WHERE recording_id = ?1",
        )
        .bind(recording_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let words: String = row.try_get("words").map_err(storage_err)?;
        let utterances: Option<String> = row.try_get("utterances").map_err(storage_err)?;
        Ok(Some(TranscriptRow {
            recording_id: row.try_get("recording_id").map_err(storage_err)?,
            text: row.try_get("text").map_err(storage_err)?,
            language: row.try_get("language").map_err(storage_err)?,
            words: serde_json::from_str(&words).map_err(storage_err)?,
            utterances: utterances
                .map(|u| serde_json::from_str(&u))
                .transpose()
                .map_err(storage_err)?,
        }))
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let rows = sqlx::query(
            "SELECT t.recording_id, t.text, r.created_at FROM transcripts t \
             JOIN recordings r ON r.id = t.recording_id \
             WHERE lower(t.text) LIKE '%' || lower(?1) || '%' ESCAPE '\\' \
             ORDER BY r.created_at DESC LIMIT ?2",
        )
        .bind(escape_like(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                let created_at: String = row.try_get("created_at").map_err(storage_err)?;
                let created_at = DateTime::parse_from_rfc3339(&created_at)
                    .map_err(storage_err)?
                    .with_timezone(&Utc);
                Ok(KeywordHit {
                    recording_id: row.try_get("recording_id").map_err(storage_err)?,
                    date: created_at.format("%Y-%m-%d").to_string(),
                    text: row.try_get("text").map_err(storage_err)?,
                })
            })
            .collect()
    }

    async fn insert_embeddings(&self, rows: &[EmbeddingRow]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for row in rows {
            sqlx::query(
                "INSERT OR REPLACE INTO embeddings (id, recording_id, chunk_text, chunk_index, vector_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&row.id)
            .bind(&row.recording_id)
            .bind(&row.chunk_text)
            .bind(row.chunk_index as i64)
            .bind(&row.vector_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }
        tx.commit().await.map_err(storage_err)
    }

    async fn embeddings_for(&self, recording_id: &str) -> Result<Vec<EmbeddingRow>> {
        let rows = sqlx::query(
            "SELECT id, recording_id, chunk_text, chunk_index, vector_id FROM embeddings \
             WHERE recording_id = ?1 ORDER BY chunk_index",
        )
        .bind(recording_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter()
            .map(|row| {
                let chunk_index: i64 = row.try_get("chunk_index").map_err(storage_err)?;
                Ok(EmbeddingRow {
                    id: row.try_get("id").map_err(storage_err)?,
                    recording_id: row.try_get("recording_id").map_err(storage_err)?,
                    chunk_text: row.try_get("chunk_text").map_err(storage_err)?,
                    chunk_index: chunk_index as usize,
                    vector_id: row.try_get("vector_id").map_err(storage_err)?,
                })
            })
            .collect()
    }

    async fn delete_recording(&self, recording_id: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        sqlx::query("DELETE FROM embeddings WHERE recording_id = ?1")
            .bind(recording_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        sqlx::query("DELETE FROM transcripts WHERE recording_id = ?1")
            .bind(recording_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        sqlx::query("DELETE FROM recordings WHERE id = ?1")
            .bind(recording_id)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        tx.commit().await.map_err(storage_err)
    }
}
