//! Relational store for recordings, transcripts, and embedding records.
//!
//! The [`MemoryStore`] trait is the pipeline's view of the store: simple
//! CRUD plus the case-insensitive keyword search that anchors the retrieval
//! baseline. A SQLite implementation ships behind the `sqlite` feature; an
//! in-memory implementation is always available for tests and store-less
//! deployments.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chunking::Chunk;
use crate::transcript::{Utterance, Word};
use crate::types::Result;
use crate::vector_index::chunk_vector_id;

pub use memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteMemoryStore;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecordingRow {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

impl RecordingRow {
    pub fn new(title: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: Utc::now(),
            duration_seconds,
        }
    }

    /// Recording date as `YYYY-MM-DD`, used in citations and vector metadata.
    pub fn date(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TranscriptRow {
    pub recording_id: String,
    pub text: String,
    pub language: String,
    pub words: Vec<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utterances: Option<Vec<Utterance>>,
}

/// Persisted 1:1 with each chunk after a successful vector upsert.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRow {
    pub id: String,
    pub recording_id: String,
    pub chunk_text: String,
    pub chunk_index: usize,
    pub vector_id: String,
}

impl EmbeddingRow {
    pub fn for_chunk(recording_id: &str, chunk: &Chunk) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            recording_id: recording_id.to_string(),
            chunk_text: chunk.text.clone(),
            chunk_index: chunk.index,
            vector_id: chunk_vector_id(recording_id, chunk.index),
        }
    }
}

/// One keyword-search hit: the whole transcript text plus recording context.
#[derive(Clone, Debug, PartialEq)]
pub struct KeywordHit {
    pub recording_id: String,
    /// Recording date as `YYYY-MM-DD`.
    pub date: String,
    pub text: String,
}

#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn insert_recording(&self, recording: &RecordingRow) -> Result<()>;

    async fn recording(&self, id: &str) -> Result<Option<RecordingRow>>;

    async fn insert_transcript(&self, transcript: &TranscriptRow) -> Result<()>;

    async fn transcript(&self, recording_id: &str) -> Result<Option<TranscriptRow>>;

    /// Case-insensitive substring search over transcript text, newest
    /// recordings first, at most `limit` hits.
    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>>;

    async fn insert_embeddings(&self, rows: &[EmbeddingRow]) -> Result<()>;

    async fn embeddings_for(&self, recording_id: &str) -> Result<Vec<EmbeddingRow>>;

    /// Delete a recording with its transcript and embedding rows.
    async fn delete_recording(&self, recording_id: &str) -> Result<()>;
}
