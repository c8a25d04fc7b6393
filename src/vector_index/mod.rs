//! Vector index gateway.
//!
//! Thin interface to an external nearest-neighbor index. Upserts are batched
//! (at most [`UPSERT_BATCH_SIZE`] records per network call); deletion is by
//! recording so a purge can never leave orphaned vectors behind.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::chunking::Chunk;
use crate::types::MemoryError;

/// Maximum records per upsert network call.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Metadata chunk text is truncated to this many characters before upsert.
pub const METADATA_TEXT_CHARS: usize = 1000;

/// Citation metadata stored alongside each vector.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VectorMetadata {
    pub recording_id: String,
    pub chunk_index: usize,
    pub chunk_text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Recording date, `YYYY-MM-DD`.
    pub date: String,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl VectorRecord {
    /// Build the upsert record for one chunk. The id doubles as the
    /// embedding-store key: `"{recording_id}_chunk_{index}"`.
    pub fn for_chunk(recording_id: &str, chunk: &Chunk, values: Vec<f32>, date: &str) -> Self {
        Self {
            id: chunk_vector_id(recording_id, chunk.index),
            values,
            metadata: VectorMetadata {
                recording_id: recording_id.to_string(),
                chunk_index: chunk.index,
                chunk_text: chunk.text.chars().take(METADATA_TEXT_CHARS).collect(),
                start_seconds: chunk.start_seconds,
                end_seconds: chunk.end_seconds,
                date: date.to_string(),
                confidence: chunk.avg_confidence,
                speaker: chunk.speaker.clone(),
            },
        }
    }
}

/// Key under which a chunk's vector is stored.
pub fn chunk_vector_id(recording_id: &str, chunk_index: usize) -> String {
    format!("{recording_id}_chunk_{chunk_index}")
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// Nearest-neighbor index interface. All methods are fallible remote calls;
/// callers catch failures and continue without semantic results.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Upsert records, batching network calls. Returns the number upserted.
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, MemoryError>;

    /// Ranked nearest matches for a query vector, best first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, MemoryError>;

    /// Remove every vector belonging to a recording.
    async fn delete_by_recording(&self, recording_id: &str) -> Result<(), MemoryError>;
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

/// REST gateway to a Pinecone-style vector index.
pub struct RestVectorIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestVectorIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Build from `VECTOR_INDEX_URL` / `VECTOR_INDEX_API_KEY`; `None` when
    /// no index is configured.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        let base_url = std::env::var("VECTOR_INDEX_URL").ok()?;
        let mut index = Self::new(base_url);
        index.api_key = std::env::var("VECTOR_INDEX_API_KEY").ok();
        Some(index)
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Result<reqwest::Response, MemoryError> {
        let mut request = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Api-Key", key);
        }
        let response = request
            .send()
            .await
            .map_err(|err| MemoryError::VectorIndex(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::VectorIndex(format!(
                "index API error {status}: {body}"
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl VectorIndex for RestVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, MemoryError> {
        let total = records.len();
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            self.post("/vectors/upsert", json!({ "vectors": batch }))
                .await?;
        }
        Ok(total)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, MemoryError> {
        let response = self
            .post(
                "/query",
                json!({
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": true,
                }),
            )
            .await?;
        let parsed: QueryResponse = response
            .json()
            .await
            .map_err(|err| MemoryError::VectorIndex(err.to_string()))?;
        Ok(parsed.matches)
    }

    async fn delete_by_recording(&self, recording_id: &str) -> Result<(), MemoryError> {
        self.post(
            "/vectors/delete",
            json!({ "filter": { "recording_id": { "$eq": recording_id } } }),
        )
        .await?;
        Ok(())
    }
}

/// In-memory cosine-similarity index for tests and offline deployments.
#[derive(Default)]
pub struct InMemoryVectorIndex {
    records: RwLock<Vec<VectorRecord>>,
}

impl InMemoryVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("index lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(&self, records: Vec<VectorRecord>) -> Result<usize, MemoryError> {
        let count = records.len();
        let mut stored = self.records.write().expect("index lock poisoned");
        for record in records {
            if let Some(existing) = stored.iter_mut().find(|r| r.id == record.id) {
                *existing = record;
            } else {
                stored.push(record);
            }
        }
        Ok(count)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>, MemoryError> {
        let stored = self.records.read().expect("index lock poisoned");
        let mut matches: Vec<VectorMatch> = stored
            .iter()
            .map(|record| VectorMatch {
                id: record.id.clone(),
                score: cosine_similarity(vector, &record.values),
                metadata: record.metadata.clone(),
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete_by_recording(&self, recording_id: &str) -> Result<(), MemoryError> {
        self.records
            .write()
            .expect("index lock poisoned")
            .retain(|r| r.metadata.recording_id != recording_id);
        Ok(())
    }
}
