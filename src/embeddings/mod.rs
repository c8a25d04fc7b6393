//! Embedding provider gateway.
//!
//! Thin interface to an external embedding service. The pipeline treats
//! every call as fallible and best-effort: a failed embedding pass leaves a
//! recording keyword-searchable but not semantically indexed.

use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::MemoryError;

/// Batch embedding interface: one vector per input text, same order, fixed
/// dimensionality.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError>;

    /// Dimensionality of every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Stable identifier for logging and telemetry.
    fn id(&self) -> &str;
}

/// Default embedding model served by the OpenAI-compatible gateway.
pub const EMBEDDING_MODEL: &str = "text-embedding-3-large";
pub const EMBEDDING_DIMENSIONS: usize = 3072;

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// HTTP gateway to an OpenAI-compatible `/v1/embeddings` endpoint.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: EMBEDDING_MODEL.to_string(),
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }

    /// Build from `OPENAI_API_KEY`; `None` when the key is absent, in which
    /// case the caller runs without the semantic branch.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        std::env::var("OPENAI_API_KEY").ok().map(Self::new)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingsRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions,
        };
        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| MemoryError::Embedding(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::Embedding(format!(
                "embedding API error {status}: {body}"
            )));
        }

        let mut parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|err| MemoryError::Embedding(err.to_string()))?;
        if parsed.data.len() != texts.len() {
            return Err(MemoryError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }
        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn id(&self) -> &str {
        &self.model
    }
}

/// Deterministic hash-seeded embeddings for tests and offline runs.
///
/// Identical texts always map to identical unit vectors; distinct texts map
/// to distinct ones with overwhelming probability.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self { dimensions: 32 }
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut hasher = rustc_hash::FxHasher::default();
        text.hash(&mut hasher);
        let mut state = hasher.finish() | 1;

        let mut values = Vec::with_capacity(self.dimensions);
        for _ in 0..self.dimensions {
            // xorshift keeps the sequence deterministic per seed
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            values.push(((state % 2000) as f32 / 1000.0) - 1.0);
        }
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut values {
                *v /= norm;
            }
        }
        values
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn id(&self) -> &str {
        "mock"
    }
}
