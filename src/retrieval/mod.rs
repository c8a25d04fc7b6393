//! Hybrid retrieval: semantic nearest-neighbor search merged with a keyword
//! baseline over raw transcript text.
//!
//! The two branches run concurrently. The semantic branch is best-effort and
//! degrades to nothing when the embedding provider or vector index is absent
//! or failing; the keyword branch is the baseline and its storage errors
//! propagate. Results are deduplicated per recording with semantic matches
//! winning, then ranked by relevance and capped at [`TOP_K`].

use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::embeddings::EmbeddingProvider;
use crate::store::MemoryStore;
use crate::types::Result;
use crate::vector_index::{VectorIndex, VectorMatch};

/// Maximum sources returned per query.
pub const TOP_K: usize = 5;

/// Fixed relevance assigned to keyword hits. Semantic scores are cosine
/// similarities in the same 0..=1 range, so 0.5 lets a strong semantic match
/// outrank a keyword hit while a weak one falls below it.
pub const KEYWORD_RELEVANCE: f32 = 0.5;

/// Keyword hits carry whole transcripts; excerpt them to this many chars.
pub const KEYWORD_EXCERPT_CHARS: usize = 500;

/// One retrieved source, normalized across both branches.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RetrievedSource {
    pub recording_id: String,
    /// Recording date, `YYYY-MM-DD`.
    pub date: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub chunk_text: String,
    pub relevance_score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl RetrievedSource {
    fn from_match(m: VectorMatch) -> Self {
        Self {
            recording_id: m.metadata.recording_id,
            date: m.metadata.date,
            start_seconds: m.metadata.start_seconds,
            end_seconds: m.metadata.end_seconds,
            chunk_text: m.metadata.chunk_text,
            relevance_score: m.score,
            speaker: m.metadata.speaker,
        }
    }
}

pub struct HybridRetriever {
    store: Arc<dyn MemoryStore>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
}

impl HybridRetriever {
    /// Keyword-only retriever; the semantic branch stays empty.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            embeddings: None,
            index: None,
        }
    }

    #[must_use]
    pub fn with_semantic(
        mut self,
        embeddings: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        self.embeddings = Some(embeddings);
        self.index = Some(index);
        self
    }

    /// Run both branches concurrently, merge, dedup, rank, cap.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedSource>> {
        let (semantic, keyword) =
            tokio::join!(self.semantic_matches(query), self.keyword_sources(query));
        let keyword = keyword?;

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut sources: Vec<RetrievedSource> = Vec::new();
        for m in semantic {
            if seen.insert(m.metadata.recording_id.clone()) {
                sources.push(RetrievedSource::from_match(m));
            }
        }
        for source in keyword {
            if seen.insert(source.recording_id.clone()) {
                sources.push(source);
            }
        }

        sources.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        sources.truncate(TOP_K);
        Ok(sources)
    }

    /// Best-effort semantic branch. Failures are logged and swallowed so a
    /// flaky embedding service never takes the whole query down.
    async fn semantic_matches(&self, query: &str) -> Vec<VectorMatch> {
        let (Some(embeddings), Some(index)) = (&self.embeddings, &self.index) else {
            return Vec::new();
        };

        let vectors = match embeddings.embed(&[query.to_string()]).await {
            Ok(vectors) => vectors,
            Err(err) => {
                warn!(provider = embeddings.id(), error = %err, "query embedding failed");
                return Vec::new();
            }
        };
        let Some(vector) = vectors.first() else {
            return Vec::new();
        };

        match index.query(vector, TOP_K).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(error = %err, "vector index query failed");
                Vec::new()
            }
        }
    }

    async fn keyword_sources(&self, query: &str) -> Result<Vec<RetrievedSource>> {
        let hits = self.store.keyword_search(query, TOP_K).await?;
        Ok(hits
            .into_iter()
            .map(|hit| RetrievedSource {
                recording_id: hit.recording_id,
                date: hit.date,
                start_seconds: 0.0,
                end_seconds: 0.0,
                chunk_text: hit.text.chars().take(KEYWORD_EXCERPT_CHARS).collect(),
                relevance_score: KEYWORD_RELEVANCE,
                speaker: None,
            })
            .collect())
    }
}
