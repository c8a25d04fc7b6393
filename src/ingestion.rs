//! Indexing pipeline: chunk a stored transcript, embed the chunks, and
//! upsert them into the vector index.
//!
//! Indexing runs after the transcript is already persisted and is
//! best-effort. A recording whose indexing pass fails (or that was ingested
//! with no semantic backend configured) stays keyword-searchable.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::chunking::Chunker;
use crate::embeddings::EmbeddingProvider;
use crate::store::{EmbeddingRow, MemoryStore};
use crate::types::{MemoryError, Result};
use crate::vector_index::{VectorIndex, VectorRecord};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexOutcome {
    pub chunk_count: usize,
    /// False when no semantic backend is configured or the transcript
    /// produced no chunks.
    pub indexed: bool,
}

pub struct IndexingPipeline {
    store: Arc<dyn MemoryStore>,
    embeddings: Option<Arc<dyn EmbeddingProvider>>,
    index: Option<Arc<dyn VectorIndex>>,
    chunker: Chunker,
}

impl IndexingPipeline {
    /// Pipeline without a semantic backend; indexing becomes a no-op.
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self {
            store,
            embeddings: None,
            index: None,
            chunker: Chunker::new(),
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

    #[must_use]
    pub fn with_chunker(mut self, chunker: Chunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Chunk, embed, and upsert one stored recording, then persist the
    /// embedding rows that tie chunks back to their vectors.
    pub async fn index_recording(&self, recording_id: &str) -> Result<IndexOutcome> {
        let (Some(embeddings), Some(index)) = (&self.embeddings, &self.index) else {
            debug!(recording_id, "no semantic backend configured, skipping indexing");
            return Ok(IndexOutcome {
                chunk_count: 0,
                indexed: false,
            });
        };

        let transcript = self
            .store
            .transcript(recording_id)
            .await?
            .ok_or_else(|| {
                MemoryError::Storage(format!("no transcript stored for recording {recording_id}"))
            })?;
        let date = match self.store.recording(recording_id).await? {
            Some(recording) => recording.date(),
            None => Utc::now().format("%Y-%m-%d").to_string(),
        };

        let chunks = self
            .chunker
            .chunk_transcript(&transcript.words, transcript.utterances.as_deref());
        if chunks.is_empty() {
            return Ok(IndexOutcome {
                chunk_count: 0,
                indexed: false,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embeddings.embed(&texts).await?;

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorRecord::for_chunk(recording_id, chunk, values, &date))
            .collect();
        index.upsert(records).await?;

        let rows: Vec<EmbeddingRow> = chunks
            .iter()
            .map(|chunk| EmbeddingRow::for_chunk(recording_id, chunk))
            .collect();
        self.store.insert_embeddings(&rows).await?;

        info!(
            recording_id,
            chunks = chunks.len(),
            provider = embeddings.id(),
            "recording indexed"
        );
        Ok(IndexOutcome {
            chunk_count: chunks.len(),
            indexed: true,
        })
    }

    /// Fire-and-forget indexing. Failures are logged, never surfaced; the
    /// recording remains keyword-searchable either way.
    pub fn spawn_index_recording(self: &Arc<Self>, recording_id: String) -> JoinHandle<()> {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = pipeline.index_recording(&recording_id).await {
                warn!(recording_id, error = %err, "background indexing failed");
            }
        })
    }

    /// Remove a recording everywhere. Vectors go first; an interrupted purge
    /// leaves store rows, never orphaned vectors.
    pub async fn purge(&self, recording_id: &str) -> Result<()> {
        if let Some(index) = &self.index {
            index.delete_by_recording(recording_id).await?;
        }
        self.store.delete_recording(recording_id).await
    }
}
