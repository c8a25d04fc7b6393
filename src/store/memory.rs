//! In-memory store for tests and store-less deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{EmbeddingRow, KeywordHit, MemoryStore, RecordingRow, TranscriptRow};
use crate::types::Result;

#[derive(Default)]
struct Tables {
    recordings: HashMap<String, RecordingRow>,
    transcripts: HashMap<String, TranscriptRow>,
    embeddings: Vec<EmbeddingRow>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn insert_recording(&self, recording: &RecordingRow) -> Result<()> {
        self.tables
            .write()
            .expect("store lock poisoned")
            .recordings
            .insert(recording.id.clone(), recording.clone());
        Ok(())
    }

    async fn recording(&self, id: &str) -> Result<Option<RecordingRow>> {
        Ok(self
            .tables
            .read()
            .expect("store lock poisoned")
            .recordings
            .get(id)
            .cloned())
    }

    async fn insert_transcript(&self, transcript: &TranscriptRow) -> Result<()> {
        self.tables
            .write()
            .expect("store lock poisoned")
            .transcripts
            .insert(transcript.recording_id.clone(), transcript.clone());
        Ok(())
    }

    async fn transcript(&self, recording_id: &str) -> Result<Option<TranscriptRow>> {
        Ok(self
            .tables
            .read()
            .expect("store lock poisoned")
            .transcripts
            .get(recording_id)
            .cloned())
    }

    async fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let needle = query.to_lowercase();
        let tables = self.tables.read().expect("store lock poisoned");

        let mut matched: Vec<(&TranscriptRow, &RecordingRow)> = tables
            .transcripts
            .values()
            .filter(|t| t.text.to_lowercase().contains(&needle))
            .filter_map(|t| tables.recordings.get(&t.recording_id).map(|r| (t, r)))
            .collect();
        matched.sort_by(|(_, a), (_, b)| b.created_at.cmp(&a.created_at));

        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(t, r)| KeywordHit {
                recording_id: t.recording_id.clone(),
                date: r.date(),
                text: t.text.clone(),
            })
            .collect())
    }

    async fn insert_embeddings(&self, rows: &[EmbeddingRow]) -> Result<()> {
        self.tables
            .write()
            .expect("store lock poisoned")
            .embeddings
            .extend(rows.iter().cloned());
        Ok(())
    }

    async fn embeddings_for(&self, recording_id: &str) -> Result<Vec<EmbeddingRow>> {
        Ok(self
            .tables
            .read()
            .expect("store lock poisoned")
            .embeddings
            .iter()
            .filter(|e| e.recording_id == recording_id)
            .cloned()
            .collect())
    }

    async fn delete_recording(&self, recording_id: &str) -> Result<()> {
        let mut tables = self.tables.write().expect("store lock poisoned");
        tables.recordings.remove(recording_id);
        tables.transcripts.remove(recording_id);
        tables.embeddings.retain(|e| e.recording_id != recording_id);
        Ok(())
    }
}
