mod common;

use std::sync::Arc;

use memoryweave::embeddings::MockEmbeddingProvider;
use memoryweave::ingestion::IndexingPipeline;
use memoryweave::store::{InMemoryStore, MemoryStore, RecordingRow, TranscriptRow};
use memoryweave::transcript::Utterance;
use memoryweave::types::MemoryError;
use memoryweave::vector_index::{InMemoryVectorIndex, chunk_vector_id};

use common::{FailingEmbeddingProvider, init_tracing, spoken_words};

async fn seed_with_utterances(store: &InMemoryStore, text: &str) -> RecordingRow {
    let recording = RecordingRow::new("seeded", 45.0);
    store.insert_recording(&recording).await.unwrap();
    let words = spoken_words(text);
    store
        .insert_transcript(&TranscriptRow {
            recording_id: recording.id.clone(),
            text: text.to_string(),
            language: "en".to_string(),
            words: words.clone(),
            utterances: Some(vec![Utterance::new("A", text, words)]),
        })
        .await
        .unwrap();
    recording
}

#[tokio::test]
async fn indexing_upserts_vectors_and_persists_rows() {
    init_tracing();
    let store = Arc::new(InMemoryStore::new());
    let recording = seed_with_utterances(&store, "We planted tomatoes. Then we watered them.").await;

    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = IndexingPipeline::new(store.clone())
        .with_semantic(Arc::new(MockEmbeddingProvider::new()), index.clone());

    let outcome = pipeline.index_recording(&recording.id).await.unwrap();
    assert!(outcome.indexed);
    assert!(outcome.chunk_count >= 1);
    assert_eq!(index.len(), outcome.chunk_count);

    let rows = store.embeddings_for(&recording.id).await.unwrap();
    assert_eq!(rows.len(), outcome.chunk_count);
    for row in &rows {
        assert_eq!(row.vector_id, chunk_vector_id(&recording.id, row.chunk_index));
    }
}

#[tokio::test]
async fn without_semantic_backend_indexing_is_a_noop() {
    let store = Arc::new(InMemoryStore::new());
    let recording = seed_with_utterances(&store, "Just a short note.").await;

    let pipeline = IndexingPipeline::new(store.clone());
    let outcome = pipeline.index_recording(&recording.id).await.unwrap();

    assert!(!outcome.indexed);
    assert_eq!(outcome.chunk_count, 0);
    assert!(store.embeddings_for(&recording.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_transcript_is_a_storage_error() {
    let store = Arc::new(InMemoryStore::new());
    let pipeline = IndexingPipeline::new(store).with_semantic(
        Arc::new(MockEmbeddingProvider::new()),
        Arc::new(InMemoryVectorIndex::new()),
    );

    let err = pipeline.index_recording("missing").await.unwrap_err();
    assert!(matches!(err, MemoryError::Storage(_)));
}

#[tokio::test]
async fn purge_removes_vectors_and_store_rows() {
    let store = Arc::new(InMemoryStore::new());
    let recording = seed_with_utterances(&store, "A memory worth forgetting.").await;

    let index = Arc::new(InMemoryVectorIndex::new());
    let pipeline = IndexingPipeline::new(store.clone())
        .with_semantic(Arc::new(MockEmbeddingProvider::new()), index.clone());
    pipeline.index_recording(&recording.id).await.unwrap();
    assert!(!index.is_empty());

    pipeline.purge(&recording.id).await.unwrap();
    assert!(index.is_empty());
    assert!(store.recording(&recording.id).await.unwrap().is_none());
    assert!(store.transcript(&recording.id).await.unwrap().is_none());
    assert!(store.embeddings_for(&recording.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn background_indexing_failure_is_swallowed() {
    let store = Arc::new(InMemoryStore::new());
    let recording = seed_with_utterances(&store, "This one will not embed.").await;

    let pipeline = Arc::new(IndexingPipeline::new(store.clone()).with_semantic(
        Arc::new(FailingEmbeddingProvider),
        Arc::new(InMemoryVectorIndex::new()),
    ));
    pipeline
        .spawn_index_recording(recording.id.clone())
        .await
        .unwrap();

    // Failed indexing leaves the recording keyword-searchable and unindexed.
    assert!(store.embeddings_for(&recording.id).await.unwrap().is_empty());
    assert_eq!(store.keyword_search("embed", 5).await.unwrap().len(), 1);
}
