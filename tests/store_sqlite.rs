#![cfg(feature = "sqlite")]

mod common;

use memoryweave::store::{EmbeddingRow, MemoryStore, RecordingRow, SqliteMemoryStore, TranscriptRow};
use memoryweave::transcript::Utterance;

use common::spoken_words;

fn transcript_row(recording_id: &str, text: &str, with_utterances: bool) -> TranscriptRow {
    let words = spoken_words(text);
    let utterances = with_utterances.then(|| vec![Utterance::new("A", text, words.clone())]);
    TranscriptRow {
        recording_id: recording_id.to_string(),
        text: text.to_string(),
        language: "en".to_string(),
        words,
        utterances,
    }
}

#[tokio::test]
async fn open_creates_the_database_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memories.db");
    let store = SqliteMemoryStore::open(&format!("sqlite://{}", path.display()))
        .await
        .unwrap();

    let recording = RecordingRow::new("persisted", 3.0);
    store.insert_recording(&recording).await.unwrap();

    assert!(path.exists());
    assert!(store.recording(&recording.id).await.unwrap().is_some());
}

#[tokio::test]
async fn recordings_and_transcripts_round_trip() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();

    let recording = RecordingRow::new("beach day", 120.5);
    store.insert_recording(&recording).await.unwrap();
    let transcript = transcript_row(&recording.id, "We swam all afternoon. The water was cold.", true);
    store.insert_transcript(&transcript).await.unwrap();

    let loaded = store.recording(&recording.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, recording.id);
    assert_eq!(loaded.title, "beach day");
    assert_eq!(loaded.duration_seconds, 120.5);
    assert_eq!(loaded.date(), recording.date());

    let loaded = store.transcript(&recording.id).await.unwrap().unwrap();
    assert_eq!(loaded, transcript);

    assert!(store.recording("missing").await.unwrap().is_none());
    assert!(store.transcript("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn transcript_without_utterances_round_trips_as_none() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();
    let recording = RecordingRow::new("note", 5.0);
    store.insert_recording(&recording).await.unwrap();

    let transcript = transcript_row(&recording.id, "quick reminder about keys", false);
    store.insert_transcript(&transcript).await.unwrap();

    let loaded = store.transcript(&recording.id).await.unwrap().unwrap();
    assert!(loaded.utterances.is_none());
    assert_eq!(loaded.words.len(), 4);
}

#[tokio::test]
async fn keyword_search_is_case_insensitive_and_newest_first() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();

    for i in 0..3 {
        let mut recording = RecordingRow::new(format!("memory {i}"), 10.0);
        recording.created_at = chrono::Utc::now() - chrono::Duration::days(3 - i);
        store.insert_recording(&recording).await.unwrap();
        store
            .insert_transcript(&transcript_row(
                &recording.id,
                &format!("We had LUNCH together, visit {i}."),
                false,
            ))
            .await
            .unwrap();
    }

    let hits = store.keyword_search("lunch", 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].text.contains("visit 2"));
    assert!(hits[1].text.contains("visit 1"));

    assert!(store.keyword_search("sailboat", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn keyword_search_treats_like_metacharacters_literally() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();

    let plain = RecordingRow::new("note", 5.0);
    store.insert_recording(&plain).await.unwrap();
    store
        .insert_transcript(&transcript_row(&plain.id, "just a plain note", false))
        .await
        .unwrap();

    let sale = RecordingRow::new("sale", 12.0);
    store.insert_recording(&sale).await.unwrap();
    store
        .insert_transcript(&transcript_row(
            &sale.id,
            "everything was 50% off at the market",
            false,
        ))
        .await
        .unwrap();

    // Metacharacters match only literally, never as wildcards.
    let hits = store.keyword_search("%", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].recording_id, sale.id);
    assert!(store.keyword_search("_lain", 5).await.unwrap().is_empty());

    let hits = store.keyword_search("50%", 5).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].recording_id, sale.id);
}

#[tokio::test]
async fn delete_cascades_across_tables() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();

    let recording = RecordingRow::new("to delete", 8.0);
    store.insert_recording(&recording).await.unwrap();
    store
        .insert_transcript(&transcript_row(&recording.id, "short note", false))
        .await
        .unwrap();
    store
        .insert_embeddings(&[EmbeddingRow {
            id: "e1".to_string(),
            recording_id: recording.id.clone(),
            chunk_text: "short note".to_string(),
            chunk_index: 0,
            vector_id: format!("{}_chunk_0", recording.id),
        }])
        .await
        .unwrap();
    assert_eq!(store.embeddings_for(&recording.id).await.unwrap().len(), 1);

    store.delete_recording(&recording.id).await.unwrap();
    assert!(store.recording(&recording.id).await.unwrap().is_none());
    assert!(store.transcript(&recording.id).await.unwrap().is_none());
    assert!(store.embeddings_for(&recording.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn embeddings_come_back_in_chunk_order() {
    let store = SqliteMemoryStore::open_in_memory().await.unwrap();
    let recording = RecordingRow::new("ordered", 20.0);
    store.insert_recording(&recording).await.unwrap();

    let rows: Vec<EmbeddingRow> = (0..4)
        .rev()
        .map(|i| EmbeddingRow {
            id: format!("e{i}"),
            recording_id: recording.id.clone(),
            chunk_text: format!("chunk {i}"),
            chunk_index: i,
            vector_id: format!("{}_chunk_{i}", recording.id),
        })
        .collect();
    store.insert_embeddings(&rows).await.unwrap();

    let loaded = store.embeddings_for(&recording.id).await.unwrap();
    let indices: Vec<usize> = loaded.iter().map(|r| r.chunk_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
}
