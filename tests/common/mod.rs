#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use futures_util::stream::{self, StreamExt};
use memoryweave::answer::{GenerationProvider, StreamEvent, TokenStream};
use memoryweave::embeddings::EmbeddingProvider;
use memoryweave::store::{InMemoryStore, MemoryStore, RecordingRow, TranscriptRow};
use memoryweave::transcript::{Utterance, Word};
use memoryweave::types::MemoryError;

/// Install a fmt subscriber honoring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Word fixtures at half-second cadence with uniform confidence.
pub fn spoken_words(text: &str) -> Vec<Word> {
    text.split_whitespace()
        .enumerate()
        .map(|(i, w)| {
            let start = i as f64 * 0.5;
            Word::new(w, start, start + 0.4, 0.9)
        })
        .collect()
}

pub fn utterance_of(speaker: &str, text: &str) -> Utterance {
    Utterance::new(speaker, text, spoken_words(text))
}

/// Insert a recording plus transcript, back-dated by `days_ago` so ordering
/// tests have distinct timestamps.
pub async fn seed_recording(
    store: &InMemoryStore,
    title: &str,
    text: &str,
    days_ago: i64,
) -> RecordingRow {
    let mut recording = RecordingRow::new(title, 60.0);
    recording.created_at = Utc::now() - Duration::days(days_ago);
    store.insert_recording(&recording).await.unwrap();
    store
        .insert_transcript(&TranscriptRow {
            recording_id: recording.id.clone(),
            text: text.to_string(),
            language: "en".to_string(),
            words: spoken_words(text),
            utterances: None,
        })
        .await
        .unwrap();
    recording
}

/// Generation provider that replays a fixed token script.
pub struct ScriptedGeneration {
    tokens: Vec<String>,
    mode: GenerationMode,
}

#[derive(Clone, Copy)]
pub enum GenerationMode {
    Ok,
    /// `stream_completion` itself fails.
    FailToStart,
    /// The stream yields this many tokens, then breaks.
    FailAfter(usize),
}

impl ScriptedGeneration {
    pub fn new(tokens: &[&str]) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            mode: GenerationMode::Ok,
        }
    }

    pub fn failing_to_start() -> Self {
        Self {
            tokens: vec![],
            mode: GenerationMode::FailToStart,
        }
    }

    pub fn failing_after(tokens: &[&str], after: usize) -> Self {
        Self {
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            mode: GenerationMode::FailAfter(after),
        }
    }

    pub fn shared(self) -> Arc<dyn GenerationProvider> {
        Arc::new(self)
    }
}

#[async_trait]
impl GenerationProvider for ScriptedGeneration {
    async fn stream_completion(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> Result<TokenStream, MemoryError> {
        match self.mode {
            GenerationMode::FailToStart => {
                Err(MemoryError::Generation("scripted startup failure".into()))
            }
            GenerationMode::Ok => {
                let tokens: Vec<Result<String, MemoryError>> =
                    self.tokens.iter().cloned().map(Ok).collect();
                Ok(stream::iter(tokens).boxed())
            }
            GenerationMode::FailAfter(after) => {
                let mut items: Vec<Result<String, MemoryError>> =
                    self.tokens.iter().take(after).cloned().map(Ok).collect();
                items.push(Err(MemoryError::Generation("scripted mid-stream failure".into())));
                Ok(stream::iter(items).boxed())
            }
        }
    }
}

/// Embedding provider whose every call fails.
pub struct FailingEmbeddingProvider;

#[async_trait]
impl EmbeddingProvider for FailingEmbeddingProvider {
    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, MemoryError> {
        Err(MemoryError::Embedding("scripted embedding failure".into()))
    }

    fn dimensions(&self) -> usize {
        8
    }

    fn id(&self) -> &str {
        "failing"
    }
}

/// Drain every event currently buffered on the channel.
pub fn drain_events(rx: &flume::Receiver<StreamEvent>) -> Vec<StreamEvent> {
    rx.try_iter().collect()
}

/// Compact shape of an event sequence for assertions.
pub fn event_kinds(events: &[StreamEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|event| match event {
            StreamEvent::Status { .. } => "status",
            StreamEvent::Token { .. } => "token",
            StreamEvent::Sources { .. } => "sources",
            StreamEvent::Suggestions { .. } => "suggestions",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Done => "done",
        })
        .collect()
}
