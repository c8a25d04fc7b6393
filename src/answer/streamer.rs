//! Drives one query through retrieval and generation, emitting
//! [`StreamEvent`]s as it goes.

use std::sync::Arc;

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::retrieval::{HybridRetriever, RetrievedSource};
use crate::types::{MIN_QUERY_LEN, MemoryError, Result};

use super::event::StreamEvent;
use super::generation::GenerationProvider;
use super::prompt::{SYSTEM_PROMPT, build_grounding_prompt};

pub const SEARCHING_MESSAGE: &str = "Searching your memories...";

pub const NO_MATCHES_MESSAGE: &str = "I couldn't find any recordings that match your \
question. Try recording more memories or asking a different question.";

/// Fixed follow-ups sent after every non-empty answer.
pub const FOLLOW_UP_SUGGESTIONS: [&str; 3] = [
    "Tell me more about this",
    "What else happened that day?",
    "Any related memories?",
];

/// Excerpt fallback quotes at most this many sources.
const EXCERPT_SOURCES: usize = 3;
const EXCERPT_CHARS: usize = 200;

pub struct AnswerStreamer {
    retriever: HybridRetriever,
    generation: Option<Arc<dyn GenerationProvider>>,
}

impl AnswerStreamer {
    /// Streamer without a generation provider; answers fall back to raw
    /// excerpts.
    pub fn new(retriever: HybridRetriever) -> Self {
        Self {
            retriever,
            generation: None,
        }
    }

    #[must_use]
    pub fn with_generation(mut self, provider: Arc<dyn GenerationProvider>) -> Self {
        self.generation = Some(provider);
        self
    }

    /// Answer one query, emitting events on `events`. The stream always ends
    /// with exactly one terminal event unless the receiver is dropped, which
    /// is treated as cancellation.
    pub async fn stream_answer(&self, query: &str, events: &flume::Sender<StreamEvent>) {
        match self.run(query, events).await {
            Ok(()) => {}
            Err(MemoryError::ChannelClosed) => {
                debug!(query, "answer stream cancelled by receiver");
            }
            Err(err) => {
                let _ = events.send(StreamEvent::error(err.to_string()));
            }
        }
    }

    async fn run(&self, query: &str, events: &flume::Sender<StreamEvent>) -> Result<()> {
        let query = query.trim();
        let len = query.chars().count();
        if len < MIN_QUERY_LEN {
            return Err(MemoryError::QueryTooShort {
                len,
                min: MIN_QUERY_LEN,
            });
        }

        send(events, StreamEvent::status(SEARCHING_MESSAGE))?;

        let sources = self.retriever.retrieve(query).await?;
        if sources.is_empty() {
            send(events, StreamEvent::token(NO_MATCHES_MESSAGE))?;
            send(events, StreamEvent::Sources { sources: vec![] })?;
            send(events, StreamEvent::Done)?;
            return Ok(());
        }

        send(
            events,
            StreamEvent::Sources {
                sources: sources.clone(),
            },
        )?;

        match &self.generation {
            Some(provider) => {
                self.answer_with_provider(provider.as_ref(), query, &sources, events)
                    .await?
            }
            None => excerpt_fallback(&sources, events)?,
        }

        send(
            events,
            StreamEvent::Suggestions {
                suggestions: FOLLOW_UP_SUGGESTIONS.iter().map(|s| s.to_string()).collect(),
            },
        )?;
        send(events, StreamEvent::Done)
    }

    async fn answer_with_provider(
        &self,
        provider: &dyn GenerationProvider,
        query: &str,
        sources: &[RetrievedSource],
        events: &flume::Sender<StreamEvent>,
    ) -> Result<()> {
        let dates = unique_dates(sources);
        send(
            events,
            StreamEvent::status(format!(
                "Analyzing {} recordings from {}...",
                sources.len(),
                dates.join(", ")
            )),
        )?;

        let prompt = build_grounding_prompt(query, sources);
        let mut tokens = match provider.stream_completion(SYSTEM_PROMPT, &prompt).await {
            Ok(tokens) => tokens,
            Err(err) => {
                warn!(error = %err, "generation unavailable, falling back to excerpts");
                return excerpt_fallback(sources, events);
            }
        };

        let mut relayed = false;
        while let Some(token) = tokens.next().await {
            match token {
                Ok(content) => {
                    send(events, StreamEvent::token(content))?;
                    relayed = true;
                }
                Err(err) if relayed => {
                    // A partial answer already went out; close it rather
                    // than restarting with excerpts.
                    warn!(error = %err, "generation stream broke mid-answer");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "generation stream failed before first token");
                    return excerpt_fallback(sources, events);
                }
            }
        }
        Ok(())
    }
}

fn unique_dates(sources: &[RetrievedSource]) -> Vec<String> {
    let mut seen = rustc_hash::FxHashSet::default();
    sources
        .iter()
        .filter(|s| seen.insert(s.date.clone()))
        .map(|s| s.date.clone())
        .take(3)
        .collect()
}

fn excerpt_fallback(
    sources: &[RetrievedSource],
    events: &flume::Sender<StreamEvent>,
) -> Result<()> {
    send(
        events,
        StreamEvent::token(format!(
            "Found {} relevant recordings. Here are some excerpts:\n\n",
            sources.len()
        )),
    )?;
    for source in sources.iter().take(EXCERPT_SOURCES) {
        let excerpt: String = source.chunk_text.chars().take(EXCERPT_CHARS).collect();
        send(
            events,
            StreamEvent::token(format!("From {}: \"{}...\"\n\n", source.date, excerpt)),
        )?;
    }
    Ok(())
}

fn send(events: &flume::Sender<StreamEvent>, event: StreamEvent) -> Result<()> {
    events.send(event).map_err(|_| MemoryError::ChannelClosed)
}
