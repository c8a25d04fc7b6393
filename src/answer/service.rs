//! Session-level answer handling: one active answer at a time.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::debug;

use super::event::StreamEvent;
use super::streamer::AnswerStreamer;

/// Runs queries for one session. Submitting a new query aborts the one in
/// flight, so at most one answer streams at a time.
pub struct AnswerService {
    streamer: Arc<AnswerStreamer>,
    active: Mutex<Option<JoinHandle<()>>>,
}

impl AnswerService {
    pub fn new(streamer: AnswerStreamer) -> Self {
        Self {
            streamer: Arc::new(streamer),
            active: Mutex::new(None),
        }
    }

    /// Start answering `query`, superseding any in-flight answer. Dropping
    /// the returned receiver cancels the stream.
    pub fn submit(&self, query: impl Into<String>) -> flume::Receiver<StreamEvent> {
        let query = query.into();
        let (tx, rx) = flume::unbounded();
        let streamer = Arc::clone(&self.streamer);
        let handle = tokio::spawn(async move {
            streamer.stream_answer(&query, &tx).await;
        });

        let previous = self
            .active
            .lock()
            .expect("answer service lock poisoned")
            .replace(handle);
        if let Some(previous) = previous {
            debug!("superseding in-flight answer");
            previous.abort();
        }
        rx
    }
}

impl Drop for AnswerService {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.active.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}
