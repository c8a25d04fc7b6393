//! # Memoryweave: Spoken-Memory Retrieval Pipeline
//!
//! Memoryweave turns word-level voice transcripts into retrievable memory
//! chunks and answers natural-language questions about them with a streamed,
//! source-grounded response.
//!
//! ## Core Concepts
//!
//! - **Transcripts**: Word-level timing, confidence, and speaker labels,
//!   assembled live or supplied whole
//! - **Chunks**: Token-bounded, sentence-preserving slices of a transcript,
//!   carrying timing and citation metadata
//! - **Hybrid retrieval**: Semantic nearest-neighbor search merged with a
//!   keyword baseline, deduplicated per recording
//! - **Answer stream**: Status, token, source, and suggestion events over a
//!   channel, closed by exactly one terminal event
//!
//! ## Quick Start
//!
//! ### Chunking a transcript
//!
//! ```
//! use memoryweave::chunking::Chunker;
//! use memoryweave::transcript::{Utterance, Word};
//!
//! let words = vec![
//!     Word::new("We", 0.0, 0.3, 0.97),
//!     Word::new("made", 0.3, 0.6, 0.95),
//!     Word::new("pasta.", 0.6, 1.0, 0.99),
//! ];
//! let utterance = Utterance::new("A", "We made pasta.", words.clone());
//!
//! let chunks = Chunker::new().chunk_transcript(&words, Some(&[utterance]));
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].speaker.as_deref(), Some("A"));
//! ```
//!
//! ### Answering a question
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use memoryweave::answer::{AnswerStreamer, StreamEvent};
//! use memoryweave::retrieval::HybridRetriever;
//! use memoryweave::store::InMemoryStore;
//!
//! # async fn demo() {
//! let store = Arc::new(InMemoryStore::new());
//! let retriever = HybridRetriever::new(store);
//! let streamer = AnswerStreamer::new(retriever);
//!
//! let (tx, rx) = flume::unbounded();
//! streamer.stream_answer("what did we cook last week?", &tx).await;
//! while let Ok(event) = rx.try_recv() {
//!     if matches!(event, StreamEvent::Done | StreamEvent::Error { .. }) {
//!         break;
//!     }
//! }
//! # }
//! ```
//!
//! ## Degradation
//!
//! Every external provider is optional. Without an embedding provider or
//! vector index, retrieval is keyword-only; without a generation provider,
//! answers fall back to quoted excerpts. A recording is always
//! keyword-searchable the moment its transcript is stored, whether or not
//! indexing has run or succeeded.
//!
//! ## Module Guide
//!
//! - [`transcript`] - Words, utterances, and live transcript assembly
//! - [`chunking`] - Sentence segmentation, token counting, and the chunker
//! - [`embeddings`] - Embedding provider gateway and test mock
//! - [`vector_index`] - Vector index gateway with batched upserts
//! - [`store`] - Relational store trait with SQLite and in-memory backends
//! - [`retrieval`] - Hybrid semantic-plus-keyword retrieval
//! - [`answer`] - Streaming answer pipeline and session service
//! - [`ingestion`] - Background indexing pipeline and purge

pub mod answer;
pub mod chunking;
pub mod embeddings;
pub mod ingestion;
pub mod retrieval;
pub mod store;
pub mod transcript;
pub mod types;
pub mod vector_index;

pub use answer::{AnswerService, AnswerStreamer, StreamEvent};
pub use chunking::{Chunk, Chunker, ChunkerConfig};
pub use ingestion::{IndexOutcome, IndexingPipeline};
pub use retrieval::{HybridRetriever, RetrievedSource, TOP_K};
pub use transcript::{LiveTranscript, Transcript, Utterance, Word};
pub use types::{MemoryError, Result};
