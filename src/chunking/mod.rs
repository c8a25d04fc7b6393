//! Transcript chunking pipeline: sentence segmentation, token estimation,
//! and the bounded, overlap-aware chunker.

pub mod chunker;
pub mod segmenter;
pub mod tokenizer;

pub use chunker::{Chunk, Chunker, ChunkerConfig, MAX_TOKENS, OVERLAP_TOKENS};
pub use segmenter::split_sentences;
pub use tokenizer::{count_tokens, token_tail};
