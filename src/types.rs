//! Crate-wide error type and result alias.

use thiserror::Error;

/// Minimum accepted query length in characters.
pub const MIN_QUERY_LEN: usize = 2;

/// Errors surfaced by the retrieval and indexing pipeline.
///
/// External-provider failures (embedding, vector index, generation) are
/// usually caught at the call site and degraded rather than propagated;
/// see the retriever and streamer for the exact policy.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Query rejected before any work was started.
    #[error("query too short: {len} characters (minimum {min})")]
    QueryTooShort { len: usize, min: usize },

    /// Embedding provider failed or returned a malformed response.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// Vector index gateway failed.
    #[error("vector index error: {0}")]
    VectorIndex(String),

    /// Generation provider failed or its token stream broke.
    #[error("generation provider error: {0}")]
    Generation(String),

    /// Relational store failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// The event stream consumer dropped its receiver. Treated as
    /// cancellation, never as a processing failure.
    #[error("event channel closed by consumer")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, MemoryError>;
