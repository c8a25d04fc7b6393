//! Events emitted while answering a query.

use serde::{Deserialize, Serialize};

use crate::retrieval::RetrievedSource;

/// One event in the answer stream, in emission order: status updates, then
/// answer tokens, then sources and follow-up suggestions, closed by exactly
/// one terminal event.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status { content: String },
    Token { content: String },
    Sources { sources: Vec<RetrievedSource> },
    Suggestions { suggestions: Vec<String> },
    Error { error: String },
    Done,
}

impl StreamEvent {
    pub fn status(content: impl Into<String>) -> Self {
        Self::Status {
            content: content.into(),
        }
    }

    pub fn token(content: impl Into<String>) -> Self {
        Self::Token {
            content: content.into(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// `Done` and `Error` close the stream; nothing follows them.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
