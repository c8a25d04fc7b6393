//! Streaming answer pipeline: retrieve sources, generate a grounded answer,
//! and emit the result as an ordered event stream.

pub mod event;
pub mod generation;
pub mod prompt;
pub mod service;
pub mod streamer;

pub use event::StreamEvent;
pub use generation::{GenerationProvider, OpenAiGenerationProvider, TokenStream};
pub use prompt::{SYSTEM_PROMPT, build_grounding_prompt};
pub use service::AnswerService;
pub use streamer::{AnswerStreamer, FOLLOW_UP_SUGGESTIONS, NO_MATCHES_MESSAGE, SEARCHING_MESSAGE};
