//! Streaming answer generation gateway.

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::types::MemoryError;

/// Default chat model served by the OpenAI-compatible gateway.
pub const GENERATION_MODEL: &str = "gpt-4-turbo-preview";

const MAX_COMPLETION_TOKENS: u32 = 500;
const TEMPERATURE: f32 = 0.7;
const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Answer tokens as they arrive from the model. An `Err` item means the
/// connection broke mid-answer.
pub type TokenStream = BoxStream<'static, Result<String, MemoryError>>;

#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Open a streaming completion. Errors here mean the request never
    /// started; errors on the stream mean it broke partway.
    async fn stream_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream, MemoryError>;
}

#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    delta: ChatDelta,
}

#[derive(Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// HTTP gateway to an OpenAI-compatible `/v1/chat/completions` endpoint with
/// server-sent-event streaming.
pub struct OpenAiGenerationProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiGenerationProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            model: GENERATION_MODEL.to_string(),
        }
    }

    /// Build from `OPENAI_API_KEY`; `None` when the key is absent, in which
    /// case answers fall back to raw excerpts.
    pub fn from_env() -> Option<Self> {
        dotenvy::dotenv().ok();
        std::env::var("OPENAI_API_KEY").ok().map(Self::new)
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Drain complete SSE lines from `buffer`, collecting any content deltas.
///
/// The buffer holds raw bytes: network chunk boundaries can fall inside a
/// multi-byte character, so only `\n`-terminated lines are decoded. A `\n`
/// byte never occurs inside a multi-byte UTF-8 sequence.
fn drain_sse_lines(buffer: &mut Vec<u8>) -> Vec<Result<String, MemoryError>> {
    let mut tokens = Vec::new();
    while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim();
        let Some(data) = line.strip_prefix("data: ") else {
            continue;
        };
        if data == "[DONE]" {
            continue;
        }
        let Ok(chunk) = serde_json::from_str::<ChatChunk>(data) else {
            continue;
        };
        let content = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content);
        if let Some(content) = content {
            if !content.is_empty() {
                tokens.push(Ok(content));
            }
        }
    }
    tokens
}

#[async_trait]
impl GenerationProvider for OpenAiGenerationProvider {
    async fn stream_completion(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<TokenStream, MemoryError> {
        let body = json!({
            "model": self.model,
            "messages": [
                ChatMessage { role: "system", content: system_prompt },
                ChatMessage { role: "user", content: user_prompt },
            ],
            "max_tokens": MAX_COMPLETION_TOKENS,
            "temperature": TEMPERATURE,
            "stream": true,
        });
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| MemoryError::Generation(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MemoryError::Generation(format!(
                "completion API error {status}: {body}"
            )));
        }

        let tokens = response
            .bytes_stream()
            .scan(Vec::new(), |buffer, chunk| {
                let out = match chunk {
                    Ok(bytes) => {
                        buffer.extend_from_slice(&bytes);
                        drain_sse_lines(buffer)
                    }
                    Err(err) => vec![Err(MemoryError::Generation(err.to_string()))],
                };
                futures_util::future::ready(Some(stream::iter(out)))
            })
            .flatten()
            .boxed();
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_parses_deltas_and_skips_done_marker() {
        let mut buffer = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\
             data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\
             data: [DONE]\n"
            .to_vec();
        let tokens: Vec<String> = drain_sse_lines(&mut buffer)
            .into_iter()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens, vec!["Hel", "lo"]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_keeps_incomplete_line_buffered() {
        let mut buffer =
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\ndata: {\"cho".to_vec();
        let tokens = drain_sse_lines(&mut buffer);
        assert_eq!(tokens.len(), 1);
        assert_eq!(buffer, b"data: {\"cho");
    }

    #[test]
    fn multibyte_characters_survive_chunk_boundaries() {
        let payload = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9} cr\u{e8}me\"}}]}\n";
        let bytes = payload.as_bytes();
        // Split inside the two-byte 'é'.
        let split = payload.find('\u{e9}').unwrap() + 1;
        assert!(!payload.is_char_boundary(split));

        let mut buffer = Vec::new();
        buffer.extend_from_slice(&bytes[..split]);
        assert!(drain_sse_lines(&mut buffer).is_empty());

        buffer.extend_from_slice(&bytes[split..]);
        let tokens: Vec<String> = drain_sse_lines(&mut buffer)
            .into_iter()
            .map(|t| t.unwrap())
            .collect();
        assert_eq!(tokens, vec!["caf\u{e9} cr\u{e8}me"]);
        assert!(buffer.is_empty());
    }
}
