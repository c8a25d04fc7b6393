//! Prompt assembly for grounded answer generation.

use crate::retrieval::RetrievedSource;

/// System prompt for the answer model. Keeps the model grounded in the
/// provided excerpts and conversational in tone.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions \
about someone's personal voice memories. You are given excerpts from their recorded \
memories and must answer using only that material. When you reference a memory, \
mention when it was recorded. If the excerpts do not contain the answer, say so \
plainly instead of guessing. Answer warmly and in plain language, in three to five \
sentences, without markdown formatting.";

/// Assemble the user message: the question followed by numbered source blocks.
pub fn build_grounding_prompt(query: &str, sources: &[RetrievedSource]) -> String {
    let mut prompt = format!("Question: {query}\n\nMemory excerpts:\n");
    for (i, source) in sources.iter().enumerate() {
        prompt.push_str(&format!("\n[Source {} - Recording from {}", i + 1, source.date));
        if let Some(speaker) = &source.speaker {
            prompt.push_str(&format!(", Speaker {speaker}"));
        }
        prompt.push_str("]\n");
        prompt.push_str(&source.chunk_text);
        prompt.push('\n');
    }
    prompt
}
