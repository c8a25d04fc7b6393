//! Token counting against a fixed BPE vocabulary.
//!
//! Chunk sizing compares counts against a budget, so the only requirement is
//! that the same vocabulary is used everywhere in the pipeline. The cl100k
//! vocabulary is embedded in the binary and loaded once.

use std::sync::LazyLock;

use tiktoken_rs::CoreBPE;

static BPE: LazyLock<CoreBPE> =
    LazyLock::new(|| tiktoken_rs::cl100k_base().expect("embedded cl100k vocabulary loads"));

/// Deterministic token count for a text span. Pure function of its input.
pub fn count_tokens(text: &str) -> usize {
    BPE.encode_ordinary(text).len()
}

/// The longest whole-word suffix of `text` that fits within `budget` tokens.
///
/// Used to carry trailing context from one chunk into the next. The returned
/// suffix is measured as a single string, so its token count never exceeds
/// the budget; it is empty when even the last word alone is over budget.
pub fn token_tail(text: &str, budget: usize) -> String {
    if budget == 0 {
        return String::new();
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    let mut taken = 0;
    for n in 1..=words.len() {
        let candidate = words[words.len() - n..].join(" ");
        if count_tokens(&candidate) > budget {
            break;
        }
        taken = n;
    }
    words[words.len() - taken..].join(" ")
}
