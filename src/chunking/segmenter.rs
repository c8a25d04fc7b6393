//! Sentence segmentation on punctuation boundaries.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^.!?]+[.!?]+\s*").expect("sentence boundary pattern is valid")
});

/// Split text into sentence-like units, keeping terminal punctuation with
/// its sentence.
///
/// Trailing text after the last punctuation boundary is retained as a final
/// sentence, so the concatenation of outputs reconstructs the input modulo
/// whitespace normalization. Input with no boundary at all comes back as a
/// single sentence. Pure function.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut consumed = 0;
    for found in SENTENCE_BOUNDARY.find_iter(text) {
        let sentence = found.as_str().trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        consumed = found.end();
    }

    let remainder = text[consumed..].trim();
    if !remainder.is_empty() {
        sentences.push(remainder.to_string());
    }

    sentences
}
