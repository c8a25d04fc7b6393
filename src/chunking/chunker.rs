//! Transcript chunking: token-bounded, sentence-preserving, speaker-aware.
//!
//! The chunker partitions a transcript into retrievable units for embedding
//! and citation. It never splits inside a sentence and never errors:
//! malformed or empty input degrades to an empty or partial chunk sequence,
//! which callers treat as "nothing to embed".
//!
//! Splitting runs in two pure phases: a greedy reduction packs sentences
//! into immutable candidate buffers, then a second pass prefixes each
//! candidate after the first with trailing context from its predecessor's
//! un-prefixed buffer. Taking the overlap from the predecessor's buffer
//! rather than its emitted text keeps duplication from compounding across
//! chunks.

use serde::{Deserialize, Serialize};

use super::segmenter::split_sentences;
use super::tokenizer::{count_tokens, token_tail};
use crate::transcript::{Utterance, Word};

/// Target upper bound on chunk size, in tokens.
pub const MAX_TOKENS: usize = 400;
/// Trailing context copied into the next chunk within an utterance.
pub const OVERLAP_TOKENS: usize = 50;

#[derive(Clone, Copy, Debug)]
pub struct ChunkerConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_tokens: MAX_TOKENS,
            overlap_tokens: OVERLAP_TOKENS,
        }
    }
}

/// A bounded, retrievable unit of transcript text.
///
/// `token_count <= max_tokens` holds for every chunk except one whose single
/// sentence alone exceeds the budget; a sentence is never split to enforce
/// the bound. `index` values are contiguous from zero across one
/// [`Chunker::chunk_transcript`] call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub start_seconds: f64,
    pub end_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    pub word_count: usize,
    pub token_count: usize,
    pub avg_confidence: f64,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunk a transcript into an ordered, contiguously indexed sequence.
    ///
    /// When speaker-segmented utterances are available each one contributes
    /// its own chunks, with indices continuing monotonically across
    /// utterances. Otherwise the word sequence is chunked as a single
    /// speakerless text.
    pub fn chunk_transcript(&self, words: &[Word], utterances: Option<&[Utterance]>) -> Vec<Chunk> {
        match utterances {
            Some(utterances) if !utterances.is_empty() => {
                let mut chunks = Vec::new();
                for utterance in utterances {
                    let start_index = chunks.len();
                    chunks.extend(self.chunk_utterance(utterance, start_index));
                }
                chunks
            }
            _ => self.chunk_words(words),
        }
    }

    fn chunk_utterance(&self, utterance: &Utterance, start_index: usize) -> Vec<Chunk> {
        let text = utterance.text.trim();
        if text.is_empty() {
            return Vec::new();
        }

        let total_tokens = count_tokens(text);
        if total_tokens <= self.config.max_tokens {
            return vec![Chunk {
                text: text.to_string(),
                index: start_index,
                start_seconds: utterance.start_seconds,
                end_seconds: utterance.end_seconds,
                speaker: Some(utterance.speaker.clone()),
                word_count: utterance.words.len(),
                token_count: total_tokens,
                avg_confidence: average_confidence_of(&utterance.words),
            }];
        }

        // Reserve the overlap allowance out of the packing budget so the
        // emitted text, prefix included, still honors the token bound.
        let core_budget = self
            .config
            .max_tokens
            .saturating_sub(self.config.overlap_tokens)
            .max(1);
        let sentences = split_sentences(text);
        let candidates = pack_sentences(&sentences, self.config.max_tokens, core_budget);

        let mut chunks = Vec::with_capacity(candidates.len());
        for (offset, core) in candidates.iter().enumerate() {
            let text = if offset == 0 {
                core.clone()
            } else {
                let tail = token_tail(&candidates[offset - 1], self.config.overlap_tokens);
                if tail.is_empty() {
                    core.clone()
                } else {
                    format!("{tail} {core}")
                }
            };

            let matched = match_words(&utterance.words, core);
            let start_seconds = matched
                .first()
                .map(|w| w.start_seconds)
                .unwrap_or(utterance.start_seconds);
            let end_seconds = matched
                .last()
                .map(|w| w.end_seconds)
                .unwrap_or(utterance.end_seconds);

            chunks.push(Chunk {
                word_count: text.split_whitespace().count(),
                token_count: count_tokens(&text),
                avg_confidence: average_confidence(&matched),
                text,
                index: start_index + offset,
                start_seconds,
                end_seconds,
                speaker: Some(utterance.speaker.clone()),
            });
        }
        chunks
    }

    /// Word-level fallback when no speaker segmentation exists. No overlap
    /// is added since there are no speaker boundaries to exploit.
    fn chunk_words(&self, words: &[Word]) -> Vec<Chunk> {
        if words.is_empty() {
            return Vec::new();
        }

        let all_text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let sentences = split_sentences(&all_text);
        if sentences.is_empty() {
            return Vec::new();
        }
        let groups = pack_sentences(&sentences, self.config.max_tokens, self.config.max_tokens);
        let group_count = groups.len();

        groups
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let (start_idx, end_idx) = locate_span(words, &text, index, group_count);
                let span = &words[start_idx..=end_idx.max(start_idx)];
                Chunk {
                    word_count: text.split_whitespace().count(),
                    token_count: count_tokens(&text),
                    avg_confidence: average_confidence_of(span),
                    start_seconds: words[start_idx].start_seconds,
                    end_seconds: words[end_idx.max(start_idx)].end_seconds,
                    speaker: None,
                    text,
                    index,
                }
            })
            .collect()
    }
}

/// Greedy sentence packing: a pure reduction producing immutable buffers.
///
/// A sentence joins the open buffer while the running count stays within
/// budget; otherwise the buffer closes and the sentence seeds the next one.
/// The buffer only closes when non-empty, so a single sentence over budget
/// becomes its own buffer rather than being split.
///
/// The first buffer gets `first_budget`; later buffers get `rest_budget`
/// (smaller when an overlap prefix will be added in the second phase).
fn pack_sentences(sentences: &[String], first_budget: usize, rest_budget: usize) -> Vec<String> {
    let mut groups: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_tokens = 0usize;

    for sentence in sentences {
        let sentence_tokens = count_tokens(sentence);
        let budget = if groups.is_empty() {
            first_budget
        } else {
            rest_budget
        };

        if current_tokens + sentence_tokens > budget && !current.is_empty() {
            groups.push(std::mem::take(&mut current));
            current_tokens = 0;
        }

        if current.is_empty() {
            current.push_str(sentence);
        } else {
            current.push(' ');
            current.push_str(sentence);
        }
        current_tokens += sentence_tokens;
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

fn strip_punctuation(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, '.' | '!' | '?' | ','))
        .collect::<String>()
        .to_lowercase()
}

/// Best-effort forward match of a text span's words against the word
/// sequence. First match wins; unmatched tokens are skipped.
fn match_words<'a>(words: &'a [Word], text: &str) -> Vec<&'a Word> {
    let mut matched = Vec::new();
    let mut search_from = 0;
    for raw in text.split_whitespace() {
        let needle = strip_punctuation(raw);
        if needle.is_empty() {
            continue;
        }
        for (i, word) in words.iter().enumerate().skip(search_from) {
            if word.text.to_lowercase().contains(&needle) {
                matched.push(word);
                search_from = i + 1;
                break;
            }
        }
    }
    matched
}

/// Locate a chunk's start and end word indices by matching its first and
/// last tokens against the word sequence; falls back to the chunk's ordinal
/// share of the sequence when a token cannot be found.
fn locate_span(words: &[Word], text: &str, index: usize, group_count: usize) -> (usize, usize) {
    let fallback_start = index * words.len() / group_count.max(1);
    let fallback_end = (((index + 1) * words.len()) / group_count.max(1))
        .saturating_sub(1)
        .max(fallback_start);

    let first_token = text.split_whitespace().next().map(strip_punctuation);
    let last_token = text.split_whitespace().next_back().map(strip_punctuation);

    let start_idx = first_token
        .filter(|t| !t.is_empty())
        .and_then(|t| words.iter().position(|w| strip_punctuation(&w.text) == t))
        .unwrap_or(fallback_start);
    let end_idx = last_token
        .filter(|t| !t.is_empty())
        .and_then(|t| {
            words[start_idx..]
                .iter()
                .position(|w| strip_punctuation(&w.text) == t)
                .map(|offset| start_idx + offset)
        })
        .unwrap_or(fallback_end)
        .max(start_idx);

    (start_idx, end_idx.min(words.len().saturating_sub(1)))
}

fn average_confidence_of(words: &[Word]) -> f64 {
    if words.is_empty() {
        return 1.0;
    }
    let sum: f64 = words.iter().map(|w| w.confidence).sum();
    round2(sum / words.len() as f64)
}

/// Mean confidence of matched words. Defaults to 1.0 when nothing matched:
/// absence of confidence data must not read as low confidence.
fn average_confidence(words: &[&Word]) -> f64 {
    if words.is_empty() {
        return 1.0;
    }
    let sum: f64 = words.iter().map(|w| w.confidence).sum();
    round2(sum / words.len() as f64)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spoken(text: &str, index: usize) -> Word {
        let start = index as f64 * 0.5;
        Word::new(text, start, start + 0.4, 0.9)
    }

    fn words_of(text: &str) -> Vec<Word> {
        text.split_whitespace()
            .enumerate()
            .map(|(i, w)| spoken(w, i))
            .collect()
    }

    #[test]
    fn packing_never_splits_a_sentence() {
        let sentences: Vec<String> = vec![
            "The garden was full of tomatoes this year.".into(),
            "We picked a whole basket before lunch.".into(),
            "Grandma made her famous sauce.".into(),
        ];
        let groups = pack_sentences(&sentences, 12, 12);
        assert!(groups.len() >= 2);
        for sentence in &sentences {
            assert!(
                groups.iter().any(|g| g.contains(sentence.as_str())),
                "sentence {sentence:?} must appear whole in some group"
            );
        }
    }

    #[test]
    fn packing_reconstructs_input() {
        let sentences: Vec<String> = vec![
            "First thing happened.".into(),
            "Second thing happened.".into(),
            "Third thing happened.".into(),
        ];
        let groups = pack_sentences(&sentences, 8, 8);
        assert_eq!(groups.join(" "), sentences.join(" "));
    }

    #[test]
    fn oversized_sentence_becomes_its_own_group() {
        let sentences: Vec<String> = vec![
            "Short one.".into(),
            "This single sentence is far far far far far far far too long for the budget.".into(),
            "Another short.".into(),
        ];
        let groups = pack_sentences(&sentences, 6, 6);
        assert!(groups.iter().any(|g| g == &sentences[1]));
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        let chunker = Chunker::new();
        assert!(chunker.chunk_transcript(&[], None).is_empty());
        assert!(chunker.chunk_transcript(&[], Some(&[])).is_empty());
    }

    #[test]
    fn small_utterance_is_one_chunk() {
        let words = words_of("We went to the lake on Saturday.");
        let utterance = Utterance::new("A", "We went to the lake on Saturday.", words.clone());
        let chunks = Chunker::new().chunk_transcript(&words, Some(std::slice::from_ref(&utterance)));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].speaker.as_deref(), Some("A"));
        assert_eq!(chunks[0].text, utterance.text);
        assert_eq!(chunks[0].start_seconds, utterance.start_seconds);
        assert_eq!(chunks[0].end_seconds, utterance.end_seconds);
        assert_eq!(chunks[0].avg_confidence, 0.9);
    }

    #[test]
    fn indices_continue_across_utterances() {
        let first = Utterance::new("A", "Morning walk by the river.", words_of("Morning walk by the river."));
        let second = Utterance::new("B", "Then coffee at the corner shop.", words_of("Then coffee at the corner shop."));
        let words: Vec<Word> = first.words.iter().chain(&second.words).cloned().collect();
        let chunks = Chunker::new().chunk_transcript(&words, Some(&[first, second]));
        let indices: Vec<usize> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
    }

    #[test]
    fn unmatched_words_default_confidence_to_one() {
        let words = vec![spoken("zzzz", 0)];
        let utterance = Utterance::new(
            "A",
            "Completely different text here. More different text follows. Even more after that.",
            words.clone(),
        );
        let config = ChunkerConfig {
            max_tokens: 8,
            overlap_tokens: 2,
        };
        let chunks = Chunker::with_config(config).chunk_transcript(&words, Some(&[utterance]));
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.avg_confidence == 1.0));
    }

    #[test]
    fn word_only_path_locates_spans() {
        let words = words_of("Hello there. How are you today? I am fine.");
        let config = ChunkerConfig {
            max_tokens: 6,
            overlap_tokens: 0,
        };
        let chunks = Chunker::with_config(config).chunk_transcript(&words, None);
        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].text, "Hello there.");
        assert_eq!(chunks[0].start_seconds, words[0].start_seconds);
        assert_eq!(chunks[0].end_seconds, words[1].end_seconds);
        assert!(chunks.iter().all(|c| c.speaker.is_none()));
    }
}
