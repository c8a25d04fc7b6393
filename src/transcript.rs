//! Transcript data model: words, utterances, and live assembly.
//!
//! A [`Transcript`] is created once per recording and never updated. During
//! live transcription the provider delivers finalized segments one at a time;
//! [`LiveTranscript`] accumulates them, merging consecutive segments from the
//! same speaker into a single [`Utterance`].

use serde::{Deserialize, Serialize};

/// A single transcribed word with timing and recognition confidence.
///
/// Immutable once created; owned by its transcript.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Word {
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// Recognition confidence in `[0, 1]`.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

impl Word {
    pub fn new(
        text: impl Into<String>,
        start_seconds: f64,
        end_seconds: f64,
        confidence: f64,
    ) -> Self {
        Self {
            text: text.into(),
            start_seconds,
            end_seconds,
            confidence,
            speaker: None,
        }
    }

    #[must_use]
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }
}

/// A maximal contiguous speech segment attributed to one speaker.
///
/// Invariant: `words` are ordered by `start_seconds`; `start_seconds` and
/// `end_seconds` track the first and last word.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Utterance {
    pub speaker: String,
    pub text: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub words: Vec<Word>,
}

impl Utterance {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, words: Vec<Word>) -> Self {
        let start_seconds = words.first().map(|w| w.start_seconds).unwrap_or(0.0);
        let end_seconds = words.last().map(|w| w.end_seconds).unwrap_or(0.0);
        Self {
            speaker: speaker.into(),
            text: text.into(),
            start_seconds,
            end_seconds,
            words,
        }
    }
}

/// One finalized transcript per recording.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Transcript {
    pub recording_id: String,
    pub text: String,
    pub language: String,
    pub words: Vec<Word>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utterances: Option<Vec<Utterance>>,
}

/// Incremental transcript assembly for a live recording session.
///
/// Finalized segments arrive in order from the transcription provider. A
/// segment whose speaker matches the trailing utterance is merged into it;
/// otherwise it opens a new utterance.
#[derive(Clone, Debug, Default)]
pub struct LiveTranscript {
    words: Vec<Word>,
    utterances: Vec<Utterance>,
}

impl LiveTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one finalized segment.
    ///
    /// Segments with no words are ignored. Words without a speaker tag fall
    /// into the default speaker `"A"`.
    pub fn push_segment(&mut self, text: &str, words: Vec<Word>) {
        let Some(first) = words.first() else {
            return;
        };
        let speaker = first.speaker.clone().unwrap_or_else(|| "A".to_string());
        let end_seconds = words.last().map(|w| w.end_seconds).unwrap_or(0.0);

        self.words.extend(words.iter().cloned());

        match self.utterances.last_mut() {
            Some(last) if last.speaker == speaker => {
                last.text.push(' ');
                last.text.push_str(text);
                last.end_seconds = end_seconds;
                last.words.extend(words);
            }
            _ => {
                self.utterances
                    .push(Utterance::new(speaker, text.to_string(), words));
            }
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn utterances(&self) -> &[Utterance] {
        &self.utterances
    }

    /// Freeze the session into an immutable [`Transcript`].
    pub fn finalize(self, recording_id: impl Into<String>, language: impl Into<String>) -> Transcript {
        let text = self
            .utterances
            .iter()
            .map(|u| u.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let utterances = if self.utterances.is_empty() {
            None
        } else {
            Some(self.utterances)
        };
        Transcript {
            recording_id: recording_id.into(),
            text,
            language: language.into(),
            words: self.words,
            utterances,
        }
    }
}
