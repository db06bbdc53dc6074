// Text preprocessing: raw transcript text to normalized, stemmed tokens.
//
// The filter chain runs in a fixed order: Unicode normalization and
// lowercasing, markup stripping, splitting on anything that isn't a letter
// (this drops punctuation and numbers in one pass), a minimum length filter,
// stopword removal, and finally Snowball stemming. Same input, same tokens.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use stop_words::{get, LANGUAGE};
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::error::AnalysisError;

/// Tokens shorter than this (in characters) are dropped before stemming.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Call-transcript pleasantries that carry no topical signal. Merged into the
/// general English stopword list.
const TRANSCRIPT_FILLER: &[&str] = &[
    "hello",
    "thanks",
    "thank",
    "welcome",
    "okay",
    "yeah",
    "operator",
    "morning",
    "afternoon",
    "evening",
    "everyone",
    "ladies",
    "gentlemen",
];

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

static SHARED: Lazy<Preprocessor> = Lazy::new(Preprocessor::new);

/// Reusable preprocessing state: the stopword set and the stemmer are built
/// once and shared across calls.
pub struct Preprocessor {
    stop_words: HashSet<String>,
    stemmer: Stemmer,
    min_chars: usize,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Preprocessor {
    pub fn new() -> Self {
        let mut stop_words: HashSet<String> = get(LANGUAGE::English).into_iter().collect();
        stop_words.extend(TRANSCRIPT_FILLER.iter().map(|w| w.to_string()));

        Self {
            stop_words,
            stemmer: Stemmer::create(Algorithm::English),
            min_chars: MIN_TOKEN_CHARS,
        }
    }

    /// Run the full filter chain. May return an empty vector.
    pub fn tokens(&self, raw: &str) -> Vec<String> {
        let normalized = raw.nfkc().collect::<String>().to_lowercase();
        let untagged = MARKUP.replace_all(&normalized, " ");

        untagged
            .split(|c: char| !c.is_alphabetic())
            .filter(|word| word.chars().count() >= self.min_chars)
            .filter(|word| !self.stop_words.contains(*word))
            .map(|word| self.stemmer.stem(word).into_owned())
            .collect()
    }

    /// Like `tokens`, but an empty result is an error.
    pub fn preprocess(&self, raw: &str) -> Result<Vec<String>, AnalysisError> {
        let tokens = self.tokens(raw);
        if tokens.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }
        debug!(tokens = tokens.len(), "Preprocessed transcript");
        Ok(tokens)
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }
}

/// Preprocess with the process-wide shared `Preprocessor`.
pub fn preprocess(raw: &str) -> Result<Vec<String>, AnalysisError> {
    SHARED.preprocess(raw)
}
