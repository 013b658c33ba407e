//! Canonical registry keys for word tokens.

use crate::language::strip_anchors;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

static RE_EDGE_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\p{P}\p{S}\p{N}\s]+|[\p{P}\p{S}\p{N}\s]+$").unwrap());

/// Maps raw tokens to registry keys. An empty key means "not a word".
#[derive(Debug, Clone, Default)]
pub struct WordNormalizer {
    validator: Option<Regex>,
}

impl WordNormalizer {
    /// Build a normalizer validating against `word_pattern` as a whole-string
    /// match. An empty or malformed pattern accepts any non-empty word.
    pub fn new(word_pattern: &str) -> Self {
        let pattern = strip_anchors(word_pattern);
        if pattern.is_empty() {
            return Self::default();
        }
        let anchored = format!("^(?:{pattern})$");
        match RegexBuilder::new(&anchored).unicode(true).build() {
            Ok(validator) => Self {
                validator: Some(validator),
            },
            Err(err) => {
                warn!(
                    pattern = word_pattern,
                    "Word pattern failed to compile; accepting any stripped token: {err}"
                );
                Self::default()
            }
        }
    }

    pub fn normalize(&self, raw: &str) -> String {
        let decomposed: String = raw.nfd().collect();
        let stripped = RE_EDGE_NOISE.replace_all(&decomposed, "");
        if stripped.is_empty() {
            return String::new();
        }
        if let Some(validator) = &self.validator {
            if !validator.is_match(&stripped) {
                return String::new();
            }
        }
        stripped.to_lowercase()
    }
}

/// One-shot convenience over [`WordNormalizer`].
pub fn normalize_word(raw: &str, word_pattern: &str) -> String {
    WordNormalizer::new(word_pattern).normalize(raw)
}
