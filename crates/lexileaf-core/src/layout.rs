//! Everything derived from one (text, rules) pair.
//!
//! Tokens, their registry keys, the offset index and the per-article
//! frequency map are built together and shared behind one `Arc`, so a caller
//! can never pair an offset table with a different token sequence.

use crate::language::LanguageRules;
use crate::normalizer::WordNormalizer;
use crate::offsets::{OffsetIndex, rejoin};
use crate::sentences::sentence_spans;
use crate::tokenizer::{Token, Tokenizer};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::info;

#[derive(Debug, Clone)]
pub struct TokenLayout {
    text: String,
    tokens: Vec<Token>,
    keys: Vec<String>,
    offsets: OffsetIndex,
    frequencies: BTreeMap<String, usize>,
    sentences: Vec<Range<usize>>,
    degraded: bool,
}

impl TokenLayout {
    pub fn build(text: &str, rules: &LanguageRules) -> Self {
        let tokenizer = Tokenizer::new(&rules.word_pattern);
        let normalizer = WordNormalizer::new(&rules.word_pattern);
        let tokens = tokenizer.tokenize(text);

        let keys: Vec<String> = tokens
            .iter()
            .map(|token| {
                if token.is_word() {
                    normalizer.normalize(&token.text)
                } else {
                    String::new()
                }
            })
            .collect();

        let mut frequencies = BTreeMap::new();
        for key in keys.iter().filter(|key| !key.is_empty()) {
            *frequencies.entry(key.clone()).or_insert(0usize) += 1;
        }

        let offsets = OffsetIndex::build(&tokens);
        let sentences = sentence_spans(text, &rules.split_pattern);
        info!(
            tokens = tokens.len(),
            distinct_words = frequencies.len(),
            sentences = sentences.len(),
            degraded = tokenizer.is_fallback(),
            "Built token layout"
        );

        Self {
            text: text.to_string(),
            tokens,
            keys,
            offsets,
            frequencies,
            sentences,
            degraded: tokenizer.is_fallback(),
        }
    }

    /// Source text the layout was built from.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Registry key of a token, or `None` when it is not a word.
    pub fn key(&self, index: usize) -> Option<&str> {
        self.keys
            .get(index)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn offsets(&self) -> &OffsetIndex {
        &self.offsets
    }

    /// Occurrences of each registry key in this article.
    pub fn frequencies(&self) -> &BTreeMap<String, usize> {
        &self.frequencies
    }

    pub fn distinct_words(&self) -> usize {
        self.frequencies.len()
    }

    /// True when the word pattern was unusable and the fallback splitter ran.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Narration text starting at `start`, aligned with [`OffsetIndex`].
    pub fn rejoined_from(&self, start: usize) -> String {
        rejoin(self.tokens.get(start..).unwrap_or_default())
    }

    /// The sentence of the source text that contains token `index`.
    pub fn sentence_containing(&self, index: usize) -> Option<&str> {
        let token = self.tokens.get(index)?;
        let position = token.byte_start;
        let slot = self
            .sentences
            .partition_point(|range| range.end <= position);
        self.sentences
            .get(slot)
            .filter(|range| range.start <= position)
            .map(|range| &self.text[range.clone()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{DEFAULT_SPLIT_PATTERN, DEFAULT_WORD_PATTERN};

    fn english() -> LanguageRules {
        LanguageRules::new(DEFAULT_SPLIT_PATTERN, DEFAULT_WORD_PATTERN)
    }

    #[test]
    fn counts_frequencies_of_normalized_words() {
        let layout = TokenLayout::build("Hello, world! Hello again.", &english());
        let keys: Vec<&str> = (0..layout.len()).filter_map(|idx| layout.key(idx)).collect();
        assert_eq!(keys, vec!["hello", "world", "hello", "again"]);

        let expected: BTreeMap<String, usize> = [("again", 1), ("hello", 2), ("world", 1)]
            .into_iter()
            .map(|(key, count)| (key.to_string(), count))
            .collect();
        assert_eq!(layout.frequencies(), &expected);
        assert_eq!(layout.distinct_words(), 3);
    }

    #[test]
    fn separators_have_no_key() {
        let layout = TokenLayout::build("Hi, 42 times!", &english());
        assert_eq!(layout.key(0), Some("hi"));
        assert_eq!(layout.key(1), None);
        assert_eq!(layout.key(2), None);
        assert_eq!(layout.key(99), None);
    }

    #[test]
    fn rejoined_text_matches_offsets() {
        let layout = TokenLayout::build("Hello, world!", &english());
        assert_eq!(layout.rejoined_from(0), "Hello , world !");
        assert_eq!(layout.rejoined_from(2), "world !");
        assert_eq!(layout.rejoined_from(10), "");
        assert_eq!(layout.offsets().len(), layout.len());
    }

    #[test]
    fn finds_sentence_for_token() {
        let layout = TokenLayout::build("Uno dos. Tres cuatro!", &english());
        assert_eq!(layout.sentence_containing(0), Some("Uno dos."));
        assert_eq!(layout.sentence_containing(3), Some("Tres cuatro!"));
        assert_eq!(layout.sentence_containing(40), None);
    }

    #[test]
    fn malformed_rules_mark_layout_degraded() {
        let layout = TokenLayout::build("Hola mundo", &LanguageRules::new("(", "[x"));
        assert!(layout.is_degraded());
        assert_eq!(layout.len(), 2);
        assert_eq!(layout.key(1), Some("mundo"));
    }
}
