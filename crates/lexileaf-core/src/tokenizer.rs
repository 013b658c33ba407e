//! Splits raw text into word and separator tokens.
//!
//! The word pattern comes from user-editable language settings, so it may be
//! malformed. Compilation failures switch the tokenizer to a letter-run
//! splitter instead of propagating; the reading view must always get tokens.

use crate::language::strip_anchors;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use tracing::{debug, warn};
use ts_rs::TS;

/// Digit runs and single punctuation/symbol code points.
const SEPARATOR_PATTERN: &str = r"\p{N}+|[\p{P}\p{S}]";
const LETTER_RUN_PATTERN: &str = r"\p{L}+";
const PATTERN_SIZE_LIMIT: usize = 4 * (1 << 20);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum TokenKind {
    Word,
    Separator,
}

/// A word match or a separator (digit run or one punctuation/symbol code
/// point) of the source text. Whitespace between tokens is not a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// Start position in the source, counted in chars.
    pub start: usize,
    /// Start position in the source, counted in bytes.
    pub byte_start: usize,
    pub kind: TokenKind,
}

impl Token {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.byte_start..self.byte_start + self.text.len()
    }

    pub fn is_word(&self) -> bool {
        self.kind == TokenKind::Word
    }
}

#[derive(Debug, Clone)]
pub struct Tokenizer {
    matcher: Option<Regex>,
    failure: Option<String>,
}

impl Tokenizer {
    pub fn new(word_pattern: &str) -> Self {
        let word = strip_anchors(word_pattern);
        let word = if word.is_empty() {
            LETTER_RUN_PATTERN
        } else {
            word
        };
        let combined = format!("(?P<word>{word})|(?P<sep>{SEPARATOR_PATTERN})");
        match RegexBuilder::new(&combined)
            .unicode(true)
            .size_limit(PATTERN_SIZE_LIMIT)
            .build()
        {
            Ok(matcher) => Self {
                matcher: Some(matcher),
                failure: None,
            },
            Err(err) => {
                warn!(
                    pattern = word_pattern,
                    "Word pattern failed to compile; splitting on letter runs: {err}"
                );
                Self {
                    matcher: None,
                    failure: Some(err.to_string()),
                }
            }
        }
    }

    /// True when the configured pattern was unusable.
    pub fn is_fallback(&self) -> bool {
        self.matcher.is_none()
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn tokenize(&self, text: &str) -> Vec<Token> {
        let tokens = match &self.matcher {
            Some(matcher) => tokenize_with(matcher, text),
            None => split_letter_runs(text),
        };
        debug!(
            tokens = tokens.len(),
            fallback = self.is_fallback(),
            "Tokenized text"
        );
        tokens
    }
}

/// One-shot convenience over [`Tokenizer`].
pub fn tokenize(text: &str, word_pattern: &str) -> Vec<Token> {
    Tokenizer::new(word_pattern).tokenize(text)
}

fn tokenize_with(matcher: &Regex, text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut byte_cursor = 0usize;
    let mut char_cursor = 0usize;

    for caps in matcher.captures_iter(text) {
        let (found, kind) = match (caps.name("word"), caps.name("sep")) {
            (Some(word), _) => (word, TokenKind::Word),
            (None, Some(sep)) => (sep, TokenKind::Separator),
            (None, None) => continue,
        };
        if found.as_str().is_empty() {
            continue;
        }
        char_cursor += text[byte_cursor..found.start()].chars().count();
        byte_cursor = found.start();
        tokens.push(Token {
            text: found.as_str().to_string(),
            start: char_cursor,
            byte_start: found.start(),
            kind,
        });
    }

    tokens
}

/// Letter runs become words; the gaps between them become separators, split
/// on whitespace so spacing does not turn into tokens.
fn split_letter_runs(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current: Option<(usize, usize, bool)> = None;

    let flush = |tokens: &mut Vec<Token>, run: Option<(usize, usize, bool)>, end: usize| {
        if let Some((byte_start, start, is_word)) = run {
            tokens.push(Token {
                text: text[byte_start..end].to_string(),
                start,
                byte_start,
                kind: if is_word {
                    TokenKind::Word
                } else {
                    TokenKind::Separator
                },
            });
        }
    };

    for (char_idx, (byte_idx, ch)) in text.char_indices().enumerate() {
        if ch.is_whitespace() {
            flush(&mut tokens, current.take(), byte_idx);
            continue;
        }
        let is_word = ch.is_alphabetic();
        match current {
            Some((_, _, run_is_word)) if run_is_word == is_word => {}
            _ => {
                flush(&mut tokens, current.take(), byte_idx);
                current = Some((byte_idx, char_idx, is_word));
            }
        }
    }
    flush(&mut tokens, current.take(), text.len());

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::DEFAULT_WORD_PATTERN;

    fn texts(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|token| token.text.as_str()).collect()
    }

    fn reconstruct(source: &str, tokens: &[Token]) -> String {
        let mut out = String::new();
        let mut cursor = 0usize;
        for token in tokens {
            out.push_str(&source[cursor..token.byte_start]);
            out.push_str(&token.text);
            cursor = token.byte_range().end;
        }
        out.push_str(&source[cursor..]);
        out
    }

    #[test]
    fn splits_words_and_punctuation() {
        let tokens = tokenize("Hello, world! Hello again.", DEFAULT_WORD_PATTERN);
        assert_eq!(
            texts(&tokens),
            vec!["Hello", ",", "world", "!", "Hello", "again", "."]
        );
        let kinds: Vec<TokenKind> = tokens.iter().map(|token| token.kind).collect();
        assert_eq!(kinds[0], TokenKind::Word);
        assert_eq!(kinds[1], TokenKind::Separator);
    }

    #[test]
    fn keeps_apostrophes_and_hyphens_inside_words() {
        let tokens = tokenize("L'homme porte-parole ¿qué?", DEFAULT_WORD_PATTERN);
        assert_eq!(
            texts(&tokens),
            vec!["L'homme", "porte-parole", "¿", "qué", "?"]
        );
    }

    #[test]
    fn char_offsets_count_multibyte_text() {
        let tokens = tokenize("café über naïve", DEFAULT_WORD_PATTERN);
        let starts: Vec<usize> = tokens.iter().map(|token| token.start).collect();
        assert_eq!(starts, vec![0, 5, 10]);
        assert_eq!(tokens[1].byte_start, "café ".len());
    }

    #[test]
    fn tokens_reconstruct_source_through_their_offsets() {
        let source = "  Él dijo:   «ven aquí», y 42 gatos   llegaron…\n";
        let tokens = tokenize(source, DEFAULT_WORD_PATTERN);
        assert_eq!(reconstruct(source, &tokens), source);
        for pair in tokens.windows(2) {
            assert!(pair[0].byte_range().end <= pair[1].byte_start);
            assert!(pair[0].start < pair[1].start);
        }
        for token in &tokens {
            assert_eq!(&source[token.byte_range()], token.text);
        }
    }

    #[test]
    fn anchored_pattern_is_embedded_as_subexpression() {
        let tokens = tokenize("one two", r"^\p{L}+$");
        assert_eq!(texts(&tokens), vec!["one", "two"]);
    }

    #[test]
    fn empty_pattern_falls_back_to_letter_runs() {
        let tokenizer = Tokenizer::new("");
        assert!(!tokenizer.is_fallback());
        assert_eq!(texts(&tokenizer.tokenize("it's ok")), vec!["it", "'", "s", "ok"]);
    }

    #[test]
    fn malformed_pattern_does_not_panic_and_still_tokenizes() {
        let tokenizer = Tokenizer::new(r"[\p{L}+");
        assert!(tokenizer.is_fallback());
        assert!(tokenizer.failure().is_some());

        let tokens = tokenizer.tokenize("Hello, world!");
        assert!(!tokens.is_empty());
        assert_eq!(texts(&tokens), vec!["Hello", ",", "world", "!"]);
        assert_eq!(tokens[2].start, 7);
        assert_eq!(tokens[2].kind, TokenKind::Word);
    }

    #[test]
    fn patterns_matching_empty_strings_are_skipped() {
        let tokens = tokenize("a  b", r"\p{L}*");
        assert_eq!(texts(&tokens), vec!["a", "b"]);
    }
}
