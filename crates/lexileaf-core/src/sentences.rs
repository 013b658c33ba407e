//! Sentence splitting for word context.

use regex::Regex;
use std::ops::Range;
use tracing::warn;

/// Split `text` into trimmed sentence byte ranges. Each sentence ends with a
/// match of `split_pattern`; an empty or malformed pattern falls back to
/// splitting on `.`, `!` and `?`.
pub fn sentence_spans(text: &str, split_pattern: &str) -> Vec<Range<usize>> {
    if split_pattern.trim().is_empty() {
        return punctuation_spans(text);
    }
    match Regex::new(split_pattern) {
        Ok(splitter) => {
            let mut spans = Vec::new();
            let mut cursor = 0usize;
            for terminator in splitter.find_iter(text) {
                if terminator.end() <= cursor {
                    continue;
                }
                push_trimmed(text, cursor..terminator.end(), &mut spans);
                cursor = terminator.end();
            }
            push_trimmed(text, cursor..text.len(), &mut spans);
            spans
        }
        Err(err) => {
            warn!(
                pattern = split_pattern,
                "Split pattern failed to compile; using punctuation splitter: {err}"
            );
            punctuation_spans(text)
        }
    }
}

fn punctuation_spans(text: &str) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut start = 0usize;

    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let end = idx + ch.len_utf8();
            push_trimmed(text, start..end, &mut spans);
            start = end;
        }
    }
    push_trimmed(text, start..text.len(), &mut spans);

    spans
}

fn push_trimmed(text: &str, range: Range<usize>, spans: &mut Vec<Range<usize>>) {
    let slice = &text[range.clone()];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading == slice.len() {
        return;
    }
    spans.push(range.start + leading..range.end - trailing);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::DEFAULT_SPLIT_PATTERN;

    fn sentences<'a>(text: &'a str, pattern: &str) -> Vec<&'a str> {
        sentence_spans(text, pattern)
            .into_iter()
            .map(|range| &text[range])
            .collect()
    }

    #[test]
    fn splits_on_configured_terminators() {
        assert_eq!(
            sentences("Hola. ¿Qué tal?  Bien… y tú", DEFAULT_SPLIT_PATTERN),
            vec!["Hola.", "¿Qué tal?", "Bien…", "y tú"]
        );
    }

    #[test]
    fn runs_of_terminators_stay_with_their_sentence() {
        assert_eq!(
            sentences("Wait!!! Really?!", DEFAULT_SPLIT_PATTERN),
            vec!["Wait!!!", "Really?!"]
        );
    }

    #[test]
    fn broken_pattern_uses_punctuation_splitter() {
        assert_eq!(sentences("A. B! C", "(["), vec!["A.", "B!", "C"]);
        assert_eq!(sentences("A. B", ""), vec!["A.", "B"]);
    }

    #[test]
    fn whitespace_only_text_has_no_sentences() {
        assert!(sentence_spans("   \n", DEFAULT_SPLIT_PATTERN).is_empty());
    }
}
