//! Token index <-> character offset mapping for narration alignment.
//!
//! Offsets describe the text as the narrator receives it: tokens re-joined
//! with exactly one separator character. They are not positions in the
//! source text (those live on [`Token::start`]).

use crate::tokenizer::Token;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetIndex {
    offsets: Vec<usize>,
    end: usize,
}

impl OffsetIndex {
    pub fn build(tokens: &[Token]) -> Self {
        let mut offsets = Vec::with_capacity(tokens.len());
        let mut cursor = 0usize;
        for (idx, token) in tokens.iter().enumerate() {
            if idx > 0 {
                cursor += 1;
            }
            offsets.push(cursor);
            cursor += token.char_len();
        }
        Self {
            offsets,
            end: cursor,
        }
    }

    /// Token covering `char_offset`: the greatest index whose start is at or
    /// before the offset. Offsets past the last token yield `None`.
    pub fn token_index_at(&self, char_offset: usize) -> Option<usize> {
        if char_offset >= self.end {
            return None;
        }
        self.offsets
            .partition_point(|start| *start <= char_offset)
            .checked_sub(1)
    }

    pub fn offset_of(&self, token_index: usize) -> Option<usize> {
        self.offsets.get(token_index).copied()
    }

    /// One past the last char of the last token.
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.offsets
    }
}

/// Re-join tokens the way [`OffsetIndex`] assumes: one space between each.
pub fn rejoin(tokens: &[Token]) -> String {
    let mut out = String::new();
    for (idx, token) in tokens.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(&token.text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::DEFAULT_WORD_PATTERN;
    use crate::tokenizer::tokenize;

    #[test]
    fn offsets_assume_single_separator() {
        let tokens = tokenize("Hello,   world!", DEFAULT_WORD_PATTERN);
        let index = OffsetIndex::build(&tokens);
        assert_eq!(index.as_slice(), &[0, 6, 8, 14]);
        assert_eq!(index.end(), 15);
        assert_eq!(rejoin(&tokens), "Hello , world !");
    }

    #[test]
    fn boundary_at_thirteen_resolves_to_world() {
        let tokens = tokenize("Hello, world!", DEFAULT_WORD_PATTERN);
        let index = OffsetIndex::build(&tokens);
        let found = index.token_index_at(13).expect("offset inside text");
        assert_eq!(tokens[found].text, "world");
    }

    #[test]
    fn every_char_inside_a_token_maps_back_to_it() {
        let tokens = tokenize("Él dijo: «ven aquí», y llegaron.", DEFAULT_WORD_PATTERN);
        let index = OffsetIndex::build(&tokens);
        for (idx, token) in tokens.iter().enumerate() {
            let start = index.offset_of(idx).unwrap();
            for offset in start..start + token.char_len() {
                assert_eq!(index.token_index_at(offset), Some(idx));
            }
        }
    }

    #[test]
    fn out_of_range_offsets_return_none() {
        let tokens = tokenize("uno dos", DEFAULT_WORD_PATTERN);
        let index = OffsetIndex::build(&tokens);
        assert_eq!(index.token_index_at(index.end()), None);
        assert_eq!(index.token_index_at(usize::MAX), None);
        assert_eq!(OffsetIndex::build(&[]).token_index_at(0), None);
    }

    #[test]
    fn gap_offsets_map_to_preceding_token() {
        let tokens = tokenize("uno dos", DEFAULT_WORD_PATTERN);
        let index = OffsetIndex::build(&tokens);
        assert_eq!(index.token_index_at(3), Some(0));
        assert_eq!(index.token_index_at(4), Some(1));
    }
}
