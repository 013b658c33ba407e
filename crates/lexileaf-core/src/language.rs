//! Per-language tokenization rules.
//!
//! Rules are plain data resolved once per language; the tokenizer and
//! normalizer never branch on the language code themselves.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use ts_rs::TS;

/// Letters (with combining marks) optionally chained by apostrophes or hyphens.
pub const DEFAULT_WORD_PATTERN: &str = r"[\p{L}\p{M}]+(?:['’\-][\p{L}\p{M}]+)*";
/// Sentence terminators used to split context sentences.
pub const DEFAULT_SPLIT_PATTERN: &str = r"[.!?…]+";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(default)]
#[ts(export)]
pub struct LanguageRules {
    pub split_pattern: String,
    pub word_pattern: String,
}

impl LanguageRules {
    pub fn new(split_pattern: impl Into<String>, word_pattern: impl Into<String>) -> Self {
        Self {
            split_pattern: split_pattern.into(),
            word_pattern: word_pattern.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.split_pattern.trim().is_empty() && self.word_pattern.trim().is_empty()
    }
}

/// Supplies tokenization rules for a language code.
pub trait RuleProvider {
    fn rules_for(&self, language: &str) -> Option<LanguageRules>;
}

impl RuleProvider for BTreeMap<String, LanguageRules> {
    fn rules_for(&self, language: &str) -> Option<LanguageRules> {
        self.get(language).cloned()
    }
}

/// Rules shipped for the languages the reader knows out of the box.
pub fn builtin_rules() -> BTreeMap<String, LanguageRules> {
    let mut rules = BTreeMap::new();
    for code in ["en", "es", "fr", "de", "it", "pt"] {
        rules.insert(
            code.to_string(),
            LanguageRules::new(DEFAULT_SPLIT_PATTERN, DEFAULT_WORD_PATTERN),
        );
    }
    rules
}

/// Resolve rules for `language`, degrading to empty rules (and therefore the
/// tokenizer/normalizer fallbacks) when the provider has none.
pub fn resolve_rules(provider: &dyn RuleProvider, language: &str) -> LanguageRules {
    match provider.rules_for(language) {
        Some(rules) => {
            debug!(%language, "Resolved language rules");
            rules
        }
        None => {
            warn!(%language, "No tokenization rules configured; using fallbacks");
            LanguageRules::default()
        }
    }
}

/// Strip a leading `^` and an unescaped trailing `$` so a whole-string
/// pattern can be embedded as a sub-expression.
pub(crate) fn strip_anchors(pattern: &str) -> &str {
    let mut trimmed = pattern.trim();
    if let Some(rest) = trimmed.strip_prefix('^') {
        trimmed = rest;
    }
    if let Some(rest) = trimmed.strip_suffix('$') {
        let escapes = rest.chars().rev().take_while(|ch| *ch == '\\').count();
        if escapes % 2 == 0 {
            trimmed = rest;
        }
    }
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_anchors_but_keeps_escaped_dollar() {
        assert_eq!(strip_anchors(r"^\p{L}+$"), r"\p{L}+");
        assert_eq!(strip_anchors(r"\p{L}+\$"), r"\p{L}+\$");
        assert_eq!(strip_anchors(r"\p{L}+\\$"), r"\p{L}+\\");
        assert_eq!(strip_anchors("  "), "");
    }

    #[test]
    fn unknown_language_resolves_to_empty_rules() {
        let provider = builtin_rules();
        assert!(resolve_rules(&provider, "xx").is_empty());
        assert_eq!(
            resolve_rules(&provider, "es").word_pattern,
            DEFAULT_WORD_PATTERN
        );
    }
}
