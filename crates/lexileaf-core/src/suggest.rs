//! Translation suggestions for a selected word.
//!
//! Lookups are best effort: a failed request yields an empty list. Requests
//! are superseded by newer selections, and [`SuggestionTracker`] is what lets
//! the session recognise a late answer for a word the learner already left.

use crate::store::WordId;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use ts_rs::TS;

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";
pub const MAX_SUGGESTIONS: usize = 5;

/// A suggestion lookup the host should perform and report back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SuggestionRequest {
    pub request_id: u64,
    pub word_id: WordId,
    pub word: String,
    pub source_language: String,
    pub target_language: String,
}

pub trait SuggestionService {
    /// Candidate translations of `word`; empty when nothing could be found.
    fn suggest(&self, word: &str, source_language: &str, target_language: &str) -> Vec<String>;
}

/// Client for a MyMemory-compatible `GET ?q=..&langpair=src|tgt` endpoint.
#[derive(Debug, Clone)]
pub struct HttpSuggestionService {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpSuggestionService {
    pub fn new(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lexileaf/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build suggestion HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    fn fetch(&self, word: &str, source: &str, target: &str) -> anyhow::Result<Vec<String>> {
        let langpair = format!("{source}|{target}");
        let body = self
            .client
            .get(&self.endpoint)
            .query(&[("q", word), ("langpair", langpair.as_str())])
            .send()?
            .error_for_status()?
            .text()?;
        parse_response(&body, word)
    }
}

impl SuggestionService for HttpSuggestionService {
    fn suggest(&self, word: &str, source_language: &str, target_language: &str) -> Vec<String> {
        match self.fetch(word, source_language, target_language) {
            Ok(found) => {
                debug!(word, count = found.len(), "Fetched suggestions");
                found
            }
            Err(err) => {
                warn!(word, "Suggestion lookup failed: {err:#}");
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    response_data: Option<LookupData>,
    #[serde(default)]
    matches: Vec<LookupMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupData {
    translated_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LookupMatch {
    translation: Option<String>,
}

/// Primary translation first, then alternative matches. Blank entries and
/// echoes of the query are dropped, duplicates are folded case-insensitively.
pub fn parse_response(body: &str, word: &str) -> anyhow::Result<Vec<String>> {
    let parsed: LookupResponse =
        serde_json::from_str(body).context("unexpected suggestion response")?;

    let primary = parsed
        .response_data
        .and_then(|data| data.translated_text);
    let alternatives = parsed.matches.into_iter().filter_map(|m| m.translation);

    let mut seen = HashSet::new();
    seen.insert(word.trim().to_lowercase());
    let mut out = Vec::new();
    for candidate in primary.into_iter().chain(alternatives) {
        let candidate = candidate.trim();
        if candidate.is_empty() || !seen.insert(candidate.to_lowercase()) {
            continue;
        }
        out.push(candidate.to_string());
        if out.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    Ok(out)
}

/// Remembers the one lookup whose answer is still wanted.
#[derive(Debug, Default)]
pub struct SuggestionTracker {
    next_id: u64,
    pending: Option<(u64, WordId)>,
}

impl SuggestionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a lookup for `word_id`, superseding any earlier one.
    pub fn issue(&mut self, word_id: &WordId) -> u64 {
        self.next_id += 1;
        self.pending = Some((self.next_id, word_id.clone()));
        self.next_id
    }

    /// True (and clears the pending lookup) only for the latest request.
    pub fn accept(&mut self, request_id: u64, word_id: &WordId) -> bool {
        match &self.pending {
            Some((pending_id, pending_word)) if *pending_id == request_id && pending_word == word_id => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn pending(&self) -> Option<u64> {
        self.pending.as_ref().map(|(id, _)| *id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_primary_and_matches() {
        let body = r#"{
            "responseData": {"translatedText": "house"},
            "matches": [
                {"translation": "House"},
                {"translation": "home"},
                {"translation": "  "},
                {"translation": "casa"},
                {"translation": "dwelling"}
            ]
        }"#;
        let found = parse_response(body, "casa").unwrap();
        assert_eq!(found, vec!["house", "home", "dwelling"]);
    }

    #[test]
    fn caps_number_of_suggestions() {
        let matches: Vec<String> = (0..10)
            .map(|n| format!(r#"{{"translation": "w{n}"}}"#))
            .collect();
        let body = format!(r#"{{"matches": [{}]}}"#, matches.join(","));
        assert_eq!(parse_response(&body, "x").unwrap().len(), MAX_SUGGESTIONS);
    }

    #[test]
    fn malformed_body_is_an_error() {
        assert!(parse_response("<html>", "casa").is_err());
    }

    #[test]
    fn only_latest_request_is_accepted() {
        let mut tracker = SuggestionTracker::new();
        let casa = WordId("casa".to_string());
        let perro = WordId("perro".to_string());

        let first = tracker.issue(&casa);
        let second = tracker.issue(&perro);
        assert!(!tracker.accept(first, &casa));
        assert!(!tracker.accept(second, &casa));
        assert!(tracker.accept(second, &perro));
        assert!(!tracker.accept(second, &perro));
    }

    #[test]
    fn cancel_drops_pending_request() {
        let mut tracker = SuggestionTracker::new();
        let casa = WordId("casa".to_string());
        let id = tracker.issue(&casa);
        assert_eq!(tracker.pending(), Some(id));
        tracker.cancel();
        assert!(!tracker.accept(id, &casa));
    }
}
