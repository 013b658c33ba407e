//! Records persisted by the external word/article store, and the store seam.
//!
//! The engine only talks to storage through [`RecordStore`]; every call is
//! fallible and the caller decides how to compensate.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::{SessionError, StoreError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};
use ts_rs::TS;

/// Opaque word identity assigned on first creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct WordId(pub String);

impl WordId {
    pub fn generate(language: &str, key: &str) -> Self {
        static SEQ: AtomicU64 = AtomicU64::new(0);
        let nonce = SEQ.fetch_add(1, Ordering::Relaxed);
        let mut hasher = Sha256::new();
        hasher.update(language.as_bytes());
        hasher.update([0u8]);
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(now_nanos().to_le_bytes());
        hasher.update(nonce.to_le_bytes());
        let hash = format!("{:x}", hasher.finalize());
        WordId(hash[..16].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Familiarity rating: 0 = unseen/unrated, 5 = fully known.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS,
)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export)]
pub struct Comfort(u8);

impl Comfort {
    pub const UNSEEN: Comfort = Comfort(0);
    pub const KNOWN: Comfort = Comfort(5);

    pub fn new(level: u8) -> Result<Self, SessionError> {
        if level > Self::KNOWN.0 {
            return Err(SessionError::InvalidComfort(level));
        }
        Ok(Comfort(level))
    }

    pub fn level(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Comfort {
    type Error = SessionError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Comfort::new(level)
    }
}

impl From<Comfort> for u8 {
    fn from(comfort: Comfort) -> Self {
        comfort.0
    }
}

/// One distinct vocabulary item for one target language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub id: WordId,
    pub language: String,
    pub name: String,
    #[serde(default)]
    pub comfort: Comfort,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub frequency: u64,
    pub created_at: u64,
}

impl WordEntry {
    pub fn new(language: &str, name: &str, frequency: u64) -> Self {
        Self {
            id: WordId::generate(language, name),
            language: language.to_string(),
            name: name.to_string(),
            comfort: Comfort::UNSEEN,
            translation: None,
            frequency,
            created_at: now_millis(),
        }
    }
}

/// Partial update of a [`WordEntry`]; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordPatch {
    pub comfort: Option<Comfort>,
    pub translation: Option<Option<String>>,
    pub frequency: Option<u64>,
}

impl WordPatch {
    pub fn apply(&self, entry: &mut WordEntry) {
        if let Some(comfort) = self.comfort {
            entry.comfort = comfort;
        }
        if let Some(translation) = &self.translation {
            entry.translation = translation.clone();
        }
        if let Some(frequency) = self.frequency {
            entry.frequency = frequency;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export)]
pub struct ArticleId(pub String);

impl ArticleId {
    /// Content-derived id; importing the same article twice yields the same id.
    pub fn for_content(title: &str, language: &str, text: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update([0u8]);
        hasher.update(language.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        ArticleId(hash[..20].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub id: ArticleId,
    pub title: String,
    pub language: String,
    pub text: String,
    /// Word entries touched while reading this article.
    #[serde(default)]
    pub seen_words: BTreeSet<WordId>,
    /// Bookmark: page shown when the article was last left.
    #[serde(default)]
    pub last_page: usize,
    pub created_at: u64,
}

impl ArticleRecord {
    pub fn new(title: &str, language: &str, text: &str) -> Self {
        Self {
            id: ArticleId::for_content(title, language, text),
            title: title.to_string(),
            language: language.to_string(),
            text: text.to_string(),
            seen_words: BTreeSet::new(),
            last_page: 0,
            created_at: now_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticlePatch {
    pub seen_words: Option<BTreeSet<WordId>>,
    pub last_page: Option<usize>,
}

impl ArticlePatch {
    pub fn apply(&self, article: &mut ArticleRecord) {
        if let Some(seen) = &self.seen_words {
            article.seen_words = seen.clone();
        }
        if let Some(page) = self.last_page {
            article.last_page = page;
        }
    }
}

/// The external key-value/document store holding words and articles.
pub trait RecordStore {
    fn get_word(&self, id: &WordId) -> Result<Option<WordEntry>, StoreError>;
    fn add_word(&mut self, entry: &WordEntry) -> Result<(), StoreError>;
    /// Insert several entries in one write. The default inserts one by one
    /// and stops at the first failure; stores with whole-table writes
    /// override it.
    fn add_words(&mut self, entries: &[WordEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.add_word(entry)?;
        }
        Ok(())
    }
    fn update_word(&mut self, id: &WordId, patch: &WordPatch) -> Result<(), StoreError>;
    /// Query on the indexed `language` field.
    fn words_by_language(&self, language: &str) -> Result<Vec<WordEntry>, StoreError>;

    fn get_article(&self, id: &ArticleId) -> Result<Option<ArticleRecord>, StoreError>;
    fn add_article(&mut self, article: &ArticleRecord) -> Result<(), StoreError>;
    fn update_article(&mut self, id: &ArticleId, patch: &ArticlePatch) -> Result<(), StoreError>;
}

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn now_nanos() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comfort_rejects_levels_above_five() {
        assert_eq!(Comfort::new(5).unwrap(), Comfort::KNOWN);
        assert!(matches!(
            Comfort::new(6),
            Err(SessionError::InvalidComfort(6))
        ));
    }

    #[test]
    fn comfort_round_trips_as_plain_integer() {
        let entry = WordEntry::new("es", "hola", 3);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"comfort\":0"));

        let bad = json.replace("\"comfort\":0", "\"comfort\":9");
        assert!(serde_json::from_str::<WordEntry>(&bad).is_err());
    }

    #[test]
    fn generated_word_ids_are_unique() {
        let a = WordId::generate("es", "hola");
        let b = WordId::generate("es", "hola");
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 16);
    }

    #[test]
    fn article_id_depends_on_content_only() {
        let a = ArticleRecord::new("T", "es", "Hola mundo");
        let b = ArticleRecord::new("T", "es", "Hola mundo");
        let c = ArticleRecord::new("T", "es", "Hola mundo.");
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[test]
    fn patches_touch_only_given_fields() {
        let mut entry = WordEntry::new("es", "hola", 3);
        WordPatch {
            comfort: Some(Comfort::new(2).unwrap()),
            ..WordPatch::default()
        }
        .apply(&mut entry);
        assert_eq!(entry.comfort.level(), 2);
        assert_eq!(entry.frequency, 3);

        WordPatch {
            translation: Some(Some("hello".to_string())),
            ..WordPatch::default()
        }
        .apply(&mut entry);
        assert_eq!(entry.translation.as_deref(), Some("hello"));
        assert_eq!(entry.comfort.level(), 2);
    }
}
