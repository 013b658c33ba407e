use super::{
    ArticleId, ArticlePatch, ArticleRecord, RecordStore, WordEntry, WordId, WordPatch,
};
use crate::error::StoreError;
use std::collections::BTreeMap;

/// In-process store. Used by tests and by hosts that keep everything in
/// memory; `fail_writes` makes every mutating call fail so callers can
/// exercise their rollback paths.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    words: BTreeMap<WordId, WordEntry>,
    articles: BTreeMap<ArticleId, ArticleRecord>,
    fail_writes: bool,
    word_writes: usize,
    article_writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_article(mut self, article: ArticleRecord) -> Self {
        self.articles.insert(article.id.clone(), article);
        self
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Successful word writes so far. A batch insert counts once.
    pub fn word_writes(&self) -> usize {
        self.word_writes
    }

    pub fn article_writes(&self) -> usize {
        self.article_writes
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn words(&self) -> impl Iterator<Item = &WordEntry> {
        self.words.values()
    }

    pub fn article(&self, id: &ArticleId) -> Option<&ArticleRecord> {
        self.articles.get(id)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Rejected("writes disabled".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn get_word(&self, id: &WordId) -> Result<Option<WordEntry>, StoreError> {
        Ok(self.words.get(id).cloned())
    }

    fn add_word(&mut self, entry: &WordEntry) -> Result<(), StoreError> {
        self.check_writable()?;
        self.words.insert(entry.id.clone(), entry.clone());
        self.word_writes += 1;
        Ok(())
    }

    fn add_words(&mut self, entries: &[WordEntry]) -> Result<(), StoreError> {
        self.check_writable()?;
        for entry in entries {
            self.words.insert(entry.id.clone(), entry.clone());
        }
        self.word_writes += 1;
        Ok(())
    }

    fn update_word(&mut self, id: &WordId, patch: &WordPatch) -> Result<(), StoreError> {
        self.check_writable()?;
        let entry = self.words.get_mut(id).ok_or_else(|| StoreError::Missing {
            kind: "word",
            id: id.to_string(),
        })?;
        patch.apply(entry);
        self.word_writes += 1;
        Ok(())
    }

    fn words_by_language(&self, language: &str) -> Result<Vec<WordEntry>, StoreError> {
        Ok(self
            .words
            .values()
            .filter(|entry| entry.language == language)
            .cloned()
            .collect())
    }

    fn get_article(&self, id: &ArticleId) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.articles.get(id).cloned())
    }

    fn add_article(&mut self, article: &ArticleRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        self.articles.insert(article.id.clone(), article.clone());
        self.article_writes += 1;
        Ok(())
    }

    fn update_article(&mut self, id: &ArticleId, patch: &ArticlePatch) -> Result<(), StoreError> {
        self.check_writable()?;
        let article = self.articles.get_mut(id).ok_or_else(|| StoreError::Missing {
            kind: "article",
            id: id.to_string(),
        })?;
        patch.apply(article);
        self.article_writes += 1;
        Ok(())
    }
}
