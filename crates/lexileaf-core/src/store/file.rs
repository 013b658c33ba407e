//! JSON-file store.
//!
//! Words and articles live in two tables under the data directory. Both are
//! loaded once on open and rewritten whole on every mutation through a
//! temporary file that is renamed into place, so a crash never leaves a
//! half-written table behind.

use super::{
    ArticleId, ArticlePatch, ArticleRecord, RecordStore, WordEntry, WordId, WordPatch,
};
use crate::error::StoreError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

pub const WORDS_FILE: &str = "words.json";
pub const ARTICLES_FILE: &str = "articles.json";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    words: BTreeMap<WordId, WordEntry>,
    articles: BTreeMap<ArticleId, ArticleRecord>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let words: BTreeMap<WordId, WordEntry> = read_table(&dir.join(WORDS_FILE))?;
        let articles: BTreeMap<ArticleId, ArticleRecord> =
            read_table(&dir.join(ARTICLES_FILE))?;
        info!(
            path = %dir.display(),
            words = words.len(),
            articles = articles.len(),
            "Opened record store"
        );
        Ok(Self {
            dir,
            words,
            articles,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn articles(&self) -> impl Iterator<Item = &ArticleRecord> {
        self.articles.values()
    }

    fn flush_words(&self) -> Result<(), StoreError> {
        write_table(&self.dir.join(WORDS_FILE), &self.words)
    }

    fn flush_articles(&self) -> Result<(), StoreError> {
        write_table(&self.dir.join(ARTICLES_FILE), &self.articles)
    }
}

impl RecordStore for FileStore {
    fn get_word(&self, id: &WordId) -> Result<Option<WordEntry>, StoreError> {
        Ok(self.words.get(id).cloned())
    }

    fn add_word(&mut self, entry: &WordEntry) -> Result<(), StoreError> {
        let previous = self.words.insert(entry.id.clone(), entry.clone());
        if let Err(err) = self.flush_words() {
            match previous {
                Some(previous) => self.words.insert(entry.id.clone(), previous),
                None => self.words.remove(&entry.id),
            };
            return Err(err);
        }
        Ok(())
    }

    fn add_words(&mut self, entries: &[WordEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }
        let previous: Vec<(WordId, Option<WordEntry>)> = entries
            .iter()
            .map(|entry| {
                let previous = self.words.insert(entry.id.clone(), entry.clone());
                (entry.id.clone(), previous)
            })
            .collect();
        if let Err(err) = self.flush_words() {
            for (id, previous) in previous.into_iter().rev() {
                match previous {
                    Some(previous) => self.words.insert(id, previous),
                    None => self.words.remove(&id),
                };
            }
            return Err(err);
        }
        debug!(words = entries.len(), "Stored word batch");
        Ok(())
    }

    fn update_word(&mut self, id: &WordId, patch: &WordPatch) -> Result<(), StoreError> {
        let entry = self.words.get_mut(id).ok_or_else(|| StoreError::Missing {
            kind: "word",
            id: id.to_string(),
        })?;
        let previous = entry.clone();
        patch.apply(entry);
        if let Err(err) = self.flush_words() {
            self.words.insert(id.clone(), previous);
            return Err(err);
        }
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
        let previous = self.articles.insert(article.id.clone(), article.clone());
        if let Err(err) = self.flush_articles() {
            match previous {
                Some(previous) => self.articles.insert(article.id.clone(), previous),
                None => self.articles.remove(&article.id),
            };
            return Err(err);
        }
        Ok(())
    }

    fn update_article(&mut self, id: &ArticleId, patch: &ArticlePatch) -> Result<(), StoreError> {
        let article = self.articles.get_mut(id).ok_or_else(|| StoreError::Missing {
            kind: "article",
            id: id.to_string(),
        })?;
        let previous = article.clone();
        patch.apply(article);
        if let Err(err) = self.flush_articles() {
            self.articles.insert(id.clone(), previous);
            return Err(err);
        }
        Ok(())
    }
}

fn read_table<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "Table missing; starting empty");
        return Ok(T::default());
    }
    let data = fs::read_to_string(path)?;
    if data.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(&data)?)
}

fn write_table<T: Serialize>(path: &Path, table: &T) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let temp_file = NamedTempFile::new_in(parent)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        serde_json::to_writer_pretty(&mut writer, table)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(|err| err.error)?;
    debug!(path = %path.display(), "Table written");
    Ok(())
}
