//! In-memory projection of the word store, cached per language.
//!
//! Every mutation updates the cache first and then writes through to the
//! store. A failed write is compensated by restoring the previous cached
//! value, so lookups issued right after a creation always see it and a
//! rejected write never leaves a phantom entry behind.

use crate::error::SessionError;
use crate::store::{Comfort, RecordStore, WordEntry, WordId, WordPatch};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Default)]
struct LanguageCache {
    entries: HashMap<WordId, WordEntry>,
    by_name: HashMap<String, WordId>,
}

impl LanguageCache {
    fn insert(&mut self, entry: WordEntry) {
        self.by_name.insert(name_key(&entry.name), entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    fn remove(&mut self, id: &WordId) -> Option<WordEntry> {
        let entry = self.entries.remove(id)?;
        let key = name_key(&entry.name);
        if self.by_name.get(&key) == Some(id) {
            self.by_name.remove(&key);
        }
        Some(entry)
    }
}

/// Outcome of [`WordRegistry::ensure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensured {
    pub entry: WordEntry,
    /// True when this call created the entry.
    pub created: bool,
}

#[derive(Debug, Default)]
pub struct WordRegistry {
    languages: HashMap<String, LanguageCache>,
}

impl WordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)load every entry of `language` from the store.
    ///
    /// Store rows whose names collide after case folding are kept, but only
    /// the oldest one is reachable through [`WordRegistry::lookup`].
    pub fn load_language<S: RecordStore>(
        &mut self,
        store: &S,
        language: &str,
    ) -> Result<usize, SessionError> {
        let mut rows = store
            .words_by_language(language)
            .map_err(|err| SessionError::persistence("vocabulary", err))?;
        rows.sort_by_key(|entry| entry.created_at);

        let mut cache = LanguageCache::default();
        for entry in rows {
            let key = name_key(&entry.name);
            if cache.by_name.contains_key(&key) {
                warn!(%language, word = %entry.name, id = %entry.id, "Duplicate word entry in store");
                cache.entries.insert(entry.id.clone(), entry);
                continue;
            }
            cache.insert(entry);
        }

        let loaded = cache.entries.len();
        info!(%language, words = loaded, "Loaded vocabulary");
        self.languages.insert(language.to_string(), cache);
        Ok(loaded)
    }

    pub fn is_loaded(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    /// Case-insensitive exact match on display names.
    pub fn lookup(&self, language: &str, key: &str) -> Option<&WordEntry> {
        let cache = self.languages.get(language)?;
        let id = cache.by_name.get(&name_key(key))?;
        cache.entries.get(id)
    }

    pub fn get(&self, language: &str, id: &WordId) -> Option<&WordEntry> {
        self.languages.get(language)?.entries.get(id)
    }

    pub fn contains(&self, language: &str, id: &WordId) -> bool {
        self.get(language, id).is_some()
    }

    pub fn entries(&self, language: &str) -> impl Iterator<Item = &WordEntry> {
        self.languages
            .get(language)
            .into_iter()
            .flat_map(|cache| cache.entries.values())
    }

    pub fn len(&self, language: &str) -> usize {
        self.languages
            .get(language)
            .map_or(0, |cache| cache.entries.len())
    }

    /// Return the entry for `key`, creating it with comfort 0 and the
    /// observed frequency when the language has none yet.
    pub fn ensure<S: RecordStore>(
        &mut self,
        store: &mut S,
        language: &str,
        key: &str,
        observed_frequency: u64,
    ) -> Result<Ensured, SessionError> {
        if key.trim().is_empty() {
            return Err(SessionError::NotAWord(key.to_string()));
        }
        if let Some(entry) = self.lookup(language, key) {
            return Ok(Ensured {
                entry: entry.clone(),
                created: false,
            });
        }

        let entry = WordEntry::new(language, key, observed_frequency);
        let cache = self.languages.entry(language.to_string()).or_default();
        cache.insert(entry.clone());

        if let Err(err) = store.add_word(&entry) {
            cache.remove(&entry.id);
            warn!(%language, word = key, "Word creation failed; rolled back: {err}");
            return Err(SessionError::persistence("word", err));
        }

        debug!(%language, word = key, id = %entry.id, frequency = observed_frequency, "Created word entry");
        Ok(Ensured {
            entry,
            created: true,
        })
    }

    /// Batch form of [`WordRegistry::ensure`]. Blank keys are skipped and
    /// every missing entry reaches the store in a single write. When that
    /// write fails, none of the new entries stay cached.
    pub fn ensure_many<'k, S, I>(
        &mut self,
        store: &mut S,
        language: &str,
        keys: I,
    ) -> Result<Vec<Ensured>, SessionError>
    where
        S: RecordStore,
        I: IntoIterator<Item = (&'k str, u64)>,
    {
        let mut ensured = Vec::new();
        let mut created = Vec::new();
        for (key, observed_frequency) in keys {
            if key.trim().is_empty() {
                continue;
            }
            if let Some(entry) = self.lookup(language, key) {
                ensured.push(Ensured {
                    entry: entry.clone(),
                    created: false,
                });
                continue;
            }
            let entry = WordEntry::new(language, key, observed_frequency);
            self.languages
                .entry(language.to_string())
                .or_default()
                .insert(entry.clone());
            created.push(entry.clone());
            ensured.push(Ensured {
                entry,
                created: true,
            });
        }
        if created.is_empty() {
            return Ok(ensured);
        }

        if let Err(err) = store.add_words(&created) {
            if let Some(cache) = self.languages.get_mut(language) {
                for entry in &created {
                    cache.remove(&entry.id);
                }
            }
            warn!(%language, words = created.len(), "Word batch failed; rolled back: {err}");
            return Err(SessionError::persistence("word", err));
        }

        debug!(%language, words = created.len(), "Created word entries");
        Ok(ensured)
    }

    pub fn set_comfort<S: RecordStore>(
        &mut self,
        store: &mut S,
        language: &str,
        id: &WordId,
        comfort: Comfort,
    ) -> Result<WordEntry, SessionError> {
        let patch = WordPatch {
            comfort: Some(comfort),
            ..WordPatch::default()
        };
        self.update(store, language, id, patch)
    }

    /// Blank text clears the translation.
    pub fn set_translation<S: RecordStore>(
        &mut self,
        store: &mut S,
        language: &str,
        id: &WordId,
        translation: Option<&str>,
    ) -> Result<WordEntry, SessionError> {
        let translation = translation
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let patch = WordPatch {
            translation: Some(translation),
            ..WordPatch::default()
        };
        self.update(store, language, id, patch)
    }

    pub fn increment_frequency<S: RecordStore>(
        &mut self,
        store: &mut S,
        language: &str,
        id: &WordId,
        by: u64,
    ) -> Result<WordEntry, SessionError> {
        let current = self
            .get(language, id)
            .ok_or_else(|| not_found(id))?
            .frequency;
        let patch = WordPatch {
            frequency: Some(current.saturating_add(by)),
            ..WordPatch::default()
        };
        self.update(store, language, id, patch)
    }

    fn update<S: RecordStore>(
        &mut self,
        store: &mut S,
        language: &str,
        id: &WordId,
        patch: WordPatch,
    ) -> Result<WordEntry, SessionError> {
        let entry = self
            .languages
            .get_mut(language)
            .and_then(|cache| cache.entries.get_mut(id))
            .ok_or_else(|| not_found(id))?;

        let previous = entry.clone();
        patch.apply(entry);
        let updated = entry.clone();

        if let Err(err) = store.update_word(id, &patch) {
            *entry = previous;
            warn!(%language, %id, "Word update failed; rolled back: {err}");
            return Err(SessionError::persistence("word", err));
        }
        Ok(updated)
    }
}

fn not_found(id: &WordId) -> SessionError {
    SessionError::NotFound {
        kind: "word",
        id: id.to_string(),
    }
}

/// Registry comparison key: canonical decomposition, then case folding.
fn name_key(name: &str) -> String {
    name.nfd().collect::<String>().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn loaded(store: &MemoryStore) -> WordRegistry {
        let mut registry = WordRegistry::new();
        registry.load_language(store, "es").unwrap();
        registry
    }

    #[test]
    fn ensure_twice_creates_one_record() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);

        let first = registry.ensure(&mut store, "es", "hola", 2).unwrap();
        let second = registry.ensure(&mut store, "es", "hola", 7).unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.entry.id, second.entry.id);
        assert_eq!(second.entry.frequency, 2);
        assert_eq!(store.word_count(), 1);
        assert_eq!(first.entry.comfort, Comfort::UNSEEN);
    }

    #[test]
    fn ensure_many_writes_new_words_once() {
        let mut store = MemoryStore::new();
        store.add_word(&WordEntry::new("es", "hola", 4)).unwrap();
        let mut registry = loaded(&store);

        let ensured = registry
            .ensure_many(
                &mut store,
                "es",
                [("hola", 1), ("casa", 2), ("", 9), ("perro", 3), ("casa", 5)],
            )
            .unwrap();

        let created: Vec<bool> = ensured.iter().map(|e| e.created).collect();
        assert_eq!(created, vec![false, true, true, false]);
        assert_eq!(ensured[0].entry.frequency, 4);
        assert_eq!(ensured[1].entry.id, ensured[3].entry.id);
        assert_eq!(store.word_count(), 3);
        assert_eq!(store.word_writes(), 2);
        assert!(registry.lookup("es", "perro").is_some());
    }

    #[test]
    fn failed_batch_rolls_back_every_new_entry() {
        let mut store = MemoryStore::new();
        store.add_word(&WordEntry::new("es", "hola", 1)).unwrap();
        let mut registry = loaded(&store);
        store.set_fail_writes(true);

        let err = registry
            .ensure_many(&mut store, "es", [("hola", 1), ("casa", 1), ("perro", 1)])
            .unwrap_err();
        assert!(matches!(err, SessionError::Persistence { what: "word", .. }));
        assert!(registry.lookup("es", "hola").is_some());
        assert!(registry.lookup("es", "casa").is_none());
        assert!(registry.lookup("es", "perro").is_none());
        assert_eq!(registry.len("es"), 1);
    }

    #[test]
    fn lookup_is_case_insensitive_and_language_scoped() {
        let mut store = MemoryStore::new();
        store.add_word(&WordEntry::new("es", "Año", 1)).unwrap();
        let mut registry = loaded(&store);

        let key: String = "año".nfd().collect();
        assert!(registry.lookup("es", &key).is_some());
        assert!(registry.lookup("es", "ano").is_none());
        assert!(registry.lookup("fr", &key).is_none());

        let ensured = registry.ensure(&mut store, "fr", &key, 1).unwrap();
        assert!(ensured.created);
        assert_eq!(registry.len("es"), 1);
        assert_eq!(registry.len("fr"), 1);
    }

    #[test]
    fn failed_creation_leaves_no_entry() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);
        store.set_fail_writes(true);

        let err = registry.ensure(&mut store, "es", "gato", 1).unwrap_err();
        assert!(matches!(err, SessionError::Persistence { what: "word", .. }));
        assert!(registry.lookup("es", "gato").is_none());
        assert_eq!(registry.len("es"), 0);

        store.set_fail_writes(false);
        assert!(registry.ensure(&mut store, "es", "gato", 1).unwrap().created);
    }

    #[test]
    fn comfort_update_rolls_back_on_failure() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);
        let id = registry.ensure(&mut store, "es", "perro", 1).unwrap().entry.id;

        let level = Comfort::new(3).unwrap();
        let updated = registry.set_comfort(&mut store, "es", &id, level).unwrap();
        assert_eq!(updated.comfort, level);
        assert_eq!(store.get_word(&id).unwrap().unwrap().comfort, level);

        store.set_fail_writes(true);
        assert!(
            registry
                .set_comfort(&mut store, "es", &id, Comfort::KNOWN)
                .is_err()
        );
        assert_eq!(registry.get("es", &id).unwrap().comfort, level);
    }

    #[test]
    fn translation_is_trimmed_and_blank_clears_it() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);
        let id = registry.ensure(&mut store, "es", "casa", 1).unwrap().entry.id;

        let entry = registry
            .set_translation(&mut store, "es", &id, Some("  house "))
            .unwrap();
        assert_eq!(entry.translation.as_deref(), Some("house"));

        let entry = registry
            .set_translation(&mut store, "es", &id, Some("   "))
            .unwrap();
        assert_eq!(entry.translation, None);
    }

    #[test]
    fn increments_frequency_explicitly() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);
        let id = registry.ensure(&mut store, "es", "sol", 4).unwrap().entry.id;
        let entry = registry
            .increment_frequency(&mut store, "es", &id, 3)
            .unwrap();
        assert_eq!(entry.frequency, 7);
    }

    #[test]
    fn unknown_ids_and_empty_keys_are_rejected() {
        let mut store = MemoryStore::new();
        let mut registry = loaded(&store);
        let missing = WordId("missing".to_string());
        assert!(
            registry
                .set_comfort(&mut store, "es", &missing, Comfort::KNOWN)
                .unwrap_err()
                .is_not_found()
        );
        assert!(matches!(
            registry.ensure(&mut store, "es", "", 1),
            Err(SessionError::NotAWord(_))
        ));
    }
}
