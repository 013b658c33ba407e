//! The reading session: one open article, its layout, the registry and the
//! narration state.
//!
//! A session is driven by [`SessionCommand`]s and by narration signals it
//! drains itself in [`ReadingSession::pump_narration`]. Neither path renders
//! anything; each returns [`SessionEffect`]s that tell the host what changed,
//! and [`ReadingSession::snapshot`] describes the current state in full.

use crate::config::AppConfig;
use crate::error::SessionError;
use crate::language::{LanguageRules, RuleProvider, resolve_rules};
use crate::layout::TokenLayout;
use crate::narration::{
    NarrationEngine, NarrationSender, NarrationSignal, NarrationState, NarrationSync,
    SyncUpdate, VoiceSettings, narration_channel,
};
use crate::pagination::{PageCounters, clamp_page_size, page_of, range_of};
use crate::registry::WordRegistry;
use crate::store::{ArticleId, ArticlePatch, ArticleRecord, Comfort, RecordStore, WordId};
use crate::suggest::{SuggestionRequest, SuggestionTracker};
use crate::tokenizer::TokenKind;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc::Receiver;
use tracing::{debug, info, warn};
use ts_rs::TS;

/// Learner settings the session needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub page_size: usize,
    pub target_language: String,
    pub voice: VoiceSettings,
}

impl Default for SessionSettings {
    fn default() -> Self {
        SessionSettings::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for SessionSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            page_size: clamp_page_size(config.page_size),
            target_language: config.target_language.clone(),
            voice: config.voice_settings(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    NextPage,
    PrevPage,
    SetPage { page: usize },
    SelectToken { token: usize },
    ClearSelection,
    SetComfort { word: WordId, level: u8 },
    SetTranslation { word: WordId, text: Option<String> },
    SuggestionsArrived {
        request_id: u64,
        word: WordId,
        suggestions: Vec<String>,
    },
    SetPageSize { page_size: usize },
    SetLanguageRules { rules: LanguageRules },
    /// Narrate from `from`, or from the highlighted token / page start.
    NarrationPlay { from: Option<usize> },
    NarrationPause,
    NarrationResume,
    NarrationStop,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::NextPage => "reader_next_page",
            Self::PrevPage => "reader_prev_page",
            Self::SetPage { .. } => "reader_set_page",
            Self::SelectToken { .. } => "reader_select_token",
            Self::ClearSelection => "reader_clear_selection",
            Self::SetComfort { .. } => "word_set_comfort",
            Self::SetTranslation { .. } => "word_set_translation",
            Self::SuggestionsArrived { .. } => "word_suggestions_arrived",
            Self::SetPageSize { .. } => "reader_set_page_size",
            Self::SetLanguageRules { .. } => "reader_set_language_rules",
            Self::NarrationPlay { .. } => "narration_play",
            Self::NarrationPause => "narration_pause",
            Self::NarrationResume => "narration_resume",
            Self::NarrationStop => "narration_stop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Non-blocking message for the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl From<&SessionError> for Notice {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::RuleCompilation { .. } | SessionError::NarrationUnavailable => {
                Notice::info(err.to_string())
            }
            SessionError::Persistence { .. } => Notice::warning(err.to_string()),
            _ => Notice::error(err.to_string()),
        }
    }
}

/// What the host must do after a command or a narration pump.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum SessionEffect {
    /// A different page is shown. The only effect that resets scroll.
    PageTurn { page: usize },
    /// Narration reached `token`; keep the scroll position.
    Highlight { token: usize },
    ClearHighlight,
    FetchSuggestions(SuggestionRequest),
    Notify(Notice),
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct TokenView {
    pub index: usize,
    /// Source text between the previous token and this one, usually
    /// whitespace. Hosts print it before the token to keep the layout.
    pub leading: String,
    pub text: String,
    pub kind: TokenKind,
    pub word_id: Option<WordId>,
    pub comfort: Option<Comfort>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SelectionView {
    pub token: usize,
    pub word_id: WordId,
    pub word: String,
    pub comfort: Comfort,
    pub translation: Option<String>,
    pub suggestions: Vec<String>,
    pub sentence: Option<String>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct NarrationView {
    pub state: NarrationState,
    pub available: bool,
    pub current_token: Option<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ProgressView {
    /// Pages of the token window; bounds navigation.
    pub token_pages: usize,
    /// Pages over the article's distinct words; denominator of `progress_pct`.
    pub vocabulary_pages: usize,
    pub progress_pct: f64,
    pub distinct_words: usize,
    pub seen_words: usize,
    /// Seen words per comfort level 0..=5.
    pub comfort_counts: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ReaderSnapshot {
    pub article_id: ArticleId,
    pub title: String,
    pub language: String,
    pub current_page: usize,
    pub page_size: usize,
    pub tokens: Vec<TokenView>,
    pub highlighted_token: Option<usize>,
    pub selection: Option<SelectionView>,
    pub narration: NarrationView,
    pub progress: ProgressView,
    pub degraded_rules: bool,
}

#[derive(Debug, Clone)]
struct Selection {
    token: usize,
    word_id: WordId,
    suggestions: Vec<String>,
}

/// Store an article, or return the stored copy if the same content was
/// imported before.
pub fn import_article<S: RecordStore>(
    store: &mut S,
    title: &str,
    language: &str,
    text: &str,
) -> Result<ArticleRecord, SessionError> {
    let record = ArticleRecord::new(title, language, text);
    let existing = store
        .get_article(&record.id)
        .map_err(|err| SessionError::persistence("article", err))?;
    if let Some(existing) = existing {
        debug!(id = %existing.id, "Article already imported");
        return Ok(existing);
    }
    store
        .add_article(&record)
        .map_err(|err| SessionError::persistence("article", err))?;
    info!(id = %record.id, %language, title, "Imported article");
    Ok(record)
}

pub struct ReadingSession<S: RecordStore, N: NarrationEngine> {
    store: S,
    narrator: N,
    registry: WordRegistry,
    article_id: ArticleId,
    title: String,
    language: String,
    layout: Arc<TokenLayout>,
    settings: SessionSettings,
    counters: PageCounters,
    current_page: usize,
    highlighted: Option<usize>,
    selection: Option<Selection>,
    seen: BTreeSet<WordId>,
    seen_dirty: bool,
    narration: NarrationSync,
    signals_tx: NarrationSender,
    signals_rx: Receiver<NarrationSignal>,
    suggestions: SuggestionTracker,
}

impl<S: RecordStore, N: NarrationEngine> ReadingSession<S, N> {
    /// Open `article_id`: tokenize it, bring the registry up to date with its
    /// vocabulary and restore the bookmarked page.
    pub fn open(
        store: S,
        narrator: N,
        article_id: &ArticleId,
        rules: &dyn RuleProvider,
        settings: SessionSettings,
    ) -> Result<(Self, Vec<SessionEffect>), SessionError> {
        let article = store
            .get_article(article_id)
            .map_err(|err| SessionError::persistence("article", err))?
            .ok_or_else(|| SessionError::NotFound {
                kind: "article",
                id: article_id.to_string(),
            })?;

        let mut registry = WordRegistry::new();
        registry.load_language(&store, &article.language)?;

        let language_rules = resolve_rules(rules, &article.language);
        let layout = Arc::new(TokenLayout::build(&article.text, &language_rules));
        let mut settings = settings;
        settings.page_size = clamp_page_size(settings.page_size);
        let counters = PageCounters::new(
            layout.len(),
            layout.distinct_words(),
            settings.page_size,
        );

        let stored_seen = article.seen_words.len();
        let seen: BTreeSet<WordId> = article
            .seen_words
            .into_iter()
            .filter(|id| registry.contains(&article.language, id))
            .collect();
        let dropped = stored_seen - seen.len();
        if dropped > 0 {
            info!(dropped, "Dropped seen words that no longer exist");
        }

        let (signals_tx, signals_rx) = narration_channel();
        let mut session = Self {
            store,
            narrator,
            registry,
            article_id: article.id,
            title: article.title,
            language: article.language,
            layout,
            settings,
            counters,
            current_page: article.last_page.min(counters.last_page()),
            highlighted: None,
            selection: None,
            seen,
            seen_dirty: dropped > 0,
            narration: NarrationSync::new(),
            signals_tx,
            signals_rx,
            suggestions: SuggestionTracker::new(),
        };

        info!(
            article = %session.article_id,
            language = %session.language,
            tokens = session.layout.len(),
            page = session.current_page,
            "Opened reading session"
        );

        let mut effects = vec![SessionEffect::PageTurn {
            page: session.current_page,
        }];
        effects.extend(session.rules_notice());
        effects.extend(session.ensure_vocabulary());
        effects.extend(session.flush_seen().map(SessionEffect::Notify));
        Ok((session, effects))
    }

    pub fn apply(&mut self, command: SessionCommand) -> Vec<SessionEffect> {
        let action = command.action();
        debug!(action, "Applying session command");
        match command {
            SessionCommand::NextPage => {
                if self.current_page >= self.counters.last_page() {
                    return Vec::new();
                }
                self.turn_page(self.current_page + 1)
            }
            SessionCommand::PrevPage => match self.current_page.checked_sub(1) {
                Some(page) => self.turn_page(page),
                None => Vec::new(),
            },
            SessionCommand::SetPage { page } => self.turn_page(page),
            SessionCommand::SelectToken { token } => self.select_token(token),
            SessionCommand::ClearSelection => {
                self.selection = None;
                self.suggestions.cancel();
                Vec::new()
            }
            SessionCommand::SetComfort { word, level } => self.set_comfort(&word, level),
            SessionCommand::SetTranslation { word, text } => {
                self.set_translation(&word, text.as_deref())
            }
            SessionCommand::SuggestionsArrived {
                request_id,
                word,
                suggestions,
            } => {
                self.accept_suggestions(request_id, &word, suggestions);
                Vec::new()
            }
            SessionCommand::SetPageSize { page_size } => self.set_page_size(page_size),
            SessionCommand::SetLanguageRules { rules } => self.set_language_rules(&rules),
            SessionCommand::NarrationPlay { from } => {
                let start = from.unwrap_or_else(|| self.default_narration_start());
                self.start_narration(start)
            }
            SessionCommand::NarrationPause => {
                if self.narration.pause() {
                    self.narrator.pause();
                }
                Vec::new()
            }
            SessionCommand::NarrationResume => {
                if self.narration.resume() {
                    self.narrator.resume();
                }
                Vec::new()
            }
            SessionCommand::NarrationStop => self.stop_narration(),
        }
    }

    /// Drain every narration signal queued since the last call.
    pub fn pump_narration(&mut self) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        while let Ok(signal) = self.signals_rx.try_recv() {
            let updates =
                self.narration
                    .on_signal(signal, self.current_page, self.settings.page_size);
            for update in updates {
                match update {
                    SyncUpdate::PageTurn { page } => effects.extend(self.show_page(page)),
                    SyncUpdate::Highlight { token } => {
                        self.highlighted = Some(token);
                        effects.push(SessionEffect::Highlight { token });
                    }
                    SyncUpdate::Finished => {
                        self.highlighted = None;
                        effects.push(SessionEffect::ClearHighlight);
                    }
                    SyncUpdate::Failed { message } => {
                        self.highlighted = None;
                        effects.push(SessionEffect::ClearHighlight);
                        effects.push(SessionEffect::Notify(Notice::warning(format!(
                            "Narration stopped: {message}"
                        ))));
                    }
                }
            }
        }
        effects
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let range = range_of(self.current_page, self.settings.page_size, self.layout.len());
        let tokens = range
            .filter_map(|index| {
                let token = self.layout.token(index)?;
                let gap_start = index
                    .checked_sub(1)
                    .and_then(|prev| self.layout.token(prev))
                    .map_or(0, |prev| prev.byte_range().end);
                let leading = self
                    .layout
                    .text()
                    .get(gap_start..token.byte_start)
                    .unwrap_or_default()
                    .to_string();
                let entry = self
                    .layout
                    .key(index)
                    .and_then(|key| self.registry.lookup(&self.language, key));
                Some(TokenView {
                    index,
                    leading,
                    text: token.text.clone(),
                    kind: token.kind,
                    word_id: entry.map(|entry| entry.id.clone()),
                    comfort: entry.map(|entry| entry.comfort),
                })
            })
            .collect();

        let selection = self.selection.as_ref().and_then(|selection| {
            let entry = self.registry.get(&self.language, &selection.word_id)?;
            Some(SelectionView {
                token: selection.token,
                word_id: entry.id.clone(),
                word: entry.name.clone(),
                comfort: entry.comfort,
                translation: entry.translation.clone(),
                suggestions: selection.suggestions.clone(),
                sentence: self
                    .layout
                    .sentence_containing(selection.token)
                    .map(str::to_string),
            })
        });

        let mut comfort_counts = vec![0usize; usize::from(Comfort::KNOWN.level()) + 1];
        for id in &self.seen {
            if let Some(entry) = self.registry.get(&self.language, id) {
                comfort_counts[usize::from(entry.comfort.level())] += 1;
            }
        }

        ReaderSnapshot {
            article_id: self.article_id.clone(),
            title: self.title.clone(),
            language: self.language.clone(),
            current_page: self.current_page,
            page_size: self.settings.page_size,
            tokens,
            highlighted_token: self.highlighted,
            selection,
            narration: NarrationView {
                state: self.narration.state(),
                available: self.narrator.is_available(),
                current_token: self.narration.current_token(),
            },
            progress: ProgressView {
                token_pages: self.counters.token_pages,
                vocabulary_pages: self.counters.vocabulary_pages,
                progress_pct: self.counters.progress_pct(self.current_page),
                distinct_words: self.layout.distinct_words(),
                seen_words: self.seen.len(),
                comfort_counts,
            },
            degraded_rules: self.layout.is_degraded(),
        }
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.counters.token_pages
    }

    pub fn layout(&self) -> &Arc<TokenLayout> {
        &self.layout
    }

    pub fn registry(&self) -> &WordRegistry {
        &self.registry
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    /// Retry any pending seen-set write.
    pub fn flush(&mut self) -> Option<Notice> {
        self.flush_seen()
    }

    /// Stop narration, flush pending writes and hand the collaborators back.
    pub fn close(mut self) -> (S, N) {
        if self.narration.stop() {
            self.narrator.cancel();
        }
        if let Some(notice) = self.flush_seen() {
            warn!("Closing with unsaved progress: {}", notice.message);
        }
        info!(article = %self.article_id, "Closed reading session");
        (self.store, self.narrator)
    }

    fn default_narration_start(&self) -> usize {
        let page_start = range_of(self.current_page, self.settings.page_size, self.layout.len()).start;
        self.highlighted
            .filter(|token| page_of(*token, self.settings.page_size) == self.current_page)
            .unwrap_or(page_start)
    }

    /// User-driven page change. Active narration follows to the new page.
    fn turn_page(&mut self, page: usize) -> Vec<SessionEffect> {
        let page = page.min(self.counters.last_page());
        if page == self.current_page {
            return Vec::new();
        }
        let mut effects = self.show_page(page);

        let start = range_of(page, self.settings.page_size, self.layout.len()).start;
        match self.narration.state() {
            NarrationState::Idle => {}
            NarrationState::Speaking => effects.extend(self.start_narration(start)),
            NarrationState::Paused => {
                effects.extend(self.start_narration(start));
                if self.narration.pause() {
                    self.narrator.pause();
                }
            }
        }
        effects
    }

    fn show_page(&mut self, page: usize) -> Vec<SessionEffect> {
        self.current_page = page;
        debug!(page, "Showing page");
        let mut effects = vec![SessionEffect::PageTurn { page }];

        let patch = ArticlePatch {
            last_page: Some(page),
            ..ArticlePatch::default()
        };
        if let Err(err) = self.store.update_article(&self.article_id, &patch) {
            warn!(page, "Failed to save bookmark: {err}");
            let err = SessionError::persistence("bookmark", err);
            effects.push(SessionEffect::Notify(Notice::from(&err)));
        }
        effects
    }

    fn select_token(&mut self, token: usize) -> Vec<SessionEffect> {
        let Some(key) = self.layout.key(token).map(str::to_string) else {
            debug!(token, "Selected token is not a word");
            return Vec::new();
        };
        let frequency = self.layout.frequencies().get(&key).copied().unwrap_or(1) as u64;

        let entry = match self
            .registry
            .ensure(&mut self.store, &self.language, &key, frequency)
        {
            Ok(ensured) => ensured.entry,
            Err(err) => return vec![SessionEffect::Notify(Notice::from(&err))],
        };

        let mut effects = Vec::new();
        effects.extend(self.mark_seen(&entry.id));

        let request_id = self.suggestions.issue(&entry.id);
        self.selection = Some(Selection {
            token,
            word_id: entry.id.clone(),
            suggestions: Vec::new(),
        });
        effects.push(SessionEffect::FetchSuggestions(SuggestionRequest {
            request_id,
            word_id: entry.id,
            word: entry.name,
            source_language: self.language.clone(),
            target_language: self.settings.target_language.clone(),
        }));
        effects
    }

    fn set_comfort(&mut self, word: &WordId, level: u8) -> Vec<SessionEffect> {
        let result = Comfort::new(level).and_then(|comfort| {
            self.registry
                .set_comfort(&mut self.store, &self.language, word, comfort)
        });
        match result {
            Ok(entry) => {
                debug!(word = %entry.name, level, "Comfort updated");
                self.mark_seen(word).into_iter().collect()
            }
            Err(err) => vec![SessionEffect::Notify(Notice::from(&err))],
        }
    }

    fn set_translation(&mut self, word: &WordId, text: Option<&str>) -> Vec<SessionEffect> {
        match self
            .registry
            .set_translation(&mut self.store, &self.language, word, text)
        {
            Ok(entry) => {
                debug!(word = %entry.name, "Translation updated");
                self.mark_seen(word).into_iter().collect()
            }
            Err(err) => vec![SessionEffect::Notify(Notice::from(&err))],
        }
    }

    fn accept_suggestions(&mut self, request_id: u64, word: &WordId, suggestions: Vec<String>) {
        let current = self
            .selection
            .as_mut()
            .filter(|selection| &selection.word_id == word);
        match current {
            Some(selection) if self.suggestions.accept(request_id, word) => {
                debug!(request_id, count = suggestions.len(), "Applied suggestions");
                selection.suggestions = suggestions;
            }
            _ => debug!(request_id, %word, "Discarding stale suggestions"),
        }
    }

    /// Keep the first visible token on screen across the size change.
    fn set_page_size(&mut self, page_size: usize) -> Vec<SessionEffect> {
        let page_size = clamp_page_size(page_size);
        if page_size == self.settings.page_size {
            return Vec::new();
        }
        let anchor = range_of(self.current_page, self.settings.page_size, self.layout.len()).start;
        self.settings.page_size = page_size;
        self.counters = PageCounters::new(
            self.layout.len(),
            self.layout.distinct_words(),
            page_size,
        );
        info!(page_size, "Page size changed");
        let page = page_of(anchor, page_size).min(self.counters.last_page());
        self.show_page(page)
    }

    /// Stop narration, retokenize and swap the layout in one step.
    fn set_language_rules(&mut self, rules: &LanguageRules) -> Vec<SessionEffect> {
        let mut effects = self.stop_narration();
        let anchor = range_of(self.current_page, self.settings.page_size, self.layout.len()).start;

        self.layout = Arc::new(TokenLayout::build(self.layout.text(), rules));
        self.counters = PageCounters::new(
            self.layout.len(),
            self.layout.distinct_words(),
            self.settings.page_size,
        );
        self.selection = None;
        self.suggestions.cancel();
        info!(language = %self.language, tokens = self.layout.len(), "Language rules changed");

        let anchor = anchor.min(self.layout.len().saturating_sub(1));
        let page = page_of(anchor, self.settings.page_size).min(self.counters.last_page());
        effects.extend(self.show_page(page));
        effects.extend(self.rules_notice());
        effects.extend(self.ensure_vocabulary());
        effects.extend(self.flush_seen().map(SessionEffect::Notify));
        effects
    }

    fn start_narration(&mut self, from: usize) -> Vec<SessionEffect> {
        if !self.narrator.is_available() {
            return vec![SessionEffect::Notify(Notice::from(
                &SessionError::NarrationUnavailable,
            ))];
        }
        if from >= self.layout.len() {
            return vec![SessionEffect::Notify(Notice::info("Nothing left to narrate"))];
        }
        if self.narration.stop() {
            self.narrator.cancel();
        }

        let Some(utterance) =
            self.narration
                .begin(Arc::clone(&self.layout), from, &self.settings.voice)
        else {
            return Vec::new();
        };
        if let Err(err) = self.narrator.speak(utterance, self.signals_tx.clone()) {
            self.narration.stop();
            warn!("Narration engine refused utterance: {err:#}");
            return vec![SessionEffect::Notify(Notice::warning(format!(
                "Narration could not start: {err}"
            )))];
        }

        let mut effects = Vec::new();
        let page = page_of(from, self.settings.page_size);
        if page != self.current_page {
            effects.extend(self.show_page(page));
        }
        self.highlighted = Some(from);
        effects.push(SessionEffect::Highlight { token: from });
        effects
    }

    fn stop_narration(&mut self) -> Vec<SessionEffect> {
        if !self.narration.stop() {
            return Vec::new();
        }
        self.narrator.cancel();
        self.highlighted = None;
        vec![SessionEffect::ClearHighlight]
    }

    fn rules_notice(&self) -> Option<SessionEffect> {
        if !self.layout.is_degraded() {
            return None;
        }
        let err = SessionError::RuleCompilation {
            language: self.language.clone(),
            message: "word pattern is unusable; splitting on letters instead".to_string(),
        };
        Some(SessionEffect::Notify(Notice::from(&err)))
    }

    /// Make sure every word of the article has a registry entry, seeded with
    /// its frequency in this article, and count it as seen. New entries are
    /// written in one batch.
    fn ensure_vocabulary(&mut self) -> Option<SessionEffect> {
        let layout = Arc::clone(&self.layout);
        let keys = layout
            .frequencies()
            .iter()
            .map(|(key, count)| (key.as_str(), *count as u64));
        let outcome = self
            .registry
            .ensure_many(&mut self.store, &self.language, keys);
        let (ids, created, failed) = match outcome {
            Ok(ensured) => {
                let created = ensured.iter().filter(|e| e.created).count();
                let ids: Vec<WordId> = ensured.into_iter().map(|e| e.entry.id).collect();
                (ids, created, 0)
            }
            Err(err) => {
                debug!("Could not save new words: {err}");
                let mut failed = 0usize;
                let mut ids = Vec::new();
                for key in layout.frequencies().keys() {
                    match self.registry.lookup(&self.language, key) {
                        Some(entry) => ids.push(entry.id.clone()),
                        None => failed += 1,
                    }
                }
                (ids, 0, failed)
            }
        };
        for id in ids {
            if self.seen.insert(id) {
                self.seen_dirty = true;
            }
        }
        info!(created, failed, distinct = layout.distinct_words(), "Vocabulary synced");

        (failed > 0).then(|| {
            SessionEffect::Notify(Notice::warning(format!(
                "{failed} new words could not be saved; they will be retried when selected"
            )))
        })
    }

    fn mark_seen(&mut self, id: &WordId) -> Option<SessionEffect> {
        if self.seen.insert(id.clone()) {
            self.seen_dirty = true;
        }
        self.flush_seen().map(SessionEffect::Notify)
    }

    /// The seen set only grows, so a failed write is simply retried on the
    /// next flush with the then-current set.
    fn flush_seen(&mut self) -> Option<Notice> {
        if !self.seen_dirty {
            return None;
        }
        let patch = ArticlePatch {
            seen_words: Some(self.seen.clone()),
            ..ArticlePatch::default()
        };
        match self.store.update_article(&self.article_id, &patch) {
            Ok(()) => {
                self.seen_dirty = false;
                debug!(seen = self.seen.len(), "Saved seen words");
                None
            }
            Err(err) => {
                warn!("Failed to save seen words: {err}");
                let err = SessionError::persistence("seen words", err);
                Some(Notice::from(&err))
            }
        }
    }
}
