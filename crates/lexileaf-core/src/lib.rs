//! Reading session engine for the lexileaf reader.
//!
//! The engine tokenizes an article with per-language rules, keeps a
//! vocabulary registry in sync with the words it encounters, slices the token
//! stream into pages, and aligns an external narration stream with the token
//! on screen. Storage, narration audio and translation lookups are injected
//! collaborators; nothing in here talks to them except through their traits.

pub mod config;
pub mod error;
pub mod language;
pub mod layout;
pub mod narration;
pub mod normalizer;
pub mod offsets;
pub mod pagination;
pub mod registry;
pub mod sentences;
pub mod session;
pub mod store;
pub mod suggest;
pub mod tokenizer;

pub use error::{SessionError, StoreError};
pub use language::{LanguageRules, RuleProvider};
pub use layout::TokenLayout;
pub use narration::{NarrationEngine, NarrationSignal, NarrationState, NarrationSync, Utterance};
pub use registry::WordRegistry;
pub use session::{
    Notice, NoticeLevel, ReaderSnapshot, ReadingSession, SessionCommand, SessionEffect,
    SessionSettings, import_article,
};
pub use store::{ArticleId, ArticleRecord, Comfort, RecordStore, WordEntry, WordId};
pub use suggest::{SuggestionRequest, SuggestionService};
pub use tokenizer::{Token, TokenKind, Tokenizer};
