//! Narration alignment.
//!
//! The engine speaks the article text re-joined from a start token through
//! the end of the article, so narration runs across page boundaries. It
//! reports progress as character offsets into that utterance. Reports arrive
//! on a channel that the session drains on its own turn; [`NarrationSync`]
//! turns each one into a token index of the layout the utterance was built
//! from. Signals tagged with any other utterance id are stale and dropped.

use crate::layout::TokenLayout;
use crate::pagination::page_of;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u{}", self.0)
    }
}

/// Voice parameters forwarded to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceSettings {
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationEvent {
    /// Audio reached the word starting at `char_index` of the utterance text.
    Boundary { char_index: usize },
    Finished,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationSignal {
    pub utterance: UtteranceId,
    pub event: NarrationEvent,
}

impl NarrationSignal {
    pub fn boundary(utterance: UtteranceId, char_index: usize) -> Self {
        Self {
            utterance,
            event: NarrationEvent::Boundary { char_index },
        }
    }

    pub fn finished(utterance: UtteranceId) -> Self {
        Self {
            utterance,
            event: NarrationEvent::Finished,
        }
    }

    pub fn failed(utterance: UtteranceId, message: impl Into<String>) -> Self {
        Self {
            utterance,
            event: NarrationEvent::Failed {
                message: message.into(),
            },
        }
    }
}

pub type NarrationSender = Sender<NarrationSignal>;

pub fn narration_channel() -> (NarrationSender, Receiver<NarrationSignal>) {
    mpsc::channel()
}

/// The external text-to-speech engine. Implementations report progress only
/// through the sender handed to [`NarrationEngine::speak`].
pub trait NarrationEngine {
    fn is_available(&self) -> bool;
    fn speak(&mut self, utterance: Utterance, events: NarrationSender) -> anyhow::Result<()>;
    fn pause(&mut self);
    fn resume(&mut self);
    /// Must be safe to call with nothing playing.
    fn cancel(&mut self);
}

/// Engine for hosts without any voice.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNarrator;

impl NarrationEngine for NullNarrator {
    fn is_available(&self) -> bool {
        false
    }

    fn speak(&mut self, _utterance: Utterance, _events: NarrationSender) -> anyhow::Result<()> {
        anyhow::bail!("no narration voice installed")
    }

    fn pause(&mut self) {}

    fn resume(&mut self) {}

    fn cancel(&mut self) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NarrationState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

/// What the session must do after a signal was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncUpdate {
    /// Show a different page. Always precedes the highlight it belongs to.
    PageTurn { page: usize },
    Highlight { token: usize },
    Finished,
    Failed { message: String },
}

#[derive(Debug, Clone)]
struct ActiveUtterance {
    id: UtteranceId,
    start_token: usize,
    base_offset: usize,
    layout: Arc<TokenLayout>,
}

#[derive(Debug, Default)]
pub struct NarrationSync {
    state: NarrationState,
    active: Option<ActiveUtterance>,
    current_token: Option<usize>,
    next_id: u64,
}

impl NarrationSync {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    /// Token most recently reported by the engine, if narrating.
    pub fn current_token(&self) -> Option<usize> {
        self.current_token
    }

    pub fn active_utterance(&self) -> Option<UtteranceId> {
        self.active.as_ref().map(|active| active.id)
    }

    /// Token the current utterance started from.
    pub fn start_token(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.start_token)
    }

    /// Prepare an utterance covering `layout` from `from_token` to the end and
    /// enter `Speaking`. Any previous utterance is forgotten; the caller is
    /// responsible for cancelling it on the engine first.
    pub fn begin(
        &mut self,
        layout: Arc<TokenLayout>,
        from_token: usize,
        voice: &VoiceSettings,
    ) -> Option<Utterance> {
        let base_offset = layout.offsets().offset_of(from_token)?;
        self.next_id += 1;
        let id = UtteranceId(self.next_id);
        let text = layout.rejoined_from(from_token);
        info!(utterance = %id, from_token, chars = text.chars().count(), "Starting narration");

        self.active = Some(ActiveUtterance {
            id,
            start_token: from_token,
            base_offset,
            layout,
        });
        self.state = NarrationState::Speaking;
        self.current_token = Some(from_token);

        Some(Utterance {
            id,
            text,
            voice: voice.voice.clone(),
            rate: voice.rate,
            pitch: voice.pitch,
        })
    }

    pub fn pause(&mut self) -> bool {
        if self.state != NarrationState::Speaking {
            return false;
        }
        self.state = NarrationState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != NarrationState::Paused {
            return false;
        }
        self.state = NarrationState::Speaking;
        true
    }

    /// Back to `Idle`. Returns whether an utterance was active; calling it
    /// again is a no-op.
    pub fn stop(&mut self) -> bool {
        let was_active = self.active.take().is_some();
        if was_active {
            debug!("Narration stopped");
        }
        self.state = NarrationState::Idle;
        self.current_token = None;
        was_active
    }

    /// Resolve one engine signal against the displayed page.
    pub fn on_signal(
        &mut self,
        signal: NarrationSignal,
        displayed_page: usize,
        page_size: usize,
    ) -> Vec<SyncUpdate> {
        let Some(active) = self
            .active
            .as_ref()
            .filter(|active| active.id == signal.utterance)
        else {
            debug!(utterance = %signal.utterance, "Discarding stale narration signal");
            return Vec::new();
        };

        match signal.event {
            NarrationEvent::Boundary { char_index } => {
                let offset = active.base_offset.saturating_add(char_index);
                let Some(token) = active.layout.offsets().token_index_at(offset) else {
                    debug!(offset, "Narration boundary past the end of the text");
                    return Vec::new();
                };
                self.current_token = Some(token);

                let page = page_of(token, page_size);
                let mut updates = Vec::with_capacity(2);
                if page != displayed_page {
                    updates.push(SyncUpdate::PageTurn { page });
                }
                updates.push(SyncUpdate::Highlight { token });
                updates
            }
            NarrationEvent::Finished => {
                info!(utterance = %signal.utterance, "Narration finished");
                self.stop();
                vec![SyncUpdate::Finished]
            }
            NarrationEvent::Failed { message } => {
                warn!(utterance = %signal.utterance, "Narration failed: {message}");
                self.stop();
                vec![SyncUpdate::Failed { message }]
            }
        }
    }
}
