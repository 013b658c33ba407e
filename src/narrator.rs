//! A voiceless narration engine for the terminal.
//!
//! It walks the utterance at a fixed reading pace and reports a boundary for
//! every word, the way a speech engine reports word events, so the reader can
//! follow along with the highlight.

use crate::cancellation::CancellationToken;
use lexileaf_core::narration::{NarrationEngine, NarrationSender, NarrationSignal, Utterance};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

const PAUSE_POLL: Duration = Duration::from_millis(20);

struct Playback {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct PacedNarrator {
    words_per_minute: u32,
    playback: Option<Playback>,
}

impl PacedNarrator {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            playback: None,
        }
    }

    fn word_interval(&self, rate: f32) -> Duration {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let per_minute = f64::from(self.words_per_minute) * f64::from(rate);
        Duration::from_secs_f64(60.0 / per_minute)
    }

    fn stop_playback(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.cancel.cancel();
            if playback.handle.join().is_err() {
                debug!("Narration thread panicked");
            }
        }
    }
}

impl NarrationEngine for PacedNarrator {
    fn is_available(&self) -> bool {
        true
    }

    fn speak(&mut self, utterance: Utterance, events: NarrationSender) -> anyhow::Result<()> {
        self.stop_playback();

        let interval = self.word_interval(utterance.rate);
        let starts = word_starts(&utterance.text);
        let cancel = CancellationToken::new();
        let paused = Arc::new(AtomicBool::new(false));
        info!(
            utterance = %utterance.id,
            words = starts.len(),
            interval_ms = interval.as_millis() as u64,
            "Paced narration started"
        );

        let thread_cancel = cancel.clone();
        let thread_paused = Arc::clone(&paused);
        let id = utterance.id;
        let handle = thread::Builder::new()
            .name("lexileaf-narrator".to_string())
            .spawn(move || {
                for start in starts {
                    while thread_paused.load(Ordering::Acquire) {
                        if !thread_cancel.sleep(PAUSE_POLL) {
                            return;
                        }
                    }
                    if thread_cancel.is_cancelled() {
                        return;
                    }
                    if events.send(NarrationSignal::boundary(id, start)).is_err() {
                        return;
                    }
                    if !thread_cancel.sleep(interval) {
                        return;
                    }
                }
                let _ = events.send(NarrationSignal::finished(id));
            })?;

        self.playback = Some(Playback {
            cancel,
            paused,
            handle,
        });
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(true, Ordering::Release);
        }
    }

    fn resume(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(false, Ordering::Release);
        }
    }

    fn cancel(&mut self) {
        self.stop_playback();
    }
}

impl Drop for PacedNarrator {
    fn drop(&mut self) {
        self.stop_playback();
    }
}

/// Char index of every whitespace-delimited run in `text`.
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (idx, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(idx);
            in_word = true;
        }
    }
    starts
}
