use super::defaults;
use crate::language::{LanguageRules, RuleProvider, builtin_rules};
use crate::narration::VoiceSettings;
use crate::pagination::clamp_page_size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub(crate) const MIN_RATE: f32 = 0.25;
pub(crate) const MAX_RATE: f32 = 4.0;
pub(crate) const MIN_PITCH: f32 = 0.0;
pub(crate) const MAX_PITCH: f32 = 2.0;

/// Flattened reader configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "defaults::default_page_size")]
    pub page_size: usize,
    #[serde(default = "defaults::default_language")]
    pub language: String,
    #[serde(default = "defaults::default_target_language")]
    pub target_language: String,
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "defaults::default_rate")]
    pub rate: f32,
    #[serde(default = "defaults::default_pitch")]
    pub pitch: f32,
    #[serde(default = "defaults::default_words_per_minute")]
    pub words_per_minute: u32,
    #[serde(default = "defaults::default_suggestion_endpoint")]
    pub suggestion_endpoint: String,
    #[serde(default = "defaults::default_suggestion_timeout_secs")]
    pub suggestion_timeout_secs: u64,
    #[serde(default = "defaults::default_data_dir")]
    pub data_dir: String,
    #[serde(default = "defaults::default_log_level")]
    pub log_level: LogLevel,
    /// Per-language overrides of the built-in tokenization rules.
    #[serde(default)]
    pub languages: BTreeMap<String, LanguageRules>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            page_size: defaults::default_page_size(),
            language: defaults::default_language(),
            target_language: defaults::default_target_language(),
            voice: None,
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            words_per_minute: defaults::default_words_per_minute(),
            suggestion_endpoint: defaults::default_suggestion_endpoint(),
            suggestion_timeout_secs: defaults::default_suggestion_timeout_secs(),
            data_dir: defaults::default_data_dir(),
            log_level: defaults::default_log_level(),
            languages: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Clamp numeric settings into their supported ranges.
    pub fn sanitized(mut self) -> Self {
        self.page_size = clamp_page_size(self.page_size);
        self.rate = clamp_or_default(self.rate, MIN_RATE, MAX_RATE, defaults::default_rate());
        self.pitch = clamp_or_default(self.pitch, MIN_PITCH, MAX_PITCH, defaults::default_pitch());
        self.words_per_minute = self.words_per_minute.max(1);
        self.suggestion_timeout_secs = self.suggestion_timeout_secs.max(1);
        self
    }

    pub fn voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            voice: self.voice.clone().filter(|voice| !voice.trim().is_empty()),
            rate: self.rate,
            pitch: self.pitch,
        }
    }

    pub fn suggestion_timeout(&self) -> Duration {
        Duration::from_secs(self.suggestion_timeout_secs)
    }
}

fn clamp_or_default(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}

impl RuleProvider for AppConfig {
    /// Configured rules win; otherwise the built-in set is consulted.
    fn rules_for(&self, language: &str) -> Option<LanguageRules> {
        self.languages
            .get(language)
            .cloned()
            .or_else(|| builtin_rules().remove(language))
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
