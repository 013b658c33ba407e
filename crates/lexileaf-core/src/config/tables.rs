use super::defaults;
use super::models::{AppConfig, LogLevel};
use crate::language::LanguageRules;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// On-disk layout of `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    reading: ReadingConfig,
    #[serde(default)]
    narration: NarrationConfig,
    #[serde(default)]
    translation: TranslationConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    languages: BTreeMap<String, LanguageRules>,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            page_size: tables.reading.page_size,
            language: tables.reading.language,
            target_language: tables.reading.target_language,
            voice: tables.narration.voice,
            rate: tables.narration.rate,
            pitch: tables.narration.pitch,
            words_per_minute: tables.narration.words_per_minute,
            suggestion_endpoint: tables.translation.endpoint,
            suggestion_timeout_secs: tables.translation.timeout_secs,
            data_dir: tables.storage.data_dir,
            log_level: tables.logging.log_level,
            languages: tables.languages,
        }
        .sanitized()
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            reading: ReadingConfig {
                page_size: config.page_size,
                language: config.language.clone(),
                target_language: config.target_language.clone(),
            },
            narration: NarrationConfig {
                voice: config.voice.clone(),
                rate: config.rate,
                pitch: config.pitch,
                words_per_minute: config.words_per_minute,
            },
            translation: TranslationConfig {
                endpoint: config.suggestion_endpoint.clone(),
                timeout_secs: config.suggestion_timeout_secs,
            },
            storage: StorageConfig {
                data_dir: config.data_dir.clone(),
            },
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            languages: config.languages.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct ReadingConfig {
    #[serde(default = "defaults::default_page_size")]
    page_size: usize,
    #[serde(default = "defaults::default_language")]
    language: String,
    #[serde(default = "defaults::default_target_language")]
    target_language: String,
}

impl Default for ReadingConfig {
    fn default() -> Self {
        ReadingConfig {
            page_size: defaults::default_page_size(),
            language: defaults::default_language(),
            target_language: defaults::default_target_language(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct NarrationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    voice: Option<String>,
    #[serde(default = "defaults::default_rate")]
    rate: f32,
    #[serde(default = "defaults::default_pitch")]
    pitch: f32,
    #[serde(default = "defaults::default_words_per_minute")]
    words_per_minute: u32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        NarrationConfig {
            voice: None,
            rate: defaults::default_rate(),
            pitch: defaults::default_pitch(),
            words_per_minute: defaults::default_words_per_minute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct TranslationConfig {
    #[serde(default = "defaults::default_suggestion_endpoint")]
    endpoint: String,
    #[serde(default = "defaults::default_suggestion_timeout_secs")]
    timeout_secs: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        TranslationConfig {
            endpoint: defaults::default_suggestion_endpoint(),
            timeout_secs: defaults::default_suggestion_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct StorageConfig {
    #[serde(default = "defaults::default_data_dir")]
    data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            data_dir: defaults::default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}
