use super::models::LogLevel;
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::suggest::DEFAULT_ENDPOINT;

pub(crate) fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

pub(crate) fn default_language() -> String {
    "es".to_string()
}

pub(crate) fn default_target_language() -> String {
    "en".to_string()
}

pub(crate) fn default_rate() -> f32 {
    1.0
}

pub(crate) fn default_pitch() -> f32 {
    1.0
}

pub(crate) fn default_words_per_minute() -> u32 {
    160
}

pub(crate) fn default_suggestion_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

pub(crate) fn default_suggestion_timeout_secs() -> u64 {
    8
}

pub(crate) fn default_data_dir() -> String {
    ".lexileaf".to_string()
}

pub(crate) fn default_log_level() -> LogLevel {
    LogLevel::Info
}
