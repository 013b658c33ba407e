use thiserror::Error;

/// Failures raised by a [`crate::store::RecordStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record could not be (de)serialized: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("store rejected the write: {0}")]
    Rejected(String),

    #[error("store has no {kind} with id {id}")]
    Missing { kind: &'static str, id: String },
}

/// Errors surfaced by the reading session. None of them are fatal to the
/// process; each is contained to the operation that raised it.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid word pattern for language {language}: {message}")]
    RuleCompilation { language: String, message: String },

    #[error("could not persist {what}: {source}")]
    Persistence {
        what: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("no narration voice is available")]
    NarrationUnavailable,

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("comfort level {0} is outside 0..=5")]
    InvalidComfort(u8),

    #[error("{0:?} does not normalize to a word")]
    NotAWord(String),
}

impl SessionError {
    pub(crate) fn persistence(what: &'static str, source: StoreError) -> Self {
        SessionError::Persistence { what, source }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistence_error_keeps_store_cause() {
        let err = SessionError::persistence("word", StoreError::Rejected("disk full".to_string()));
        assert_eq!(
            err.to_string(),
            "could not persist word: store rejected the write: disk full"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn not_found_is_detectable() {
        let err = SessionError::NotFound {
            kind: "article",
            id: "abc".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!SessionError::NarrationUnavailable.is_not_found());
    }
}
