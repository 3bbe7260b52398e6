/// Error types for history operations.
use thiserror::Error;

/// Result type alias for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors surfaced by the history engine.
///
/// Undo at the bottom of the stack, redo at the top, jumping to the current
/// position and suppressed dispatches are not errors; they return `Ok`.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// An action, child or recorded entry names a reducer that is not registered.
    #[error("no reducer registered for action `{name}`")]
    UnknownAction { name: String },

    /// A reducer was registered twice while overwrites are forbidden.
    #[error("a reducer is already registered for action `{name}`")]
    DuplicateReducer { name: String },

    /// A snapshot cannot be restored into this engine.
    #[error("incompatible snapshot: {reason}")]
    IncompatibleSnapshot { reason: String },

    /// A caller-supplied forward or reverse function failed.
    #[error("reducer for `{name}` failed: {source}")]
    Reducer {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HistoryError {
    #[inline]
    pub fn unknown_action(name: impl Into<String>) -> Self {
        HistoryError::UnknownAction { name: name.into() }
    }

    #[inline]
    pub fn incompatible(reason: impl Into<String>) -> Self {
        HistoryError::IncompatibleSnapshot {
            reason: reason.into(),
        }
    }

    #[inline]
    pub(crate) fn reducer(name: &str, source: anyhow::Error) -> Self {
        HistoryError::Reducer {
            name: name.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            HistoryError::unknown_action("move").to_string(),
            "no reducer registered for action `move`"
        );
        assert_eq!(
            HistoryError::incompatible("version 7").to_string(),
            "incompatible snapshot: version 7"
        );
        let err = HistoryError::reducer("move", anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "reducer for `move` failed: disk full");
    }

    #[test]
    fn test_reducer_error_exposes_source() {
        use std::error::Error as _;
        let err = HistoryError::reducer("move", anyhow::anyhow!("boom"));
        let source = err.source().expect("source");
        assert_eq!(source.to_string(), "boom");
    }
}
