//! Result and error types for Navegar.
//!
//! Expected "not yet" conditions (an element that has not rendered, a window
//! that has not opened, a wait that ran out of time) are reported through
//! `bool`/`Option` return values at the call sites that expect them. The
//! variants here cover the cases a caller explicitly demanded to succeed,
//! plus programmer-error preconditions.

use thiserror::Error;

/// Result type for Navegar operations
pub type NavegarResult<T> = Result<T, NavegarError>;

/// Errors that can occur in Navegar
#[derive(Debug, Error)]
pub enum NavegarError {
    /// A required argument was missing or malformed (programmer error)
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the argument
        message: String,
    },

    /// A locator resolved to nothing within the applicable wait
    #[error("No element found for locator '{locator}'")]
    NotFound {
        /// The locator that failed to resolve
        locator: String,
    },

    /// Every structural candidate suffix missed
    #[error("No structural candidate matched under '{base}' ({tried} tried)")]
    NoCandidateMatched {
        /// The base locator the candidates were appended to
        base: String,
        /// How many candidates were attempted
        tried: usize,
    },

    /// A bounded wait expired where the caller demanded success
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// A window or frame never became switchable
    #[error("Failed to switch context to {target}")]
    ContextSwitchFailed {
        /// The window handle or frame name that was targeted
        target: String,
    },

    /// A menu level was scanned to exhaustion without a text match
    #[error("Menu level {level} has no entry matching '{name}'")]
    MenuLevelNotFound {
        /// Menu nesting level (1-3)
        level: u8,
        /// The display text that was searched for
        name: String,
    },

    /// An element lacked the attribute an operation needed to inspect
    #[error("Ambiguous UI state: {message}")]
    AmbiguousUiState {
        /// What could not be determined
        message: String,
    },

    /// The external browser driver reported a failure
    #[error("Driver error: {message}")]
    Driver {
        /// Error message from the driver
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NavegarError {
    /// Shorthand for an [`NavegarError::InvalidArgument`]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for a [`NavegarError::Driver`]
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = NavegarError::NotFound {
            locator: "//td[3]".to_string(),
        };
        assert!(err.to_string().contains("//td[3]"));
    }

    #[test]
    fn test_no_candidate_matched_display() {
        let err = NavegarError::NoCandidateMatched {
            base: "//td[3]".to_string(),
            tried: 3,
        };
        let text = err.to_string();
        assert!(text.contains("//td[3]"));
        assert!(text.contains('3'));
    }

    #[test]
    fn test_timeout_display() {
        let err = NavegarError::Timeout { ms: 5000 };
        assert!(err.to_string().contains("5000ms"));
    }

    #[test]
    fn test_menu_level_not_found_display() {
        let err = NavegarError::MenuLevelNotFound {
            level: 2,
            name: "Transactions".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("level 2"));
        assert!(text.contains("Transactions"));
    }

    #[test]
    fn test_invalid_argument_shorthand() {
        let err = NavegarError::invalid_argument("locator must not be empty");
        assert!(matches!(err, NavegarError::InvalidArgument { .. }));
        assert!(err.to_string().contains("locator must not be empty"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: NavegarError = io.into();
        assert!(matches!(err, NavegarError::Io(_)));
    }

    #[test]
    fn test_json_conversion() {
        let json = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let err: NavegarError = json.into();
        assert!(matches!(err, NavegarError::Json(_)));
    }
}
