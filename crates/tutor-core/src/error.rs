use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failure reported by an external service
/// (language model, speech engine).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The service asked us to slow down; the call may be retried.
    RateLimited,
    /// Any other failure; retrying is not expected to help.
    Other,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::RateLimited => write!(f, "rate_limited"),
            FailureKind::Other => write!(f, "other"),
        }
    }
}

/// Top-level error type for the tutor system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for TutorError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("External service failure ({kind}): {message}")]
    ExternalService { kind: FailureKind, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl TutorError {
    /// True when the failure is a rate limit reported by an external service.
    pub fn is_rate_limited(&self) -> bool {
        matches!(
            self,
            TutorError::ExternalService {
                kind: FailureKind::RateLimited,
                ..
            }
        )
    }
}

impl From<toml::de::Error> for TutorError {
    fn from(err: toml::de::Error) -> Self {
        TutorError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TutorError {
    fn from(err: toml::ser::Error) -> Self {
        TutorError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TutorError {
    fn from(err: serde_json::Error) -> Self {
        TutorError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for tutor operations.
pub type Result<T> = std::result::Result<T, TutorError>;
