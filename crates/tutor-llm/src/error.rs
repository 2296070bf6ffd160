use std::time::Duration;

use thiserror::Error;

use tutor_core::error::{FailureKind, TutorError};

/// Errors raised while talking to a language model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No API key configured (set {0})")]
    MissingApiKey(String),
}

impl LlmError {
    pub fn kind(&self) -> FailureKind {
        match self {
            LlmError::RateLimited { .. } => FailureKind::RateLimited,
            _ => FailureKind::Other,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == FailureKind::RateLimited
    }

    /// Wait the service asked for before the next call, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LlmError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Message safe to show or speak to a user. Carries only the error
    /// category, never the raw service response.
    pub fn user_message(&self) -> String {
        let diagnostic = match self {
            LlmError::RateLimited { .. } => "the language service is busy".to_string(),
            LlmError::Http { status, .. } => {
                format!("the language service returned status {}", status)
            }
            LlmError::Transport(_) => "could not reach the language service".to_string(),
            LlmError::InvalidResponse(_) => {
                "the language service sent an unexpected response".to_string()
            }
            LlmError::MissingApiKey(_) => "the language service is not configured".to_string(),
        };
        format!("Sorry, I encountered an error: {}.", diagnostic)
    }
}

impl From<LlmError> for TutorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey(var) => {
                TutorError::Config(format!("no API key configured (set {})", var))
            }
            other => TutorError::ExternalService {
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let limited = LlmError::RateLimited {
            message: "quota".into(),
            retry_after: None,
        };
        assert_eq!(limited.kind(), FailureKind::RateLimited);
        assert!(limited.is_rate_limited());

        let http = LlmError::Http {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(http.kind(), FailureKind::Other);
        assert!(!LlmError::Transport("reset".into()).is_rate_limited());
    }

    #[test]
    fn test_user_message_hides_raw_body() {
        let err = LlmError::Http {
            status: 400,
            message: "API key not valid. Please pass a valid API key. secret=abc123".into(),
        };
        let msg = err.user_message();
        assert!(msg.starts_with("Sorry, I encountered an error"));
        assert!(msg.contains("400"));
        assert!(!msg.contains("abc123"));
        assert!(!msg.contains("API key not valid"));
    }

    #[test]
    fn test_into_tutor_error() {
        let err: TutorError = LlmError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(3)),
        }
        .into();
        assert!(err.is_rate_limited());

        let err: TutorError = LlmError::MissingApiKey("GEMINI_API_KEY".into()).into();
        assert!(matches!(err, TutorError::Config(_)));

        let err: TutorError = LlmError::InvalidResponse("not json".into()).into();
        assert!(matches!(
            err,
            TutorError::ExternalService {
                kind: FailureKind::Other,
                ..
            }
        ));
    }
}
