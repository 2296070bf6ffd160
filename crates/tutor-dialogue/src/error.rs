use thiserror::Error;

use tutor_core::error::TutorError;

use crate::state::DialogueState;

/// Errors raised inside the dialogue layer.
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("Invalid dialogue transition: {0} -> {1}")]
    InvalidTransition(DialogueState, DialogueState),

    #[error("Voice error: {0}")]
    Voice(String),

    #[error("Input closed")]
    InputClosed,

    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<DialogueError> for TutorError {
    fn from(err: DialogueError) -> Self {
        match err {
            DialogueError::Voice(msg) => TutorError::ExternalService {
                kind: tutor_core::FailureKind::Other,
                message: msg,
            },
            DialogueError::Catalog(msg) => TutorError::Storage(msg),
            other => TutorError::InvalidInput(other.to_string()),
        }
    }
}

impl From<std::io::Error> for DialogueError {
    fn from(err: std::io::Error) -> Self {
        DialogueError::Voice(err.to_string())
    }
}
