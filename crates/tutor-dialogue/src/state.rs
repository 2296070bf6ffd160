//! Dialogue state machine with validated transitions.
//!
//! AwaitingInput -> Processing -> AwaitingInput | Terminated

use serde::{Deserialize, Serialize};

use crate::error::DialogueError;

/// Lifecycle state of a dialogue session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    /// Ready for the next utterance.
    #[default]
    AwaitingInput,
    /// A turn is running.
    Processing,
    /// The user stopped the session; no further turns are processed.
    Terminated,
}

impl std::fmt::Display for DialogueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DialogueState::AwaitingInput => "awaiting_input",
            DialogueState::Processing => "processing",
            DialogueState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Validate that a state transition is allowed.
///
/// Valid transitions:
/// - AwaitingInput -> Processing
/// - Processing -> AwaitingInput
/// - Processing -> Terminated
pub fn validate_transition(from: DialogueState, to: DialogueState) -> Result<(), DialogueError> {
    let valid = matches!(
        (from, to),
        (DialogueState::AwaitingInput, DialogueState::Processing)
            | (DialogueState::Processing, DialogueState::AwaitingInput)
            | (DialogueState::Processing, DialogueState::Terminated)
    );

    if valid {
        Ok(())
    } else {
        Err(DialogueError::InvalidTransition(from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_awaiting_to_processing() {
        assert!(
            validate_transition(DialogueState::AwaitingInput, DialogueState::Processing).is_ok()
        );
    }

    #[test]
    fn test_processing_to_awaiting() {
        assert!(
            validate_transition(DialogueState::Processing, DialogueState::AwaitingInput).is_ok()
        );
    }

    #[test]
    fn test_processing_to_terminated() {
        assert!(validate_transition(DialogueState::Processing, DialogueState::Terminated).is_ok());
    }

    #[test]
    fn test_terminated_is_final() {
        for to in [
            DialogueState::AwaitingInput,
            DialogueState::Processing,
            DialogueState::Terminated,
        ] {
            assert!(validate_transition(DialogueState::Terminated, to).is_err());
        }
    }

    #[test]
    fn test_cannot_skip_processing() {
        assert!(
            validate_transition(DialogueState::AwaitingInput, DialogueState::Terminated).is_err()
        );
        assert!(
            validate_transition(DialogueState::AwaitingInput, DialogueState::AwaitingInput).is_err()
        );
    }

    #[test]
    fn test_default_is_awaiting_input() {
        assert_eq!(DialogueState::default(), DialogueState::AwaitingInput);
        assert_eq!(DialogueState::Terminated.to_string(), "terminated");
    }
}
