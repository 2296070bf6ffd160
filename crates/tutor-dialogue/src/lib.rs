//! Conversational core of the tutor.
//!
//! Turns utterances into intents, keeps each session's read position,
//! and produces the text to speak back.

pub mod catalog;
pub mod error;
pub mod orchestrator;
pub mod session;
pub mod state;
pub mod types;
pub mod voice;

pub use catalog::{CatalogEntry, DocumentCatalog, StaticCatalog};
pub use error::DialogueError;
pub use orchestrator::DialogueOrchestrator;
pub use session::Session;
pub use state::{validate_transition, DialogueState};
pub use types::{NavigationDelta, ResponseType, TurnResult};
pub use voice::{
    run_voice_session, ConsoleSpeaker, Listener, Speaker, StdinListener, VoiceSessionSummary,
};
