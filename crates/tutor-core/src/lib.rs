//! Shared foundation for the tutor workspace: error type, intent types,
//! and TOML configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::{QuizFallback, TutorConfig};
pub use error::{FailureKind, Result, TutorError};
pub use types::*;
