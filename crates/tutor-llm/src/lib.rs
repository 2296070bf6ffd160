//! Response generation for the tutor.
//!
//! Builds intent-specific prompts, calls a [`LanguageModel`] with relaxed
//! safety settings, retries rate-limited calls with exponential backoff, and
//! parses structured quiz output.

pub mod client;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod prompt;
pub mod quiz;
pub mod retry;

pub use client::{Completion, LanguageModel, SafetySetting, SafetySettings};
pub use error::LlmError;
pub use gemini::GeminiClient;
pub use generator::{
    Generation, GenerationStatus, ResponseGenerator, EMPTY_COMPLETION_MESSAGE, RATE_LIMIT_APOLOGY,
};
pub use prompt::{build_prompt, GenerationRequest};
pub use quiz::{parse_quiz, resolve_quiz, QuizItem, QuizOutcome};
pub use retry::{RetryPolicy, Sleeper, ThreadSleeper};
pub use tutor_core::config::QuizFallback;
