//! Language model collaborator interface.

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Outcome of a structurally successful model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The model produced text.
    Text(String),
    /// The call succeeded but yielded nothing usable (no candidates, or a
    /// safety filter stopped generation).
    Empty { finish_reason: Option<String> },
}

/// One harm-category threshold sent with a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

/// Content filter thresholds sent with every request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SafetySettings(pub Vec<SafetySetting>);

impl SafetySettings {
    pub const CATEGORIES: [&'static str; 4] = [
        "HARM_CATEGORY_HARASSMENT",
        "HARM_CATEGORY_HATE_SPEECH",
        "HARM_CATEGORY_SEXUALLY_EXPLICIT",
        "HARM_CATEGORY_DANGEROUS_CONTENT",
    ];

    /// Every category set to `BLOCK_NONE`. Study material regularly covers
    /// history, medicine, and biology that strict filters reject.
    pub fn relaxed() -> Self {
        Self(
            Self::CATEGORIES
                .iter()
                .map(|c| SafetySetting {
                    category: c.to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[SafetySetting] {
        &self.0
    }
}

/// A text-completion service.
///
/// Calls are blocking; a turn waits for the model before continuing.
pub trait LanguageModel: Send + Sync {
    fn complete(&self, prompt: &str, safety: &SafetySettings) -> Result<Completion, LlmError>;

    /// Short identifier used in logs.
    fn name(&self) -> &str {
        "language-model"
    }
}
