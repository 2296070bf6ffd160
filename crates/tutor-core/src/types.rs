use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TutorError;

// =============================================================================
// Entity keys
// =============================================================================

/// 0-indexed page requested by NAVIGATE_PAGE.
pub const TARGET_PAGE: &str = "target_page";
/// 0-indexed paragraph (chunk) requested by READ_PARAGRAPH.
pub const TARGET_PARAGRAPH: &str = "target_paragraph";
/// Capitalized language name requested by TRANSLATE.
pub const TARGET_LANGUAGE: &str = "target_language";
/// Quiz difficulty requested by QUIZ.
pub const DIFFICULTY: &str = "difficulty";
/// Document name requested by OPEN_DOCUMENT.
pub const FILENAME: &str = "filename";

// =============================================================================
// Enums
// =============================================================================

/// The fixed set of commands the tutor understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentKind {
    Summarize,
    Explain,
    Translate,
    Quiz,
    NavigateNext,
    NavigatePrev,
    NavigatePage,
    ReadParagraph,
    Repeat,
    Stop,
    Help,
    OpenDocument,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 13] = [
        IntentKind::Summarize,
        IntentKind::Explain,
        IntentKind::Translate,
        IntentKind::Quiz,
        IntentKind::NavigateNext,
        IntentKind::NavigatePrev,
        IntentKind::NavigatePage,
        IntentKind::ReadParagraph,
        IntentKind::Repeat,
        IntentKind::Stop,
        IntentKind::Help,
        IntentKind::OpenDocument,
        IntentKind::Unknown,
    ];

    /// Wire name, e.g. `NAVIGATE_PAGE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Summarize => "SUMMARIZE",
            IntentKind::Explain => "EXPLAIN",
            IntentKind::Translate => "TRANSLATE",
            IntentKind::Quiz => "QUIZ",
            IntentKind::NavigateNext => "NAVIGATE_NEXT",
            IntentKind::NavigatePrev => "NAVIGATE_PREV",
            IntentKind::NavigatePage => "NAVIGATE_PAGE",
            IntentKind::ReadParagraph => "READ_PARAGRAPH",
            IntentKind::Repeat => "REPEAT",
            IntentKind::Stop => "STOP",
            IntentKind::Help => "HELP",
            IntentKind::OpenDocument => "OPEN_DOCUMENT",
            IntentKind::Unknown => "UNKNOWN",
        }
    }

    /// Intents answered by the language model from document content.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            IntentKind::Summarize | IntentKind::Explain | IntentKind::Translate | IntentKind::Quiz
        )
    }
}

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentKind {
    type Err = TutorError;

    /// Case-insensitive; accepts `navigate_page`, `NAVIGATE_PAGE` and `navigate-page`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        IntentKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == normalized)
            .ok_or_else(|| TutorError::InvalidInput(format!("unknown intent '{}'", s)))
    }
}

/// Quiz difficulty level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(TutorError::InvalidInput(format!(
                "unknown difficulty '{}'",
                other
            ))),
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A value extracted from an utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityValue {
    Number(usize),
    Text(String),
}

/// Named entities attached to an intent.
///
/// Backed by a `BTreeMap` so serialized output has a stable key order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entities(BTreeMap<String, EntityValue>);

impl Entities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_number(mut self, key: &str, value: usize) -> Self {
        self.insert_number(key, value);
        self
    }

    pub fn with_text(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert_text(key, value);
        self
    }

    pub fn insert_number(&mut self, key: &str, value: usize) {
        self.0.insert(key.to_string(), EntityValue::Number(value));
    }

    pub fn insert_text(&mut self, key: &str, value: impl Into<String>) {
        self.0
            .insert(key.to_string(), EntityValue::Text(value.into()));
    }

    pub fn get(&self, key: &str) -> Option<&EntityValue> {
        self.0.get(key)
    }

    /// Numeric entity. Text holding a plain integer is accepted too, since
    /// UI-driven callers often send numbers as strings.
    pub fn number(&self, key: &str) -> Option<usize> {
        match self.0.get(key)? {
            EntityValue::Number(n) => Some(*n),
            EntityValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key)? {
            EntityValue::Text(s) => Some(s.as_str()),
            EntityValue::Number(_) => None,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.text(DIFFICULTY)
            .and_then(|d| d.parse().ok())
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// A classified utterance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub entities: Entities,
}

impl Intent {
    pub fn new(kind: IntentKind, entities: Entities) -> Self {
        Self { kind, entities }
    }

    pub fn unknown() -> Self {
        Self::new(IntentKind::Unknown, Entities::new())
    }
}
