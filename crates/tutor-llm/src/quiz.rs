//! Structured quiz output.
//!
//! The model is asked for a JSON array of questions but frequently wraps it
//! in a markdown fence anyway. Parsing can fail even when generation
//! succeeded; what the user hears then depends on [`QuizFallback`].

use serde::{Deserialize, Serialize};

use tutor_core::config::QuizFallback;
use tutor_core::error::{Result, TutorError};
use tutor_core::types::Difficulty;

pub const QUIZ_APOLOGY: &str = "I had trouble generating the quiz. Please try again.";
pub const QUIZ_EMPTY: &str = "I generated a quiz but it looks empty.";

/// One multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizItem {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// How a quiz response resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizOutcome {
    /// Parsed; `summary` speaks the first question and `items` is the full set.
    Parsed {
        summary: String,
        items: Vec<QuizItem>,
    },
    /// Valid JSON with no questions in it.
    Empty,
    /// Unparseable; the message is chosen by the fallback policy.
    Unparsed { message: String },
}

impl QuizOutcome {
    pub fn text(&self) -> &str {
        match self {
            QuizOutcome::Parsed { summary, .. } => summary,
            QuizOutcome::Empty => QUIZ_EMPTY,
            QuizOutcome::Unparsed { message } => message,
        }
    }
}

/// Remove a surrounding ```` ```json ```` or ```` ``` ```` fence if present.
pub fn strip_code_fence(raw: &str) -> &str {
    let body = if let Some((_, rest)) = raw.split_once("```json") {
        rest
    } else if let Some((_, rest)) = raw.split_once("```") {
        rest
    } else {
        return raw.trim();
    };
    body.split("```").next().unwrap_or(body).trim()
}

/// Parse model output into quiz items.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizItem>> {
    let body = strip_code_fence(raw);
    match serde_json::from_str::<Vec<QuizItem>>(body) {
        Ok(items) => Ok(items),
        Err(first_err) => {
            // Tolerate chatter around the array.
            let start = body.find('[');
            let end = body.rfind(']');
            match (start, end) {
                (Some(s), Some(e)) if s < e => serde_json::from_str(&body[s..=e])
                    .map_err(|e| TutorError::Parse(format!("quiz JSON: {}", e))),
                _ => Err(TutorError::Parse(format!("quiz JSON: {}", first_err))),
            }
        }
    }
}

/// Spoken summary of the first question.
pub fn describe_quiz(items: &[QuizItem], difficulty: Difficulty) -> Option<String> {
    let first = items.first()?;
    let question = first.question.trim();
    let article = if difficulty == Difficulty::Easy { "an" } else { "a" };
    let mut text = format!("Here is {} {} quiz. Question: {}", article, difficulty, question);
    if !question.ends_with(['?', '.', '!']) {
        text.push('.');
    }
    if !first.options.is_empty() {
        text.push_str(&format!(" Options are: {}.", first.options.join(", ")));
    }
    Some(text)
}

/// Parse `raw` and decide what to say, applying `fallback` on failure.
pub fn resolve_quiz(raw: &str, difficulty: Difficulty, fallback: QuizFallback) -> QuizOutcome {
    match parse_quiz(raw) {
        Ok(items) => match describe_quiz(&items, difficulty) {
            Some(summary) => QuizOutcome::Parsed { summary, items },
            None => QuizOutcome::Empty,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Quiz response could not be parsed");
            let message = match fallback {
                QuizFallback::PassThrough => raw.trim().to_string(),
                QuizFallback::Apology => QUIZ_APOLOGY.to_string(),
            };
            QuizOutcome::Unparsed { message }
        }
    }
}
