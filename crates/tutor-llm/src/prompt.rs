//! Per-intent prompt templates.

use tutor_core::types::{Difficulty, IntentKind};

/// Prepended to every prompt. Answers are spoken aloud, so they must be
/// short and free of markup.
pub const SYSTEM_INSTRUCTION: &str = "You are an AI Voice Tutor. Explain things directly, \
simply, and briefly. Keep answers short (2-3 sentences max) unless asked otherwise. Use simple \
vocabulary. Do not use markdown.";

/// Everything a prompt template may embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub intent: IntentKind,
    /// Grounding text from the document.
    pub context: String,
    pub question: Option<String>,
    pub target_language: Option<String>,
    pub difficulty: Difficulty,
}

impl GenerationRequest {
    pub fn new(intent: IntentKind, context: impl Into<String>) -> Self {
        Self {
            intent,
            context: context.into(),
            question: None,
            target_language: None,
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    pub fn with_target_language(mut self, language: impl Into<String>) -> Self {
        self.target_language = Some(language.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

/// Render the prompt for `request`.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let (role, task) = match request.intent {
        IntentKind::Summarize => {
            let mut task = "Write a single cohesive paragraph summary (6-9 sentences) in \
                            simple, clear language. Do not use bullet points or lists."
                .to_string();
            if let Some(q) = request.question.as_deref().filter(|q| !q.trim().is_empty()) {
                task.push_str(&format!(" QUESTION: {}", q.trim()));
            }
            ("Patient Teacher", task)
        }
        IntentKind::Explain => {
            let mut task = "Explain the following concept step by step in simple terms, \
                            with examples."
                .to_string();
            if let Some(q) = request.question.as_deref().filter(|q| !q.trim().is_empty()) {
                task.push_str(&format!(" QUESTION: {}", q.trim()));
            }
            ("Patient Teacher", task)
        }
        IntentKind::Translate => {
            let language = request
                .target_language
                .as_deref()
                .filter(|l| !l.trim().is_empty())
                .unwrap_or("English");
            (
                "Translator",
                format!(
                    "Translate the text into {}. Keep the meaning accurate but simplify \
                     difficult words if necessary.",
                    language
                ),
            )
        }
        IntentKind::Quiz => (
            "Quiz Master",
            format!(
                "Create 3 {} difficulty quiz questions based on the content. Reply with \
                 strict JSON only: a list of objects, each with \"question\", \"options\" \
                 (a list of strings), and \"answer\" (the correct option string). \
                 Example: [{{\"question\": \"...\", \"options\": [\"a\", \"b\", \"c\", \"d\"], \
                 \"answer\": \"...\"}}]. Do not wrap the JSON in markdown or code blocks.",
                request.difficulty
            ),
        ),
        other => (
            "Assistant",
            format!(
                "The user has a command related to this content: {}. Respond appropriately.",
                other
            ),
        ),
    };

    format!(
        "{}\nROLE: {}\nCONTEXT:\n{}\nUSER REQUEST: {}\n",
        SYSTEM_INSTRUCTION,
        role,
        request.context.trim(),
        task
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTEXT: &str = "Plants convert light into chemical energy.";

    #[test]
    fn test_every_prompt_embeds_instruction_and_context() {
        for intent in IntentKind::ALL {
            let prompt = build_prompt(&GenerationRequest::new(intent, CONTEXT));
            assert!(prompt.starts_with(SYSTEM_INSTRUCTION), "{}", intent);
            assert!(prompt.contains(CONTEXT), "{}", intent);
            assert!(prompt.contains("USER REQUEST:"), "{}", intent);
        }
    }

    #[test]
    fn test_summarize_prompt() {
        let prompt = build_prompt(&GenerationRequest::new(IntentKind::Summarize, CONTEXT));
        assert!(prompt.contains("ROLE: Patient Teacher"));
        assert!(prompt.contains("6-9 sentences"));
    }

    #[test]
    fn test_explain_prompt_includes_question() {
        let req = GenerationRequest::new(IntentKind::Explain, CONTEXT)
            .with_question("what is chlorophyll");
        let prompt = build_prompt(&req);
        assert!(prompt.contains("QUESTION: what is chlorophyll"));
    }

    #[test]
    fn test_summarize_prompt_includes_question() {
        let req = GenerationRequest::new(IntentKind::Summarize, CONTEXT)
            .with_question("Summarize this entire document based on these excerpts.");
        let prompt = build_prompt(&req);
        assert!(prompt.contains("single cohesive paragraph"));
        assert!(prompt.contains("QUESTION: Summarize this entire document"));
    }

    #[test]
    fn test_explain_prompt_without_question() {
        let prompt = build_prompt(&GenerationRequest::new(IntentKind::Explain, CONTEXT));
        assert!(!prompt.contains("QUESTION:"));
    }

    #[test]
    fn test_translate_prompt_names_language() {
        let req =
            GenerationRequest::new(IntentKind::Translate, CONTEXT).with_target_language("Tamil");
        let prompt = build_prompt(&req);
        assert!(prompt.contains("ROLE: Translator"));
        assert!(prompt.contains("into Tamil"));
    }

    #[test]
    fn test_translate_prompt_defaults_to_english() {
        let prompt = build_prompt(&GenerationRequest::new(IntentKind::Translate, CONTEXT));
        assert!(prompt.contains("into English"));
    }

    #[test]
    fn test_quiz_prompt_names_difficulty_and_json() {
        let req =
            GenerationRequest::new(IntentKind::Quiz, CONTEXT).with_difficulty(Difficulty::Hard);
        let prompt = build_prompt(&req);
        assert!(prompt.contains("ROLE: Quiz Master"));
        assert!(prompt.contains("3 hard difficulty"));
        assert!(prompt.contains("strict JSON"));
        assert!(prompt.contains(r#"{"question": "...""#));
    }

    #[test]
    fn test_fallback_prompt_names_intent() {
        let prompt = build_prompt(&GenerationRequest::new(IntentKind::Help, CONTEXT));
        assert!(prompt.contains("ROLE: Assistant"));
        assert!(prompt.contains("HELP"));
    }
}
