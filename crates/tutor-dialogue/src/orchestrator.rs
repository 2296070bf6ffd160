//! Dialogue orchestrator: recognizes intents, moves the cursor, calls the
//! generator, and closes out each turn.

use std::sync::{Arc, LazyLock};

use chrono::Utc;
use regex::Regex;
use tracing::{debug, error, info, warn};

use tutor_core::config::DialogueConfig;
use tutor_core::types::{
    Entities, Intent, IntentKind, FILENAME, TARGET_LANGUAGE, TARGET_PAGE, TARGET_PARAGRAPH,
};
use tutor_intent::IntentRecognizer;
use tutor_llm::quiz::QuizOutcome;
use tutor_llm::{resolve_quiz, GenerationRequest, QuizFallback, ResponseGenerator};

use crate::catalog::DocumentCatalog;
use crate::error::DialogueError;
use crate::session::Session;
use crate::state::{validate_transition, DialogueState};
use crate::types::{Reply, ResponseType, TurnResult};

pub const WELCOME_MESSAGE: &str = "Welcome to the AI Voice Tutor. I have loaded your document. \
You can ask me to summarize, explain, translate, give a quiz, or navigate pages. \
What would you like to do?";
pub const REPROMPT: &str = "I didn't catch that. Please repeat your command.";
pub const SESSION_ENDED: &str = "This session has ended.";
pub const LAST_PAGE: &str = "You are already on the last page.";
pub const FIRST_PAGE: &str = "You are already on the first page.";
pub const INVALID_PAGE: &str = "Sorry, that page number is invalid.";
pub const SPECIFY_PARAGRAPH: &str = "Please specify which paragraph to read.";
pub const INVALID_PARAGRAPH: &str = "Invalid paragraph number for this page.";
pub const EMPTY_PARAGRAPH: &str = "This paragraph has no text.";
pub const NO_CONTENT: &str = "No content available on the current page or chunk to process.";
pub const NOTHING_TO_REPEAT: &str = "Nothing to repeat.";
pub const GOODBYE: &str = "Stopping the session. Goodbye.";
pub const HELP_TEXT: &str = "I can Summarize the page, Explain specific details, \
Translate to other languages like Tamil or Hindi, Take a Quiz, or simply Read the text. \
Just say 'Wake' to start.";
pub const GREETING_REPLY: &str =
    "Hi there! I'm ready to help you learn. What would you like to do?";
pub const NOT_UNDERSTOOD: &str = "Sorry, I didn't understand that command. Please try again.";
pub const WHICH_DOCUMENT: &str = "Please tell me which document to open.";
pub const NOT_IMPLEMENTED: &str = "Sorry, that command is not yet implemented.";
pub const GENERIC_ERROR: &str = "An error occurred. Please try again.";

const GREETINGS: [&str; 4] = ["hi", "hello", "wake", "wake up"];

const WHOLE_DOCUMENT_REQUEST: &str = "Summarize this entire document based on these excerpts.";

static WHOLE_DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:pdf|document|book|whole|entire)\b").expect("Invalid whole-document regex")
});

/// Drives turns for any number of sessions.
///
/// Holds no per-session state; every turn takes the session by `&mut`.
pub struct DialogueOrchestrator {
    recognizer: IntentRecognizer,
    generator: ResponseGenerator,
    catalog: Option<Arc<dyn DocumentCatalog>>,
    config: DialogueConfig,
}

impl DialogueOrchestrator {
    pub fn new(
        recognizer: IntentRecognizer,
        generator: ResponseGenerator,
        config: DialogueConfig,
    ) -> Self {
        Self {
            recognizer,
            generator,
            catalog: None,
            config,
        }
    }

    /// Enable OPEN_DOCUMENT lookups.
    pub fn with_catalog(mut self, catalog: Arc<dyn DocumentCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn config(&self) -> &DialogueConfig {
        &self.config
    }

    pub fn quiz_fallback(&self) -> QuizFallback {
        self.config.quiz_fallback
    }

    pub fn recognizer(&self) -> &IntentRecognizer {
        &self.recognizer
    }

    pub fn welcome_message(&self) -> &'static str {
        WELCOME_MESSAGE
    }

    /// Recognize `utterance` and run one turn.
    pub fn submit_utterance(&self, session: &mut Session, utterance: &str) -> TurnResult {
        if !session.is_active() {
            return Self::untouched(session, IntentKind::Unknown, SESSION_ENDED);
        }
        if utterance.trim().is_empty() {
            return Self::untouched(session, IntentKind::Unknown, REPROMPT);
        }

        let intent = self.recognizer.recognize(utterance);
        self.run_turn(session, intent, utterance)
    }

    /// Run one turn for an intent chosen by a UI, skipping recognition.
    pub fn invoke_intent(
        &self,
        session: &mut Session,
        kind: IntentKind,
        entities: Entities,
    ) -> TurnResult {
        self.invoke_intent_with_utterance(session, kind, entities, "")
    }

    /// Like [`invoke_intent`](Self::invoke_intent) but keeps the user's
    /// words for intents that use them (EXPLAIN, whole-document SUMMARIZE).
    pub fn invoke_intent_with_utterance(
        &self,
        session: &mut Session,
        kind: IntentKind,
        entities: Entities,
        utterance: &str,
    ) -> TurnResult {
        if !session.is_active() {
            return Self::untouched(session, kind, SESSION_ENDED);
        }
        self.run_turn(session, Intent::new(kind, entities), utterance)
    }

    fn run_turn(&self, session: &mut Session, intent: Intent, utterance: &str) -> TurnResult {
        if let Err(e) = validate_transition(session.state, DialogueState::Processing) {
            error!(session_id = %session.id, error = %e, "Session was not awaiting input");
        }
        session.state = DialogueState::Processing;
        session.last_active_at = Utc::now();
        session.turns += 1;

        let kind = intent.kind;
        debug!(session_id = %session.id, intent = %kind, "Dispatching turn");

        let (reply, next) = match self.dispatch(session, &intent, utterance) {
            Ok(reply) => {
                let next = if kind == IntentKind::Stop {
                    DialogueState::Terminated
                } else {
                    DialogueState::AwaitingInput
                };
                (reply, next)
            }
            Err(e) => {
                error!(session_id = %session.id, intent = %kind, error = %e, "Turn failed");
                (
                    Reply::new(ResponseType::Error, GENERIC_ERROR),
                    DialogueState::AwaitingInput,
                )
            }
        };

        if let Err(e) = validate_transition(session.state, next) {
            error!(session_id = %session.id, error = %e, "Invalid end-of-turn transition");
        }
        session.state = next;
        if next == DialogueState::Terminated {
            info!(session_id = %session.id, turns = session.turns, "Session terminated");
        }

        TurnResult {
            intent: kind,
            response_type: reply.response_type,
            response_text: reply.text,
            payload: reply.payload,
            navigation: reply.navigation,
            state: session.state,
        }
    }

    fn dispatch(
        &self,
        session: &mut Session,
        intent: &Intent,
        utterance: &str,
    ) -> Result<Reply, DialogueError> {
        let entities = &intent.entities;
        let reply = match intent.kind {
            IntentKind::NavigateNext => {
                let from = session.cursor.page;
                match session.cursor.next_page(&session.document) {
                    Some(cursor) => {
                        session.cursor = cursor;
                        Reply::new(
                            ResponseType::Navigation,
                            format!("Moved to page {}.", cursor.page + 1),
                        )
                        .with_navigation(from, cursor.page)
                    }
                    None => Reply::new(ResponseType::Navigation, LAST_PAGE),
                }
            }
            IntentKind::NavigatePrev => {
                let from = session.cursor.page;
                match session.cursor.prev_page(&session.document) {
                    Some(cursor) => {
                        session.cursor = cursor;
                        Reply::new(
                            ResponseType::Navigation,
                            format!("Moved to page {}.", cursor.page + 1),
                        )
                        .with_navigation(from, cursor.page)
                    }
                    None => Reply::new(ResponseType::Navigation, FIRST_PAGE),
                }
            }
            IntentKind::NavigatePage => {
                let from = session.cursor.page;
                let target = entities
                    .number(TARGET_PAGE)
                    .and_then(|page| session.cursor.go_to_page(&session.document, page));
                match target {
                    Some(cursor) => {
                        session.cursor = cursor;
                        Reply::new(
                            ResponseType::Navigation,
                            format!("Navigated to page {}.", cursor.page + 1),
                        )
                        .with_navigation(from, cursor.page)
                    }
                    None => Reply::message(INVALID_PAGE),
                }
            }
            IntentKind::ReadParagraph => self.read_paragraph(session, entities),
            IntentKind::Summarize
            | IntentKind::Explain
            | IntentKind::Translate
            | IntentKind::Quiz => self.generate_content(session, intent, utterance),
            IntentKind::Repeat => match &session.last_response {
                Some(text) => Reply::new(ResponseType::Reading, text.clone()),
                None => Reply::message(NOTHING_TO_REPEAT),
            },
            IntentKind::Stop => Reply::message(GOODBYE),
            IntentKind::Help => Reply::new(ResponseType::Help, HELP_TEXT),
            IntentKind::OpenDocument => self.open_document(entities)?,
            IntentKind::Unknown => {
                let normalized = utterance.trim().to_lowercase();
                if GREETINGS.contains(&normalized.as_str()) {
                    Reply::message(GREETING_REPLY)
                } else {
                    Reply::message(NOT_UNDERSTOOD)
                }
            }
        };
        Ok(reply)
    }

    fn read_paragraph(&self, session: &mut Session, entities: &Entities) -> Reply {
        let Some(target) = entities.number(TARGET_PARAGRAPH) else {
            return Reply::message(SPECIFY_PARAGRAPH);
        };
        let Some(cursor) = session.cursor.go_to_chunk(&session.document, target) else {
            return Reply::message(INVALID_PARAGRAPH);
        };
        session.cursor = cursor;

        let text = cursor.current(&session.document).unwrap_or_default().to_string();
        if text.trim().is_empty() {
            return Reply::new(ResponseType::Reading, EMPTY_PARAGRAPH);
        }
        session.last_response = Some(text.clone());
        Reply::new(ResponseType::Reading, text)
    }

    fn generate_content(&self, session: &mut Session, intent: &Intent, utterance: &str) -> Reply {
        let kind = intent.kind;
        let entities = &intent.entities;
        let document = Arc::clone(&session.document);

        let chunk = match session.cursor.current(&document) {
            Some(text) if !text.trim().is_empty() => text,
            _ => return Reply::message(NO_CONTENT),
        };

        let whole_document = kind == IntentKind::Summarize && Self::wants_whole_document(utterance);
        let context = if whole_document {
            info!(pages = document.page_count(), "Summarizing whole document");
            document.excerpts(
                self.config.full_summary_pages,
                self.config.full_summary_chars_per_page,
            )
        } else {
            chunk.to_string()
        };

        let difficulty = entities.difficulty();
        let mut request = GenerationRequest::new(kind, context);
        match kind {
            IntentKind::Explain if !utterance.trim().is_empty() => {
                request = request.with_question(utterance.trim());
            }
            IntentKind::Translate => {
                let language = entities.text(TARGET_LANGUAGE).unwrap_or("English");
                request = request.with_target_language(language);
            }
            IntentKind::Quiz => {
                request = request.with_difficulty(difficulty);
            }
            IntentKind::Summarize if whole_document => {
                request = request.with_question(WHOLE_DOCUMENT_REQUEST);
            }
            _ => {}
        }

        let generation = match self.generator.generate(&request) {
            Ok(generation) => generation,
            Err(e) => {
                warn!(intent = %kind, error = %e, "Generation failed; reporting to user");
                return Reply::new(ResponseType::Error, e.user_message());
            }
        };

        let reply = if kind == IntentKind::Quiz && generation.is_complete() {
            match resolve_quiz(&generation.text, difficulty, self.config.quiz_fallback) {
                QuizOutcome::Parsed { summary, items } => {
                    let mut reply = Reply::new(ResponseType::Quiz, summary);
                    reply.payload = serde_json::to_value(&items).ok();
                    reply
                }
                other => Reply::new(ResponseType::Quiz, other.text()),
            }
        } else {
            Reply::new(ResponseType::for_content(kind), generation.text)
        };

        session.last_response = Some(reply.text.clone());
        reply
    }

    fn open_document(&self, entities: &Entities) -> Result<Reply, DialogueError> {
        let Some(catalog) = &self.catalog else {
            return Ok(Reply::message(NOT_IMPLEMENTED));
        };
        let Some(name) = entities.text(FILENAME).map(str::trim).filter(|n| !n.is_empty()) else {
            return Ok(Reply::message(WHICH_DOCUMENT));
        };

        let found = catalog
            .find(name)
            .map_err(|e| DialogueError::Catalog(e.to_string()))?;
        Ok(match found {
            Some(entry) => {
                info!(doc_id = %entry.id, filename = %entry.name, "Opening document");
                Reply::new(ResponseType::OpenDocument, format!("Opening {}.", entry.name))
                    .with_payload(serde_json::json!({
                        "doc_id": entry.id,
                        "filename": entry.name,
                    }))
            }
            None => Reply::message(format!("I couldn't find a document named {}.", name)),
        })
    }

    fn wants_whole_document(utterance: &str) -> bool {
        WHOLE_DOCUMENT_RE.is_match(&utterance.to_lowercase())
    }

    /// Reply without touching the session.
    fn untouched(session: &Session, intent: IntentKind, text: &str) -> TurnResult {
        TurnResult {
            intent,
            response_type: ResponseType::Message,
            response_text: text.to_string(),
            payload: None,
            navigation: None,
            state: session.state,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    use tutor_document::Document;
    use tutor_llm::{Completion, LanguageModel, LlmError, SafetySettings, Sleeper};

    use super::*;

    /// Replays scripted completions and records prompts.
    #[derive(Default)]
    pub struct FakeModel {
        script: Mutex<VecDeque<Result<Completion, LlmError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        pub fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    impl LanguageModel for FakeModel {
        fn complete(&self, prompt: &str, _safety: &SafetySettings) -> Result<Completion, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Completion::Text("default answer".into())))
        }
    }

    pub struct NoSleep;

    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    pub fn text(t: &str) -> Result<Completion, LlmError> {
        Ok(Completion::Text(t.to_string()))
    }

    pub fn orchestrator(model: Arc<FakeModel>) -> DialogueOrchestrator {
        orchestrator_with(model, DialogueConfig::default())
    }

    pub fn orchestrator_with(
        model: Arc<FakeModel>,
        config: DialogueConfig,
    ) -> DialogueOrchestrator {
        let generator = ResponseGenerator::new(model).with_sleeper(Arc::new(NoSleep));
        DialogueOrchestrator::new(IntentRecognizer::new(), generator, config)
    }

    pub fn document(pages: &[&[&str]]) -> Arc<Document> {
        let raw: Vec<(usize, Vec<String>)> = pages
            .iter()
            .enumerate()
            .map(|(i, chunks)| (i, chunks.iter().map(|c| c.to_string()).collect()))
            .collect();
        Arc::new(Document::from_raw(raw, 800).unwrap())
    }

    pub fn three_page_session() -> Session {
        Session::new(document(&[
            &["Plants make food from light.", "Chlorophyll is green."],
            &["Animals eat plants."],
            &["Fungi decompose matter."],
        ]))
    }
}
