use serde::Serialize;

use tutor_core::types::IntentKind;

use crate::state::DialogueState;

/// What kind of reply a turn produced; drives how a UI presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Navigation,
    Reading,
    Summary,
    Explanation,
    Translation,
    Quiz,
    Help,
    OpenDocument,
    Message,
    Error,
}

impl ResponseType {
    pub fn for_content(kind: IntentKind) -> Self {
        match kind {
            IntentKind::Summarize => ResponseType::Summary,
            IntentKind::Explain => ResponseType::Explanation,
            IntentKind::Translate => ResponseType::Translation,
            IntentKind::Quiz => ResponseType::Quiz,
            _ => ResponseType::Message,
        }
    }
}

/// A page change made during a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavigationDelta {
    pub from_page: usize,
    pub to_page: usize,
}

/// Outcome of one dialogue turn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnResult {
    pub intent: IntentKind,
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub response_text: String,
    pub payload: Option<serde_json::Value>,
    pub navigation: Option<NavigationDelta>,
    pub state: DialogueState,
}

/// Reply produced by dispatch before the turn is closed out.
#[derive(Debug, Clone)]
pub(crate) struct Reply {
    pub response_type: ResponseType,
    pub text: String,
    pub payload: Option<serde_json::Value>,
    pub navigation: Option<NavigationDelta>,
}

impl Reply {
    pub fn new(response_type: ResponseType, text: impl Into<String>) -> Self {
        Self {
            response_type,
            text: text.into(),
            payload: None,
            navigation: None,
        }
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new(ResponseType::Message, text)
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_navigation(mut self, from_page: usize, to_page: usize) -> Self {
        self.navigation = Some(NavigationDelta { from_page, to_page });
        self
    }
}
