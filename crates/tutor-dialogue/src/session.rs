//! Per-conversation state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use tutor_document::{Cursor, Document};

use crate::state::DialogueState;

/// One conversation over one document.
///
/// Owned by exactly one caller at a time; the orchestrator mutates it only
/// through `&mut` so there is no locking here.
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) id: Uuid,
    pub(crate) document: Arc<Document>,
    pub(crate) document_id: Option<String>,
    pub(crate) cursor: Cursor,
    pub(crate) last_response: Option<String>,
    pub(crate) state: DialogueState,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) last_active_at: DateTime<Utc>,
    pub(crate) turns: u64,
}

impl Session {
    pub fn new(document: Arc<Document>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            document,
            document_id: None,
            cursor: Cursor::origin(),
            last_response: None,
            state: DialogueState::AwaitingInput,
            created_at: now,
            last_active_at: now,
            turns: 0,
        }
    }

    /// Tag the session with the stored id of its document.
    pub fn with_document_id(mut self, id: impl Into<String>) -> Self {
        self.document_id = Some(id.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn document(&self) -> &Arc<Document> {
        &self.document
    }

    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn last_response(&self) -> Option<&str> {
        self.last_response.as_deref()
    }

    pub fn state(&self) -> DialogueState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != DialogueState::Terminated
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active_at(&self) -> DateTime<Utc> {
        self.last_active_at
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Move to `page` (chunk 0) when a driving UI changed pages on its own.
    ///
    /// Returns false and leaves the cursor alone when `page` is out of
    /// bounds. Staying on the current page keeps the current chunk.
    pub fn sync_page(&mut self, page: usize) -> bool {
        if page == self.cursor.page {
            return true;
        }
        match self.cursor.go_to_page(&self.document, page) {
            Some(cursor) => {
                self.cursor = cursor;
                true
            }
            None => false,
        }
    }
}
