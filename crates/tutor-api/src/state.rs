//! Application state shared across all route handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use tutor_core::config::{QuizFallback, TutorConfig};
use tutor_dialogue::{DialogueOrchestrator, Session};
use tutor_document::{Document, DocumentExtractor};
use tutor_intent::IntentRecognizer;
use tutor_llm::{LanguageModel, ResponseGenerator, RetryPolicy};
use tutor_storage::{ChatRepository, Database, DocumentRepository};

use crate::error::ApiError;

/// A session checked out for one turn. Dropping it checks the session back in.
pub type SessionLease = OwnedMutexGuard<Session>;

/// Default idle lifetime of a session.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Live dialogue sessions keyed by id.
///
/// Each session sits behind its own async mutex; a turn holds the lock for
/// its whole duration, so a second request for the same session is refused
/// instead of queued. Idle and terminated sessions are swept whenever a new
/// one starts.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<AsyncMutex<Session>>>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_idle_timeout(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idle_timeout(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Register a new session and check it out immediately.
    pub fn start(&self, session: Session) -> Result<SessionLease, ApiError> {
        self.sweep_idle(Utc::now())?;

        let id = session.id();
        let slot = Arc::new(AsyncMutex::new(session));
        let lease = Arc::clone(&slot)
            .try_lock_owned()
            .map_err(|_| ApiError::Internal("new session already locked".into()))?;
        self.lock()?.insert(id, slot);
        info!(session_id = %id, "Session started");
        Ok(lease)
    }

    /// Check out an existing session for one turn.
    pub fn checkout(&self, id: Uuid) -> Result<SessionLease, ApiError> {
        let slot = self
            .lock()?
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("Session {} not found", id)))?;
        slot.try_lock_owned().map_err(|_| {
            debug!(session_id = %id, "Session busy");
            ApiError::Conflict(format!("Session {} is busy with another request", id))
        })
    }

    pub fn remove(&self, id: Uuid) -> Result<bool, ApiError> {
        let removed = self.lock()?.remove(&id).is_some();
        if removed {
            debug!(session_id = %id, "Session removed");
        }
        Ok(removed)
    }

    /// Drop sessions that are terminated or were last active before
    /// `now - idle_timeout`. Checked-out sessions are left alone.
    pub fn sweep_idle(&self, now: DateTime<Utc>) -> Result<usize, ApiError> {
        let cutoff = chrono::Duration::from_std(self.idle_timeout)
            .ok()
            .and_then(|idle| now.checked_sub_signed(idle));

        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, slot| match slot.try_lock() {
            Ok(session) => {
                session.is_active() && cutoff.is_none_or(|c| session.last_active_at() >= c)
            }
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "Expired idle sessions");
        }
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Arc<AsyncMutex<Session>>>>, ApiError> {
        self.sessions
            .lock()
            .map_err(|e| ApiError::Internal(format!("session registry lock poisoned: {}", e)))
    }
}

/// Parsed documents kept in memory so sessions share one copy.
#[derive(Default)]
pub struct DocumentCache {
    documents: Mutex<HashMap<Uuid, Arc<Document>>>,
}

impl DocumentCache {
    /// Cached document, loading it from `repo` on a miss.
    pub fn get_or_load(
        &self,
        id: Uuid,
        repo: &DocumentRepository,
    ) -> Result<Arc<Document>, ApiError> {
        if let Some(doc) = self.lock()?.get(&id) {
            return Ok(Arc::clone(doc));
        }
        let document = repo
            .load(id)?
            .ok_or_else(|| ApiError::NotFound(format!("Document {} not found", id)))?;
        let document = Arc::new(document);
        self.lock()?.insert(id, Arc::clone(&document));
        Ok(document)
    }

    pub fn insert(&self, id: Uuid, document: Arc<Document>) -> Result<(), ApiError> {
        self.lock()?.insert(id, document);
        Ok(())
    }

    pub fn evict(&self, id: Uuid) -> Result<(), ApiError> {
        self.lock()?.remove(&id);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Arc<Document>>>, ApiError> {
        self.documents
            .lock()
            .map_err(|e| ApiError::Internal(format!("document cache lock poisoned: {}", e)))
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<TutorConfig>,
    pub database: Arc<Database>,
    pub documents: Arc<DocumentRepository>,
    pub chats: Arc<ChatRepository>,
    pub orchestrator: Arc<DialogueOrchestrator>,
    pub extractor: Arc<dyn DocumentExtractor>,
    pub sessions: Arc<SessionRegistry>,
    pub cache: Arc<DocumentCache>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the dialogue engine around `model`.
    ///
    /// Unparseable quizzes always get the apology over HTTP since a web
    /// client cannot render raw model output as a quiz.
    pub fn new(
        config: TutorConfig,
        database: Database,
        model: Arc<dyn LanguageModel>,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        let retry = RetryPolicy::new(
            config.llm.max_attempts,
            Duration::from_secs(config.llm.base_delay_secs),
        );
        let generator = ResponseGenerator::new(model).with_retry_policy(retry);
        Self::with_generator(config, database, generator, extractor)
    }

    /// Like [`AppState::new`] with a preconfigured generator.
    pub fn with_generator(
        config: TutorConfig,
        database: Database,
        generator: ResponseGenerator,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        let database = Arc::new(database);
        let documents = Arc::new(DocumentRepository::new(Arc::clone(&database)));
        let chats = Arc::new(ChatRepository::new(Arc::clone(&database)));

        let sessions = SessionRegistry::with_idle_timeout(Duration::from_secs(
            config.api.session_idle_secs,
        ));
        let mut dialogue = config.dialogue.clone();
        dialogue.quiz_fallback = QuizFallback::Apology;
        let orchestrator = DialogueOrchestrator::new(IntentRecognizer::new(), generator, dialogue)
            .with_catalog(documents.clone());

        Self {
            config: Arc::new(config),
            database,
            documents,
            chats,
            orchestrator: Arc::new(orchestrator),
            extractor,
            sessions: Arc::new(sessions),
            cache: Arc::new(DocumentCache::default()),
            start_time: Instant::now(),
        }
    }
}
