//! Route handler functions for all API endpoints.

use std::io::Write;
use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use tutor_core::types::{
    Entities, IntentKind, DIFFICULTY, TARGET_LANGUAGE, TARGET_PAGE, TARGET_PARAGRAPH,
};
use tutor_dialogue::{DialogueState, ResponseType, Session, TurnResult};
use tutor_document::load_document;
use tutor_storage::{ChatRecord, DocumentRecord, MessageRecord, MessageRole, ProjectRecord};

use crate::error::ApiError;
use crate::state::{AppState, SessionLease};

// =============================================================================
// Request / response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub pdf_id: Uuid,
    pub filename: String,
    pub page_count: usize,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse {
    pub page: usize,
    pub text: String,
    pub total_pages: usize,
}

/// Body for POST /api/assistant/action.
///
/// `page`, `target_page` and `target_paragraph` are 0-indexed.
#[derive(Debug, Default, Deserialize)]
pub struct ActionRequest {
    pub doc_id: Uuid,
    pub page: Option<usize>,
    pub user_utterance: Option<String>,
    pub intent: Option<String>,
    pub session_id: Option<Uuid>,
    pub chat_id: Option<Uuid>,
    pub target_page: Option<usize>,
    pub target_paragraph: Option<usize>,
    pub target_language: Option<String>,
    pub difficulty: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ActionResponse {
    pub intent: IntentKind,
    #[serde(rename = "type")]
    pub response_type: String,
    pub payload: Option<serde_json::Value>,
    pub text_response: String,
    pub audio_url: Option<String>,
    pub new_page: usize,
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub title: String,
}

// =============================================================================
// Health
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.sessions.len(),
    })
}

// =============================================================================
// Library
// =============================================================================

/// POST /api/upload - extract and store a PDF sent as multipart field `pdf`.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("pdf") {
            continue;
        }
        let filename = field
            .file_name()
            .map(sanitize_filename)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("No selected file".to_string()))?;
        let bytes = field.bytes().await?;
        upload = Some((filename, bytes.to_vec()));
        break;
    }

    let (filename, bytes) =
        upload.ok_or_else(|| ApiError::BadRequest("No 'pdf' file part in request".to_string()))?;
    if !state.config.document.is_allowed(&filename) {
        return Err(ApiError::BadRequest(
            "Invalid file type. Only PDF files are allowed.".to_string(),
        ));
    }
    if bytes.len() > state.config.document.max_upload_bytes() {
        return Err(ApiError::PayloadTooLarge(format!(
            "File exceeds the {} MB upload limit",
            state.config.document.max_upload_mb
        )));
    }

    let uploads_dir = state.config.general.uploads_path();
    let chunk_size = state.config.document.chunk_size;
    let extractor = Arc::clone(&state.extractor);
    let document = tokio::task::spawn_blocking(move || {
        std::fs::create_dir_all(&uploads_dir)?;
        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(".pdf")
            .tempfile_in(&uploads_dir)?;
        file.write_all(&bytes)?;
        file.flush()?;
        load_document(extractor.as_ref(), file.path(), chunk_size)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Extraction task failed: {}", e)))??;

    let document = Arc::new(document);
    let record = state.documents.save(&filename, &document)?;
    state.cache.insert(record.id, document)?;

    info!(doc_id = %record.id, filename = %record.filename, "Upload processed");
    Ok(Json(UploadResponse {
        pdf_id: record.id,
        filename: record.filename,
        page_count: record.page_count,
        message: "PDF processed successfully".to_string(),
    }))
}

/// GET /api/library - stored documents, newest first.
pub async fn library(State(state): State<AppState>) -> Result<Json<Vec<DocumentRecord>>, ApiError> {
    Ok(Json(state.documents.list()?))
}

/// DELETE /api/library/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !state.documents.delete(id)? {
        return Err(ApiError::NotFound(format!("Document {} not found", id)));
    }
    state.cache.evict(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/doc/{id}/page/{page} - text of one 0-indexed page.
pub async fn page_text(
    State(state): State<AppState>,
    Path((id, page)): Path<(Uuid, usize)>,
) -> Result<Json<PageResponse>, ApiError> {
    let document = state.cache.get_or_load(id, &state.documents)?;
    let text = document.page_text(page).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Page {} is out of range; document has {} pages",
            page,
            document.page_count()
        ))
    })?;
    Ok(Json(PageResponse {
        page,
        text,
        total_pages: document.page_count(),
    }))
}

// =============================================================================
// Assistant
// =============================================================================

/// POST /api/assistant/action - run one dialogue turn.
pub async fn assistant_action(
    State(state): State<AppState>,
    Json(body): Json<ActionRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let kind = body
        .intent
        .as_deref()
        .map(str::parse::<IntentKind>)
        .transpose()?;
    let utterance = body.user_utterance.clone().unwrap_or_default();
    if kind.is_none() && utterance.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Provide 'user_utterance' or 'intent'".to_string(),
        ));
    }
    if let Some(chat_id) = body.chat_id {
        if state.chats.find_chat(chat_id)?.is_none() {
            return Err(ApiError::NotFound(format!("Chat {} not found", chat_id)));
        }
    }

    let (mut lease, started) = session_for(&state, body.doc_id, body.session_id)?;
    if let Some(page) = body.page {
        if !lease.sync_page(page) {
            let id = lease.id();
            drop(lease);
            if started {
                state.sessions.remove(id)?;
            }
            return Err(ApiError::BadRequest(format!("Page {} is out of range", page)));
        }
    }

    let entities = entities_from(&body);
    let orchestrator = Arc::clone(&state.orchestrator);
    let turn_utterance = utterance.clone();
    let task = tokio::task::spawn_blocking(move || {
        let result = match kind {
            Some(kind) => orchestrator.invoke_intent_with_utterance(
                &mut lease,
                kind,
                entities,
                &turn_utterance,
            ),
            None => orchestrator.submit_utterance(&mut lease, &turn_utterance),
        };
        (result, lease.cursor().page, lease.id())
    });

    let timeout = Duration::from_secs(state.config.api.turn_timeout_secs);
    let (result, mut new_page, mut session_id) = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(done)) => done,
        Ok(Err(e)) => return Err(ApiError::Internal(format!("Turn task failed: {}", e))),
        Err(_) => {
            warn!(timeout_secs = timeout.as_secs(), "Assistant turn timed out");
            return Err(ApiError::ServiceUnavailable(
                "The assistant took too long to respond. Please try again.".to_string(),
            ));
        }
    };

    if result.state == DialogueState::Terminated {
        state.sessions.remove(session_id)?;
    }
    if result.response_type == ResponseType::OpenDocument {
        if let Some(opened) = open_requested_document(&state, &result)? {
            state.sessions.remove(session_id)?;
            session_id = opened;
            new_page = 0;
        }
    }

    if let Some(chat_id) = body.chat_id {
        let said = if utterance.trim().is_empty() {
            kind.map(|k| k.to_string()).unwrap_or_default()
        } else {
            utterance
        };
        state.chats.append_message(chat_id, MessageRole::User, &said)?;
        state
            .chats
            .append_message(chat_id, MessageRole::Assistant, &result.response_text)?;
    }

    Ok(Json(ActionResponse {
        intent: result.intent,
        response_type: response_type_name(result.response_type),
        payload: result.payload,
        text_response: result.response_text,
        audio_url: None,
        new_page,
        session_id,
    }))
}

/// Check out the requested session, or start one when none was given or
/// the client moved to another document. The flag is true for a new session.
fn session_for(
    state: &AppState,
    doc_id: Uuid,
    session_id: Option<Uuid>,
) -> Result<(SessionLease, bool), ApiError> {
    if let Some(id) = session_id {
        let lease = state.sessions.checkout(id)?;
        if lease.document_id() == Some(doc_id.to_string().as_str()) {
            return Ok((lease, false));
        }
        info!(session_id = %id, doc_id = %doc_id, "Document changed; starting a new session");
        drop(lease);
        let replacement = start_session(state, doc_id)?;
        state.sessions.remove(id)?;
        return Ok((replacement, true));
    }
    Ok((start_session(state, doc_id)?, true))
}

fn start_session(state: &AppState, doc_id: Uuid) -> Result<SessionLease, ApiError> {
    let document = state.cache.get_or_load(doc_id, &state.documents)?;
    state
        .sessions
        .start(Session::new(document).with_document_id(doc_id.to_string()))
}

/// Start a session on the document an OPEN_DOCUMENT turn resolved.
fn open_requested_document(
    state: &AppState,
    result: &TurnResult,
) -> Result<Option<Uuid>, ApiError> {
    let doc_id = result
        .payload
        .as_ref()
        .and_then(|p| p.get("doc_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());
    let Some(doc_id) = doc_id else {
        return Ok(None);
    };
    let lease = start_session(state, doc_id)?;
    Ok(Some(lease.id()))
}

fn entities_from(body: &ActionRequest) -> Entities {
    let mut entities = Entities::new();
    if let Some(page) = body.target_page {
        entities.insert_number(TARGET_PAGE, page);
    }
    if let Some(paragraph) = body.target_paragraph {
        entities.insert_number(TARGET_PARAGRAPH, paragraph);
    }
    if let Some(language) = body.target_language.as_deref().filter(|l| !l.trim().is_empty()) {
        entities.insert_text(TARGET_LANGUAGE, language.trim());
    }
    if let Some(difficulty) = body.difficulty.as_deref().filter(|d| !d.trim().is_empty()) {
        entities.insert_text(DIFFICULTY, difficulty.trim().to_lowercase());
    }
    entities
}

fn response_type_name(response_type: ResponseType) -> String {
    serde_json::to_value(response_type)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "message".to_string())
}

/// Keep only the final path component and a conservative character set.
fn sanitize_filename(name: &str) -> String {
    let base = FsPath::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    base.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim()
        .trim_start_matches('.')
        .to_string()
}

// =============================================================================
// Projects and chats
// =============================================================================

/// GET /api/projects - all projects; the default project always exists.
pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProjectRecord>>, ApiError> {
    state.chats.ensure_default_project()?;
    Ok(Json(state.chats.list_projects()?))
}

/// POST /api/projects
pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectRecord>), ApiError> {
    let project = state.chats.create_project(&body.name)?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /api/projects/{id}/chats
pub async fn list_chats(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ChatRecord>>, ApiError> {
    if state.chats.find_project(project_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Project {} not found", project_id)));
    }
    Ok(Json(state.chats.list_chats(project_id)?))
}

/// POST /api/projects/{id}/chats
pub async fn create_chat(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
    Json(body): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<ChatRecord>), ApiError> {
    let chat = state.chats.create_chat(project_id, &body.title)?;
    Ok((StatusCode::CREATED, Json(chat)))
}

/// GET /api/chats/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(chat_id): Path<Uuid>,
) -> Result<Json<Vec<MessageRecord>>, ApiError> {
    if state.chats.find_chat(chat_id)?.is_none() {
        return Err(ApiError::NotFound(format!("Chat {} not found", chat_id)));
    }
    Ok(Json(state.chats.list_messages(chat_id)?))
}
