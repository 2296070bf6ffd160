//! Repositories for uploaded documents and chat history.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use tutor_core::error::TutorError;
use tutor_dialogue::{CatalogEntry, DocumentCatalog};
use tutor_document::Document;

use crate::db::Database;

pub const DEFAULT_PROJECT_NAME: &str = "Default";

/// Library listing entry for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub filename: String,
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = TutorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(TutorError::InvalidInput(format!("unknown message role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    pub id: Uuid,
    pub chat_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Repository for uploaded documents.
///
/// Pages are stored as the string-keyed JSON form produced by
/// [`Document::to_raw`].
pub struct DocumentRepository {
    db: Arc<Database>,
}

impl DocumentRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Store a document under a fresh id.
    pub fn save(&self, filename: &str, document: &Document) -> Result<DocumentRecord, TutorError> {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            page_count: document.page_count(),
            created_at: now_secs(),
        };
        let pages = serde_json::to_string(&document.to_raw())?;

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, filename, page_count, chunk_size, pages, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    record.id.to_string(),
                    record.filename,
                    record.page_count as i64,
                    document.max_chunk_chars() as i64,
                    pages,
                    record.created_at.timestamp(),
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to save document: {}", e)))?;
            Ok(())
        })?;

        info!(
            doc_id = %record.id,
            filename = %record.filename,
            pages = record.page_count,
            "Document stored"
        );
        Ok(record)
    }

    pub fn find(&self, id: Uuid) -> Result<Option<DocumentRecord>, TutorError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, filename, page_count, created_at FROM documents WHERE id = ?1",
                rusqlite::params![id.to_string()],
                |row| Ok(row_to_document(row)),
            )
            .optional()
            .map_err(|e| TutorError::Storage(e.to_string()))?
            .transpose()
        })
    }

    /// Load the full page content of a document.
    pub fn load(&self, id: Uuid) -> Result<Option<Document>, TutorError> {
        let stored: Option<(String, i64)> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT pages, chunk_size FROM documents WHERE id = ?1",
                rusqlite::params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .map_err(|e| TutorError::Storage(e.to_string()))
        })?;

        let Some((pages, chunk_size)) = stored else {
            return Ok(None);
        };
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(&pages)?;
        let chunk_size = usize::try_from(chunk_size)
            .map_err(|_| TutorError::Storage(format!("bad chunk size for document {}", id)))?;
        debug!(doc_id = %id, pages = raw.len(), "Document loaded");
        Document::from_raw(raw, chunk_size).map(Some)
    }

    /// All documents, newest first.
    pub fn list(&self) -> Result<Vec<DocumentRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, filename, page_count, created_at FROM documents
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| Ok(row_to_document(row)))
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut documents = Vec::new();
            for row in rows {
                documents.push(row.map_err(|e| TutorError::Storage(e.to_string()))??);
            }
            Ok(documents)
        })
    }

    /// Delete a document. Returns false when no such document existed.
    pub fn delete(&self, id: Uuid) -> Result<bool, TutorError> {
        let deleted = self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM documents WHERE id = ?1",
                rusqlite::params![id.to_string()],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to delete document: {}", e)))
        })?;
        if deleted > 0 {
            info!(doc_id = %id, "Document deleted");
        }
        Ok(deleted > 0)
    }

    /// Most recent document whose filename contains `name`, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Result<Option<DocumentRecord>, TutorError> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list()?
            .into_iter()
            .find(|doc| doc.filename.to_lowercase().contains(&needle)))
    }
}

impl DocumentCatalog for DocumentRepository {
    fn find(&self, name: &str) -> tutor_core::Result<Option<CatalogEntry>> {
        Ok(self.find_by_name(name)?.map(|doc| CatalogEntry {
            id: doc.id.to_string(),
            name: doc.filename,
        }))
    }
}

/// Repository for projects, chats, and their messages.
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn create_project(&self, name: &str) -> Result<ProjectRecord, TutorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TutorError::InvalidInput("project name must not be empty".into()));
        }
        let project = ProjectRecord {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: now_secs(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO projects (id, name, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![
                    project.id.to_string(),
                    project.name,
                    project.created_at.timestamp()
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to create project: {}", e)))?;
            Ok(())
        })?;
        Ok(project)
    }

    pub fn find_project(&self, id: Uuid) -> Result<Option<ProjectRecord>, TutorError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, created_at FROM projects WHERE id = ?1",
                rusqlite::params![id.to_string()],
                |row| Ok(row_to_project(row)),
            )
            .optional()
            .map_err(|e| TutorError::Storage(e.to_string()))?
            .transpose()
        })
    }

    /// All projects, oldest first.
    pub fn list_projects(&self) -> Result<Vec<ProjectRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, name, created_at FROM projects ORDER BY created_at, rowid")
                .map_err(|e| TutorError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map([], |row| Ok(row_to_project(row)))
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut projects = Vec::new();
            for row in rows {
                projects.push(row.map_err(|e| TutorError::Storage(e.to_string()))??);
            }
            Ok(projects)
        })
    }

    /// The project named `Default`, created on first use.
    pub fn ensure_default_project(&self) -> Result<ProjectRecord, TutorError> {
        let existing = self
            .list_projects()?
            .into_iter()
            .find(|p| p.name == DEFAULT_PROJECT_NAME);
        match existing {
            Some(project) => Ok(project),
            None => {
                info!("Creating default project");
                self.create_project(DEFAULT_PROJECT_NAME)
            }
        }
    }

    pub fn create_chat(&self, project_id: Uuid, title: &str) -> Result<ChatRecord, TutorError> {
        if self.find_project(project_id)?.is_none() {
            return Err(TutorError::NotFound(format!("project {}", project_id)));
        }
        let title = match title.trim() {
            "" => "New chat",
            t => t,
        };
        let chat = ChatRecord {
            id: Uuid::new_v4(),
            project_id,
            title: title.to_string(),
            created_at: now_secs(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chats (id, project_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    chat.id.to_string(),
                    chat.project_id.to_string(),
                    chat.title,
                    chat.created_at.timestamp()
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to create chat: {}", e)))?;
            Ok(())
        })?;
        Ok(chat)
    }

    pub fn find_chat(&self, id: Uuid) -> Result<Option<ChatRecord>, TutorError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, project_id, title, created_at FROM chats WHERE id = ?1",
                rusqlite::params![id.to_string()],
                |row| Ok(row_to_chat(row)),
            )
            .optional()
            .map_err(|e| TutorError::Storage(e.to_string()))?
            .transpose()
        })
    }

    /// Chats in a project, newest first.
    pub fn list_chats(&self, project_id: Uuid) -> Result<Vec<ChatRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, project_id, title, created_at FROM chats
                     WHERE project_id = ?1
                     ORDER BY created_at DESC, rowid DESC",
                )
                .map_err(|e| TutorError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![project_id.to_string()], |row| {
                    Ok(row_to_chat(row))
                })
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut chats = Vec::new();
            for row in rows {
                chats.push(row.map_err(|e| TutorError::Storage(e.to_string()))??);
            }
            Ok(chats)
        })
    }

    pub fn append_message(
        &self,
        chat_id: Uuid,
        role: MessageRole,
        content: &str,
    ) -> Result<MessageRecord, TutorError> {
        if self.find_chat(chat_id)?.is_none() {
            return Err(TutorError::NotFound(format!("chat {}", chat_id)));
        }
        let message = MessageRecord {
            id: Uuid::new_v4(),
            chat_id,
            role,
            content: content.to_string(),
            created_at: now_secs(),
        };
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, chat_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    message.id.to_string(),
                    message.chat_id.to_string(),
                    message.role.as_str(),
                    message.content,
                    message.created_at.timestamp()
                ],
            )
            .map_err(|e| TutorError::Storage(format!("Failed to append message: {}", e)))?;
            Ok(())
        })?;
        Ok(message)
    }

    /// Messages in a chat, in the order they were written.
    pub fn list_messages(&self, chat_id: Uuid) -> Result<Vec<MessageRecord>, TutorError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, chat_id, role, content, created_at FROM messages
                     WHERE chat_id = ?1
                     ORDER BY created_at, rowid",
                )
                .map_err(|e| TutorError::Storage(e.to_string()))?;
            let rows = stmt
                .query_map(rusqlite::params![chat_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| TutorError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                messages.push(row.map_err(|e| TutorError::Storage(e.to_string()))??);
            }
            Ok(messages)
        })
    }
}

// -- Row mapping helpers --

fn now_secs() -> DateTime<Utc> {
    from_timestamp(Utc::now().timestamp())
}

fn from_timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).single().unwrap_or_default()
}

fn parse_uuid(value: &str) -> Result<Uuid, TutorError> {
    Uuid::parse_str(value).map_err(|e| TutorError::Storage(format!("Invalid UUID: {}", e)))
}

fn row_to_document(row: &rusqlite::Row) -> Result<DocumentRecord, TutorError> {
    let id: String = row.get(0).map_err(|e| TutorError::Storage(e.to_string()))?;
    let filename: String = row.get(1).map_err(|e| TutorError::Storage(e.to_string()))?;
    let page_count: i64 = row.get(2).map_err(|e| TutorError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(3).map_err(|e| TutorError::Storage(e.to_string()))?;

    Ok(DocumentRecord {
        id: parse_uuid(&id)?,
        filename,
        page_count: page_count.max(0) as usize,
        created_at: from_timestamp(created_at),
    })
}

fn row_to_project(row: &rusqlite::Row) -> Result<ProjectRecord, TutorError> {
    let id: String = row.get(0).map_err(|e| TutorError::Storage(e.to_string()))?;
    let name: String = row.get(1).map_err(|e| TutorError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(2).map_err(|e| TutorError::Storage(e.to_string()))?;

    Ok(ProjectRecord {
        id: parse_uuid(&id)?,
        name,
        created_at: from_timestamp(created_at),
    })
}

fn row_to_chat(row: &rusqlite::Row) -> Result<ChatRecord, TutorError> {
    let id: String = row.get(0).map_err(|e| TutorError::Storage(e.to_string()))?;
    let project_id: String = row.get(1).map_err(|e| TutorError::Storage(e.to_string()))?;
    let title: String = row.get(2).map_err(|e| TutorError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(3).map_err(|e| TutorError::Storage(e.to_string()))?;

    Ok(ChatRecord {
        id: parse_uuid(&id)?,
        project_id: parse_uuid(&project_id)?,
        title,
        created_at: from_timestamp(created_at),
    })
}

fn row_to_message(row: &rusqlite::Row) -> Result<MessageRecord, TutorError> {
    let id: String = row.get(0).map_err(|e| TutorError::Storage(e.to_string()))?;
    let chat_id: String = row.get(1).map_err(|e| TutorError::Storage(e.to_string()))?;
    let role: String = row.get(2).map_err(|e| TutorError::Storage(e.to_string()))?;
    let content: String = row.get(3).map_err(|e| TutorError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(4).map_err(|e| TutorError::Storage(e.to_string()))?;

    Ok(MessageRecord {
        id: parse_uuid(&id)?,
        chat_id: parse_uuid(&chat_id)?,
        role: role.parse()?,
        content,
        created_at: from_timestamp(created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn sample_document() -> Document {
        Document::from_raw(
            vec![
                (0usize, vec!["Cells are the unit of life.".to_string()]),
                (1, vec!["Mitosis".to_string(), "Meiosis".to_string()]),
            ],
            800,
        )
        .unwrap()
    }

    #[test]
    fn test_save_and_load_document() {
        let repo = DocumentRepository::new(setup());
        let document = sample_document();
        let record = repo.save("biology.pdf", &document).unwrap();

        assert_eq!(record.page_count, 2);
        let found = repo.find(record.id).unwrap().unwrap();
        assert_eq!(found, record);

        let loaded = repo.load(record.id).unwrap().unwrap();
        assert_eq!(loaded, document);
    }

    #[test]
    fn test_missing_document() {
        let repo = DocumentRepository::new(setup());
        let id = Uuid::new_v4();
        assert!(repo.find(id).unwrap().is_none());
        assert!(repo.load(id).unwrap().is_none());
        assert!(!repo.delete(id).unwrap());
    }

    #[test]
    fn test_list_and_delete() {
        let repo = DocumentRepository::new(setup());
        let a = repo.save("a.pdf", &sample_document()).unwrap();
        let b = repo.save("b.pdf", &sample_document()).unwrap();

        let listed = repo.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, b.id);

        assert!(repo.delete(a.id).unwrap());
        let listed = repo.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, b.id);
    }

    #[test]
    fn test_catalog_lookup_by_name() {
        let repo = DocumentRepository::new(setup());
        let record = repo.save("Intro To Biology.pdf", &sample_document()).unwrap();

        let entry = DocumentCatalog::find(&repo, "biology").unwrap().unwrap();
        assert_eq!(entry.id, record.id.to_string());
        assert_eq!(entry.name, "Intro To Biology.pdf");
        assert!(DocumentCatalog::find(&repo, "chemistry").unwrap().is_none());
        assert!(repo.find_by_name("").unwrap().is_none());
    }

    #[test]
    fn test_default_project_is_created_once() {
        let repo = ChatRepository::new(setup());
        let first = repo.ensure_default_project().unwrap();
        let second = repo.ensure_default_project().unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(repo.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_project_name_required() {
        let repo = ChatRepository::new(setup());
        assert!(matches!(
            repo.create_project("  "),
            Err(TutorError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_chat_messages_in_order() {
        let repo = ChatRepository::new(setup());
        let project = repo.create_project("Biology").unwrap();
        let chat = repo.create_chat(project.id, "Chapter 1").unwrap();

        repo.append_message(chat.id, MessageRole::User, "summarize").unwrap();
        repo.append_message(chat.id, MessageRole::Assistant, "Cells divide.")
            .unwrap();

        let messages = repo.list_messages(chat.id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[1].content, "Cells divide.");

        let chats = repo.list_chats(project.id).unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0].title, "Chapter 1");
    }

    #[test]
    fn test_blank_chat_title_gets_default() {
        let repo = ChatRepository::new(setup());
        let project = repo.ensure_default_project().unwrap();
        let chat = repo.create_chat(project.id, "").unwrap();
        assert_eq!(chat.title, "New chat");
    }

    #[test]
    fn test_chat_requires_project() {
        let repo = ChatRepository::new(setup());
        assert!(matches!(
            repo.create_chat(Uuid::new_v4(), "Orphan"),
            Err(TutorError::NotFound(_))
        ));
        assert!(matches!(
            repo.append_message(Uuid::new_v4(), MessageRole::User, "hi"),
            Err(TutorError::NotFound(_))
        ));
    }

    #[test]
    fn test_message_role_parse() {
        assert_eq!("assistant".parse::<MessageRole>().unwrap(), MessageRole::Assistant);
        assert!("system".parse::<MessageRole>().is_err());
        assert_eq!(
            serde_json::to_string(&MessageRole::User).unwrap(),
            "\"user\""
        );
    }
}
