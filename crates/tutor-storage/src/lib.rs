//! SQLite persistence for the tutor: uploaded documents and chat history.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{
    ChatRecord, ChatRepository, DocumentRecord, DocumentRepository, MessageRecord, MessageRole,
    ProjectRecord, DEFAULT_PROJECT_NAME,
};
