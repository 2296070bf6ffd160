//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use tutor_core::error::TutorError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), TutorError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| TutorError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| TutorError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: documents, projects, chats, messages.
fn apply_v1(conn: &Connection) -> Result<(), TutorError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id              TEXT PRIMARY KEY NOT NULL,
            filename        TEXT NOT NULL,
            page_count      INTEGER NOT NULL,
            chunk_size      INTEGER NOT NULL,
            pages           TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_documents_created
            ON documents (created_at DESC);

        CREATE TABLE IF NOT EXISTS projects (
            id              TEXT PRIMARY KEY NOT NULL,
            name            TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chats (
            id              TEXT PRIMARY KEY NOT NULL,
            project_id      TEXT NOT NULL REFERENCES projects (id) ON DELETE CASCADE,
            title           TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chats_project
            ON chats (project_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS messages (
            id              TEXT PRIMARY KEY NOT NULL,
            chat_id         TEXT NOT NULL REFERENCES chats (id) ON DELETE CASCADE,
            role            TEXT NOT NULL CHECK (role IN ('user', 'assistant')),
            content         TEXT NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_chat
            ON messages (chat_id, created_at);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
    )
    .map_err(|e| TutorError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
