//! Database migrations for Lore
//!
//! Every statement is idempotent: the database file may be shared with other
//! applications and may already contain unrelated tables, or a `notes` table
//! created by someone else.

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Bookkeeping table. Prefixed so it cannot collide with a `schema_version`
/// table owned by another application sharing the file.
const VERSION_TABLE: &str = "lore_schema_version";

/// Run all migrations.
///
/// The store tables are ensured on every open, whatever the recorded version
/// says; only the data migrations are gated on it.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            VERSION_TABLE
        ),
        [],
    )?;

    create_store_tables(conn)?;

    let current_version: i32 = conn.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {}", VERSION_TABLE),
        [],
        |row| row.get(0),
    )?;

    if current_version < 1 {
        record_version(conn, 1)?;
    }

    if current_version < SCHEMA_VERSION {
        migrate_v2(conn)?;
        record_version(conn, 2)?;
        tracing::info!(from = current_version, to = SCHEMA_VERSION, "schema migrated");
    }

    // After the v2 cleanup, so legacy duplicates cannot block it
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_instructions_active_section
            ON project_instructions(section) WHERE active = 1",
        [],
    )?;

    Ok(())
}

fn record_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO {} (version) VALUES (?1)", VERSION_TABLE),
        [version],
    )?;
    Ok(())
}

/// The four store tables (v1 layout) plus the note link column
fn create_store_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Display notes, read by desktop UIs
        CREATE TABLE IF NOT EXISTS notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        -- Structured knowledge entries
        CREATE TABLE IF NOT EXISTS project_knowledge (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            tags TEXT,
            importance INTEGER CHECK (importance BETWEEN 1 AND 5) DEFAULT 3,
            source TEXT DEFAULT 'conversation',
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        -- Behavioral instructions
        CREATE TABLE IF NOT EXISTS project_instructions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            section TEXT NOT NULL,
            content TEXT NOT NULL,
            priority INTEGER CHECK (priority BETWEEN 1 AND 5) DEFAULT 3,
            active BOOLEAN DEFAULT 1,
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        -- Ephemeral key/value state
        CREATE TABLE IF NOT EXISTS project_context (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            context_key TEXT UNIQUE NOT NULL,
            context_value TEXT NOT NULL,
            description TEXT,
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_knowledge_ranking
            ON project_knowledge(importance DESC, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_knowledge_category
            ON project_knowledge(category);
        "#,
    )?;

    // A `notes` table created by another writer may predate the link column
    if !column_exists(conn, "notes", "knowledge_id")? {
        conn.execute("ALTER TABLE notes ADD COLUMN knowledge_id INTEGER", [])?;
    }
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_notes_knowledge ON notes(knowledge_id)",
        [],
    )?;

    Ok(())
}

/// v2: collapse duplicate active instruction rows so each section has one
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Older writers could leave several active rows for one section.
        -- Keep the most recently updated one.
        UPDATE project_instructions SET active = 0
        WHERE active = 1 AND EXISTS (
            SELECT 1 FROM project_instructions newer
            WHERE newer.active = 1
              AND newer.section = project_instructions.section
              AND (newer.updated_at > project_instructions.updated_at
                   OR (newer.updated_at = project_instructions.updated_at
                       AND newer.id > project_instructions.id))
        );
        "#,
    )?;

    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> Result<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names.iter().any(|name| name == column))
}
