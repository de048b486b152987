//! Key/value context queries

use rusqlite::{params, Connection, Row};

use crate::error::{LoreError, Result};
use crate::types::*;

fn context_from_row(row: &Row) -> rusqlite::Result<ContextEntry> {
    let updated_at: Option<String> = row.get("updated_at")?;
    Ok(ContextEntry {
        key: row.get("context_key")?,
        value: row.get("context_value")?,
        description: row.get("description")?,
        updated_at: parse_timestamp(updated_at.as_deref().unwrap_or_default()),
    })
}

/// Insert or overwrite the value stored under `key`
pub fn update_context(
    conn: &Connection,
    key: &str,
    value: &str,
    description: Option<&str>,
) -> Result<bool> {
    require_non_empty("key", key).map_err(LoreError::InvalidInput)?;

    conn.execute(
        "INSERT INTO project_context (context_key, context_value, description, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(context_key) DO UPDATE SET
            context_value = excluded.context_value,
            description = excluded.description,
            updated_at = excluded.updated_at",
        params![key, value, description, now_timestamp()],
    )?;
    tracing::debug!(key, "context updated");

    Ok(true)
}

/// Context entries, most recently updated first
pub fn list_context(conn: &Connection) -> Result<Vec<ContextEntry>> {
    let mut stmt = conn.prepare(
        "SELECT context_key, context_value, description, updated_at
         FROM project_context
         ORDER BY updated_at DESC, id DESC",
    )?;
    let entries = stmt
        .query_map([], context_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// Context as key/value pairs, most recently updated first. Keys are
/// unique because `context_key` is.
pub fn get_all_context(conn: &Connection) -> Result<Vec<(String, ContextValue)>> {
    Ok(list_context(conn)?
        .into_iter()
        .map(|entry| {
            (
                entry.key,
                ContextValue {
                    value: entry.value,
                    description: entry.description,
                    updated_at: entry.updated_at,
                },
            )
        })
        .collect())
}
