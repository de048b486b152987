//! Instruction section queries
//!
//! One active row per section. The partial unique index created by the v2
//! migration backs the lookup-then-branch upsert below.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::{LoreError, Result};
use crate::types::*;

fn instruction_from_row(row: &Row) -> rusqlite::Result<InstructionSection> {
    let created_at: Option<String> = row.get("created_at")?;
    let updated_at: Option<String> = row.get("updated_at")?;
    Ok(InstructionSection {
        id: row.get("id")?,
        section: row.get("section")?,
        content: row.get("content")?,
        priority: row.get::<_, Option<i64>>("priority")?.unwrap_or(DEFAULT_RATING),
        active: row.get::<_, Option<bool>>("active")?.unwrap_or(true),
        created_at: parse_timestamp(created_at.as_deref().unwrap_or_default()),
        updated_at: parse_timestamp(updated_at.as_deref().unwrap_or_default()),
    })
}

/// Insert or update the active instruction for `section`.
///
/// Reads then writes, so call it inside `Storage::with_transaction`.
pub fn update_instruction(
    conn: &Connection,
    section: &str,
    content: &str,
    priority: i64,
) -> Result<bool> {
    require_non_empty("section", section).map_err(LoreError::InvalidInput)?;
    require_non_empty("content", content).map_err(LoreError::InvalidInput)?;
    validate_rating("priority", priority).map_err(LoreError::InvalidInput)?;

    let now = now_timestamp();
    let existing: Option<RowId> = conn
        .query_row(
            "SELECT id FROM project_instructions WHERE section = ? AND active = 1",
            params![section],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            conn.execute(
                "UPDATE project_instructions
                 SET content = ?, priority = ?, updated_at = ?
                 WHERE id = ?",
                params![content, priority, now, id],
            )?;
            tracing::debug!(section, id, "instruction updated");
        }
        None => {
            conn.execute(
                "INSERT INTO project_instructions
                    (section, content, priority, active, created_at, updated_at)
                 VALUES (?, ?, ?, 1, ?, ?)",
                params![section, content, priority, now, now],
            )?;
            tracing::debug!(section, "instruction inserted");
        }
    }

    Ok(true)
}

/// Active instructions, highest priority first, then by section name
pub fn list_active_instructions(conn: &Connection) -> Result<Vec<InstructionSection>> {
    let mut stmt = conn.prepare(
        "SELECT id, section, content, priority, active, created_at, updated_at
         FROM project_instructions
         WHERE active = 1
         ORDER BY priority DESC, section ASC",
    )?;
    let sections = stmt
        .query_map([], instruction_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(sections)
}
