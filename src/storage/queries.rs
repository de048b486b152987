//! Database queries for knowledge entries and display notes

use rusqlite::{params, Connection, Row};

use crate::error::{LoreError, Result};
use crate::types::*;

const KNOWLEDGE_COLUMNS: &str =
    "id, title, content, category, tags, importance, source, created_at, updated_at";

/// Ranking shared by search and listing: most important first, then most recent
const KNOWLEDGE_ORDER: &str = "ORDER BY importance DESC, created_at DESC, id DESC";

/// Parse a knowledge entry from a database row
pub fn knowledge_from_row(row: &Row) -> rusqlite::Result<KnowledgeEntry> {
    let tags_json: Option<String> = row.get("tags")?;
    let created_at: Option<String> = row.get("created_at")?;
    let updated_at: Option<String> = row.get("updated_at")?;

    let tags: Vec<String> = tags_json
        .as_deref()
        .and_then(|s| serde_json::from_str(s).ok())
        .unwrap_or_default();

    Ok(KnowledgeEntry {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        category: row.get("category")?,
        tags,
        importance: row.get::<_, Option<i64>>("importance")?.unwrap_or(DEFAULT_RATING),
        source: row
            .get::<_, Option<String>>("source")?
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
        created_at: parse_timestamp(created_at.as_deref().unwrap_or_default()),
        updated_at: parse_timestamp(updated_at.as_deref().unwrap_or_default()),
    })
}

/// Parse a display note from a database row
pub fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    let created_at: Option<String> = row.get("created_at")?;
    Ok(Note {
        id: row.get("id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        knowledge_id: row.get("knowledge_id")?,
        created_at: parse_timestamp(created_at.as_deref().unwrap_or_default()),
    })
}

/// Compose the display string stored in the notes table
pub fn format_note_content(input: &AddKnowledgeInput, binding: &ProjectBinding) -> String {
    format!(
        "Project: {}\nCategory: {}\nImportance: {}/5\nTags: {}\nSource: {}\n\n{}",
        binding.display_name(),
        input.category,
        input.importance,
        input.tags.join(", "),
        input.source,
        input.content
    )
}

/// Title shown in the notes table, prefixed with the bound project name
pub fn format_note_title(title: &str, binding: &ProjectBinding) -> String {
    match binding.project_name.as_deref() {
        Some(name) => format!("[{}] {}", name, title),
        None => title.to_string(),
    }
}

/// Add a knowledge entry and its display note.
///
/// Both rows are written inside a savepoint, so a failed note insert never
/// leaves an orphaned knowledge row, with or without an enclosing transaction.
pub fn add_knowledge(
    conn: &Connection,
    input: &AddKnowledgeInput,
    binding: &ProjectBinding,
) -> Result<KnowledgeRecord> {
    input.validate().map_err(LoreError::InvalidInput)?;

    conn.execute_batch("SAVEPOINT add_knowledge")?;
    match insert_knowledge_rows(conn, input, binding) {
        Ok(record) => {
            conn.execute_batch("RELEASE add_knowledge")?;
            tracing::debug!(
                note_id = record.note_id,
                entry_id = record.entry_id,
                category = %input.category,
                "knowledge added"
            );
            Ok(record)
        }
        Err(e) => {
            if let Err(rollback) =
                conn.execute_batch("ROLLBACK TO add_knowledge; RELEASE add_knowledge")
            {
                tracing::error!(error = %rollback, "failed to roll back knowledge insert");
            }
            Err(e)
        }
    }
}

fn insert_knowledge_rows(
    conn: &Connection,
    input: &AddKnowledgeInput,
    binding: &ProjectBinding,
) -> Result<KnowledgeRecord> {
    let now = now_timestamp();
    let tags_json = serde_json::to_string(&input.tags)?;

    conn.execute(
        "INSERT INTO project_knowledge
            (title, content, category, tags, importance, source, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        params![
            input.title,
            input.content,
            input.category,
            tags_json,
            input.importance,
            input.source,
            now,
            now,
        ],
    )?;
    let entry_id = conn.last_insert_rowid();

    conn.execute(
        "INSERT INTO notes (title, content, knowledge_id, created_at) VALUES (?, ?, ?, ?)",
        params![
            format_note_title(&input.title, binding),
            format_note_content(input, binding),
            entry_id,
            now,
        ],
    )?;
    let note_id = conn.last_insert_rowid();

    Ok(KnowledgeRecord { note_id, entry_id })
}

/// Escape `LIKE` wildcards so the query matches literally
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Substring search over content, title and serialized tags.
///
/// Matching is ASCII case-insensitive (SQLite `LIKE`). `category`, when given,
/// must match exactly.
pub fn search_knowledge(
    conn: &Connection,
    query: &str,
    category: Option<&str>,
) -> Result<Vec<KnowledgeEntry>> {
    let pattern = like_pattern(query);
    let mut sql = format!(
        "SELECT {} FROM project_knowledge
         WHERE (content LIKE ?1 ESCAPE '\\' OR title LIKE ?1 ESCAPE '\\' OR tags LIKE ?1 ESCAPE '\\')",
        KNOWLEDGE_COLUMNS
    );
    if category.is_some() {
        sql.push_str(" AND category = ?2");
    }
    sql.push(' ');
    sql.push_str(KNOWLEDGE_ORDER);

    let mut stmt = conn.prepare(&sql)?;
    let rows = match category {
        Some(category) => stmt.query_map(params![pattern, category], knowledge_from_row)?,
        None => stmt.query_map(params![pattern], knowledge_from_row)?,
    };
    let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;

    tracing::debug!(query, results = entries.len(), "knowledge search");
    Ok(entries)
}

/// All knowledge entries, ranked like search results
pub fn list_all_knowledge(conn: &Connection) -> Result<Vec<KnowledgeEntry>> {
    let sql = format!(
        "SELECT {} FROM project_knowledge {}",
        KNOWLEDGE_COLUMNS, KNOWLEDGE_ORDER
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map([], knowledge_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// Most recently added entries, newest first
pub fn list_recent_knowledge(conn: &Connection, limit: i64) -> Result<Vec<KnowledgeEntry>> {
    let sql = format!(
        "SELECT {} FROM project_knowledge ORDER BY created_at DESC, id DESC LIMIT ?",
        KNOWLEDGE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let entries = stmt
        .query_map(params![limit], knowledge_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// All display notes, newest first
pub fn list_notes(conn: &Connection) -> Result<Vec<Note>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, knowledge_id, created_at
         FROM notes
         ORDER BY created_at DESC, id DESC",
    )?;
    let notes = stmt
        .query_map([], note_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(notes)
}

/// Display note written alongside a knowledge entry
pub fn get_note_for_knowledge(conn: &Connection, entry_id: RowId) -> Result<Option<Note>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, content, knowledge_id, created_at
         FROM notes WHERE knowledge_id = ? ORDER BY id LIMIT 1",
    )?;
    let mut rows = stmt.query_map(params![entry_id], note_from_row)?;
    Ok(rows.next().transpose()?)
}

/// Aggregate counts across all store tables
pub fn get_stats(conn: &Connection) -> Result<KnowledgeStats> {
    let count = |sql: &str| -> Result<i64> { Ok(conn.query_row(sql, [], |row| row.get(0))?) };

    let mut stmt = conn.prepare(
        "SELECT category, COUNT(*) AS n FROM project_knowledge
         GROUP BY category ORDER BY n DESC, category ASC",
    )?;
    let by_category = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<(String, i64)>>>()?;

    Ok(KnowledgeStats {
        total_entries: count("SELECT COUNT(*) FROM project_knowledge")?,
        total_notes: count("SELECT COUNT(*) FROM notes")?,
        active_instructions: count("SELECT COUNT(*) FROM project_instructions WHERE active = 1")?,
        context_keys: count("SELECT COUNT(*) FROM project_context")?,
        by_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;

    fn add(storage: &Storage, input: AddKnowledgeInput) -> KnowledgeRecord {
        storage
            .with_transaction(|conn| add_knowledge(conn, &input, &ProjectBinding::local()))
            .unwrap()
    }

    #[test]
    fn test_add_and_search_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        add(
            &storage,
            AddKnowledgeInput::new("T", "C", "technical")
                .with_tags(vec!["a".into(), "b".into()])
                .with_importance(4),
        );

        let results = storage
            .with_connection(|conn| search_knowledge(conn, "C", None))
            .unwrap();
        assert_eq!(results.len(), 1);
        let entry = &results[0];
        assert_eq!(entry.title, "T");
        assert_eq!(entry.content, "C");
        assert_eq!(entry.category, "technical");
        assert_eq!(entry.tags, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(entry.importance, 4);
        assert_eq!(entry.source, "conversation");
    }

    #[test]
    fn test_every_valid_importance_is_stored() {
        let storage = Storage::open_in_memory().unwrap();
        for i in MIN_RATING..=MAX_RATING {
            add(
                &storage,
                AddKnowledgeInput::new(format!("entry {}", i), "body", "misc").with_importance(i),
            );
        }
        let stored: Vec<i64> = storage
            .with_connection(list_all_knowledge)
            .unwrap()
            .into_iter()
            .map(|e| e.importance)
            .collect();
        assert_eq!(stored, vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_invalid_importance_writes_nothing() {
        let storage = Storage::open_in_memory().unwrap();
        for bad in [0, 6, -1] {
            let input = AddKnowledgeInput::new("T", "C", "misc").with_importance(bad);
            let err = storage
                .with_transaction(|conn| add_knowledge(conn, &input, &ProjectBinding::local()))
                .unwrap_err();
            assert!(matches!(err, LoreError::InvalidInput(_)));
        }
        let stats = storage.with_connection(get_stats).unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_notes, 0);
    }

    fn knowledge_rows(storage: &Storage) -> i64 {
        storage
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM project_knowledge", [], |r| r.get(0))?)
            })
            .unwrap()
    }

    #[test]
    fn test_failed_note_insert_rolls_back_entry() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .with_connection(|conn| Ok(conn.execute_batch("ALTER TABLE notes RENAME TO notes_moved")?))
            .unwrap();

        // No enclosing transaction: the savepoint alone must undo the first insert
        let input = AddKnowledgeInput::new("T", "C", "misc");
        let err = storage
            .with_connection(|conn| add_knowledge(conn, &input, &ProjectBinding::local()))
            .unwrap_err();
        assert!(matches!(err, LoreError::Database(_)));
        assert!(err.to_string().starts_with("Storage unavailable"));
        assert_eq!(knowledge_rows(&storage), 0);

        // The savepoint was released, so later writes are unaffected
        storage
            .with_connection(|conn| Ok(conn.execute_batch("ALTER TABLE notes_moved RENAME TO notes")?))
            .unwrap();
        add(&storage, AddKnowledgeInput::new("T", "C", "misc"));
        assert_eq!(knowledge_rows(&storage), 1);
    }

    #[test]
    fn test_ordering_breaks_ties_by_recency() {
        let storage = Storage::open_in_memory().unwrap();
        let first = add(&storage, AddKnowledgeInput::new("one", "x", "m").with_importance(5));
        let second = add(&storage, AddKnowledgeInput::new("two", "x", "m").with_importance(3));
        let third = add(&storage, AddKnowledgeInput::new("three", "x", "m").with_importance(5));

        let ids: Vec<RowId> = storage
            .with_connection(list_all_knowledge)
            .unwrap()
            .iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![third.entry_id, first.entry_id, second.entry_id]);
    }

    #[test]
    fn test_search_matches_title_tags_and_category_filter() {
        let storage = Storage::open_in_memory().unwrap();
        add(
            &storage,
            AddKnowledgeInput::new("Deploy process", "use the pipeline", "technical")
                .with_tags(vec!["ci".into()]),
        );
        add(&storage, AddKnowledgeInput::new("Colors", "Dark mode please", "preferences"));

        storage
            .with_connection(|conn| {
                assert_eq!(search_knowledge(conn, "deploy", None)?.len(), 1);
                assert_eq!(search_knowledge(conn, "\"ci\"", None)?.len(), 1);
                assert_eq!(search_knowledge(conn, "DARK", None)?.len(), 1);
                assert_eq!(search_knowledge(conn, "e", Some("preferences"))?.len(), 1);
                assert!(search_knowledge(conn, "dark", Some("technical"))?.is_empty());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let storage = Storage::open_in_memory().unwrap();
        add(&storage, AddKnowledgeInput::new("Coverage", "reached 100% today", "metrics"));
        add(&storage, AddKnowledgeInput::new("Naming", "snake_case everywhere", "style"));
        add(&storage, AddKnowledgeInput::new("Other", "nothing special", "misc"));

        storage
            .with_connection(|conn| {
                assert_eq!(search_knowledge(conn, "%", None)?.len(), 1);
                assert_eq!(search_knowledge(conn, "_", None)?.len(), 1);
                assert_eq!(search_knowledge(conn, "100%", None)?.len(), 1);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_note_shares_identifier_with_entry() {
        let storage = Storage::open_in_memory().unwrap();
        let binding = ProjectBinding {
            project_id: Some("p1".into()),
            project_name: Some("Dashboard".into()),
            api_key: None,
        };
        let input = AddKnowledgeInput::new("Stack", "Rust + SQLite", "technical")
            .with_tags(vec!["rust".into(), "db".into()])
            .with_importance(4);
        let record = storage
            .with_transaction(|conn| add_knowledge(conn, &input, &binding))
            .unwrap();

        let note = storage
            .with_connection(|conn| get_note_for_knowledge(conn, record.entry_id))
            .unwrap()
            .unwrap();
        assert_eq!(note.id, record.note_id);
        assert_eq!(note.title, "[Dashboard] Stack");
        assert_eq!(
            note.content,
            "Project: Dashboard\nCategory: technical\nImportance: 4/5\nTags: rust, db\nSource: conversation\n\nRust + SQLite"
        );
    }

    #[test]
    fn test_stats_by_category() {
        let storage = Storage::open_in_memory().unwrap();
        add(&storage, AddKnowledgeInput::new("a", "x", "technical"));
        add(&storage, AddKnowledgeInput::new("b", "x", "technical"));
        add(&storage, AddKnowledgeInput::new("c", "x", "business"));

        let stats = storage.with_connection(get_stats).unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.total_notes, 3);
        assert_eq!(
            stats.by_category,
            vec![("technical".to_string(), 2), ("business".to_string(), 1)]
        );
    }

    #[test]
    fn test_rows_written_by_other_applications_parse() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .with_connection(|conn| {
                conn.execute(
                    "INSERT INTO project_knowledge (title, content, category, tags)
                     VALUES ('legacy', 'body', 'misc', NULL)",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        let entries = storage.with_connection(list_all_knowledge).unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].tags.is_empty());
        assert_eq!(entries[0].importance, 3);
    }
}
