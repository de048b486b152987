//! Text rendering of tool results
//!
//! Every tool answers with a single text block. These functions are pure so
//! the exact wording can be tested without a database.

use std::fmt::Write;

use crate::types::*;

/// Search results shown before the remainder is summarized
pub const SEARCH_RESULT_LIMIT: usize = 5;
/// Content preview length in search results
pub const SEARCH_PREVIEW_CHARS: usize = 200;
/// Entries listed per category in the overview
pub const OVERVIEW_PER_CATEGORY: usize = 3;
/// Content preview length for display notes
pub const NOTE_PREVIEW_CHARS: usize = 300;

/// Storage facts reported by `check_context_status`
#[derive(Debug, Clone)]
pub struct StorageStatus {
    pub db_path: String,
    pub storage_mode: StorageMode,
    pub journal_mode: String,
    pub schema_version: i32,
}

/// Capitalize the first letter of every alphabetic run ("user_prefs" -> "User_Prefs")
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn render_added(
    input: &AddKnowledgeInput,
    record: &KnowledgeRecord,
    binding: &ProjectBinding,
) -> String {
    format!(
        "Added knowledge '{}' (note #{}, entry #{})\nProject: {}\nCategory: {} | Importance: {}/5\nTags: {}\nStorage: {}",
        input.title,
        record.note_id,
        record.entry_id,
        binding.display_name(),
        input.category,
        input.importance,
        input.tags.join(", "),
        binding.mode_label()
    )
}

pub fn render_instruction_updated(section: &str, priority: i64) -> String {
    format!(
        "Updated instructions for section '{}' with priority {}",
        section, priority
    )
}

pub fn render_context_updated(key: &str, value: &str) -> String {
    format!("Updated project context '{}' = '{}'", key, value)
}

pub fn render_search(query: &str, results: &[KnowledgeEntry]) -> String {
    if results.is_empty() {
        return format!("No project knowledge found for query: '{}'", query);
    }

    let mut out = format!(
        "Found {} knowledge entries for '{}':\n\n",
        results.len(),
        query
    );
    for item in results.iter().take(SEARCH_RESULT_LIMIT) {
        let _ = writeln!(
            out,
            "**{}** ({}, importance: {})",
            item.title, item.category, item.importance
        );
        let _ = writeln!(out, "{}", truncate_chars(&item.content, SEARCH_PREVIEW_CHARS));
        let _ = writeln!(out, "Tags: {}\n", item.tags.join(", "));
    }
    if results.len() > SEARCH_RESULT_LIMIT {
        let _ = writeln!(out, "... and {} more", results.len() - SEARCH_RESULT_LIMIT);
    }
    out
}

pub fn render_overview(
    context: &[ContextEntry],
    instructions: &[InstructionSection],
    knowledge: &[KnowledgeEntry],
) -> String {
    let mut out = String::from("# Project Overview\n\n");

    if !context.is_empty() {
        out.push_str("## Current Context\n");
        for entry in context {
            let _ = writeln!(out, "- **{}**: {}", entry.key, entry.value);
            if let Some(description) = entry.description.as_deref().filter(|d| !d.is_empty()) {
                let _ = writeln!(out, "  _{}_", description);
            }
        }
        out.push('\n');
    }

    if !instructions.is_empty() {
        out.push_str("## Project Instructions\n");
        for inst in instructions {
            let _ = writeln!(
                out,
                "### {} (Priority: {})",
                title_case(&inst.section),
                inst.priority
            );
            let _ = writeln!(out, "{}\n", inst.content);
        }
    }

    if knowledge.is_empty() {
        out.push_str("## Knowledge Summary\nNo project knowledge stored yet.\n\n");
        return out;
    }

    // Group by category, keeping the ranking order of first appearance
    let mut groups: Vec<(&str, Vec<&KnowledgeEntry>)> = Vec::new();
    for item in knowledge {
        match groups.iter_mut().find(|(cat, _)| *cat == item.category) {
            Some((_, items)) => items.push(item),
            None => groups.push((item.category.as_str(), vec![item])),
        }
    }

    out.push_str("## Knowledge Summary\n");
    for (category, items) in groups {
        let _ = writeln!(out, "### {} ({} items)", title_case(category), items.len());
        for item in items.iter().take(OVERVIEW_PER_CATEGORY) {
            let _ = writeln!(out, "- **{}** (importance: {})", item.title, item.importance);
        }
        if items.len() > OVERVIEW_PER_CATEGORY {
            let _ = writeln!(out, "- ... and {} more", items.len() - OVERVIEW_PER_CATEGORY);
        }
        out.push('\n');
    }

    out
}

pub fn render_suggestions(
    suggestions: &[String],
    knowledge_count: usize,
    instruction_count: usize,
) -> String {
    let mut out = String::from("# Project Improvement Suggestions\n\n");
    for (i, suggestion) in suggestions.iter().enumerate() {
        let _ = writeln!(out, "{}. {}", i + 1, suggestion);
    }
    let _ = write!(
        out,
        "\nBased on analysis of {} knowledge entries and {} instruction sections.",
        knowledge_count, instruction_count
    );
    out
}

pub fn render_notes(notes: &[Note]) -> String {
    if notes.is_empty() {
        return "No display notes found.".to_string();
    }

    let mut out = format!("# Display Notes ({} entries)\n\n", notes.len());
    for note in notes {
        let _ = writeln!(out, "## {}", note.title);
        let _ = writeln!(
            out,
            "**Created:** {}\n",
            note.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        let _ = writeln!(out, "{}\n\n---\n", truncate_chars(&note.content, NOTE_PREVIEW_CHARS));
    }
    out
}

pub fn render_status(binding: &ProjectBinding, storage: &StorageStatus) -> String {
    let mut out = String::from("# Project Context Status\n\n");
    let _ = writeln!(out, "**Current Project**: {}", binding.display_name());
    let _ = writeln!(
        out,
        "**Project ID**: {}",
        binding.project_id.as_deref().unwrap_or("None")
    );
    let _ = writeln!(
        out,
        "**Credential**: {}",
        if binding.has_credential() {
            "Configured"
        } else {
            "Not configured"
        }
    );
    let _ = writeln!(out, "**Storage Mode**: {}", binding.mode_label());
    let _ = writeln!(out, "**Database**: {}", storage.db_path);
    let _ = writeln!(
        out,
        "**Journal**: {} ({} mode, schema v{})",
        storage.journal_mode,
        storage.storage_mode.as_str(),
        storage.schema_version
    );
    out.push('\n');

    if binding.is_bound() {
        out.push_str(
            "Knowledge is stored locally and tagged with the bound project name.",
        );
    } else {
        out.push_str(
            "No project binding. Set LORE_PROJECT_ID and LORE_PROJECT_NAME in the server \
             environment to bind this server to a project.",
        );
    }
    out
}
