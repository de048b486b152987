//! Core types for Lore

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Row identifier shared by every table
pub type RowId = i64;

/// Lowest accepted importance / priority rating
pub const MIN_RATING: i64 = 1;
/// Highest accepted importance / priority rating
pub const MAX_RATING: i64 = 5;
/// Rating used when the caller does not supply one
pub const DEFAULT_RATING: i64 = 3;

/// Source recorded for knowledge added through the tool surface
pub const DEFAULT_SOURCE: &str = "conversation";

/// A display note, the human-readable projection of a knowledge entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: RowId,
    pub title: String,
    /// Formatted display string (metadata header followed by the raw content)
    pub content: String,
    /// Knowledge row written in the same transaction. `None` for notes that
    /// predate the link column or were written by another application.
    pub knowledge_id: Option<RowId>,
    pub created_at: DateTime<Utc>,
}

/// A structured knowledge entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub id: RowId,
    pub title: String,
    pub content: String,
    /// Free-form category such as "technical" or "preferences"
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Importance rating (1 = low, 5 = critical)
    pub importance: i64,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for adding knowledge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddKnowledgeInput {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_rating")]
    pub importance: i64,
    #[serde(default = "default_source")]
    pub source: String,
}

impl AddKnowledgeInput {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            category: category.into(),
            tags: vec![],
            importance: DEFAULT_RATING,
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = importance;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Reject input that must never reach the database
    pub fn validate(&self) -> Result<(), String> {
        require_non_empty("title", &self.title)?;
        require_non_empty("content", &self.content)?;
        validate_rating("importance", self.importance)?;
        Ok(())
    }
}

/// Identifiers produced by a single add-knowledge transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRecord {
    /// Display note id, the human-facing reference
    pub note_id: RowId,
    pub entry_id: RowId,
}

/// A behavioral instruction section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionSection {
    pub id: RowId,
    /// Section key, e.g. "context", "guidelines", "constraints"
    pub section: String,
    pub content: String,
    pub priority: i64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A key/value context entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Value side of the keyed context mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextValue {
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate counts over the knowledge table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KnowledgeStats {
    pub total_entries: i64,
    pub total_notes: i64,
    pub active_instructions: i64,
    pub context_keys: i64,
    /// (category, count) ordered by count descending
    pub by_category: Vec<(String, i64)>,
}

/// External project the server is bound to, supplied at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectBinding {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    /// Credential for the bound project. Never rendered, only reported as present.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl ProjectBinding {
    pub fn local() -> Self {
        Self::default()
    }

    pub fn is_bound(&self) -> bool {
        self.project_id.is_some()
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Name shown in display notes and reports
    pub fn display_name(&self) -> &str {
        self.project_name.as_deref().unwrap_or("Local")
    }

    /// Human-readable storage mode
    pub fn mode_label(&self) -> &'static str {
        if self.is_bound() {
            "Bound project + Local"
        } else {
            "Local only"
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to SQLite database
    pub db_path: String,
    /// Storage mode (local or cloud-safe)
    #[serde(default)]
    pub storage_mode: StorageMode,
}

impl StorageConfig {
    pub fn new(db_path: impl Into<String>, storage_mode: StorageMode) -> Self {
        Self {
            db_path: db_path.into(),
            storage_mode,
        }
    }
}

/// Storage mode for SQLite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    #[default]
    Local,
    CloudSafe,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Local => "local",
            StorageMode::CloudSafe => "cloud-safe",
        }
    }
}

impl std::str::FromStr for StorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageMode::Local),
            "cloud-safe" | "cloudsafe" => Ok(StorageMode::CloudSafe),
            _ => Err(format!("Unknown storage mode: {}", s)),
        }
    }
}

/// Default database location under the platform's local data directory
pub fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|dir| dir.join("lore").join("knowledge.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("knowledge.db"))
        .to_string_lossy()
        .to_string()
}

/// Validate an importance or priority value
pub fn validate_rating(field: &str, value: i64) -> Result<i64, String> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "{} must be between {} and {}, got {}",
            field, MIN_RATING, MAX_RATING, value
        ))
    }
}

/// Reject empty or whitespace-only strings
pub fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} must not be empty", field))
    } else {
        Ok(())
    }
}

/// Current time in the fixed-width form stored in every timestamp column.
///
/// Microsecond precision with a `Z` suffix keeps lexical and chronological
/// order identical, which the `ORDER BY created_at` queries rely on.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp. Accepts RFC 3339 as well as SQLite's
/// `CURRENT_TIMESTAMP` form written by other applications.
///
/// Anything else maps to the Unix epoch with a warning, so a corrupt row
/// sorts as oldest instead of posing as fresh.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::warn!(raw, error = %e, "Unparseable stored timestamp, using epoch");
            DateTime::<Utc>::UNIX_EPOCH
        })
}

/// Truncate to `max_chars` characters, appending "..." when anything was cut
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

fn default_rating() -> i64 {
    DEFAULT_RATING
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}
