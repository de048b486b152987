//! Context block generation
//!
//! Builds the bounded text block that gets spliced into external documents.
//! The layout is a compatibility contract with documents spliced earlier:
//!
//! ```text
//! {prefix}
//!
//! Recent topics you remember include: t1, t2
//!
//! Important long-term memories include:
//! - {content, at most 100 characters then "..."}
//!
//! {USAGE_HINT}
//! ```
//!
//! The topics line and the memories block are omitted when empty.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::Result;
use crate::storage::queries::{list_all_knowledge, list_recent_knowledge};
use crate::storage::Storage;
use crate::types::truncate_chars;

/// Default opening line of the block
pub const DEFAULT_PREFIX: &str = "This is your persistent memory context for this project.";

/// Closing sentence of every block
pub const USAGE_HINT: &str = "Use this context to keep continuity with previous conversations, but defer to the user when they say something has changed.";

/// Longest memory line before truncation
pub const MAX_MEMORY_CHARS: usize = 100;

/// Minimum importance for a stored entry to count as a long-term memory
const IMPORTANT_THRESHOLD: i64 = 4;

/// Rendered block contents
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextBlock {
    pub prefix: String,
    pub topics: Vec<String>,
    pub memories: Vec<String>,
}

impl ContextBlock {
    pub fn render(&self) -> String {
        let mut parts = vec![self.prefix.clone()];

        if !self.topics.is_empty() {
            parts.push(format!(
                "Recent topics you remember include: {}",
                self.topics.join(", ")
            ));
        }

        if !self.memories.is_empty() {
            let lines: Vec<String> = self
                .memories
                .iter()
                .map(|m| format!("- {}", truncate_chars(m, MAX_MEMORY_CHARS)))
                .collect();
            parts.push(format!(
                "Important long-term memories include:\n{}",
                lines.join("\n")
            ));
        }

        parts.push(USAGE_HINT.to_string());
        parts.join("\n\n")
    }
}

/// Where topics and memories come from
pub trait RecallSource: Send + Sync {
    /// Recently discussed topics, most recent first
    fn recent_topics(&self, limit: usize) -> Result<Vec<String>>;

    /// Content of important long-term memories
    fn important_memories(&self, limit: usize) -> Result<Vec<String>>;

    /// Short label for logs
    fn name(&self) -> &str;
}

/// Recall from the local knowledge store
pub struct StoreRecall {
    storage: Storage,
}

impl StoreRecall {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }
}

impl RecallSource for StoreRecall {
    fn recent_topics(&self, limit: usize) -> Result<Vec<String>> {
        let recent = self
            .storage
            .with_connection(|conn| list_recent_knowledge(conn, (limit * 4) as i64))?;

        let mut seen = HashSet::new();
        let mut topics = Vec::new();
        for entry in &recent {
            let candidates = std::iter::once(&entry.category).chain(entry.tags.iter());
            for topic in candidates {
                let topic = topic.trim();
                if !topic.is_empty() && seen.insert(topic.to_lowercase()) {
                    topics.push(topic.to_string());
                }
            }
        }
        topics.truncate(limit);
        Ok(topics)
    }

    fn important_memories(&self, limit: usize) -> Result<Vec<String>> {
        let entries = self.storage.with_connection(list_all_knowledge)?;
        Ok(entries
            .into_iter()
            .filter(|e| e.importance >= IMPORTANT_THRESHOLD)
            .take(limit)
            .map(|e| e.content)
            .collect())
    }

    fn name(&self) -> &str {
        "store"
    }
}

#[derive(Debug, Deserialize)]
struct RecallSnapshot {
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    memories: Vec<RecalledMemory>,
}

#[derive(Debug, Deserialize)]
struct RecalledMemory {
    content: String,
}

/// Recall from a JSON snapshot exported by a memory backend:
/// `{"topics": ["..."], "memories": [{"content": "..."}]}`
pub struct JsonFileRecall {
    path: PathBuf,
}

impl JsonFileRecall {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<RecallSnapshot> {
        let raw = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl RecallSource for JsonFileRecall {
    fn recent_topics(&self, limit: usize) -> Result<Vec<String>> {
        let mut topics = self.load()?.topics;
        topics.truncate(limit);
        Ok(topics)
    }

    fn important_memories(&self, limit: usize) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .memories
            .into_iter()
            .take(limit)
            .map(|m| m.content)
            .collect())
    }

    fn name(&self) -> &str {
        "json-file"
    }
}

/// Builds blocks from a recall source. Recall failures degrade to empty
/// sections; generation itself never fails.
pub struct ContextGenerator {
    source: Box<dyn RecallSource>,
    prefix: String,
    max_topics: usize,
    max_memories: usize,
}

impl ContextGenerator {
    pub fn new(source: Box<dyn RecallSource>) -> Self {
        Self {
            source,
            prefix: DEFAULT_PREFIX.to_string(),
            max_topics: 10,
            max_memories: 10,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_limits(mut self, max_topics: usize, max_memories: usize) -> Self {
        self.max_topics = max_topics;
        self.max_memories = max_memories;
        self
    }

    pub fn generate(&self) -> ContextBlock {
        let topics = self
            .source
            .recent_topics(self.max_topics)
            .unwrap_or_else(|e| {
                tracing::warn!(source = self.source.name(), "topic recall failed: {}", e);
                Vec::new()
            });
        let memories = self
            .source
            .important_memories(self.max_memories)
            .unwrap_or_else(|e| {
                tracing::warn!(source = self.source.name(), "memory recall failed: {}", e);
                Vec::new()
            });

        ContextBlock {
            prefix: self.prefix.clone(),
            topics,
            memories,
        }
    }
}
