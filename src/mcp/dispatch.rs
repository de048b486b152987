//! Tool call parsing
//!
//! Each tool name maps to one `ToolCall` variant carrying its own argument
//! struct, so argument validation happens once, before any store access.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{LoreError, Result};
use crate::types::{require_non_empty, validate_rating, AddKnowledgeInput, DEFAULT_RATING};

/// Every tool name accepted by `ToolCall::parse`, in definition order
pub const TOOL_NAMES: &[&str] = &[
    "add_knowledge",
    "update_instructions",
    "search_knowledge",
    "overview",
    "update_context",
    "suggest_improvements",
    "list_display_notes",
    "check_context_status",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddKnowledgeArgs {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_rating")]
    pub importance: i64,
}

impl From<AddKnowledgeArgs> for AddKnowledgeInput {
    fn from(args: AddKnowledgeArgs) -> Self {
        AddKnowledgeInput::new(args.title, args.content, args.category)
            .with_tags(args.tags)
            .with_importance(args.importance)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateInstructionsArgs {
    pub section: String,
    pub content: String,
    #[serde(default = "default_rating")]
    pub priority: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchKnowledgeArgs {
    pub query: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UpdateContextArgs {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SuggestImprovementsArgs {
    pub conversation_summary: String,
    #[serde(default)]
    pub focus_areas: Vec<String>,
}

/// A validated tool invocation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    AddKnowledge(AddKnowledgeArgs),
    UpdateInstructions(UpdateInstructionsArgs),
    SearchKnowledge(SearchKnowledgeArgs),
    Overview,
    UpdateContext(UpdateContextArgs),
    SuggestImprovements(SuggestImprovementsArgs),
    ListDisplayNotes,
    CheckContextStatus,
}

impl ToolCall {
    /// Validate `arguments` against the schema of tool `name`
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            Value::Object(map) => Value::Object(map),
            other => {
                return Err(LoreError::InvalidInput(format!(
                    "arguments for '{}' must be an object, got {}",
                    name, other
                )))
            }
        };

        let call = match name {
            "add_knowledge" => {
                let args: AddKnowledgeArgs = decode(name, arguments)?;
                require_non_empty("title", &args.title).map_err(LoreError::InvalidInput)?;
                require_non_empty("content", &args.content).map_err(LoreError::InvalidInput)?;
                validate_rating("importance", args.importance).map_err(LoreError::InvalidInput)?;
                ToolCall::AddKnowledge(args)
            }
            "update_instructions" => {
                let args: UpdateInstructionsArgs = decode(name, arguments)?;
                require_non_empty("section", &args.section).map_err(LoreError::InvalidInput)?;
                require_non_empty("content", &args.content).map_err(LoreError::InvalidInput)?;
                validate_rating("priority", args.priority).map_err(LoreError::InvalidInput)?;
                ToolCall::UpdateInstructions(args)
            }
            "search_knowledge" => ToolCall::SearchKnowledge(decode(name, arguments)?),
            "overview" => ToolCall::Overview,
            "update_context" => {
                let args: UpdateContextArgs = decode(name, arguments)?;
                require_non_empty("key", &args.key).map_err(LoreError::InvalidInput)?;
                ToolCall::UpdateContext(args)
            }
            "suggest_improvements" => ToolCall::SuggestImprovements(decode(name, arguments)?),
            "list_display_notes" => ToolCall::ListDisplayNotes,
            "check_context_status" => ToolCall::CheckContextStatus,
            other => return Err(LoreError::UnsupportedTool(other.to_string())),
        };

        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::AddKnowledge(_) => "add_knowledge",
            ToolCall::UpdateInstructions(_) => "update_instructions",
            ToolCall::SearchKnowledge(_) => "search_knowledge",
            ToolCall::Overview => "overview",
            ToolCall::UpdateContext(_) => "update_context",
            ToolCall::SuggestImprovements(_) => "suggest_improvements",
            ToolCall::ListDisplayNotes => "list_display_notes",
            ToolCall::CheckContextStatus => "check_context_status",
        }
    }
}

fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|e| LoreError::InvalidInput(format!("invalid arguments for '{}': {}", tool, e)))
}

fn default_rating() -> i64 {
    DEFAULT_RATING
}
