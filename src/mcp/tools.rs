//! MCP tool definitions for Lore

use serde_json::json;

use super::protocol::ToolDefinition;

/// All tool definitions: (name, description, JSON schema)
pub const TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    (
        "add_knowledge",
        "Add new knowledge to the current project. Use this when you learn something important that should be remembered for future conversations.",
        r#"{
            "type": "object",
            "properties": {
                "title": {"type": "string", "description": "Clear, descriptive title for this knowledge"},
                "content": {"type": "string", "description": "Detailed content of the knowledge"},
                "category": {"type": "string", "description": "Category like 'technical', 'business', 'preferences', 'constraints'"},
                "tags": {"type": "array", "items": {"type": "string"}, "default": [], "description": "Tags for organization"},
                "importance": {"type": "integer", "minimum": 1, "maximum": 5, "default": 3, "description": "Importance level (1=low, 5=critical)"}
            },
            "required": ["title", "content", "category"]
        }"#,
    ),
    (
        "update_instructions",
        "Update or add an instruction section for this project. Use this to change how the assistant should behave in this project.",
        r#"{
            "type": "object",
            "properties": {
                "section": {"type": "string", "description": "Instruction section like 'context', 'guidelines', 'constraints', 'objectives'"},
                "content": {"type": "string", "description": "The instruction content"},
                "priority": {"type": "integer", "minimum": 1, "maximum": 5, "default": 3, "description": "Priority level (1=low, 5=critical)"}
            },
            "required": ["section", "content"]
        }"#,
    ),
    (
        "search_knowledge",
        "Search existing project knowledge (case-insensitive substring match on title, content and tags). Check here before adding duplicate information.",
        r#"{
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "Search query"},
                "category": {"type": "string", "description": "Optional exact category filter"}
            },
            "required": ["query"]
        }"#,
    ),
    (
        "overview",
        "Get a complete overview of current project context, instructions and knowledge.",
        r#"{
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }"#,
    ),
    (
        "update_context",
        "Update dynamic project context (current focus, active task, last discussion). Overwrites any existing value for the key.",
        r#"{
            "type": "object",
            "properties": {
                "key": {"type": "string", "description": "Context key like 'current_focus', 'active_task', 'last_discussion'"},
                "value": {"type": "string", "description": "Current value"},
                "description": {"type": "string", "description": "Optional description of this context"}
            },
            "required": ["key", "value"]
        }"#,
    ),
    (
        "suggest_improvements",
        "Analyze a conversation summary against stored knowledge and instructions and suggest improvements.",
        r#"{
            "type": "object",
            "properties": {
                "conversation_summary": {"type": "string", "description": "Summary of the current conversation"},
                "focus_areas": {"type": "array", "items": {"type": "string"}, "default": [], "description": "Areas to focus suggestions on"}
            },
            "required": ["conversation_summary"]
        }"#,
    ),
    (
        "list_display_notes",
        "List the display notes written alongside knowledge entries, as a desktop UI would show them.",
        r#"{
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }"#,
    ),
    (
        "check_context_status",
        "Show which project (if any) this server is bound to and how knowledge is stored.",
        r#"{
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }"#,
    ),
];

/// Get all tool definitions as ToolDefinition structs
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    TOOL_DEFINITIONS
        .iter()
        .map(|(name, description, schema)| ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::from_str(schema).unwrap_or(json!({})),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::dispatch::TOOL_NAMES;

    #[test]
    fn test_schemas_parse() {
        for (name, _, schema) in TOOL_DEFINITIONS {
            let parsed: serde_json::Value = serde_json::from_str(schema)
                .unwrap_or_else(|e| panic!("schema for {name} is invalid: {e}"));
            assert_eq!(parsed["type"], "object");
        }
    }

    #[test]
    fn test_definitions_match_dispatch() {
        let defined: Vec<&str> = TOOL_DEFINITIONS.iter().map(|(n, _, _)| *n).collect();
        assert_eq!(defined, TOOL_NAMES);
    }
}
