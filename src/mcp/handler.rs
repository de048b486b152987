//! Tool execution against the knowledge store

use serde_json::{json, Value};

use super::dispatch::ToolCall;
use super::protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, ToolCallResult,
};
use super::render::{self, StorageStatus};
use super::tools::get_tool_definitions;
use crate::error::Result;
use crate::intelligence::{suggest_improvements, ImprovementInput};
use crate::storage::context_queries::{list_context, update_context};
use crate::storage::instruction_queries::{list_active_instructions, update_instruction};
use crate::storage::queries::{add_knowledge, list_all_knowledge, list_notes, search_knowledge};
use crate::storage::{Storage, SCHEMA_VERSION};
use crate::types::{AddKnowledgeInput, ProjectBinding};

/// Executes a validated tool call and renders its text result
pub trait ToolDispatcher {
    fn dispatch(&self, call: ToolCall) -> Result<String>;
}

/// MCP request handler backed by one `Storage`
pub struct KnowledgeHandler {
    storage: Storage,
    binding: ProjectBinding,
}

impl KnowledgeHandler {
    pub fn new(storage: Storage, binding: ProjectBinding) -> Self {
        Self { storage, binding }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn binding(&self) -> &ProjectBinding {
        &self.binding
    }

    /// Parse and run a tool call, mapping the outcome onto MCP shapes.
    ///
    /// Caller mistakes become JSON-RPC errors; backend failures become a
    /// tool result flagged `isError` so the client can show the message.
    pub fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolCallResult> {
        let call = ToolCall::parse(name, arguments)?;
        match self.dispatch(call) {
            Ok(text) => Ok(ToolCallResult::text(text)),
            Err(e) if e.is_validation() => Err(e),
            Err(e) => {
                tracing::error!(tool = name, error = %e, "tool call failed");
                Ok(ToolCallResult::error(e.to_string()))
            }
        }
    }

    fn overview(&self) -> Result<String> {
        self.storage.with_connection(|conn| {
            let context = list_context(conn)?;
            let instructions = list_active_instructions(conn)?;
            let knowledge = list_all_knowledge(conn)?;
            Ok(render::render_overview(&context, &instructions, &knowledge))
        })
    }

    fn status(&self) -> Result<String> {
        let status = StorageStatus {
            db_path: self.storage.db_path().to_string(),
            storage_mode: self.storage.storage_mode(),
            journal_mode: self.storage.journal_mode()?,
            schema_version: SCHEMA_VERSION,
        };
        Ok(render::render_status(&self.binding, &status))
    }
}

impl ToolDispatcher for KnowledgeHandler {
    fn dispatch(&self, call: ToolCall) -> Result<String> {
        tracing::debug!(tool = call.name(), "dispatching tool call");

        match call {
            ToolCall::AddKnowledge(args) => {
                let input = AddKnowledgeInput::from(args);
                let record = self
                    .storage
                    .with_transaction(|conn| add_knowledge(conn, &input, &self.binding))?;
                tracing::info!(
                    note_id = record.note_id,
                    entry_id = record.entry_id,
                    category = %input.category,
                    "knowledge added"
                );
                Ok(render::render_added(&input, &record, &self.binding))
            }
            ToolCall::UpdateInstructions(args) => {
                self.storage.with_transaction(|conn| {
                    update_instruction(conn, &args.section, &args.content, args.priority)
                })?;
                Ok(render::render_instruction_updated(&args.section, args.priority))
            }
            ToolCall::SearchKnowledge(args) => {
                let results = self.storage.with_connection(|conn| {
                    search_knowledge(conn, &args.query, args.category.as_deref())
                })?;
                Ok(render::render_search(&args.query, &results))
            }
            ToolCall::Overview => self.overview(),
            ToolCall::UpdateContext(args) => {
                self.storage.with_connection(|conn| {
                    update_context(conn, &args.key, &args.value, args.description.as_deref())
                })?;
                Ok(render::render_context_updated(&args.key, &args.value))
            }
            ToolCall::SuggestImprovements(args) => {
                let (knowledge, instructions) = self.storage.with_connection(|conn| {
                    Ok((list_all_knowledge(conn)?, list_active_instructions(conn)?))
                })?;
                let suggestions = suggest_improvements(&ImprovementInput {
                    knowledge: &knowledge,
                    instructions: &instructions,
                    conversation_summary: &args.conversation_summary,
                    focus_areas: &args.focus_areas,
                });
                Ok(render::render_suggestions(
                    &suggestions,
                    knowledge.len(),
                    instructions.len(),
                ))
            }
            ToolCall::ListDisplayNotes => {
                let notes = self.storage.with_connection(list_notes)?;
                Ok(render::render_notes(&notes))
            }
            ToolCall::CheckContextStatus => self.status(),
        }
    }
}

impl McpHandler for KnowledgeHandler {
    fn handle_request(&self, request: McpRequest) -> McpResponse {
        match request.method.as_str() {
            methods::INITIALIZE => {
                let result = InitializeResult::default();
                McpResponse::success(request.id, json!(result))
            }
            methods::INITIALIZED | methods::PING => McpResponse::success(request.id, json!({})),
            methods::LIST_TOOLS => {
                let tools = get_tool_definitions();
                McpResponse::success(request.id, json!({ "tools": tools }))
            }
            methods::CALL_TOOL => {
                let name = request
                    .params
                    .get("name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("");
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(Value::Null);

                match self.call_tool(name, arguments) {
                    Ok(result) => McpResponse::success(request.id, json!(result)),
                    Err(e) => McpResponse::from_error(request.id, e),
                }
            }
            _ => McpResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intelligence::WELL_ORGANIZED;

    fn handler() -> KnowledgeHandler {
        KnowledgeHandler::new(Storage::open_in_memory().unwrap(), ProjectBinding::local())
    }

    fn call(handler: &KnowledgeHandler, name: &str, args: Value) -> String {
        let result = handler.call_tool(name, args).unwrap();
        assert_eq!(result.is_error, None, "tool {name} failed");
        result.first_text().unwrap().to_string()
    }

    fn request(method: &str, params: Value) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".into(),
            id: Some(json!(1)),
            method: method.into(),
            params,
        }
    }

    #[test]
    fn test_add_then_search() {
        let h = handler();
        let text = call(
            &h,
            "add_knowledge",
            json!({"title": "T", "content": "C", "category": "technical", "importance": 4}),
        );
        assert!(text.starts_with("Added knowledge 'T' (note #1, entry #1)"));
        assert!(text.contains("Storage: Local only"));

        let text = call(&h, "search_knowledge", json!({"query": "c"}));
        assert!(text.starts_with("Found 1 knowledge entries for 'c':"));
        assert!(text.contains("**T** (technical, importance: 4)"));
    }

    #[test]
    fn test_search_miss() {
        let h = handler();
        let text = call(&h, "search_knowledge", json!({"query": "zzz"}));
        assert_eq!(text, "No project knowledge found for query: 'zzz'");
    }

    #[test]
    fn test_instructions_upsert_in_overview() {
        let h = handler();
        call(
            &h,
            "update_instructions",
            json!({"section": "guidelines", "content": "v1"}),
        );
        let text = call(
            &h,
            "update_instructions",
            json!({"section": "guidelines", "content": "v2", "priority": 5}),
        );
        assert_eq!(
            text,
            "Updated instructions for section 'guidelines' with priority 5"
        );

        let overview = call(&h, "overview", json!({}));
        assert!(overview.contains("### Guidelines (Priority: 5)\nv2"));
        assert!(!overview.contains("v1"));
    }

    #[test]
    fn test_context_overwrite() {
        let h = handler();
        call(&h, "update_context", json!({"key": "current_focus", "value": "a"}));
        let text = call(&h, "update_context", json!({"key": "current_focus", "value": "b"}));
        assert_eq!(text, "Updated project context 'current_focus' = 'b'");
        let overview = call(&h, "overview", Value::Null);
        assert!(overview.contains("- **current_focus**: b"));
        assert!(!overview.contains("- **current_focus**: a"));
    }

    #[test]
    fn test_suggestions_on_empty_store() {
        let h = handler();
        let text = call(
            &h,
            "suggest_improvements",
            json!({"conversation_summary": "nothing notable"}),
        );
        assert!(text.contains(&format!("1. {}", WELL_ORGANIZED)));
        assert!(text.ends_with("Based on analysis of 0 knowledge entries and 0 instruction sections."));
    }

    #[test]
    fn test_notes_listing() {
        let h = handler();
        assert_eq!(call(&h, "list_display_notes", json!({})), "No display notes found.");
        call(
            &h,
            "add_knowledge",
            json!({"title": "T", "content": "C", "category": "technical"}),
        );
        let text = call(&h, "list_display_notes", json!({}));
        assert!(text.starts_with("# Display Notes (1 entries)\n\n## T\n"));
    }

    #[test]
    fn test_status_reports_binding() {
        let h = KnowledgeHandler::new(
            Storage::open_in_memory().unwrap(),
            ProjectBinding {
                project_id: Some("p1".into()),
                project_name: Some("Atlas".into()),
                api_key: None,
            },
        );
        let text = call(&h, "check_context_status", json!({}));
        assert!(text.contains("**Current Project**: Atlas"));
        assert!(text.contains("**Credential**: Not configured"));
        assert!(text.contains("Bound project + Local"));
    }

    #[test]
    fn test_invalid_importance_writes_nothing() {
        let h = handler();
        let err = h
            .call_tool(
                "add_knowledge",
                json!({"title": "T", "content": "C", "category": "x", "importance": 9}),
            )
            .unwrap_err();
        assert_eq!(err.code(), -32602);
        let stats = h
            .storage()
            .with_connection(crate::storage::queries::get_stats)
            .unwrap();
        assert_eq!(stats.total_entries, 0);
        assert_eq!(stats.total_notes, 0);
    }

    #[test]
    fn test_add_knowledge_is_atomic_when_notes_unavailable() {
        let h = handler();
        h.storage()
            .with_connection(|conn| Ok(conn.execute_batch("DROP TABLE notes")?))
            .unwrap();

        let result = h
            .call_tool(
                "add_knowledge",
                json!({"title": "T", "content": "C", "category": "technical"}),
            )
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        assert!(result.first_text().unwrap().starts_with("Storage unavailable"));

        let rows: i64 = h
            .storage()
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM project_knowledge", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_mcp_error_mapping() {
        let h = handler();
        let resp = h.handle_request(request(
            methods::CALL_TOOL,
            json!({"name": "delete_everything", "arguments": {}}),
        ));
        assert_eq!(resp.error.unwrap().code, -32601);

        let resp = h.handle_request(request(
            methods::CALL_TOOL,
            json!({"name": "update_context", "arguments": {"key": "k"}}),
        ));
        assert_eq!(resp.error.unwrap().code, -32602);

        let resp = h.handle_request(request("resources/list", json!({})));
        assert_eq!(resp.error.unwrap().code, -32601);
    }

    #[test]
    fn test_mcp_list_tools() {
        let h = handler();
        let resp = h.handle_request(request(methods::LIST_TOOLS, json!({})));
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 8);
    }

    #[test]
    fn test_mcp_call_success_shape() {
        let h = handler();
        let resp = h.handle_request(request(
            methods::CALL_TOOL,
            json!({"name": "overview"}),
        ));
        let result = resp.result.unwrap();
        assert_eq!(result["content"][0]["type"], "text");
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("No project knowledge stored yet."));
        assert!(result.get("isError").is_none());
    }
}
