//! End-to-end MCP sessions over the line-delimited stdio loop
//!
//! Run with: cargo test --test mcp_session_tests

use std::io::Cursor;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use lore::mcp::{KnowledgeHandler, McpServer};
use lore::storage::Storage;
use lore::types::{ProjectBinding, StorageConfig, StorageMode};

fn run_session(handler: KnowledgeHandler, requests: &[Value]) -> Vec<Value> {
    let input: String = requests
        .iter()
        .map(|r| format!("{}\n", r))
        .collect();
    let mut output = Vec::new();
    McpServer::new(handler)
        .serve(Cursor::new(input.into_bytes()), &mut output)
        .unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn tool_call(id: i64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    })
}

fn text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

#[test]
fn test_full_session() {
    let handler = KnowledgeHandler::new(
        Storage::open_in_memory().unwrap(),
        ProjectBinding {
            project_id: Some("p-7".into()),
            project_name: Some("Atlas".into()),
            api_key: Some("secret".into()),
        },
    );

    let responses = run_session(
        handler,
        &[
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"}),
            json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
            tool_call(
                3,
                "add_knowledge",
                json!({"title": "Stack", "content": "Rust and SQLite", "category": "technical",
                       "tags": ["rust"], "importance": 5}),
            ),
            tool_call(4, "search_knowledge", json!({"query": "sqlite"})),
            tool_call(5, "list_display_notes", json!({})),
            tool_call(6, "check_context_status", json!({})),
        ],
    );

    // The notification gets no response
    assert_eq!(responses.len(), 6);
    assert_eq!(responses[0]["result"]["serverInfo"]["name"], "lore");

    let names: Vec<&str> = responses[1]["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, lore::mcp::TOOL_NAMES);

    assert_eq!(
        text(&responses[2]),
        "Added knowledge 'Stack' (note #1, entry #1)\nProject: Atlas\nCategory: technical | Importance: 5/5\nTags: rust\nStorage: Bound project + Local"
    );
    assert!(text(&responses[3]).starts_with("Found 1 knowledge entries for 'sqlite':"));

    let notes = text(&responses[4]);
    assert!(notes.contains("## [Atlas] Stack"));
    assert!(notes.contains("Project: Atlas\nCategory: technical\nImportance: 5/5"));

    let status = text(&responses[5]);
    assert!(status.contains("**Credential**: Configured"));
    assert!(!status.contains("secret"));
}

#[test]
fn test_errors_do_not_end_session() {
    let handler =
        KnowledgeHandler::new(Storage::open_in_memory().unwrap(), ProjectBinding::local());

    let responses = run_session(
        handler,
        &[
            tool_call(1, "no_such_tool", json!({})),
            tool_call(2, "update_instructions", json!({"section": "s", "content": "c", "priority": 0})),
            tool_call(3, "overview", json!({})),
        ],
    );

    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["error"]["code"], -32601);
    assert_eq!(responses[1]["error"]["code"], -32602);
    assert!(text(&responses[2]).contains("No project knowledge stored yet."));
}

#[test]
fn test_knowledge_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("knowledge.db").to_string_lossy().to_string();
    let config = StorageConfig::new(db_path, StorageMode::CloudSafe);

    let first = KnowledgeHandler::new(Storage::open(config.clone()).unwrap(), ProjectBinding::local());
    run_session(
        first,
        &[tool_call(
            1,
            "add_knowledge",
            json!({"title": "Deploys", "content": "Fridays are off limits", "category": "constraints"}),
        )],
    );

    let second = KnowledgeHandler::new(Storage::open(config).unwrap(), ProjectBinding::local());
    let responses = run_session(second, &[tool_call(1, "search_knowledge", json!({"query": "FRIDAY"}))]);
    assert!(text(&responses[0]).contains("**Deploys** (constraints, importance: 3)"));
}

#[test]
fn test_shared_file_with_foreign_schema_version_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at TEXT);
             INSERT INTO schema_version (version) VALUES (7);",
        )
        .unwrap();
    }

    let config = StorageConfig::new(path.to_string_lossy(), StorageMode::Local);
    let handler = KnowledgeHandler::new(Storage::open(config).unwrap(), ProjectBinding::local());
    let responses = run_session(
        handler,
        &[tool_call(
            1,
            "add_knowledge",
            json!({"title": "Shared", "content": "file", "category": "technical"}),
        )],
    );

    assert!(responses[0]["result"].get("isError").is_none());
    assert!(text(&responses[0]).starts_with("Added knowledge 'Shared' (note #1, entry #1)"));
}
