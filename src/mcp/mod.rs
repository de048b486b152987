//! MCP (Model Context Protocol) server implementation
//!
//! JSON-RPC over stdio exposing the knowledge store as eight tools.

pub mod dispatch;
pub mod handler;
pub mod protocol;
pub mod render;
pub mod tools;

pub use dispatch::{ToolCall, TOOL_NAMES};
pub use handler::{KnowledgeHandler, ToolDispatcher};
pub use protocol::{
    methods, InitializeResult, McpHandler, McpRequest, McpResponse, McpServer, ToolCallResult,
};
pub use tools::{get_tool_definitions, TOOL_DEFINITIONS};
