//! Lore - project knowledge for AI assistants
//!
//! Stores knowledge entries, instruction sections and live context for one
//! project, serves them to assistants over MCP, and splices a generated
//! memory block into instruction documents.

pub mod error;
pub mod intelligence;
pub mod mcp;
pub mod storage;
pub mod sync;
pub mod types;

pub use error::{LoreError, Result};
pub use storage::Storage;
pub use types::*;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
