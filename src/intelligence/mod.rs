//! Analysis over stored knowledge
//!
//! - Improvement suggestions from a conversation summary
//! - Context block generation for external documents

pub mod context_block;
pub mod suggestions;

pub use context_block::{
    ContextBlock, ContextGenerator, JsonFileRecall, RecallSource, StoreRecall,
    DEFAULT_PREFIX, MAX_MEMORY_CHARS, USAGE_HINT,
};
pub use suggestions::{suggest_improvements, ImprovementInput, WELL_ORGANIZED};
