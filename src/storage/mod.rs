//! Storage engine for Lore
//!
//! Handles SQLite database operations, journal mode, and schema management.

mod connection;
pub mod context_queries;
pub mod instruction_queries;
mod migrations;
pub mod queries;

pub use connection::Storage;
pub use migrations::SCHEMA_VERSION;
