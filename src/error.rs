//! Error types for Lore

use thiserror::Error;

/// Result type alias for Lore operations
pub type Result<T> = std::result::Result<T, LoreError>;

/// Main error type for Lore
#[derive(Error, Debug)]
pub enum LoreError {
    #[error("Storage unavailable: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported operation: unknown tool '{0}'")]
    UnsupportedTool(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    /// The destination document could not be read or written. The generated
    /// block travels with the error so callers can still surface it.
    #[error("Context target error: {message}")]
    SpliceTarget { message: String, block: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LoreError {
    /// Whether the error was caused by the caller's input rather than the backend
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LoreError::InvalidInput(_) | LoreError::UnsupportedTool(_)
        )
    }

    /// Get error code for MCP protocol
    pub fn code(&self) -> i64 {
        match self {
            LoreError::InvalidInput(_) => -32602,
            LoreError::UnsupportedTool(_) => -32601,
            LoreError::Config(_) => -32002,
            _ => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LoreError::InvalidInput("x".into()).code(), -32602);
        assert_eq!(LoreError::UnsupportedTool("x".into()).code(), -32601);
        assert_eq!(LoreError::Storage("x".into()).code(), -32000);
    }

    #[test]
    fn test_database_error_reads_as_unavailable() {
        let err = LoreError::from(rusqlite::Error::InvalidQuery);
        assert!(err.to_string().starts_with("Storage unavailable"));
        assert!(!err.is_validation());
    }
}
