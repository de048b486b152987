//! Documents that receive the context block

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// A document that can be read and replaced as a whole
pub trait DocumentTarget {
    /// Current document text
    fn fetch(&self) -> Result<String>;

    /// Replace the document text
    fn store(&self, document: &str) -> Result<()>;

    /// Human-readable location for logs and messages
    fn describe(&self) -> String;
}

/// A local text file. A missing file reads as an empty document.
pub struct FileTarget {
    path: PathBuf,
}

impl FileTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentTarget for FileTarget {
    fn fetch(&self) -> Result<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, document: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, document)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileTarget::new(dir.path().join("CLAUDE.md"));
        assert_eq!(target.fetch().unwrap(), "");
    }

    #[test]
    fn test_store_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileTarget::new(dir.path().join("a").join("b").join("context.md"));
        target.store("hello").unwrap();
        assert_eq!(target.fetch().unwrap(), "hello");
    }

    #[test]
    fn test_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = FileTarget::new(dir.path());
        assert!(target.fetch().is_err());
    }
}
