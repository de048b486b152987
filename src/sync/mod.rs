//! Context sync into external documents
//!
//! A generated context block is spliced between sentinel markers in a target
//! document, which is written back only when the text changed.

pub mod splice;
pub mod target;

pub use splice::{
    extract_block, find_span, has_markers, splice, Markers, DEFAULT_END_MARKER,
    DEFAULT_START_MARKER,
};
pub use target::{DocumentTarget, FileTarget};

use crate::error::{LoreError, Result};

/// Result of a sync run
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Document text after splicing
    pub document: String,
    /// Whether the marker pair already existed
    pub replaced: bool,
    /// Whether the document text differs from what was fetched
    pub changed: bool,
    /// Whether the target was written
    pub written: bool,
}

/// Splice `block` into `target`.
///
/// With `dry_run` the target is read but never written. Target failures carry
/// the block in `LoreError::SpliceTarget` so it is not lost.
pub fn sync_context(
    target: &dyn DocumentTarget,
    block: &str,
    markers: &Markers,
    dry_run: bool,
) -> Result<SyncOutcome> {
    markers.check_block(block)?;

    let current = target.fetch().map_err(|e| LoreError::SpliceTarget {
        message: format!("failed to read {}: {}", target.describe(), e),
        block: block.to_string(),
    })?;

    let replaced = has_markers(&current, markers);
    let document = splice(&current, block, markers);
    let changed = document != current;

    let written = changed && !dry_run;
    if written {
        target.store(&document).map_err(|e| LoreError::SpliceTarget {
            message: format!("failed to write {}: {}", target.describe(), e),
            block: block.to_string(),
        })?;
        tracing::info!(document = %target.describe(), replaced, "context block synced");
    } else {
        tracing::debug!(document = %target.describe(), changed, dry_run, "context sync skipped write");
    }

    Ok(SyncOutcome {
        document,
        replaced,
        changed,
        written,
    })
}
