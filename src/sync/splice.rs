//! Marker splice
//!
//! Replaces the text between two literal sentinel markers, or appends a new
//! marker pair when the document has none. Splicing the same block twice is a
//! no-op, and nothing outside the marker span is touched.

use crate::error::{LoreError, Result};

/// Opening marker shared with every previously spliced document
pub const DEFAULT_START_MARKER: &str = "<!-- MEMORY CONTEXT START -->";
/// Closing marker shared with every previously spliced document
pub const DEFAULT_END_MARKER: &str = "<!-- MEMORY CONTEXT END -->";

/// A pair of distinct, non-empty sentinel strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    start: String,
    end: String,
}

impl Markers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self> {
        let start = start.into();
        let end = end.into();
        if start.is_empty() || end.is_empty() {
            return Err(LoreError::Config("markers must not be empty".into()));
        }
        if start == end {
            return Err(LoreError::Config(
                "start and end markers must differ".into(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// `START\n{block}\nEND`
    pub fn wrap(&self, block: &str) -> String {
        format!("{}\n{}\n{}", self.start, block, self.end)
    }

    /// A block containing a marker would corrupt the span on the next run
    pub fn check_block(&self, block: &str) -> Result<()> {
        if block.contains(&self.start) || block.contains(&self.end) {
            return Err(LoreError::InvalidInput(
                "context block must not contain the sentinel markers".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_string(),
            end: DEFAULT_END_MARKER.to_string(),
        }
    }
}

/// Byte range of the first complete marker span, markers included.
///
/// The span ends at the first END that follows a START and begins at the
/// nearest START before it, so no START is nested inside.
pub fn find_span(document: &str, markers: &Markers) -> Option<(usize, usize)> {
    let first_start = document.find(&markers.start)?;
    let search_from = first_start + markers.start.len();
    let end_idx = search_from + document[search_from..].find(&markers.end)?;
    let span_start = document[..end_idx].rfind(&markers.start)?;
    Some((span_start, end_idx + markers.end.len()))
}

pub fn has_markers(document: &str, markers: &Markers) -> bool {
    find_span(document, markers).is_some()
}

/// Text currently between the markers, without the newline padding `wrap` adds
pub fn extract_block<'a>(document: &'a str, markers: &Markers) -> Option<&'a str> {
    let (start, end) = find_span(document, markers)?;
    let inner = &document[start + markers.start.len()..end - markers.end.len()];
    let inner = inner.strip_prefix('\n').unwrap_or(inner);
    Some(inner.strip_suffix('\n').unwrap_or(inner))
}

/// Splice `block` into `document`.
///
/// A document without markers always gets `\n\n` plus the wrapped block
/// appended, even when it is empty, so the bytes match documents spliced by
/// earlier runs.
pub fn splice(document: &str, block: &str, markers: &Markers) -> String {
    let wrapped = markers.wrap(block);
    match find_span(document, markers) {
        Some((start, end)) => format!("{}{}{}", &document[..start], wrapped, &document[end..]),
        None => format!("{}\n\n{}", document, wrapped),
    }
}
