//! Outline assembly and the JSON contract consumed by callers.
//!
//! ```json
//! {
//!   "title": "Document title",
//!   "outline": [
//!     { "level": "H1", "text": "Introduction", "page": 1 }
//!   ]
//! }
//! ```
//!
//! Key order is fixed by field order, non-ASCII text is written literally,
//! and files use 2-space indentation with no trailing newline.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::glyph::TextBlock;
use crate::heading::{Classification, HeadingEntry, HeadingLevel};

/// Title fallback width used by the batch driver.
pub const BATCH_TITLE_CHARS: usize = 50;

/// Title fallback width used by the HTTP server.
pub const SERVER_TITLE_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub outline: Vec<HeadingEntry>,
}

impl Outline {
    pub fn new(title: impl Into<String>, entries: Vec<HeadingEntry>) -> Self {
        Self {
            title: title.into(),
            outline: entries,
        }
    }

    /// Build an outline, resolving the title when no H1 was captured.
    ///
    /// Falls back to the first block's text cut to `max_title_chars`
    /// characters, then to `fallback` (usually the file stem).
    pub fn from_classification(
        classification: Classification,
        blocks: &[TextBlock],
        fallback: &str,
        max_title_chars: usize,
    ) -> Self {
        let title = classification
            .title
            .or_else(|| {
                blocks
                    .first()
                    .map(|b| b.text.chars().take(max_title_chars).collect())
            })
            .unwrap_or_else(|| fallback.to_string());

        Self::new(title, classification.entries)
    }

    pub fn entries(&self) -> &[HeadingEntry] {
        &self.outline
    }

    pub fn is_empty(&self) -> bool {
        self.outline.is_empty()
    }

    /// Number of entries at the given level.
    pub fn count(&self, level: HeadingLevel) -> usize {
        self.outline.iter().filter(|e| e.level == level).count()
    }

    /// Pretty form: 2-space indentation, the on-disk format.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Compact form, used for HTTP response bodies.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Replace (or add) the extension of `path` with `.json`.
pub fn json_path(path: &Path) -> PathBuf {
    path.with_extension("json")
}

/// Write `outline` as pretty JSON to `path` with its extension forced to
/// `.json`.  Returns the path actually written.
pub fn write_json(outline: &Outline, path: &Path) -> std::io::Result<PathBuf> {
    let target = json_path(path);
    let json = outline.to_json_pretty().map_err(std::io::Error::other)?;
    fs::write(&target, json)?;
    Ok(target)
}
