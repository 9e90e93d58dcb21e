//! Core library for pagesense
//!
//! This crate implements the **Functional Core** of pagesense, following the
//! Functional Core - Imperative Shell pattern used across the workspace:
//!
//! - **`pagesense_core`** (this crate): pure transformations from character
//!   records to a heading outline
//! - **`pdf`**: the glyph backend that reads PDF bytes into character records
//! - **`pagesense`**: the CLI, batch driver and HTTP server
//!
//! # Pipeline
//!
//! ```text
//! CharRecord[]  ->  glyph::aggregate_document  ->  TextBlock[]
//!               ->  heading::detect_headings   ->  Classification
//!               ->  outline::Outline           ->  JSON
//! ```
//!
//! Everything here is synchronous, deterministic and holds no external
//! resources; documents are independent units of work.
//!
//! # Example Usage
//!
//! ```rust
//! use pagesense_core::{analyze, glyph::CharRecord, AggregateOptions};
//!
//! let chars: Vec<CharRecord> = "Hello"
//!     .chars()
//!     .enumerate()
//!     .map(|(i, c)| CharRecord {
//!         text: c.to_string(),
//!         x0: i as f64 * 6.0,
//!         top: 72.0,
//!         size: Some(18.0),
//!         fontname: Some("Helvetica-Bold".to_string()),
//!         page_index: 0,
//!     })
//!     .collect();
//!
//! let analysis = analyze(&chars, AggregateOptions::default());
//! let outline = analysis.into_outline("hello", 50).unwrap();
//! assert_eq!(outline.title, "Hello");
//! ```

pub mod glyph;
pub mod heading;
pub mod outline;

pub use glyph::{AggregateOptions, CharRecord, FontStyle, TextBlock};
pub use heading::{Classification, HeadingEntry, HeadingLevel, Thresholds};
pub use outline::Outline;

/// Blocks and their classification for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub blocks: Vec<TextBlock>,
    pub classification: Classification,
}

impl Analysis {
    /// `true` when no text block could be produced (no characters, or only
    /// whitespace).  Callers decide how severe that is.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Resolve the final outline, or `None` for an empty document.
    pub fn into_outline(self, fallback: &str, max_title_chars: usize) -> Option<Outline> {
        if self.is_empty() {
            return None;
        }
        Some(Outline::from_classification(
            self.classification,
            &self.blocks,
            fallback,
            max_title_chars,
        ))
    }
}

/// Run aggregation and classification over a whole document.
pub fn analyze(chars: &[CharRecord], options: AggregateOptions) -> Analysis {
    let blocks = glyph::aggregate_document(chars, options);
    let classification = heading::detect_headings(&blocks);
    Analysis {
        blocks,
        classification,
    }
}
