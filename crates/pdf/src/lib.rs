//! PDF glyph backend for pagesense.
//!
//! Reads PDF bytes with `lopdf` and produces the flat, per-character
//! [`CharRecord`] stream consumed by `pagesense_core`.  This crate is the
//! only place that touches PDF internals; everything downstream works on
//! records.

use std::path::Path;

use pagesense_core::CharRecord;
use thiserror::Error;

pub mod parser;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use parser::backend::{LopdfBackend, PdfBackend};
pub use parser::glyphs::{extract_document_chars, extract_page_chars};

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Character records for every page of the document, in page order.
pub fn extract_chars(bytes: &[u8]) -> Result<Vec<CharRecord>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    log::debug!("loaded document with {} pages", backend.page_count());
    Ok(extract_document_chars(&backend))
}

/// Read `path` and extract its character records.
pub fn extract_chars_from_path(path: &Path) -> Result<Vec<CharRecord>, PdfError> {
    let bytes = std::fs::read(path)?;
    extract_chars(&bytes)
}
