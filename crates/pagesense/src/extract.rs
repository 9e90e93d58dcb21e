//! The per-document pipeline shared by every command: PDF bytes in, outline
//! out.

use std::path::{Path, PathBuf};

use pagesense_core::{analyze, AggregateOptions, Analysis, Outline};

use crate::error::Error;

/// Identifier used as the last-resort title: the file stem.
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string())
}

/// `true` for paths ending in `.pdf`, ignoring case.
pub fn is_pdf_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Where the outline for `stem` is written inside `dir`.
pub fn output_path(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{stem}.json"))
}

/// Extract characters and run aggregation and classification.
pub fn analyze_bytes(bytes: &[u8], options: AggregateOptions) -> Result<Analysis, Error> {
    let chars = pdf::extract_chars(bytes)?;
    log::debug!("extracted {} characters", chars.len());
    Ok(analyze(&chars, options))
}

/// Full pipeline.  A document without text is [`Error::NoTextBlocks`].
pub fn outline_from_bytes(
    bytes: &[u8],
    fallback: &str,
    max_title_chars: usize,
) -> Result<Outline, Error> {
    analyze_bytes(bytes, AggregateOptions::default())?
        .into_outline(fallback, max_title_chars)
        .ok_or(Error::NoTextBlocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagesense_core::HeadingLevel;
    use pdf::test_support::{sample_pdf, SampleLine};

    #[test]
    fn test_document_stem() {
        assert_eq!(document_stem(Path::new("/in/report.v2.pdf")), "report.v2");
        assert_eq!(document_stem(Path::new("")), "document");
    }

    #[test]
    fn test_is_pdf_path() {
        assert!(is_pdf_path(Path::new("a.pdf")));
        assert!(is_pdf_path(Path::new("B.PDF")));
        assert!(!is_pdf_path(Path::new("a.pdf.txt")));
        assert!(!is_pdf_path(Path::new("pdf")));
    }

    #[test]
    fn test_output_path_keeps_dotted_stems() {
        assert_eq!(
            output_path(Path::new("out"), "report.v2"),
            PathBuf::from("out/report.v2.json")
        );
    }

    #[test]
    fn test_outline_from_bytes() {
        let bytes = sample_pdf(&[vec![
            SampleLine::new("Quarterly Review", 22, 720),
            SampleLine::new("numbers went up", 10, 680),
            SampleLine::new("numbers went down", 10, 666),
            SampleLine::new("numbers stayed", 10, 652),
        ]]);

        let outline = outline_from_bytes(&bytes, "stem", 50).unwrap();
        assert_eq!(outline.title, "Quarterly Review");
        assert_eq!(outline.outline[0].level, HeadingLevel::H1);
    }

    #[test]
    fn test_outline_from_bytes_without_text() {
        let bytes = sample_pdf(&[vec![]]);
        assert!(matches!(
            outline_from_bytes(&bytes, "stem", 50),
            Err(Error::NoTextBlocks)
        ));
    }

    #[test]
    fn test_outline_from_bytes_backend_failure() {
        assert!(matches!(
            outline_from_bytes(b"garbage", "stem", 50),
            Err(Error::Backend(_))
        ));
    }
}
