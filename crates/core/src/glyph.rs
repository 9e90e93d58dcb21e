//! Glyph aggregation: per-character records into font-consistent text runs.
//!
//! A page's characters are bucketed into lines by their rounded `top`
//! coordinate, ordered left-to-right, and split into runs wherever the font
//! size or font name changes.  Each non-blank run becomes one [`TextBlock`].
//!
//! ```text
//! CharRecord[]  ->  lines (by rounded top)  ->  runs (size, font)  ->  TextBlock[]
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A single character as reported by a PDF glyph backend.
///
/// Every field is optional on the wire so that partial records coming from a
/// character dump deserialize cleanly.  Missing `size` and `fontname` are
/// treated as `0.0` and `""` during aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharRecord {
    pub text: String,
    /// Horizontal origin (left edge) in points.
    pub x0: f64,
    /// Distance from the top of the page to the top of the glyph.
    pub top: f64,
    pub size: Option<f64>,
    pub fontname: Option<String>,
    /// 0-based page index.
    pub page_index: usize,
}

impl CharRecord {
    fn size_or_default(&self) -> f64 {
        self.size.unwrap_or(0.0)
    }

    fn fontname_or_default(&self) -> &str {
        self.fontname.as_deref().unwrap_or("")
    }
}

/// Typographic style derived from a font name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontStyle {
    #[default]
    Regular,
    Italic,
    Bold,
    BoldItalic,
}

impl FontStyle {
    /// Lexical classification of a font name.
    ///
    /// Matching is case-insensitive on substrings: `italic`, `oblique` or `it`
    /// mark italic; `bold`, `bd` or `demibold` mark bold.
    pub fn from_fontname(fontname: &str) -> Self {
        let lower = fontname.to_lowercase();
        let italic = ["italic", "oblique", "it"]
            .iter()
            .any(|token| lower.contains(token));
        let bold = ["bold", "bd", "demibold"]
            .iter()
            .any(|token| lower.contains(token));

        match (bold, italic) {
            (true, true) => FontStyle::BoldItalic,
            (true, false) => FontStyle::Bold,
            (false, true) => FontStyle::Italic,
            (false, false) => FontStyle::Regular,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }

    /// Legacy bitmask: bit 0 = italic, bit 1 = bold.
    pub fn flags(self) -> u8 {
        (self.is_italic() as u8) | ((self.is_bold() as u8) << 1)
    }
}

/// One run of characters on a single line sharing font size and font name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
    pub size: f64,
    pub fontname: String,
    pub style: FontStyle,
    /// 1-based page number.
    pub page: u32,
}

/// Knobs for [`aggregate_page`] and [`aggregate_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateOptions {
    /// Derive [`FontStyle`] from font names.  When disabled every block is
    /// [`FontStyle::Regular`].
    pub detect_style: bool,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self { detect_style: true }
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Font sizes are compared after rounding to this many decimal places.
const SIZE_DECIMALS: i32 = 3;

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Bucket key for the line a character belongs to.
///
/// Rounds half to even.  Two visual lines whose tops round to the same
/// integer end up merged.
fn line_key(top: f64) -> i64 {
    top.round_ties_even() as i64
}

/// Integer key for comparing font sizes without floating-point noise.
fn size_key(size: f64) -> i64 {
    (size * 10f64.powi(SIZE_DECIMALS)).round_ties_even() as i64
}

fn same_run(prev: &CharRecord, next: &CharRecord) -> bool {
    size_key(prev.size_or_default()) == size_key(next.size_or_default())
        && prev.fontname_or_default() == next.fontname_or_default()
}

/// Split a left-to-right sorted line into maximal runs of equal font.
fn split_runs<'a>(line: &[&'a CharRecord]) -> Vec<Vec<&'a CharRecord>> {
    let mut runs: Vec<Vec<&CharRecord>> = Vec::new();

    for &ch in line {
        let continues = runs
            .last()
            .and_then(|run| run.last())
            .is_some_and(|prev| same_run(prev, ch));

        match runs.last_mut() {
            Some(run) if continues => run.push(ch),
            _ => runs.push(vec![ch]),
        }
    }

    runs
}

fn build_block(run: &[&CharRecord], page: u32, options: AggregateOptions) -> Option<TextBlock> {
    let first = run.first()?;
    let joined: String = run.iter().map(|c| c.text.as_str()).collect();
    let text = joined.trim();
    if text.is_empty() {
        return None;
    }

    let fontname = first.fontname_or_default().to_string();
    let style = if options.detect_style {
        FontStyle::from_fontname(&fontname)
    } else {
        FontStyle::Regular
    };

    Some(TextBlock {
        text: text.to_string(),
        size: first.size_or_default(),
        fontname,
        style,
        page,
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Aggregate one page's characters into text blocks.
///
/// Lines are emitted top to bottom and runs left to right.  Whitespace-only
/// runs are dropped.  A page with no characters yields no blocks.
pub fn aggregate_page(chars: &[CharRecord], page: u32, options: AggregateOptions) -> Vec<TextBlock> {
    let mut lines: BTreeMap<i64, Vec<&CharRecord>> = BTreeMap::new();
    for ch in chars {
        lines.entry(line_key(ch.top)).or_default().push(ch);
    }

    let mut blocks = Vec::new();
    for (_, mut line) in lines {
        // Stable: characters sharing an x0 keep their extraction order.
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));

        blocks.extend(
            split_runs(&line)
                .iter()
                .filter_map(|run| build_block(run, page, options)),
        );
    }

    blocks
}

/// Aggregate a whole document, page by page in increasing page order.
///
/// Records may arrive in any order; they are bucketed by `page_index` first.
pub fn aggregate_document(chars: &[CharRecord], options: AggregateOptions) -> Vec<TextBlock> {
    let mut pages: BTreeMap<usize, Vec<CharRecord>> = BTreeMap::new();
    for ch in chars {
        pages.entry(ch.page_index).or_default().push(ch.clone());
    }

    pages
        .into_iter()
        .flat_map(|(index, page_chars)| aggregate_page(&page_chars, index as u32 + 1, options))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
