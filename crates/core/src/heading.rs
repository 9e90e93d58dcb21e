//! Percentile-based heading classification.
//!
//! Font-size cutoffs are derived from the document's own size distribution
//! (99th / 90th / 75th percentiles) rather than fixed point sizes, then
//! corrected so the ladder stays strictly decreasing whenever the largest
//! size is positive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::glyph::TextBlock;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    pub fn as_u8(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

impl fmt::Display for HeadingLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "H{}", self.as_u8())
    }
}

/// A classified heading, in document reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadingEntry {
    pub level: HeadingLevel,
    pub text: String,
    pub page: u32,
}

/// Document-scoped font-size cutoffs, `h1 >= h2 >= h3`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Thresholds {
    pub h1: f64,
    pub h2: f64,
    pub h3: f64,
}

/// Result of classifying one document's blocks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Classification {
    pub thresholds: Thresholds,
    pub entries: Vec<HeadingEntry>,
    /// Text of the first H1, if any block reached H1.
    pub title: Option<String>,
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const H1_PERCENTILE: f64 = 99.0;
const H2_PERCENTILE: f64 = 90.0;
const H3_PERCENTILE: f64 = 75.0;

/// Scale applied to a threshold that collides with the one above it.
const COLLAPSE_FACTOR: f64 = 0.9;

// ---------------------------------------------------------------------------
// Percentiles
// ---------------------------------------------------------------------------

/// Linear-interpolation percentile of an ascending-sorted slice.
///
/// The rank is `q / 100 * (n - 1)`; the value is interpolated between the
/// neighbouring order statistics.  Returns `0.0` for an empty slice.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let fraction = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * fraction
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

impl Thresholds {
    /// Derive thresholds from a raw (unsorted) list of font sizes.
    pub fn from_sizes(sizes: &[f64]) -> Self {
        if sizes.is_empty() {
            return Self::default();
        }

        let mut sorted = sizes.to_vec();
        sorted.sort_by(f64::total_cmp);

        let mut h1 = percentile(&sorted, H1_PERCENTILE);
        let mut h2 = percentile(&sorted, H2_PERCENTILE);
        let mut h3 = percentile(&sorted, H3_PERCENTILE);

        if h1 <= 0.0 {
            let max = sorted.last().copied().unwrap_or(0.0).max(0.0);
            h1 = max;
            h2 = max;
            h3 = max;
        }
        if h2 >= h1 {
            h2 = if h1 > 0.0 { h1 * COLLAPSE_FACTOR } else { h1 };
        }
        if h3 >= h2 {
            h3 = if h2 > 0.0 { h2 * COLLAPSE_FACTOR } else { h2 };
        }

        Self { h1, h2, h3 }
    }

    pub fn from_blocks(blocks: &[TextBlock]) -> Self {
        let sizes: Vec<f64> = blocks.iter().map(|b| b.size).collect();
        Self::from_sizes(&sizes)
    }

    /// Classify a single block; the first matching rule wins.
    ///
    /// - H1: `size >= h1` and `size > 0`
    /// - H2: `size >= h2` and the block is bold
    /// - H3: `size >= h3` and the text is a single line
    pub fn classify(&self, block: &TextBlock) -> Option<HeadingLevel> {
        let size = block.size;

        if size >= self.h1 && size > 0.0 {
            Some(HeadingLevel::H1)
        } else if size >= self.h2 && block.style.is_bold() {
            Some(HeadingLevel::H2)
        } else if size >= self.h3 && !block.text.contains('\n') {
            Some(HeadingLevel::H3)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Classify a document's blocks (already concatenated in page order).
///
/// Body-text blocks are dropped.  The first H1 becomes the title; later H1s
/// never overwrite it.
pub fn detect_headings(blocks: &[TextBlock]) -> Classification {
    let thresholds = Thresholds::from_blocks(blocks);
    log::debug!(
        "heading thresholds over {} blocks: h1={:.3} h2={:.3} h3={:.3}",
        blocks.len(),
        thresholds.h1,
        thresholds.h2,
        thresholds.h3
    );

    let mut title: Option<String> = None;
    let mut entries = Vec::new();

    for block in blocks {
        let Some(level) = thresholds.classify(block) else {
            continue;
        };

        let text = block.text.trim().to_string();
        if level == HeadingLevel::H1 && title.is_none() {
            title = Some(text.clone());
        }

        entries.push(HeadingEntry {
            level,
            text,
            page: block.page,
        });
    }

    Classification {
        thresholds,
        entries,
        title,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
