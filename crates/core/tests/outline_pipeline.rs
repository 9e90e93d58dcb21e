//! End-to-end checks: character records in, outline JSON out.

use pagesense_core::{analyze, AggregateOptions, CharRecord, HeadingLevel, Outline};

fn line(text: &str, top: f64, size: f64, font: &str, page_index: usize) -> Vec<CharRecord> {
    text.chars()
        .enumerate()
        .map(|(i, c)| CharRecord {
            text: c.to_string(),
            x0: 72.0 + i as f64 * size * 0.5,
            top,
            size: Some(size),
            fontname: Some(font.to_string()),
            page_index,
        })
        .collect()
}

fn outline_of(chars: &[CharRecord]) -> Option<Outline> {
    analyze(chars, AggregateOptions::default()).into_outline("fallback", 50)
}

#[test]
fn scenario_a_single_large_run_becomes_title() {
    let mut chars = line("Annual Report", 50.0, 24.0, "Arial-BoldMT", 0);
    chars.extend(line("Some body text here", 100.0, 10.0, "ArialMT", 0));

    let outline = outline_of(&chars).unwrap();

    assert_eq!(outline.title, "Annual Report");
    assert_eq!(outline.outline.len(), 1);
    assert_eq!(outline.outline[0].level, HeadingLevel::H1);
    assert_eq!(outline.outline[0].page, 1);
}

#[test]
fn scenario_b_skewed_distribution() {
    let mut chars = Vec::new();
    let mut top = 10.0;
    let mut push = |text: &str, size: f64, font: &str| {
        chars.extend(line(text, top, size, font, 0));
        top += 20.0;
    };

    push("Main Title", 20.0, "Times-Roman");
    push("Bold Section", 14.0, "Times-Bold");
    push("Plain Section", 14.0, "Times-Roman");
    push("Another Plain Section", 14.0, "Times-Roman");
    for i in 0..96 {
        push(&format!("body line {i}"), 10.0, "Times-Roman");
    }

    let analysis = analyze(&chars, AggregateOptions::default());
    assert_eq!(analysis.blocks.len(), 100);

    let t = analysis.classification.thresholds;
    assert!((t.h1 - 14.06).abs() < 1e-9);
    assert!((t.h2 - 10.0).abs() < 1e-9);
    assert!((t.h3 - 9.0).abs() < 1e-9);

    let outline = analysis.into_outline("fallback", 50).unwrap();
    assert_eq!(outline.title, "Main Title");
    assert_eq!(outline.count(HeadingLevel::H1), 1);
    assert_eq!(outline.count(HeadingLevel::H2), 1);
    assert_eq!(outline.outline[1].text, "Bold Section");
    // Non-bold size-14 runs fall through to the H3 rule, as do body lines.
    assert_eq!(outline.outline[2].level, HeadingLevel::H3);
    assert_eq!(outline.count(HeadingLevel::H3), 98);
}

#[test]
fn scenario_c_empty_input() {
    let analysis = analyze(&[], AggregateOptions::default());

    assert!(analysis.is_empty());
    assert!(analysis.classification.entries.is_empty());
    assert!(analysis.classification.title.is_none());
    assert!(analysis.into_outline("fallback", 50).is_none());
}

#[test]
fn whitespace_only_document_is_empty() {
    let chars = line("     ", 10.0, 12.0, "Helvetica", 0);
    assert!(analyze(&chars, AggregateOptions::default()).is_empty());
}

#[test]
fn scenario_d_uniform_typography() {
    let mut chars = Vec::new();
    for (i, text) in ["First line", "Second line", "Third line"].iter().enumerate() {
        chars.extend(line(text, 40.0 + i as f64 * 15.0, 11.0, "Helvetica", 0));
    }

    let analysis = analyze(&chars, AggregateOptions::default());
    let t = analysis.classification.thresholds;
    assert_eq!(t.h1, 11.0);

    let outline = analysis.into_outline("fallback", 50).unwrap();
    assert_eq!(outline.title, "First line");
    assert_eq!(outline.count(HeadingLevel::H1), 3);
}

#[test]
fn no_h1_title_comes_from_first_block() {
    // Zero sizes cannot reach H1, so the caller-side fallback applies.
    let mut chars = line("A fairly long opening line that keeps going and going", 10.0, 0.0, "F", 0);
    chars.extend(line("Next", 30.0, 0.0, "F", 0));

    let analysis = analyze(&chars, AggregateOptions::default());
    assert!(analysis.classification.title.is_none());

    let outline = analysis.into_outline("fallback", 50).unwrap();
    assert_eq!(
        outline.title,
        "A fairly long opening line that keeps going and go"
    );
}

fn multi_page_document() -> Vec<CharRecord> {
    let mut chars = Vec::new();
    // Page 2 records arrive before page 1 and lines are out of order.
    chars.extend(line("Results", 200.0, 16.0, "Helvetica-Bold", 1));
    chars.extend(line("Discussion", 80.0, 16.0, "Helvetica-Bold", 1));
    chars.extend(line("body two", 300.0, 10.0, "Helvetica", 1));
    chars.extend(line("body one", 300.0, 10.0, "Helvetica", 0));
    chars.extend(line("Methods", 120.0, 16.0, "Helvetica-Bold", 0));
    chars.extend(line("A Study of Things", 40.0, 26.0, "Helvetica", 0));
    for i in 0..12 {
        chars.extend(line(&format!("filler {i}"), 400.0 + i as f64 * 14.0, 10.0, "Helvetica", 0));
    }
    chars
}

#[test]
fn entries_are_trimmed_and_non_empty() {
    let outline = outline_of(&multi_page_document()).unwrap();
    assert!(!outline.outline.is_empty());
    for entry in &outline.outline {
        assert!(!entry.text.is_empty());
        assert_eq!(entry.text, entry.text.trim());
    }
}

#[test]
fn thresholds_are_ordered() {
    let analysis = analyze(&multi_page_document(), AggregateOptions::default());
    let t = analysis.classification.thresholds;
    assert!(t.h1 > t.h2, "{t:?}");
    assert!(t.h2 > t.h3, "{t:?}");
}

#[test]
fn entries_follow_reading_order() {
    let outline = outline_of(&multi_page_document()).unwrap();

    let pages: Vec<u32> = outline.outline.iter().map(|e| e.page).collect();
    assert!(pages.windows(2).all(|w| w[0] <= w[1]), "{pages:?}");

    let headings: Vec<&str> = outline
        .outline
        .iter()
        .filter(|e| e.level != HeadingLevel::H3)
        .map(|e| e.text.as_str())
        .collect();
    assert_eq!(
        headings,
        vec!["A Study of Things", "Methods", "Discussion", "Results"]
    );
    assert_eq!(outline.title, "A Study of Things");
}

#[test]
fn rerunning_is_byte_identical() {
    let chars = multi_page_document();
    let first = outline_of(&chars).unwrap().to_json_pretty().unwrap();
    let second = outline_of(&chars).unwrap().to_json_pretty().unwrap();
    assert_eq!(first, second);
}
