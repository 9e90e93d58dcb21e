//! Content-stream walker producing one [`CharRecord`] per shown character.
//!
//! Positions are reported in top-left page coordinates: `x0` is the text
//! cursor when the glyph is drawn and `top` is the distance from the top of
//! the page to the top of the glyph box (`page height - baseline - size`).
//! Glyph widths are not read from the font program; every glyph advances the
//! cursor by an estimate proportional to the font size.

use pagesense_core::CharRecord;

use super::backend::{
    get_number_from_value, BackendFontInfo, PageId, PdfBackend, PdfValue, DEFAULT_PAGE_HEIGHT,
};
use crate::PdfError;

/// Estimated glyph advance as a fraction of the font size.
const APPROX_CHAR_WIDTH_RATIO: f32 = 0.5;

/// `TJ` offsets wider than this share of a glyph read as a word break.
const WORD_GAP_RATIO: f32 = 0.3;

/// The identity 2x3 text matrix: [a, b, c, d, tx, ty].
const IDENTITY_MATRIX: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

// ---------------------------------------------------------------------------
// Text state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct TextState {
    /// Index into the page's font list, `None` when the key is unknown.
    font: Option<usize>,
    font_name: String,
    font_size: f32,
    text_matrix: [f32; 6],
    line_matrix: [f32; 6],
    horiz_scale: f32,
    char_spacing: f32,
    word_spacing: f32,
    text_rise: f32,
    leading: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_name: String::new(),
            font_size: 0.0,
            text_matrix: IDENTITY_MATRIX,
            line_matrix: IDENTITY_MATRIX,
            horiz_scale: 1.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            text_rise: 0.0,
            leading: 0.0,
        }
    }
}

impl TextState {
    fn x(&self) -> f32 {
        self.text_matrix[4]
    }

    fn y(&self) -> f32 {
        self.text_matrix[5]
    }

    /// Font size scaled by the vertical component of the text matrix.
    fn effective_font_size(&self) -> f32 {
        let scale = (self.text_matrix[1].powi(2) + self.text_matrix[3].powi(2)).sqrt();
        (self.font_size * scale).abs()
    }

    fn glyph_width(&self) -> f32 {
        self.font_size * APPROX_CHAR_WIDTH_RATIO * self.horiz_scale
    }

    fn advance_x(&mut self, dx: f32) {
        self.text_matrix[4] += dx * self.text_matrix[0];
        self.text_matrix[5] += dx * self.text_matrix[1];
    }

    fn advance_glyph(&mut self, ch: char) {
        let mut dx = self.glyph_width() + self.char_spacing;
        if ch == ' ' {
            dx += self.word_spacing;
        }
        self.advance_x(dx);
    }

    /// Translate the line matrix (`Td`, `TD`, `T*`) and restart the text
    /// matrix from it.
    fn translate_line(&mut self, tx: f32, ty: f32) {
        let m = self.line_matrix;
        self.line_matrix[4] = m[0] * tx + m[2] * ty + m[4];
        self.line_matrix[5] = m[1] * tx + m[3] * ty + m[5];
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        self.translate_line(0.0, -self.leading);
    }
}

// ---------------------------------------------------------------------------
// Page walker
// ---------------------------------------------------------------------------

struct PageWalker<'a> {
    backend: &'a dyn PdfBackend,
    fonts: Vec<BackendFontInfo>,
    page_index: usize,
    page_height: f32,
    state: TextState,
    chars: Vec<CharRecord>,
}

impl<'a> PageWalker<'a> {
    fn new(backend: &'a dyn PdfBackend, page_index: usize, page_id: PageId) -> Self {
        let fonts = backend.page_fonts(page_id).unwrap_or_else(|e| {
            log::debug!("page {}: no font resources ({e})", page_index + 1);
            Vec::new()
        });
        let page_height = backend.page_height(page_id).unwrap_or_else(|e| {
            log::debug!("page {}: {e}, assuming {DEFAULT_PAGE_HEIGHT}", page_index + 1);
            DEFAULT_PAGE_HEIGHT
        });

        Self {
            backend,
            fonts,
            page_index,
            page_height,
            state: TextState::default(),
            chars: Vec::new(),
        }
    }

    fn font(&self) -> Option<&BackendFontInfo> {
        self.state.font.and_then(|i| self.fonts.get(i))
    }

    fn set_font(&mut self, operands: &[PdfValue]) {
        let [key, size, ..] = operands else {
            return;
        };
        let key = match key {
            PdfValue::Name(n) | PdfValue::Str(n) => n,
            _ => return,
        };

        self.state.font_size = get_number_from_value(size).unwrap_or(0.0);
        self.state.font = self.fonts.iter().position(|f| &f.name == key);
        self.state.font_name = match self.font() {
            Some(info) => info.display_name(),
            None => String::from_utf8_lossy(key).into_owned(),
        };
    }

    fn set_matrix(&mut self, operands: &[PdfValue]) {
        let vals: Vec<f32> = operands
            .iter()
            .take(6)
            .filter_map(get_number_from_value)
            .collect();
        if let Ok(matrix) = <[f32; 6]>::try_from(vals.as_slice()) {
            self.state.text_matrix = matrix;
            self.state.line_matrix = matrix;
        }
    }

    fn record(&self, ch: char) -> CharRecord {
        let size = self.state.effective_font_size();
        let baseline = self.state.y() + self.state.text_rise;
        let name = &self.state.font_name;

        CharRecord {
            text: ch.to_string(),
            x0: f64::from(self.state.x()),
            top: f64::from(self.page_height - baseline - size),
            size: Some(f64::from(size)),
            fontname: (!name.is_empty()).then(|| name.clone()),
            page_index: self.page_index,
        }
    }

    /// Show one string operand.  Returns `true` if any glyph was emitted.
    fn show(&mut self, operand: &PdfValue) -> bool {
        let PdfValue::Str(bytes) = operand else {
            return false;
        };
        let text = self.backend.decode_text(self.font(), bytes);

        let mut emitted = false;
        for ch in text.chars() {
            if !ch.is_control() {
                let record = self.record(ch);
                self.chars.push(record);
                emitted = true;
            }
            self.state.advance_glyph(ch);
        }
        emitted
    }

    /// Show a `TJ` array.  Numbers are offsets in thousandths of text space;
    /// a wide enough offset between strings becomes a space character.
    fn show_array(&mut self, items: &[PdfValue]) {
        let mut shown = false;
        for item in items {
            if let PdfValue::Str(_) = item {
                shown |= self.show(item);
                continue;
            }
            let Some(adj) = get_number_from_value(item) else {
                continue;
            };
            let dx = -adj / 1000.0 * self.state.font_size * self.state.horiz_scale;
            if shown && dx > self.state.glyph_width() * WORD_GAP_RATIO && !self.ends_with_space() {
                let space = self.record(' ');
                self.chars.push(space);
            }
            self.state.advance_x(dx);
        }
    }

    fn ends_with_space(&self) -> bool {
        self.chars.last().is_some_and(|c| c.text == " ")
    }

    fn apply(&mut self, operator: &str, operands: &[PdfValue]) {
        let first_number = || operands.first().and_then(get_number_from_value);

        match operator {
            "BT" => {
                self.state.text_matrix = IDENTITY_MATRIX;
                self.state.line_matrix = IDENTITY_MATRIX;
            }
            "Tf" => self.set_font(operands),
            "Tm" => self.set_matrix(operands),
            "Td" | "TD" => {
                if let [tx, ty, ..] = operands {
                    let tx = get_number_from_value(tx).unwrap_or(0.0);
                    let ty = get_number_from_value(ty).unwrap_or(0.0);
                    if operator == "TD" {
                        self.state.leading = -ty;
                    }
                    self.state.translate_line(tx, ty);
                }
            }
            "T*" => self.state.next_line(),
            "TL" => {
                if let Some(v) = first_number() {
                    self.state.leading = v;
                }
            }
            "Tc" => {
                if let Some(v) = first_number() {
                    self.state.char_spacing = v;
                }
            }
            "Tw" => {
                if let Some(v) = first_number() {
                    self.state.word_spacing = v;
                }
            }
            "Tz" => {
                if let Some(v) = first_number() {
                    self.state.horiz_scale = v / 100.0;
                }
            }
            "Ts" => {
                if let Some(v) = first_number() {
                    self.state.text_rise = v;
                }
            }
            "Tj" => {
                if let Some(s) = operands.first() {
                    self.show(s);
                }
            }
            "TJ" => {
                if let Some(PdfValue::Array(items)) = operands.first() {
                    self.show_array(items);
                }
            }
            "'" => {
                self.state.next_line();
                if let Some(s) = operands.first() {
                    self.show(s);
                }
            }
            "\"" => {
                if let [aw, ac, s, ..] = operands {
                    if let Some(aw) = get_number_from_value(aw) {
                        self.state.word_spacing = aw;
                    }
                    if let Some(ac) = get_number_from_value(ac) {
                        self.state.char_spacing = ac;
                    }
                    self.state.next_line();
                    self.show(s);
                }
            }
            // Font state survives ET; everything else is not text.
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Walk one page's content stream and return its characters in content
/// order.  `page_index` is 0-based and copied onto every record.
///
/// Handles `BT ET Tf Tm Td TD T* TL Tc Tw Tz Ts Tj TJ ' "`.
pub fn extract_page_chars(
    backend: &dyn PdfBackend,
    page_index: usize,
    page_id: PageId,
) -> Result<Vec<CharRecord>, PdfError> {
    let raw = backend.page_content(page_id)?;
    let ops = backend.decode_content(&raw)?;

    let mut walker = PageWalker::new(backend, page_index, page_id);
    for op in &ops {
        walker.apply(&op.operator, &op.operands);
    }

    Ok(walker.chars)
}

/// Characters for every page in page order.  Pages whose content cannot be
/// read are skipped.
pub fn extract_document_chars(backend: &dyn PdfBackend) -> Vec<CharRecord> {
    let mut chars = Vec::new();

    for (page_index, (&page_num, &page_id)) in backend.pages().iter().enumerate() {
        match extract_page_chars(backend, page_index, page_id) {
            Ok(page_chars) => chars.extend(page_chars),
            Err(e) => log::debug!("skipping page {page_num}: {e}"),
        }
    }

    chars
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
