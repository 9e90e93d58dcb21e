use std::collections::{BTreeMap, HashSet};

use lopdf::{self, content::Content};

use super::cmap::ToUnicodeMap;
use crate::PdfError;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// A page identifier mirroring `lopdf::ObjectId`: (object number, generation number).
pub type PageId = (u32, u16);

/// Page height used when a page declares no usable MediaBox (US Letter).
pub const DEFAULT_PAGE_HEIGHT: f32 = 792.0;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Font information extracted from a page's resource dictionary.
#[derive(Debug, Clone, Default)]
pub struct BackendFontInfo {
    /// The resource key as it appears on the page (e.g. `b"F1"`).
    pub name: Vec<u8>,
    /// Base font name from the font dictionary, if present.
    pub base_font: Option<String>,
    /// Encoding name (`WinAnsiEncoding`, `Identity-H`, ...), if it is a name.
    pub encoding: Option<String>,
    /// Parsed ToUnicode CMap, if the font carries one.
    pub to_unicode: Option<ToUnicodeMap>,
}

impl BackendFontInfo {
    /// The name reported on character records: the base font, or the
    /// resource key when the dictionary has none.
    pub fn display_name(&self) -> String {
        self.base_font
            .clone()
            .unwrap_or_else(|| String::from_utf8_lossy(&self.name).into_owned())
    }

    fn is_identity_encoded(&self) -> bool {
        self.encoding
            .as_deref()
            .is_some_and(|enc| enc.contains("Identity"))
    }
}

/// A lopdf-independent view of a content-stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Dict(Vec<(Vec<u8>, PdfValue)>),
    Reference(PageId),
}

/// A single content-stream operation (operator + operands).
#[derive(Debug, Clone)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Extract an `f32` from a [`PdfValue`], accepting both `Integer` and `Real`.
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(f) => Some(*f),
        _ => None,
    }
}

/// Convert a `lopdf::Object` into a [`PdfValue`].  Stream bodies are dropped;
/// only their dictionaries survive.
pub fn convert_object(obj: &lopdf::Object) -> PdfValue {
    let dict_entries = |dict: &lopdf::Dictionary| -> Vec<(Vec<u8>, PdfValue)> {
        dict.iter()
            .map(|(k, v)| (k.clone(), convert_object(v)))
            .collect()
    };

    match obj {
        lopdf::Object::Null => PdfValue::Null,
        lopdf::Object::Boolean(b) => PdfValue::Bool(*b),
        lopdf::Object::Integer(i) => PdfValue::Integer(*i),
        lopdf::Object::Real(f) => PdfValue::Real(*f),
        lopdf::Object::Name(n) => PdfValue::Name(n.clone()),
        lopdf::Object::String(s, _) => PdfValue::Str(s.clone()),
        lopdf::Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        lopdf::Object::Dictionary(dict) => PdfValue::Dict(dict_entries(dict)),
        lopdf::Object::Stream(stream) => PdfValue::Dict(dict_entries(&stream.dict)),
        lopdf::Object::Reference(id) => PdfValue::Reference(*id),
    }
}

/// Best-effort decoding of string bytes with no font information:
/// UTF-16BE with BOM, then UTF-8, then Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if let Some(payload) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return utf16be_lossy(payload);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Decode string bytes shown with `font`.
///
/// A ToUnicode CMap wins when it yields text; Identity-encoded fonts are
/// then tried as UTF-16BE; everything else goes through
/// [`decode_text_simple`].
pub fn decode_with_font(font: Option<&BackendFontInfo>, bytes: &[u8]) -> String {
    if let Some(font) = font {
        if let Some(cmap) = &font.to_unicode {
            let decoded = cmap.decode(bytes);
            if !decoded.is_empty() {
                return decoded;
            }
        }

        if font.is_identity_encoded() && bytes.len() >= 2 && bytes.len().is_multiple_of(2) {
            let decoded = utf16be_lossy(bytes);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }
    }

    decode_text_simple(bytes)
}

fn name_entry(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key)
        .and_then(lopdf::Object::as_name)
        .ok()
        .map(|n| String::from_utf8_lossy(n).into_owned())
}

fn utf16be_lossy(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

// ---------------------------------------------------------------------------
// PdfBackend trait
// ---------------------------------------------------------------------------

/// Abstraction over the PDF parser so the glyph state machine can be driven
/// by mock pages in tests.
pub trait PdfBackend {
    /// Mapping from 1-based page number to [`PageId`].
    fn pages(&self) -> BTreeMap<u32, PageId>;

    /// Font information for every font referenced by the given page.
    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError>;

    /// Decompressed content stream bytes for a page.
    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError>;

    /// Decode content-stream bytes into a sequence of [`ContentOp`]s.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError>;

    /// Page height in user-space units, taken from the MediaBox.
    fn page_height(&self, page: PageId) -> Result<f32, PdfError>;

    /// Decode the bytes of a text-showing operand for the active font.
    fn decode_text(&self, font: Option<&BackendFontInfo>, bytes: &[u8]) -> String {
        decode_with_font(font, bytes)
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by [`lopdf::Document`].
pub struct LopdfBackend {
    doc: lopdf::Document,
}

impl LopdfBackend {
    /// Parse a PDF from an in-memory byte slice.  Encrypted documents are
    /// rejected.
    pub fn load_bytes(data: &[u8]) -> Result<Self, PdfError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        Ok(Self { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }

    /// Page dimensions `(width, height)` from the (possibly inherited)
    /// MediaBox `[llx lly urx ury]`.
    pub fn page_dimensions(&self, page: PageId) -> Result<(f32, f32), PdfError> {
        self.doc
            .get_object(page)
            .and_then(lopdf::Object::as_dict)
            .map_err(|e| PdfError::Parse(format!("cannot read page dictionary: {e}")))?;

        let media_box = self
            .find_media_box(page)
            .ok_or_else(|| PdfError::Parse("MediaBox not found for page".into()))?;

        let nums = self.array_to_f32s(&media_box)?;
        match nums.as_slice() {
            [llx, lly, urx, ury, ..] => Ok(((urx - llx).abs(), (ury - lly).abs())),
            _ => Err(PdfError::Parse(format!(
                "MediaBox has {} elements, expected 4",
                nums.len()
            ))),
        }
    }

    // -- private helpers ----------------------------------------------------

    /// Walk up the page tree to find the MediaBox array.  A node seen twice
    /// ends the walk with `None`.
    fn find_media_box(&self, page: PageId) -> Option<Vec<lopdf::Object>> {
        let mut visited = HashSet::new();
        let mut node = page;

        while visited.insert(node) {
            let dict = self
                .doc
                .get_object(node)
                .and_then(lopdf::Object::as_dict)
                .ok()?;
            if let Some(arr) = dict.get(b"MediaBox").ok().and_then(|o| self.resolve_array(o)) {
                return Some(arr);
            }
            node = dict
                .get(b"Parent")
                .and_then(lopdf::Object::as_reference)
                .ok()?;
        }

        log::debug!("page tree cycle at object {} {}", node.0, node.1);
        None
    }

    fn resolve_array(&self, obj: &lopdf::Object) -> Option<Vec<lopdf::Object>> {
        match obj {
            lopdf::Object::Array(arr) => Some(arr.clone()),
            lopdf::Object::Reference(id) => self
                .doc
                .get_object(*id)
                .and_then(lopdf::Object::as_array)
                .ok()
                .cloned(),
            _ => None,
        }
    }

    fn array_to_f32s(&self, objects: &[lopdf::Object]) -> Result<Vec<f32>, PdfError> {
        objects
            .iter()
            .map(|obj| {
                let resolved = match obj {
                    lopdf::Object::Reference(id) => self
                        .doc
                        .get_object(*id)
                        .map_err(|e| PdfError::Parse(e.to_string()))?,
                    other => other,
                };
                match resolved {
                    lopdf::Object::Integer(i) => Ok(*i as f32),
                    lopdf::Object::Real(f) => Ok(*f),
                    _ => Err(PdfError::Parse(format!(
                        "expected number in array, got {resolved:?}"
                    ))),
                }
            })
            .collect()
    }

    /// Load and parse a font's ToUnicode stream.  Missing or unreadable
    /// streams yield `None`.
    fn to_unicode(&self, font: &lopdf::Dictionary) -> Option<ToUnicodeMap> {
        let stream = match font.get(b"ToUnicode").ok()? {
            lopdf::Object::Reference(id) => self.doc.get_object(*id).ok()?.as_stream().ok()?,
            lopdf::Object::Stream(stream) => stream,
            _ => return None,
        };

        // Unfiltered streams have no decoder; their content is already plain.
        let body = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let cmap = ToUnicodeMap::parse(&String::from_utf8_lossy(&body));
        if cmap.is_empty() {
            return None;
        }
        log::debug!("ToUnicode CMap with {} mappings", cmap.len());
        Some(cmap)
    }
}

// ---------------------------------------------------------------------------
// PdfBackend implementation for LopdfBackend
// ---------------------------------------------------------------------------

impl PdfBackend for LopdfBackend {
    fn pages(&self) -> BTreeMap<u32, PageId> {
        self.doc.get_pages()
    }

    fn page_fonts(&self, page: PageId) -> Result<Vec<BackendFontInfo>, PdfError> {
        let fonts_map = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page fonts: {e}")))?;

        Ok(fonts_map
            .iter()
            .map(|(name, dict)| BackendFontInfo {
                name: name.clone(),
                base_font: name_entry(dict, b"BaseFont"),
                encoding: name_entry(dict, b"Encoding"),
                to_unicode: self.to_unicode(dict),
            })
            .collect())
    }

    fn page_content(&self, page: PageId) -> Result<Vec<u8>, PdfError> {
        self.doc
            .get_page_content(page)
            .map_err(|e| PdfError::Parse(format!("cannot get page content: {e}")))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>, PdfError> {
        let content = Content::decode(data)
            .map_err(|e| PdfError::Parse(format!("content stream decode error: {e}")))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn page_height(&self, page: PageId) -> Result<f32, PdfError> {
        self.page_dimensions(page).map(|(_, height)| height)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
