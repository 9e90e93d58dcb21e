//! ToUnicode CMap parsing.
//!
//! Only the parts needed to turn character codes back into text are read:
//! the width of the first code space range and the `bfchar` / `bfrange`
//! mappings.  Everything else in the CMap program is skipped.
//!
//! ```text
//! 1 begincodespacerange <0000> <FFFF> endcodespacerange
//! 2 beginbfchar <0003> <0020> <0011> <0041> endbfchar
//! 1 beginbfrange <0012> <0014> <0042> endbfrange
//! ```

use std::collections::HashMap;

/// Ranges wider than this are treated as corrupt and ignored.
const MAX_RANGE_SPAN: u32 = 0xFFFF;

/// Code width used when the CMap never states one.
const DEFAULT_CODE_LEN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token<'a> {
    Hex(&'a str),
    ArrayOpen,
    ArrayClose,
    Word(&'a str),
}

/// Mapping from character codes to Unicode text for one font.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicodeMap {
    code_len: usize,
    map: HashMap<u32, String>,
}

impl ToUnicodeMap {
    /// Parse the (decompressed) body of a ToUnicode stream.
    pub fn parse(src: &str) -> Self {
        let tokens = tokenize(src);
        let mut code_len: Option<usize> = None;
        let mut map = HashMap::new();

        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                Token::Word("begincodespacerange") => {
                    if let Some(Token::Hex(lo)) = tokens.get(i + 1) {
                        code_len.get_or_insert(hex_bytes(lo).len());
                    }
                }
                Token::Word("beginbfchar") => {
                    i = read_bfchar(&tokens, i + 1, &mut code_len, &mut map);
                    continue;
                }
                Token::Word("beginbfrange") => {
                    i = read_bfrange(&tokens, i + 1, &mut code_len, &mut map);
                    continue;
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            code_len: code_len.filter(|&n| n > 0).unwrap_or(DEFAULT_CODE_LEN),
            map,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Bytes per character code.
    pub fn code_len(&self) -> usize {
        self.code_len
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }

    /// Decode a shown string.  Codes without a mapping produce no text.
    pub fn decode(&self, bytes: &[u8]) -> String {
        bytes
            .chunks(self.code_len)
            .filter_map(|chunk| self.get(code_of(chunk)))
            .collect()
    }
}

fn read_bfchar(
    tokens: &[Token<'_>],
    mut i: usize,
    code_len: &mut Option<usize>,
    map: &mut HashMap<u32, String>,
) -> usize {
    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) = (tokens.get(i), tokens.get(i + 1)) {
        let src = hex_bytes(src);
        code_len.get_or_insert(src.len());
        map.insert(code_of(&src), utf16_text(&utf16_units(dst)));
        i += 2;
    }
    i + 1
}

fn read_bfrange(
    tokens: &[Token<'_>],
    mut i: usize,
    code_len: &mut Option<usize>,
    map: &mut HashMap<u32, String>,
) -> usize {
    while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) = (tokens.get(i), tokens.get(i + 1)) {
        let lo = hex_bytes(lo);
        code_len.get_or_insert(lo.len());
        let lo = code_of(&lo);
        let hi = code_of(&hex_bytes(hi));
        let in_bounds = hi >= lo && hi - lo <= MAX_RANGE_SPAN;

        match tokens.get(i + 2) {
            Some(Token::Hex(dst)) => {
                if in_bounds {
                    let base = utf16_units(dst);
                    for (offset, code) in (lo..=hi).enumerate() {
                        map.insert(code, utf16_text(&bump_last(&base, offset)));
                    }
                }
                i += 3;
            }
            Some(Token::ArrayOpen) => {
                let mut j = i + 3;
                let mut code = lo;
                while let Some(Token::Hex(dst)) = tokens.get(j) {
                    if in_bounds && code <= hi {
                        map.insert(code, utf16_text(&utf16_units(dst)));
                    }
                    code = code.saturating_add(1);
                    j += 1;
                }
                if let Some(Token::ArrayClose) = tokens.get(j) {
                    j += 1;
                }
                i = j;
            }
            _ => break,
        }
    }
    i + 1
}

/// Add `offset` to the last UTF-16 unit of a range destination.
fn bump_last(units: &[u16], offset: usize) -> Vec<u16> {
    let mut out = units.to_vec();
    if let Some(last) = out.last_mut() {
        *last = last.wrapping_add(offset as u16);
    }
    out
}

fn tokenize(src: &str) -> Vec<Token<'_>> {
    let bytes = src.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b if b.is_ascii_whitespace() => i += 1,
            b'%' => {
                while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
                    i += 1;
                }
            }
            b'[' => {
                tokens.push(Token::ArrayOpen);
                i += 1;
            }
            b']' => {
                tokens.push(Token::ArrayClose);
                i += 1;
            }
            b'<' if bytes.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Word("<<"));
                i += 2;
            }
            b'>' if bytes.get(i + 1) == Some(&b'>') => {
                tokens.push(Token::Word(">>"));
                i += 2;
            }
            b'<' => {
                let start = i + 1;
                let end = bytes[start..]
                    .iter()
                    .position(|&b| b == b'>')
                    .map_or(bytes.len(), |p| start + p);
                tokens.push(Token::Hex(&src[start..end]));
                i = end + 1;
            }
            b'(' => {
                // Literal strings carry nothing we map; skip them whole.
                let mut depth = 0usize;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\\' => i += 1,
                        b'(' => depth += 1,
                        b')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    i += 1;
                }
                i += 1;
            }
            _ => {
                let start = i;
                i += 1;
                while i < bytes.len() && !is_delimiter(bytes[i]) {
                    i += 1;
                }
                tokens.push(Token::Word(&src[start..i]));
            }
        }
    }

    tokens
}

fn is_delimiter(b: u8) -> bool {
    b.is_ascii_whitespace() || matches!(b, b'[' | b']' | b'<' | b'>' | b'(' | b')' | b'%' | b'/')
}

/// Hex digits to bytes.  A trailing odd digit is padded with zero.
fn hex_bytes(hex: &str) -> Vec<u8> {
    let digits: Vec<u8> = hex
        .chars()
        .filter_map(|c| c.to_digit(16))
        .map(|d| d as u8)
        .collect();
    digits
        .chunks(2)
        .map(|pair| (pair[0] << 4) | pair.get(1).copied().unwrap_or(0))
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b))
}

fn utf16_units(hex: &str) -> Vec<u16> {
    hex_bytes(hex)
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect()
}

fn utf16_text(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
3 beginbfchar
<0003> <0020>
<0011> <0041>
<0050> <00660066>
endbfchar
2 beginbfrange
<0012> <0014> <0042>
<0020> <0021> [<0061> <0062>]
endbfrange
endcmap
"#;

    // -----------------------------------------------------------------------
    // parse
    // -----------------------------------------------------------------------

    #[test]
    fn test_parse_bfchar() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.code_len(), 2);
        assert_eq!(cmap.get(0x0003), Some(" "));
        assert_eq!(cmap.get(0x0011), Some("A"));
    }

    #[test]
    fn test_parse_ligature_destination() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.get(0x0050), Some("ff"));
    }

    #[test]
    fn test_parse_bfrange_increments() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.get(0x0012), Some("B"));
        assert_eq!(cmap.get(0x0013), Some("C"));
        assert_eq!(cmap.get(0x0014), Some("D"));
        assert_eq!(cmap.get(0x0015), None);
    }

    #[test]
    fn test_parse_bfrange_array() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.get(0x0020), Some("a"));
        assert_eq!(cmap.get(0x0021), Some("b"));
        assert_eq!(cmap.len(), 8);
    }

    #[test]
    fn test_parse_single_byte_codes() {
        let cmap = ToUnicodeMap::parse("1 beginbfchar <41> <0058> endbfchar");
        assert_eq!(cmap.code_len(), 1);
        assert_eq!(cmap.decode(b"AA"), "XX");
    }

    #[test]
    fn test_parse_garbage_is_empty() {
        let cmap = ToUnicodeMap::parse("%!PS (not a cmap) << /Foo 1 >> def");
        assert!(cmap.is_empty());
        assert_eq!(cmap.code_len(), DEFAULT_CODE_LEN);
    }

    #[test]
    fn test_parse_inverted_range_ignored() {
        let cmap = ToUnicodeMap::parse("1 beginbfrange <0010> <0005> <0041> endbfrange");
        assert!(cmap.is_empty());
    }

    // -----------------------------------------------------------------------
    // decode
    // -----------------------------------------------------------------------

    #[test]
    fn test_decode_two_byte_codes() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        let bytes = [0x00, 0x11, 0x00, 0x03, 0x00, 0x12];
        assert_eq!(cmap.decode(&bytes), "A B");
    }

    #[test]
    fn test_decode_skips_unmapped() {
        let cmap = ToUnicodeMap::parse(SAMPLE);
        assert_eq!(cmap.decode(&[0x00, 0x11, 0x07, 0x77]), "A");
    }

    #[test]
    fn test_hex_bytes_pads_odd_digit() {
        assert_eq!(hex_bytes("4"), vec![0x40]);
        assert_eq!(hex_bytes("00 41"), vec![0x00, 0x41]);
    }
}
