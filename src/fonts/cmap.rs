//! ToUnicode CMap parser.
//!
//! A ToUnicode CMap maps the character codes a content stream shows to
//! Unicode text. Only the two mapping operators matter for extraction:
//!
//! ```text
//! beginbfchar
//! <0041> <0041>                      % code 0x0041 -> "A"
//! <0003> <00660069>                  % code 0x0003 -> "fi"
//! endbfchar
//!
//! beginbfrange
//! <0020> <007E> <0020>               % 0x20..=0x7E -> U+0020..=U+007E
//! <005F> <0061> [<0066> <0067> <0068>]
//! endbfrange
//! ```
//!
//! Everything else in the stream (codespace ranges, CMap names, PostScript
//! boilerplate) is ignored.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;

lazy_static! {
    /// `<src> <dst>`
    static ref RE_BFCHAR: Regex = Regex::new(r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>").unwrap();

    /// `<start> <end> <base>` or `<start> <end> [<v0> <v1> ...]`
    static ref RE_BFRANGE: Regex = Regex::new(
        r"<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*(?:<([0-9A-Fa-f]+)>|\[((?:\s*<[0-9A-Fa-f]+>)*)\s*\])"
    ).unwrap();

    static ref RE_HEX: Regex = Regex::new(r"<([0-9A-Fa-f]+)>").unwrap();
}

/// A character code together with its width in bytes.
///
/// `<41>` and `<0041>` are different codes: a content stream showing the
/// single byte 0x41 must not pick up a mapping written for the two-byte
/// code 0x0041.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharCode {
    /// Numeric value of the code
    pub code: u32,
    /// Width in bytes (1 to 4)
    pub width: u8,
}

impl CharCode {
    /// Create a code of the given byte width.
    pub fn new(code: u32, width: u8) -> Self {
        Self { code, width }
    }

    /// Parse a hex code as written in a CMap or a content stream.
    ///
    /// The width is the number of bytes the digits describe, rounded up.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if hex.is_empty() || hex.len() > 8 {
            return None;
        }
        let code = u32::from_str_radix(hex, 16).ok()?;
        Some(Self::new(code, hex.len().div_ceil(2) as u8))
    }

    /// Build a code from raw bytes, big-endian.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.is_empty() || bytes.len() > 4 {
            return None;
        }
        let code = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
        Some(Self::new(code, bytes.len() as u8))
    }

    /// Upper-case hex form, two digits per byte (`0041`).
    pub fn to_hex(&self) -> String {
        format!("{:0width$X}", self.code, width = usize::from(self.width) * 2)
    }
}

/// Mapping from character codes to Unicode text.
///
/// Ordered by code so that iteration and diagnostics are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharMap {
    entries: BTreeMap<CharCode, String>,
}

impl CharMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a code, replacing any previous mapping.
    pub fn insert(&mut self, code: CharCode, text: String) {
        self.entries.insert(code, text);
    }

    /// Map a code only if it is not mapped yet. Returns whether it was added.
    pub fn insert_if_absent(&mut self, code: CharCode, text: &str) -> bool {
        if self.entries.contains_key(&code) {
            return false;
        }
        self.entries.insert(code, text.to_string());
        true
    }

    /// Copy every mapping of `other` whose code is still unmapped here.
    ///
    /// Existing mappings always win. Returns the number of codes added.
    pub fn fill_missing(&mut self, other: &CharMap) -> usize {
        other
            .iter()
            .filter(|(code, text)| self.insert_if_absent(*code, text))
            .count()
    }

    /// Text mapped to `code`.
    pub fn get(&self, code: &CharCode) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    /// Text mapped to the code spelled by `bytes` (1 to 4 bytes).
    pub fn lookup(&self, bytes: &[u8]) -> Option<&str> {
        self.get(&CharCode::from_bytes(bytes)?)
    }

    /// Whether any mapping produces `ch`.
    pub fn produces(&self, ch: char) -> bool {
        self.entries.values().any(|text| text.contains(ch))
    }

    /// Number of mapped codes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no code is mapped.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mappings in code order.
    pub fn iter(&self) -> impl Iterator<Item = (CharCode, &str)> {
        self.entries.iter().map(|(code, text)| (*code, text.as_str()))
    }
}

impl FromIterator<(CharCode, String)> for CharMap {
    fn from_iter<I: IntoIterator<Item = (CharCode, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Parse a decoded ToUnicode CMap stream.
///
/// Within one CMap a later entry for the same code replaces an earlier one.
/// Range entries expand to at most `max_range_span` codes each. A stream
/// without any `bfchar` or `bfrange` section is an error.
pub fn parse_tounicode_cmap(data: &[u8], max_range_span: u32) -> Result<CharMap> {
    let content = stream_text(data);
    let mut map = CharMap::new();

    let bfchar = extract_sections(&content, "beginbfchar", "endbfchar");
    let bfrange = extract_sections(&content, "beginbfrange", "endbfrange");
    if bfchar.is_empty() && bfrange.is_empty() {
        return Err(Error::CMap("no bfchar or bfrange section".to_string()));
    }

    for section in bfchar {
        for captures in RE_BFCHAR.captures_iter(section) {
            match parse_bfchar_entry(&captures[1], &captures[2]) {
                Some((code, text)) => {
                    log::trace!("ToUnicode bfchar: <{}> -> {:?}", code.to_hex(), text);
                    map.insert(code, text);
                },
                None => log::debug!("Skipping bfchar entry <{}> <{}>", &captures[1], &captures[2]),
            }
        }
    }

    for section in bfrange {
        for captures in RE_BFRANGE.captures_iter(section) {
            let (Some(start), Some(end)) = (CharCode::from_hex(&captures[1]), CharCode::from_hex(&captures[2]))
            else {
                log::debug!("Skipping bfrange entry <{}> <{}>", &captures[1], &captures[2]);
                continue;
            };
            let mappings = match (captures.get(3), captures.get(4)) {
                (Some(base), _) => expand_range(start, end.code, base.as_str(), max_range_span),
                (None, Some(array)) => expand_array(start, end.code, array.as_str()),
                (None, None) => Vec::new(),
            };
            log::trace!(
                "ToUnicode bfrange <{}> <{}>: {} mappings",
                start.to_hex(),
                end.to_hex(),
                mappings.len()
            );
            for (code, text) in mappings {
                map.insert(code, text);
            }
        }
    }

    Ok(map)
}

/// Decode a destination string.
///
/// Up to four hex digits are a single code point; longer strings are
/// UTF-16BE (surrogate pairs, ligatures). Unpaired surrogates are dropped,
/// and a destination that decodes to nothing is rejected.
pub fn decode_destination(hex: &str) -> Option<String> {
    if hex.len() <= 4 {
        let value = u32::from_str_radix(hex, 16).ok()?;
        return char::from_u32(value).map(String::from);
    }

    let units: Vec<u16> = hex
        .as_bytes()
        .chunks(4)
        .filter(|chunk| chunk.len() == 4)
        .filter_map(|chunk| u16::from_str_radix(std::str::from_utf8(chunk).ok()?, 16).ok())
        .collect();
    let text: String = char::decode_utf16(units).filter_map(|c| c.ok()).collect();
    (!text.is_empty()).then_some(text)
}

/// CMap streams are ASCII in practice; anything else is read as Latin-1.
fn stream_text(data: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(data.iter().map(|&b| b as char).collect()),
    }
}

/// Extract sections between begin and end markers.
fn extract_sections<'a>(content: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut sections = Vec::new();
    let mut remaining = content;

    while let Some(begin_pos) = remaining.find(begin) {
        let after_begin = &remaining[begin_pos + begin.len()..];
        if let Some(end_pos) = after_begin.find(end) {
            sections.push(&after_begin[..end_pos]);
            remaining = &after_begin[end_pos + end.len()..];
        } else {
            break;
        }
    }

    sections
}

fn parse_bfchar_entry(src: &str, dst: &str) -> Option<(CharCode, String)> {
    Some((CharCode::from_hex(src)?, decode_destination(dst)?))
}

/// `<start> <end> <base>`: code `start + i` maps to `base + i`.
///
/// A multi-character base keeps its prefix and advances its last character.
fn expand_range(start: CharCode, end: u32, base: &str, max_span: u32) -> Vec<(CharCode, String)> {
    let (prefix, first) = if base.len() <= 4 {
        match u32::from_str_radix(base, 16) {
            Ok(value) => (String::new(), value),
            Err(_) => return Vec::new(),
        }
    } else {
        let Some(mut text) = decode_destination(base) else {
            return Vec::new();
        };
        match text.pop() {
            Some(last) => (text, u32::from(last)),
            None => return Vec::new(),
        }
    };

    let last = end.min(start.code.saturating_add(max_span.max(1) - 1));
    if last < end {
        log::debug!(
            "bfrange <{}> truncated to {} codes",
            start.to_hex(),
            max_span.max(1)
        );
    }

    (start.code..=last)
        .filter_map(|code| {
            let ch = char::from_u32(first.checked_add(code - start.code)?)?;
            let mut text = prefix.clone();
            text.push(ch);
            Some((CharCode::new(code, start.width), text))
        })
        .collect()
}

/// `<start> <end> [<v0> <v1> ...]`: code `start + i` maps to `v_i`.
fn expand_array(start: CharCode, end: u32, array: &str) -> Vec<(CharCode, String)> {
    let values: Vec<&str> = RE_HEX
        .captures_iter(array)
        .filter_map(|captures| captures.get(1))
        .map(|m| m.as_str())
        .collect();

    let expected = end.saturating_sub(start.code) as usize + 1;
    if end < start.code || values.len() != expected {
        log::warn!(
            "ToUnicode bfrange array size mismatch: expected {} entries for range 0x{:X}-0x{:X}, got {}",
            expected,
            start.code,
            end,
            values.len()
        );
    }
    if end < start.code {
        return Vec::new();
    }

    values
        .iter()
        .take(expected)
        .enumerate()
        .filter_map(|(i, value)| {
            let code = start.code.checked_add(i as u32)?;
            Some((CharCode::new(code, start.width), decode_destination(value)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> CharMap {
        parse_tounicode_cmap(data, 256).unwrap()
    }

    fn hex(map: &CharMap, code: &str) -> Option<String> {
        map.get(&CharCode::from_hex(code).unwrap()).map(str::to_string)
    }

    #[test]
    fn test_char_code_hex() {
        let code = CharCode::from_hex("41").unwrap();
        assert_eq!(code, CharCode::new(0x41, 1));
        assert_eq!(code.to_hex(), "41");
        assert_eq!(CharCode::from_hex("0041").unwrap().to_hex(), "0041");
        assert_eq!(CharCode::from_hex("abc").unwrap(), CharCode::new(0xABC, 2));
        assert_eq!(CharCode::from_hex(""), None);
        assert_eq!(CharCode::from_hex("123456789"), None);
        assert_eq!(CharCode::from_bytes(&[0x01, 0x02]), Some(CharCode::new(0x0102, 2)));
    }

    #[test]
    fn test_parse_bfchar_single() {
        let map = parse(b"beginbfchar\n<0041> <0041>\nendbfchar");
        assert_eq!(hex(&map, "0041").as_deref(), Some("A"));
        assert_eq!(map.len(), 1);
        // Width matters
        assert_eq!(hex(&map, "41"), None);
    }

    #[test]
    fn test_parse_bfchar_several_per_line() {
        let map = parse(b"2 beginbfchar <01><0061><02> <0062>\nendbfchar");
        assert_eq!(hex(&map, "01").as_deref(), Some("a"));
        assert_eq!(hex(&map, "02").as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_bfchar_polish_and_ligature() {
        let map = parse(b"beginbfchar\n<0003> <0105>\n<0004> <00660069>\n<0005> <D835DF0C>\nendbfchar");
        assert_eq!(hex(&map, "0003").as_deref(), Some("ą"));
        assert_eq!(hex(&map, "0004").as_deref(), Some("fi"));
        assert_eq!(hex(&map, "0005").as_deref(), Some("\u{1D70C}"));
    }

    #[test]
    fn test_parse_bfrange_inclusive() {
        let map = parse(b"beginbfrange\n<0041> <005A> <0041>\nendbfrange");
        assert_eq!(map.len(), 26);
        assert_eq!(hex(&map, "0041").as_deref(), Some("A"));
        assert_eq!(hex(&map, "004D").as_deref(), Some("M"));
        assert_eq!(hex(&map, "005A").as_deref(), Some("Z"));
        assert_eq!(hex(&map, "005B"), None);
    }

    #[test]
    fn test_parse_bfrange_keeps_start_width() {
        let map = parse(b"beginbfrange\n<20> <22> <0020>\nendbfrange");
        assert_eq!(hex(&map, "21").as_deref(), Some("!"));
        assert_eq!(hex(&map, "0021"), None);
    }

    #[test]
    fn test_parse_bfrange_span_cap() {
        let map = parse_tounicode_cmap(b"beginbfrange\n<0000> <FFFF> <0020>\nendbfrange", 256).unwrap();
        assert_eq!(map.len(), 256);
        assert!(hex(&map, "00FF").is_some());
        assert!(hex(&map, "0100").is_none());

        let map = parse_tounicode_cmap(b"beginbfrange\n<0000> <FFFF> <0020>\nendbfrange", 4).unwrap();
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_parse_bfrange_skips_invalid_scalars() {
        let map = parse(b"beginbfrange\n<0000> <0003> <D7FE>\nendbfrange");
        // D7FE, D7FF are valid; D800, D801 are surrogates
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_parse_bfrange_array() {
        let map = parse(b"beginbfrange\n<005F> <0061> [<00660066> <00660069> <00660066006C>]\nendbfrange");
        assert_eq!(hex(&map, "005F").as_deref(), Some("ff"));
        assert_eq!(hex(&map, "0060").as_deref(), Some("fi"));
        assert_eq!(hex(&map, "0061").as_deref(), Some("ffl"));
    }

    #[test]
    fn test_parse_bfrange_array_honours_end() {
        let map = parse(b"beginbfrange\n<0001> <0002> [<0041> <0042> <0043>]\nendbfrange");
        assert_eq!(map.len(), 2);
        assert_eq!(hex(&map, "0003"), None);
    }

    #[test]
    fn test_parse_bfrange_multi_char_base() {
        let map = parse(b"beginbfrange\n<0001> <0002> <00660069>\nendbfrange");
        assert_eq!(hex(&map, "0001").as_deref(), Some("fi"));
        assert_eq!(hex(&map, "0002").as_deref(), Some("fj"));
    }

    #[test]
    fn test_later_entry_replaces_earlier() {
        let map = parse(b"beginbfchar\n<0041> <0058>\nendbfchar\nbeginbfrange\n<0041> <0042> <0041>\nendbfrange");
        assert_eq!(hex(&map, "0041").as_deref(), Some("A"));
    }

    #[test]
    fn test_parse_no_sections() {
        assert!(parse_tounicode_cmap(b"/CIDInit /ProcSet findresource", 256).is_err());
    }

    #[test]
    fn test_parse_latin1_stream() {
        let map = parse(b"% \xe9t\xe9\nbeginbfchar\n<01> <00E9>\nendbfchar");
        assert_eq!(hex(&map, "01").as_deref(), Some("é"));
    }

    #[test]
    fn test_fill_missing_never_overwrites() {
        let mut primary = parse(b"beginbfchar\n<0041> <0041>\nendbfchar");
        let fallback = parse(b"beginbfchar\n<0041> <0058>\n<0042> <0042>\nendbfchar");
        assert_eq!(primary.fill_missing(&fallback), 1);
        assert_eq!(hex(&primary, "0041").as_deref(), Some("A"));
        assert_eq!(hex(&primary, "0042").as_deref(), Some("B"));
    }

    #[test]
    fn test_decode_destination() {
        assert_eq!(decode_destination("41").as_deref(), Some("A"));
        assert_eq!(decode_destination("0142").as_deref(), Some("ł"));
        assert_eq!(decode_destination("D800"), None);
        assert_eq!(decode_destination("D800D800"), None);
        assert_eq!(decode_destination("0041D800").as_deref(), Some("A"));
    }

    #[test]
    fn test_extract_sections() {
        let content = "x beginbfchar A endbfchar y beginbfchar B endbfchar beginbfchar C";
        assert_eq!(extract_sections(content, "beginbfchar", "endbfchar"), vec![" A ", " B "]);
        assert!(extract_sections("nothing", "beginbfchar", "endbfchar").is_empty());
    }
}
