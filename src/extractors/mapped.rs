//! Extraction through font character maps.
//!
//! `Tf` selects the map the registry resolves for the font name. Hex strings
//! are then decoded code by code: two bytes first, then one byte, and an
//! unmapped two-byte code becomes the placeholder. Literal strings always go
//! through the byte decoder chain, as do hex strings while no map is
//! available.

use crate::config::ExtractOptions;
use crate::content::{text_operations, TextElement, TextOperation, TextString};
use crate::extractors::{render_array, Fragments};
use crate::fonts::{CharCode, CharMap, FontRegistry};
use crate::text::decode_bytes;
use std::sync::Arc;

/// Limit on missing codes reported per string.
const MISSING_CODES_REPORTED: usize = 16;

/// Font state carried across the operations of one stream.
struct MappedState<'r> {
    registry: &'r FontRegistry,
    options: &'r ExtractOptions,
    current_map: Option<Arc<CharMap>>,
}

impl<'r> MappedState<'r> {
    fn new(registry: &'r FontRegistry, options: &'r ExtractOptions) -> Self {
        Self {
            registry,
            options,
            current_map: None,
        }
    }

    fn set_font(&mut self, name: &str) {
        match self.registry.resolve(name) {
            Some(map) => self.current_map = Some(Arc::clone(map)),
            // Keep the previous map
            None => log::debug!("No character map for font {}", name),
        }
    }

    fn decode_string(&self, string: &TextString) -> String {
        match string {
            TextString::Literal(bytes) => decode_bytes(bytes),
            TextString::Hex(bytes) => self.decode_hex(bytes),
        }
    }

    fn decode_element(&self, element: &TextElement) -> String {
        match element {
            TextElement::Literal(bytes) => decode_bytes(bytes),
            TextElement::Hex(bytes) => self.decode_hex(bytes),
            TextElement::Adjustment(_) => String::new(),
        }
    }

    fn decode_hex(&self, bytes: &[u8]) -> String {
        match &self.current_map {
            Some(map) => decode_codes(bytes, map, self.options.missing_glyph_placeholder),
            None => decode_bytes(bytes),
        }
    }
}

/// Decode character codes through `map`.
///
/// Each position tries a two-byte code, then a one-byte code. A two-byte
/// code neither matches emits `placeholder`; a lone trailing byte is skipped.
pub fn decode_codes(bytes: &[u8], map: &CharMap, placeholder: char) -> String {
    let mut text = String::new();
    let mut missing = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if let Some(mapped) = bytes.get(i..i + 2).and_then(|code| map.lookup(code)) {
            text.push_str(mapped);
            i += 2;
        } else if let Some(mapped) = map.lookup(&bytes[i..i + 1]) {
            text.push_str(mapped);
            i += 1;
        } else if i + 2 <= bytes.len() {
            if missing.len() < MISSING_CODES_REPORTED {
                missing.push(CharCode::new((u32::from(bytes[i]) << 8) | u32::from(bytes[i + 1]), 2));
            }
            text.push(placeholder);
            i += 2;
        } else {
            i += 1;
        }
    }

    if !missing.is_empty() && log::log_enabled!(log::Level::Debug) {
        let codes: Vec<String> = missing.iter().map(CharCode::to_hex).collect();
        log::debug!("Text: {:?}", text);
        log::debug!("Missing codes: {}", codes.join(" "));
    }

    text
}

/// Extract text from a content stream, decoding hex strings through the
/// maps of `registry`.
pub fn extract_mapped(content: &[u8], registry: &FontRegistry, options: &ExtractOptions) -> String {
    let mut state = MappedState::new(registry, options);
    let mut fragments = Fragments::default();

    for operation in text_operations(content) {
        match operation {
            TextOperation::SetFont(name) => state.set_font(&name),
            TextOperation::Show(string) => fragments.push(state.decode_string(&string)),
            TextOperation::ShowArray(elements) => {
                let text = render_array(&elements, options.tj_space_threshold, |element| {
                    state.decode_element(element)
                });
                fragments.push(text);
            },
        }
    }

    fragments.join()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::parse_tounicode_cmap;

    fn registry(entries: &[(&str, &str)]) -> FontRegistry {
        let mut registry = FontRegistry::new();
        for (name, cmap) in entries {
            let map = Arc::new(parse_tounicode_cmap(cmap.as_bytes(), 256).unwrap());
            registry.register(name, &map);
        }
        registry
    }

    const UPPERCASE: &str = "beginbfrange <0041> <005A> <0041> endbfrange";

    #[test]
    fn test_bfchar_lookup() {
        let fonts = registry(&[("F1", "beginbfchar <0041> <0041> endbfchar")]);
        let text = extract_mapped(b"BT /F1 12 Tf <0041> Tj ET", &fonts, &ExtractOptions::default());
        assert_eq!(text, "A");
    }

    #[test]
    fn test_bfrange_lookup() {
        let fonts = registry(&[("F1", UPPERCASE)]);
        let text = extract_mapped(
            b"BT /F1 12 Tf <0041004200430058005A> Tj ET",
            &fonts,
            &ExtractOptions::default(),
        );
        assert_eq!(text, "ABCXZ");
    }

    #[test]
    fn test_missing_code_placeholder() {
        let fonts = registry(&[("F1", UPPERCASE)]);
        let text = extract_mapped(b"/F1 1 Tf <00410999> Tj", &fonts, &ExtractOptions::default());
        assert_eq!(text, "A?");

        let options = ExtractOptions::default().with_missing_glyph_placeholder('\u{FFFD}');
        let text = extract_mapped(b"/F1 1 Tf <0999> Tj", &fonts, &options);
        assert_eq!(text, "\u{FFFD}");
    }

    #[test]
    fn test_one_byte_codes() {
        let fonts = registry(&[("F1", "beginbfchar <01> <0061> <02> <0062> endbfchar")]);
        let text = extract_mapped(b"/F1 1 Tf <010201> Tj", &fonts, &ExtractOptions::default());
        assert_eq!(text, "aba");
    }

    #[test]
    fn test_trailing_byte_skipped() {
        let map = parse_tounicode_cmap(UPPERCASE.as_bytes(), 256).unwrap();
        assert_eq!(decode_codes(&[0x00, 0x41, 0x7F], &map, '?'), "A");
    }

    #[test]
    fn test_tj_array_spacing() {
        let fonts = registry(&[("F1", UPPERCASE)]);
        let options = ExtractOptions::default();
        let text = extract_mapped(b"/F1 1 Tf [<0041> -150 <0042>] TJ", &fonts, &options);
        assert_eq!(text, "A B");
        let text = extract_mapped(b"/F1 1 Tf [<0041> -20 <0042>] TJ", &fonts, &options);
        assert_eq!(text, "AB");
    }

    #[test]
    fn test_font_switch() {
        let fonts = registry(&[
            ("F1", UPPERCASE),
            ("F2", "beginbfchar <0041> <0105> endbfchar"),
        ]);
        let text = extract_mapped(
            b"BT /F1 1 Tf <0041> Tj /F2 1 Tf <0041> Tj ET",
            &fonts,
            &ExtractOptions::default(),
        );
        assert_eq!(text, "A \u{105}");
    }

    #[test]
    fn test_literal_bypasses_map() {
        let fonts = registry(&[("F1", "beginbfchar <48> <0058> endbfchar")]);
        let text = extract_mapped(b"/F1 1 Tf (Hi) Tj", &fonts, &ExtractOptions::default());
        assert_eq!(text, "Hi");
    }

    #[test]
    fn test_no_map_uses_decoder_chain() {
        let fonts = FontRegistry::new();
        let text = extract_mapped(b"BT <00480069> Tj <48656C6C6F> Tj ET", &fonts, &ExtractOptions::default());
        assert_eq!(text, "Hi Hello");
    }
}
