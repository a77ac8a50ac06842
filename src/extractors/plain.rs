//! Extraction without character maps.
//!
//! Shown strings are decoded with the byte decoder chain. A second pass
//! picks up UTF-16 runs introduced by a byte order mark anywhere inside a
//! `BT`...`ET` block, which some producers write without string syntax.

use crate::config::ExtractOptions;
use crate::content::{text_operations, TextElement, TextOperation, TextString};
use crate::extractors::{render_array, Fragments};
use crate::text::decode_bytes;
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_TEXT_BLOCK: Regex = Regex::new(r"(?s-u)BT(.*?)ET").unwrap();
    static ref RE_UTF16_RUN: Regex = Regex::new(r"(?s-u)\xFE\xFF((?:.{2})+)").unwrap();
}

const BOM_UTF16_BE: &[u8] = b"\xFE\xFF";

/// Extract text from a content stream using byte-level decoding only.
pub fn extract_plain(content: &[u8], options: &ExtractOptions) -> String {
    let mut fragments = Fragments::default();

    for operation in text_operations(content) {
        match operation {
            TextOperation::SetFont(_) => {},
            TextOperation::Show(TextString::Literal(bytes) | TextString::Hex(bytes)) => {
                fragments.push(decode_bytes(&bytes));
            },
            TextOperation::ShowArray(elements) => {
                fragments.push(render_array(&elements, options.tj_space_threshold, decode_element));
            },
        }
    }

    for run in utf16_runs(content) {
        fragments.push(run);
    }

    fragments.join()
}

fn decode_element(element: &TextElement) -> String {
    match element {
        TextElement::Literal(bytes) | TextElement::Hex(bytes) => decode_bytes(bytes),
        TextElement::Adjustment(_) => String::new(),
    }
}

/// UTF-16BE runs following a byte order mark inside text blocks.
fn utf16_runs(content: &[u8]) -> Vec<String> {
    let mut runs = Vec::new();
    for block in RE_TEXT_BLOCK.captures_iter(content).filter_map(|c| c.get(1)) {
        let block = block.as_bytes();
        if !block.windows(2).any(|pair| pair == BOM_UTF16_BE) {
            continue;
        }
        for run in RE_UTF16_RUN.captures_iter(block).filter_map(|c| c.get(1)) {
            let units = run
                .as_bytes()
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            let text: String = char::decode_utf16(units).filter_map(|r| r.ok()).collect();
            log::trace!("UTF-16 run of {} bytes in text block", run.as_bytes().len());
            runs.push(text);
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(content: &[u8]) -> String {
        extract_plain(content, &ExtractOptions::default())
    }

    #[test]
    fn test_literal_show() {
        assert_eq!(plain(b"BT /F1 12 Tf 72 712 Td (Hello) Tj ET"), "Hello");
    }

    #[test]
    fn test_escaped_parentheses() {
        assert_eq!(plain(br"BT (f\(x\) = a\\b) Tj ET"), r"f(x) = a\b");
    }

    #[test]
    fn test_hex_show() {
        assert_eq!(plain(b"BT <48656C6C6F> Tj ET"), "Hello");
        assert_eq!(plain(b"BT <FEFF00480069> Tj ET"), "Hi");
    }

    #[test]
    fn test_document_order() {
        assert_eq!(plain(b"BT <41> Tj (B) Tj [(C) -500 (D)] TJ (E) ' ET"), "A B C D E");
    }

    #[test]
    fn test_array_spacing() {
        assert_eq!(plain(b"BT [(A) -150 (B)] TJ ET"), "A B");
        assert_eq!(plain(b"BT [(A) -20 (B)] TJ ET"), "AB");
    }

    #[test]
    fn test_blank_fragments_dropped() {
        assert_eq!(plain(b"BT ( ) Tj (x) Tj <00> Tj ET"), "x");
    }

    #[test]
    fn test_utf16_run_in_text_block() {
        let content = b"BT \xFE\xFF\x00H\x00i ET";
        // The run extends to the end of the block
        assert!(plain(content).starts_with("Hi"));
    }

    #[test]
    fn test_no_text() {
        assert_eq!(plain(b"0 0 m 100 100 l S"), "");
    }
}
