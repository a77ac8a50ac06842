//! Document classification by byte-pattern presence.
//!
//! The analysis is a heuristic dispatcher: its flags decide whether the font
//! registry is built and which extraction strategy runs. The document kind
//! is informational only.

use crate::object::find_bytes;
use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use serde::Serialize;

lazy_static! {
    static ref RE_LITERAL_TJ: Regex = Regex::new(r"(?-u)\([^)]+\)\s*Tj").unwrap();
    static ref RE_HEX_STRING: Regex = Regex::new(r"<[0-9A-Fa-f]{4,}>").unwrap();
    static ref RE_BASE_FONT: Regex = Regex::new(r"(?-u)/BaseFont\s*/([^\s/>]+)").unwrap();
}

/// Coarse origin/encoding class of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Nothing recognizable
    #[default]
    Unknown,
    /// Literal strings shown with `Tj`
    Simple,
    /// Hex (usually CID) strings
    Complex,
    /// Produced by Microsoft Word or another Office tool
    Microsoft,
    /// Produced by PowerPoint
    PowerPoint,
}

/// Result of [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DocumentAnalysis {
    /// Document class
    pub kind: DocumentKind,
    /// A `(...) Tj` pattern occurs somewhere
    pub has_literal_text: bool,
    /// A hex string of at least 4 digits occurs somewhere
    pub has_hex_text: bool,
    /// `/ToUnicode` occurs somewhere
    pub has_tounicode: bool,
    /// `/ObjStm` occurs somewhere
    pub has_object_streams: bool,
    /// `/BaseFont` names in first-seen order, without duplicates
    pub fonts: Vec<String>,
}

impl DocumentAnalysis {
    /// Whether character maps are worth building for this document.
    pub fn wants_font_registry(&self) -> bool {
        self.has_tounicode || self.has_hex_text
    }
}

/// Classify a document from its raw bytes.
pub fn analyze(bytes: &[u8]) -> DocumentAnalysis {
    let mut analysis = DocumentAnalysis::default();
    let contains = |needle: &[u8]| find_bytes(bytes, needle).is_some();

    if RE_LITERAL_TJ.is_match(bytes) {
        analysis.has_literal_text = true;
        analysis.kind = DocumentKind::Simple;
    }
    if RE_HEX_STRING.is_match(bytes) {
        analysis.has_hex_text = true;
        analysis.kind = DocumentKind::Complex;
    }
    analysis.has_tounicode = contains(b"/ToUnicode");
    analysis.has_object_streams = contains(b"/ObjStm");

    let fonts: IndexSet<String> = RE_BASE_FONT
        .captures_iter(bytes)
        .filter_map(|captures| captures.get(1))
        .map(|name| name.as_bytes().iter().map(|&b| b as char).collect())
        .collect();
    analysis.fonts = fonts.into_iter().collect();

    let mentions_powerpoint = contains(b"PowerPoint");
    if contains(b"Microsoft") || contains(b"Word") {
        analysis.kind = DocumentKind::Microsoft;
    } else if mentions_powerpoint || contains(b"powerpoint") {
        analysis.kind = DocumentKind::PowerPoint;
    }
    if (contains(b"/Producer") || contains(b"/Creator")) && mentions_powerpoint {
        analysis.kind = DocumentKind::PowerPoint;
    }

    log::debug!(
        "Document analysis: {:?}, literal={}, hex={}, tounicode={}, objstm={}, {} fonts",
        analysis.kind,
        analysis.has_literal_text,
        analysis.has_hex_text,
        analysis.has_tounicode,
        analysis.has_object_streams,
        analysis.fonts.len()
    );
    analysis
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        let analysis = analyze(b"");
        assert_eq!(analysis, DocumentAnalysis::default());
        assert!(!analysis.wants_font_registry());
    }

    #[test]
    fn test_literal_then_hex() {
        let analysis = analyze(b"BT (Hello) Tj ET");
        assert_eq!(analysis.kind, DocumentKind::Simple);
        assert!(analysis.has_literal_text);
        assert!(!analysis.has_hex_text);

        let analysis = analyze(b"BT (Hello) Tj <00410042> Tj ET");
        assert_eq!(analysis.kind, DocumentKind::Complex);
        assert!(analysis.has_hex_text);
        assert!(analysis.wants_font_registry());
    }

    #[test]
    fn test_short_hex_is_not_complex() {
        let analysis = analyze(b"BT <41> Tj ET");
        assert!(!analysis.has_hex_text);
        assert_eq!(analysis.kind, DocumentKind::Unknown);
    }

    #[test]
    fn test_flags() {
        let analysis = analyze(b"<< /ToUnicode 5 0 R >> << /Type /ObjStm /N 1 >>");
        assert!(analysis.has_tounicode);
        assert!(analysis.has_object_streams);
        assert!(analysis.wants_font_registry());
    }

    #[test]
    fn test_fonts_deduplicated_in_order() {
        let analysis = analyze(
            b"<< /BaseFont /ABCDEF+Aptos >> << /BaseFont/Arial-Bold>> << /BaseFont /ABCDEF+Aptos >>",
        );
        assert_eq!(analysis.fonts, vec!["ABCDEF+Aptos", "Arial-Bold"]);
    }

    #[test]
    fn test_producer_classification() {
        let analysis = analyze(b"(x) Tj << /Producer (Microsoft Word 2019) >>");
        assert_eq!(analysis.kind, DocumentKind::Microsoft);

        let analysis = analyze(b"<< /Creator (powerpoint) >>");
        assert_eq!(analysis.kind, DocumentKind::PowerPoint);

        // Producer mentioning PowerPoint wins over Microsoft
        let analysis = analyze(b"<< /Producer (Microsoft PowerPoint) >>");
        assert_eq!(analysis.kind, DocumentKind::PowerPoint);
    }

    #[test]
    fn test_serializes_to_json() {
        let json = serde_json::to_string(&analyze(b"(a) Tj")).unwrap();
        assert!(json.contains("\"kind\":\"simple\""));
        assert!(json.contains("\"has_literal_text\":true"));
    }
}
