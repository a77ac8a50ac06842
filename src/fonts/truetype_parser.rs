//! Embedded TrueType font programs (`/FontFile2`).
//!
//! Wraps the `ttf-parser` crate to recover a Unicode mapping from the
//! font's own `cmap` table. The result only fills codes that no ToUnicode
//! CMap covers.

use crate::fonts::cmap::{CharCode, CharMap};
use ttf_parser::{Face, PlatformId};

/// Error types for TrueType font parsing.
#[derive(Debug, thiserror::Error)]
pub enum TrueTypeError {
    /// Failed to parse font file
    #[error("Failed to parse font file: {0}")]
    ParseError(String),

    /// Font file is empty or invalid
    #[error("Font file is empty or invalid")]
    EmptyFont,

    /// Required table is missing
    #[error("Required font table is missing: {0}")]
    MissingTable(String),
}

/// Result type for TrueType operations.
pub type TrueTypeResult<T> = Result<T, TrueTypeError>;

/// A parsed TrueType/OpenType font program.
pub struct TrueTypeFont<'a> {
    face: Face<'a>,
}

impl std::fmt::Debug for TrueTypeFont<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrueTypeFont")
            .field("name", &self.postscript_name())
            .field("glyphs", &self.num_glyphs())
            .finish()
    }
}

impl<'a> TrueTypeFont<'a> {
    /// Parse a TrueType/OpenType font from raw data.
    pub fn parse(data: &'a [u8]) -> TrueTypeResult<Self> {
        if data.is_empty() {
            return Err(TrueTypeError::EmptyFont);
        }

        let face = Face::parse(data, 0).map_err(|e| TrueTypeError::ParseError(e.to_string()))?;
        Ok(Self { face })
    }

    /// Get the font's PostScript name.
    pub fn postscript_name(&self) -> Option<String> {
        self.face
            .names()
            .into_iter()
            .find(|name| name.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|name| name.to_string())
    }

    /// Get the number of glyphs in the font.
    pub fn num_glyphs(&self) -> u16 {
        self.face.number_of_glyphs()
    }

    /// Code point to character map from the best Unicode `cmap` subtable.
    ///
    /// Only BMP code points with a non-zero glyph are kept, keyed as
    /// two-byte codes (`0041` -> `A`).
    pub fn unicode_map(&self) -> TrueTypeResult<CharMap> {
        let table = self
            .face
            .tables()
            .cmap
            .ok_or_else(|| TrueTypeError::MissingTable("cmap".to_string()))?;

        let subtable = table
            .subtables
            .into_iter()
            .filter_map(|subtable| {
                subtable_rank(subtable.platform_id, subtable.encoding_id).map(|rank| (rank, subtable))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, subtable)| subtable)
            .ok_or_else(|| TrueTypeError::MissingTable("Unicode cmap subtable".to_string()))?;

        let mut codepoints = Vec::new();
        subtable.codepoints(|cp| codepoints.push(cp));

        let map: CharMap = codepoints
            .into_iter()
            .filter(|&cp| cp <= 0xFFFF)
            .filter(|&cp| subtable.glyph_index(cp).is_some_and(|glyph| glyph.0 != 0))
            .filter_map(|cp| Some((CharCode::new(cp, 2), char::from_u32(cp)?.to_string())))
            .collect();

        log::debug!(
            "TrueType cmap ({:?}/{}) maps {} code points",
            subtable.platform_id,
            subtable.encoding_id,
            map.len()
        );
        Ok(map)
    }
}

/// Preference of a `cmap` subtable; lower is better, `None` is not Unicode.
fn subtable_rank(platform: PlatformId, encoding: u16) -> Option<u8> {
    match (platform, encoding) {
        (PlatformId::Windows, 10) => Some(0),
        (PlatformId::Unicode, 4) | (PlatformId::Unicode, 6) => Some(1),
        (PlatformId::Unicode, 3) => Some(2),
        (PlatformId::Windows, 1) => Some(3),
        (PlatformId::Unicode, _) => Some(4),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_on_empty_data() {
        let result = TrueTypeFont::parse(&[]);
        assert!(matches!(result, Err(TrueTypeError::EmptyFont)));
    }

    #[test]
    fn test_error_on_invalid_data() {
        let result = TrueTypeFont::parse(b"not a font file");
        assert!(matches!(result, Err(TrueTypeError::ParseError(_))));
    }

    /// A font with the tables `ttf-parser` requires and a Windows BMP
    /// format 4 `cmap` mapping `A..=C` to glyphs 1..=3.
    fn minimal_truetype() -> Vec<u8> {
        fn be16(out: &mut Vec<u8>, value: u16) {
            out.extend_from_slice(&value.to_be_bytes());
        }

        let mut cmap = Vec::new();
        for value in [0, 1, 3, 1] {
            be16(&mut cmap, value);
        }
        cmap.extend_from_slice(&12u32.to_be_bytes());
        for value in [4, 32, 0, 4, 4, 1, 0, 0x0043, 0xFFFF, 0, 0x0041, 0xFFFF, 0xFFC0, 1, 0, 0] {
            be16(&mut cmap, value);
        }

        let mut head = vec![0u8; 54];
        head[..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());

        let mut hhea = vec![0u8; 36];
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());

        let mut maxp = 0x0000_5000u32.to_be_bytes().to_vec();
        be16(&mut maxp, 10);

        let tables: [(&[u8; 4], Vec<u8>); 4] = [(b"cmap", cmap), (b"head", head), (b"hhea", hhea), (b"maxp", maxp)];
        let mut font = 0x0001_0000u32.to_be_bytes().to_vec();
        for value in [tables.len() as u16, 0, 0, 0] {
            be16(&mut font, value);
        }
        let mut offset = 12 + 16 * tables.len() as u32;
        for (tag, table) in &tables {
            font.extend_from_slice(*tag);
            font.extend_from_slice(&0u32.to_be_bytes());
            font.extend_from_slice(&offset.to_be_bytes());
            font.extend_from_slice(&(table.len() as u32).to_be_bytes());
            offset += table.len() as u32;
        }
        for (_, table) in &tables {
            font.extend_from_slice(table);
        }
        font
    }

    #[test]
    fn test_unicode_map_from_format4_cmap() {
        let data = minimal_truetype();
        let font = TrueTypeFont::parse(&data).unwrap();
        assert_eq!(font.num_glyphs(), 10);

        let map = font.unicode_map().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map.get(&CharCode::new(0x41, 2)), Some("A"));
        assert_eq!(map.get(&CharCode::new(0x42, 2)), Some("B"));
        assert_eq!(map.get(&CharCode::new(0x43, 2)), Some("C"));
        assert_eq!(map.get(&CharCode::new(0x44, 2)), None);
    }

    #[test]
    fn test_subtable_preference() {
        let ucs4 = subtable_rank(PlatformId::Windows, 10).unwrap();
        let unicode_full = subtable_rank(PlatformId::Unicode, 4).unwrap();
        let unicode_bmp = subtable_rank(PlatformId::Unicode, 3).unwrap();
        let windows_bmp = subtable_rank(PlatformId::Windows, 1).unwrap();
        let unicode_other = subtable_rank(PlatformId::Unicode, 0).unwrap();
        assert!(ucs4 < unicode_full);
        assert!(unicode_full < unicode_bmp);
        assert!(unicode_bmp < windows_bmp);
        assert!(windows_bmp < unicode_other);
    }

    #[test]
    fn test_symbol_and_mac_subtables_rejected() {
        assert_eq!(subtable_rank(PlatformId::Windows, 0), None);
        assert_eq!(subtable_rank(PlatformId::Macintosh, 0), None);
    }

    #[test]
    fn test_error_display() {
        let err = TrueTypeError::MissingTable("cmap".to_string());
        assert_eq!(format!("{}", err), "Required font table is missing: cmap");
    }
}
