//! Byte-level decoding of PDF strings that no character map covers.
//!
//! Decoders are tried in [`DECODER_CHAIN`] order; the first one that
//! accepts the bytes wins. Latin-1 is last and accepts everything, so
//! [`decode_bytes`] always produces a string.

use encoding_rs::WINDOWS_1252;

/// A fallible byte decoder.
pub type Decoder = fn(&[u8]) -> Option<String>;

/// Ordered decoder chain.
pub const DECODER_CHAIN: &[(&str, Decoder)] = &[
    ("utf-16-bom", decode_utf16_bom),
    ("utf-16-null-pattern", decode_utf16_null_pattern),
    ("utf-8", decode_utf8),
    ("cp1252", decode_cp1252),
    ("latin-1", decode_latin1),
];

const BOM_UTF16_BE: [u8; 2] = [0xFE, 0xFF];
const BOM_UTF16_LE: [u8; 2] = [0xFF, 0xFE];

/// Bytes CP1252 leaves undefined.
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// Decode `bytes` with the first decoder in the chain that accepts them.
pub fn decode_bytes(bytes: &[u8]) -> String {
    for (name, decoder) in DECODER_CHAIN {
        if let Some(text) = decoder(bytes) {
            log::trace!("Decoded {} bytes as {}", bytes.len(), name);
            return text;
        }
    }
    // Unreachable while latin-1 terminates the chain
    String::new()
}

/// UTF-16 with a leading byte order mark.
pub fn decode_utf16_bom(bytes: &[u8]) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(&BOM_UTF16_BE) {
        Some(utf16_units(rest, u16::from_be_bytes))
    } else if let Some(rest) = bytes.strip_prefix(&BOM_UTF16_LE) {
        Some(utf16_units(rest, u16::from_le_bytes))
    } else {
        None
    }
}

/// UTF-16 without a byte order mark, recognized by zero high bytes.
///
/// Every odd byte zero means little-endian ASCII-range text, every even
/// byte zero means big-endian.
pub fn decode_utf16_null_pattern(bytes: &[u8]) -> Option<String> {
    if bytes.len() < 2 || bytes.len() % 2 != 0 {
        return None;
    }
    if bytes.iter().skip(1).step_by(2).all(|&b| b == 0) {
        Some(utf16_units(bytes, u16::from_le_bytes))
    } else if bytes.iter().step_by(2).all(|&b| b == 0) {
        Some(utf16_units(bytes, u16::from_be_bytes))
    } else {
        None
    }
}

/// Strict UTF-8.
pub fn decode_utf8(bytes: &[u8]) -> Option<String> {
    std::str::from_utf8(bytes).ok().map(str::to_string)
}

/// Windows-1252, rejecting its undefined bytes.
pub fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    if bytes.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
        return None;
    }
    Some(WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned())
}

/// ISO-8859-1. Never fails.
pub fn decode_latin1(bytes: &[u8]) -> Option<String> {
    Some(bytes.iter().map(|&b| char::from(b)).collect())
}

/// Decode UTF-16 code units, dropping unpaired surrogates and a trailing odd byte.
fn utf16_units(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    char::decode_utf16(units).filter_map(|r| r.ok()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bom_big_endian() {
        assert_eq!(decode_bytes(&[0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69]), "Hi");
    }

    #[test]
    fn test_bom_little_endian() {
        assert_eq!(decode_bytes(&[0xFF, 0xFE, 0x48, 0x00, 0x69, 0x00]), "Hi");
    }

    #[test]
    fn test_bom_drops_unpaired_surrogate() {
        assert_eq!(decode_bytes(&[0xFE, 0xFF, 0xD8, 0x00, 0x00, 0x41]), "A");
    }

    #[test]
    fn test_null_pattern() {
        assert_eq!(decode_bytes(&[0x00, 0x41, 0x00, 0x42]), "AB");
        assert_eq!(decode_bytes(&[0x41, 0x00, 0x42, 0x00]), "AB");
        // Odd length is not UTF-16
        assert_eq!(decode_utf16_null_pattern(&[0x00, 0x41, 0x00]), None);
    }

    #[test]
    fn test_utf8() {
        assert_eq!(decode_bytes("zażółć".as_bytes()), "zażółć");
    }

    #[test]
    fn test_cp1252() {
        // 0x80 is the euro sign, 0x9C is oe
        assert_eq!(decode_bytes(&[0x80, 0x20, 0x9C]), "\u{20AC} \u{153}");
    }

    #[test]
    fn test_cp1252_undefined_falls_to_latin1() {
        assert_eq!(decode_cp1252(&[0x41, 0x81]), None);
        assert_eq!(decode_bytes(&[0x41, 0x81]), "A\u{81}");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode_bytes(&[]), "");
    }
}
