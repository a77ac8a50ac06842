//! FlateDecode (zlib/deflate) implementation.
//!
//! Real-world streams are often damaged: truncated by a bad upload, written
//! with a broken zlib header, or stored as raw deflate. Decoding therefore
//! walks a fixed ladder of strategies and keeps the first that yields data.
//! Partial output from a truncated stream counts as data.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use inflate::inflate_bytes_zlib;
use libflate::zlib::Decoder as LibflateDecoder;
use std::io::Read;

/// FlateDecode filter.
pub struct FlateDecoder;

/// Outcome of one recovery strategy.
enum Attempt {
    /// Stream decoded cleanly.
    Complete(Vec<u8>),
    /// Decoding failed after producing some output.
    Partial(Vec<u8>),
    /// Nothing usable.
    Failed(String),
}

type Strategy = fn(&[u8]) -> Attempt;

/// Recovery ladder, tried in order.
const STRATEGIES: [(&str, Strategy); 5] = [
    ("zlib", zlib),
    ("raw deflate", raw_deflate),
    ("deflate after header", deflate_skip_header),
    ("inflate", inflate_crate),
    ("libflate", libflate),
];

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut failures = Vec::new();

        for (index, (name, strategy)) in STRATEGIES.iter().enumerate() {
            match strategy(input) {
                // A clean zlib stream may legitimately be empty; the fallbacks
                // must produce something to be trusted.
                Attempt::Complete(data) if index == 0 || !data.is_empty() => {
                    if index > 0 {
                        log::debug!("FlateDecode recovered {} bytes via {}", data.len(), name);
                    }
                    return Ok(data);
                },
                Attempt::Complete(_) => failures.push(format!("{}: empty output", name)),
                Attempt::Partial(data) => {
                    log::warn!(
                        "FlateDecode partial recovery via {}: {} bytes before corruption",
                        name,
                        data.len()
                    );
                    return Ok(data);
                },
                Attempt::Failed(reason) => failures.push(format!("{}: {}", name, reason)),
            }
        }

        Err(Error::Decode(format!(
            "FlateDecode failed on {} bytes ({})",
            input.len(),
            failures.join("; ")
        )))
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

fn read_all<R: Read>(mut reader: R) -> Attempt {
    let mut output = Vec::new();
    match reader.read_to_end(&mut output) {
        Ok(_) => Attempt::Complete(output),
        Err(_) if !output.is_empty() => Attempt::Partial(output),
        Err(e) => Attempt::Failed(e.to_string()),
    }
}

fn zlib(input: &[u8]) -> Attempt {
    read_all(ZlibDecoder::new(input))
}

fn raw_deflate(input: &[u8]) -> Attempt {
    read_all(DeflateDecoder::new(input))
}

fn deflate_skip_header(input: &[u8]) -> Attempt {
    if input.len() <= 2 {
        return Attempt::Failed("input too short".to_string());
    }
    read_all(DeflateDecoder::new(&input[2..]))
}

fn inflate_crate(input: &[u8]) -> Attempt {
    match inflate_bytes_zlib(input) {
        Ok(data) => Attempt::Complete(data),
        Err(e) => Attempt::Failed(e),
    }
}

fn libflate(input: &[u8]) -> Attempt {
    match LibflateDecoder::new(input) {
        Ok(decoder) => read_all(decoder),
        Err(e) => Attempt::Failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, ZlibEncoder};
    use flate2::Compression;
    use std::io::Write;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_decode_zlib() {
        let compressed = compress(b"BT (Ala ma kota) Tj ET");
        assert_eq!(compressed[..2], [0x78, 0x9c]);
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), b"BT (Ala ma kota) Tj ET");
    }

    #[test]
    fn test_decode_empty_stream() {
        let compressed = compress(b"");
        assert!(FlateDecoder.decode(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_decode_large_data() {
        let original = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".repeat(1000);
        let compressed = compress(&original);
        assert_eq!(FlateDecoder.decode(&compressed).unwrap(), original);
    }

    #[test]
    fn test_decode_raw_deflate() {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"BT (raw) Tj ET").unwrap();
        let raw = encoder.finish().unwrap();
        assert_eq!(FlateDecoder.decode(&raw).unwrap(), b"BT (raw) Tj ET");
    }

    #[test]
    fn test_truncated_stream_does_not_panic() {
        let original = b"BT (Hello world, this is a longer line of text) Tj ET".repeat(50);
        let compressed = compress(&original);
        let truncated = &compressed[..compressed.len() / 2];
        if let Ok(data) = FlateDecoder.decode(truncated) {
            assert!(original.starts_with(&data));
        }
    }

    #[test]
    fn test_garbage_fails() {
        let result = FlateDecoder.decode(&[0xFF; 16]);
        assert!(matches!(result, Err(Error::Decode(_))));
    }

    #[test]
    fn test_decoder_name() {
        assert_eq!(FlateDecoder.name(), "FlateDecode");
    }
}
