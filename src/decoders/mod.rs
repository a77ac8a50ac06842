//! Stream decoder implementations for the supported PDF filters.
//!
//! Only the filters that carry text in practice are implemented:
//! - ASCIIHexDecode - hexadecimal encoding
//! - ASCII85Decode - base85 encoding
//! - FlateDecode (zlib/deflate)
//!
//! LZW, RunLength, CCITT and JBIG2 streams are left undecoded.
//!
//! Filters are never read from a real `/Filter` array. Callers detect which
//! filter names occur in the object dictionary and the chain is applied in
//! the fixed [`FILTER_ORDER`].

use crate::config::ExtractOptions;
use crate::error::{Error, Result};

mod ascii85;
mod ascii_hex;
mod flate;

pub(crate) use ascii_hex::hex_value;
pub use ascii_hex::AsciiHexDecoder;
pub use ascii85::Ascii85Decoder;
pub use flate::FlateDecoder;

/// PDF stream filter types understood by the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// ASCIIHexDecode (hexadecimal encoding)
    ASCIIHexDecode,
    /// ASCII85Decode (base-85 encoding)
    ASCII85Decode,
    /// FlateDecode (deflate/zlib compression)
    FlateDecode,
}

/// Order in which detected filters are applied.
pub const FILTER_ORDER: [Filter; 3] = [
    Filter::ASCIIHexDecode,
    Filter::ASCII85Decode,
    Filter::FlateDecode,
];

impl Filter {
    /// The filter's PDF name without the leading slash.
    pub fn name(&self) -> &'static str {
        match self {
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::FlateDecode => "FlateDecode",
        }
    }

    fn decoder(&self) -> &'static dyn StreamDecoder {
        match self {
            Filter::ASCIIHexDecode => &AsciiHexDecoder,
            Filter::ASCII85Decode => &Ascii85Decoder,
            Filter::FlateDecode => &FlateDecoder,
        }
    }
}

/// Trait for PDF stream decoders.
///
/// Each decoder implements a specific PDF filter algorithm and can decode
/// compressed or encoded stream data.
pub trait StreamDecoder {
    /// Decode the input data.
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Apply a filter chain with decompression bomb protection.
///
/// Filters run in the order given. After each one the output is checked
/// against the ratio and size limits from `options`.
pub fn decode_chain(data: &[u8], filters: &[Filter], options: &ExtractOptions) -> Result<Vec<u8>> {
    let max_ratio = options.max_decompression_ratio;
    let max_size = options.max_decompressed_size;
    let compressed_size = data.len().max(1);

    let mut current = data.to_vec();
    for filter in filters {
        let decoder = filter.decoder();
        current = decoder.decode(&current)?;
        log::trace!("{} produced {} bytes", decoder.name(), current.len());

        if max_ratio > 0 {
            let ratio = current.len() as u64 / compressed_size as u64;
            if ratio > max_ratio as u64 {
                return Err(Error::DecompressionLimit(format!(
                    "ratio {}:1 exceeds limit {}:1 (compressed: {} bytes, decompressed: {} bytes)",
                    ratio,
                    max_ratio,
                    data.len(),
                    current.len()
                )));
            }
        }

        if max_size > 0 && current.len() > max_size {
            return Err(Error::DecompressionLimit(format!(
                "decompressed size {} bytes exceeds limit {} bytes",
                current.len(),
                max_size
            )));
        }
    }

    Ok(current)
}
