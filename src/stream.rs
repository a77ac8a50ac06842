//! Stream extraction and decoding.
//!
//! Two independent passes produce stream payloads:
//!
//! - **Structured**: every located object with a `stream` keyword has its
//!   payload cut out and run through the filters its dictionary names.
//! - **Raw scan**: the whole buffer is searched for `stream`...`endstream`
//!   spans, whatever object they belong to. Payloads that start with a zlib
//!   header are inflated when possible.
//!
//! The raw scan usually repeats what the structured pass found; the
//! orchestrator removes the duplicate text later.

use crate::config::ExtractOptions;
use crate::decoders::{decode_chain, Filter, FILTER_ORDER};
use crate::error::{Error, Result};
use crate::object::{find_bytes, ObjectCache, ObjectDict, RawObject};
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_RAW_STREAM: Regex = Regex::new(r"(?s-u)stream\r?\n(.*?)endstream").unwrap();
}

/// zlib headers the raw scan recognizes (default and best compression).
const ZLIB_HEADERS: [[u8; 2]; 2] = [[0x78, 0x9c], [0x78, 0xda]];

/// Where a payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSource {
    /// Stream of the numbered object.
    Object(u32),
    /// N-th span found by the raw scan.
    RawScan(usize),
}

/// A decoded stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPayload {
    /// Origin of the payload
    pub source: StreamSource,
    /// Decoded bytes
    pub data: Vec<u8>,
}

/// Bytes between the `stream` line and `endstream`.
///
/// Exactly one end-of-line sequence after `stream` is skipped (`\r\n`,
/// `\n\r`, `\n` or `\r`).
pub fn stream_span(object_bytes: &[u8]) -> Option<&[u8]> {
    let keyword = find_bytes(object_bytes, b"stream")?;
    let mut start = keyword + b"stream".len();
    let rest = &object_bytes[start..];
    start += match rest {
        [b'\r', b'\n', ..] | [b'\n', b'\r', ..] => 2,
        [b'\n', ..] | [b'\r', ..] => 1,
        _ => 0,
    };
    let end = start + find_bytes(&object_bytes[start..], b"endstream")?;
    Some(&object_bytes[start..end])
}

/// Filters named in the dictionary, in application order.
pub fn detect_filters(dict: &ObjectDict<'_>) -> Vec<Filter> {
    FILTER_ORDER
        .iter()
        .copied()
        .filter(|filter| dict.has_filter(filter.name()))
        .collect()
}

/// Decode the stream of an object, reporting why it failed.
pub fn decode_stream(object_bytes: &[u8], options: &ExtractOptions) -> Result<Vec<u8>> {
    let span = stream_span(object_bytes).ok_or(Error::MissingStream)?;
    let filters = detect_filters(&ObjectDict::new(object_bytes));
    decode_chain(span, &filters, options)
}

/// Decode the stream of an object. Any failure yields `None`.
pub fn extract_stream(object_bytes: &[u8], options: &ExtractOptions) -> Option<Vec<u8>> {
    decode_stream(object_bytes, options).ok()
}

/// Structured pass: decode the stream of every located object, in object
/// number order.
pub fn extract_object_streams(cache: &ObjectCache<'_>, options: &ExtractOptions) -> Vec<StreamPayload> {
    cache
        .objects()
        .into_iter()
        .filter(RawObject::has_stream)
        .filter_map(|object| match decode_stream(object.bytes, options) {
            Ok(data) => Some(StreamPayload {
                source: StreamSource::Object(object.number),
                data,
            }),
            Err(e) => {
                log::debug!("Object {} yields no stream: {}", object.number, e);
                None
            },
        })
        .collect()
}

/// Raw pass: every `stream`...`endstream` span in the buffer, in file order.
pub fn scan_raw_streams(bytes: &[u8], options: &ExtractOptions) -> Vec<StreamPayload> {
    RE_RAW_STREAM
        .captures_iter(bytes)
        .filter_map(|captures| captures.get(1))
        .enumerate()
        .map(|(index, span)| {
            let raw = span.as_bytes();
            let data = if ZLIB_HEADERS.iter().any(|header| raw.starts_with(header)) {
                decode_chain(raw, &[Filter::FlateDecode], options).unwrap_or_else(|e| {
                    log::debug!("Raw stream {} kept undecoded: {}", index, e);
                    raw.to_vec()
                })
            } else {
                raw.to_vec()
            };
            StreamPayload {
                source: StreamSource::RawScan(index),
                data,
            }
        })
        .collect()
}

/// Both passes, structured payloads first.
pub fn extract_all_streams(cache: &ObjectCache<'_>, options: &ExtractOptions) -> Vec<StreamPayload> {
    let mut payloads = extract_object_streams(cache, options);
    let structured = payloads.len();
    if options.scan_raw_streams {
        payloads.extend(scan_raw_streams(cache.data(), options));
    }
    log::debug!(
        "Extracted {} streams ({} structured, {} raw)",
        payloads.len(),
        structured,
        payloads.len() - structured
    );
    payloads
}
