//! Object discovery by scanning the raw buffer.
//!
//! Used alongside the xref section rather than only as a fallback: every
//! `N G obj` header in the file is found, and any object number the xref
//! section did not supply is taken from here.

use crate::xref::ObjectRef;
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::collections::HashSet;

lazy_static! {
    /// "N G obj" anywhere in the file
    static ref RE_OBJ_PATTERN: Regex = Regex::new(r"(\d+)\s+(\d+)\s+obj").unwrap();

    /// "N G obj" at the start of a slice, after optional whitespace
    static ref RE_OBJ_HEADER: Regex = Regex::new(r"^\s*(\d+)\s+(\d+)\s+obj").unwrap();
}

/// Window searched on each side of a stale xref offset.
const NEARBY_WINDOW: usize = 1024;

/// Scan the whole buffer for object headers.
///
/// The first header seen for an object number wins. A match only counts
/// when it is followed by something that can start a PDF object, which
/// filters out `obj` inside words and text.
pub fn scan_objects(bytes: &[u8]) -> Vec<ObjectRef> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for capture in RE_OBJ_PATTERN.captures_iter(bytes) {
        let Some(full) = capture.get(0) else {
            continue;
        };
        let Some(number) = capture.get(1).and_then(|m| parse_number(m.as_bytes())) else {
            log::debug!("Unparsable object number at offset {}", full.start());
            continue;
        };
        if !starts_object_body(&bytes[full.end()..]) {
            continue;
        }
        // A digit right before the match means the regex started mid-number
        if full.start() > 0 && bytes[full.start() - 1].is_ascii_digit() {
            continue;
        }
        if seen.insert(number) {
            found.push(ObjectRef::at_offset(number, full.start() as u64));
        }
    }

    log::debug!("Object scan found {} objects", found.len());
    found
}

/// Object number of the `N G obj` header at `offset`, if there is one.
pub fn object_header_at(bytes: &[u8], offset: usize) -> Option<u32> {
    let window = bytes.get(offset..)?;
    let window = &window[..window.len().min(64)];
    let captures = RE_OBJ_HEADER.captures(window)?;
    parse_number(captures.get(1)?.as_bytes())
}

/// Look for the header of object `number` within ±1KB of `approx_offset`.
///
/// Returns the absolute offset of the header closest to `approx_offset`.
pub fn search_nearby_for_object(bytes: &[u8], number: u32, approx_offset: usize) -> Option<usize> {
    let start = approx_offset.saturating_sub(NEARBY_WINDOW).min(bytes.len());
    let end = approx_offset.saturating_add(NEARBY_WINDOW).min(bytes.len());

    (start..end)
        .filter(|&pos| bytes[pos].is_ascii_digit())
        .filter(|&pos| pos == 0 || !bytes[pos - 1].is_ascii_alphanumeric())
        .filter(|&pos| object_header_at(bytes, pos) == Some(number))
        .min_by_key(|&found| found.abs_diff(approx_offset))
}

fn parse_number(digits: &[u8]) -> Option<u32> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

/// Whether the bytes after `obj` can begin an object body.
fn starts_object_body(rest: &[u8]) -> bool {
    let Some(&next) = rest.iter().find(|b| !b.is_ascii_whitespace()) else {
        return false;
    };
    // Reject `obj` glued to letters ("objective")
    if rest.first().is_some_and(|b| b.is_ascii_alphanumeric()) {
        return false;
    }
    matches!(next, b'<' | b'[' | b'(' | b'/' | b't' | b'f' | b'n' | b'-' | b'+' | b'.' | b'e')
        || next.is_ascii_digit()
}
