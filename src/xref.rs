//! Object location: cross-reference table parsing and the object table.
//!
//! The object table maps object numbers to the place their bytes live.
//! It is filled from two sources:
//!
//! 1. The classic `xref` section that `startxref` points at
//! 2. A brute-force scan for `N G obj` headers over the whole buffer
//!
//! Entries from the xref section win; the scan only fills gaps. Files with
//! a missing, truncated or shifted xref section still produce a usable
//! table from the scan alone.

use crate::config::ExtractOptions;
use crate::error::{Error, Result};
use crate::xref_reconstruction::{object_header_at, scan_objects, search_nearby_for_object};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::collections::BTreeMap;

lazy_static! {
    static ref RE_STARTXREF: Regex = Regex::new(r"startxref\s+(\d+)").unwrap();
}

/// Sanity cap on one xref subsection.
const MAX_SUBSECTION_ENTRIES: u32 = 1_000_000;

/// Where an object's bytes can be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectLocation {
    /// Byte offset of the `N G obj` header in the file.
    Offset(u64),
    /// Object is stored compressed inside object stream `n`.
    InObjectStream(u32),
}

/// An object number and its location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef {
    /// Object number
    pub number: u32,
    /// Where the object lives
    pub location: ObjectLocation,
}

impl ObjectRef {
    /// Object stored directly in the file at `offset`.
    pub fn at_offset(number: u32, offset: u64) -> Self {
        Self {
            number,
            location: ObjectLocation::Offset(offset),
        }
    }

    /// Object owned by object stream `stream`.
    pub fn in_stream(number: u32, stream: u32) -> Self {
        Self {
            number,
            location: ObjectLocation::InObjectStream(stream),
        }
    }

    /// Signed offset: positive for file offsets, negative container number
    /// for objects owned by an object stream.
    pub fn byte_offset(&self) -> i64 {
        match self.location {
            ObjectLocation::Offset(offset) => offset as i64,
            ObjectLocation::InObjectStream(stream) => -i64::from(stream),
        }
    }

    /// File offset, if the object is stored directly.
    pub fn offset(&self) -> Option<usize> {
        match self.location {
            ObjectLocation::Offset(offset) => usize::try_from(offset).ok(),
            ObjectLocation::InObjectStream(_) => None,
        }
    }
}

/// Object number → location, iterated in object-number order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectTable {
    entries: BTreeMap<u32, ObjectRef>,
}

impl ObjectTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry unless the object number is already known.
    ///
    /// Returns `true` if the entry was added.
    pub fn insert_if_absent(&mut self, entry: ObjectRef) -> bool {
        match self.entries.entry(entry.number) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(entry);
                true
            },
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Add every entry whose number is not present yet. Returns how many
    /// were added.
    pub fn merge_missing<I: IntoIterator<Item = ObjectRef>>(&mut self, entries: I) -> usize {
        entries
            .into_iter()
            .filter(|entry| self.insert_if_absent(*entry))
            .count()
    }

    /// Consuming form of [`merge_missing`](Self::merge_missing).
    pub fn with_missing<I: IntoIterator<Item = ObjectRef>>(mut self, entries: I) -> Self {
        self.merge_missing(entries);
        self
    }

    /// Look up an object.
    pub fn get(&self, number: u32) -> Option<&ObjectRef> {
        self.entries.get(&number)
    }

    /// Whether an object number is known.
    pub fn contains(&self, number: u32) -> bool {
        self.entries.contains_key(&number)
    }

    /// Number of known objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectRef> + '_ {
        self.entries.values()
    }

    /// Directly stored objects as `(number, offset)` in object-number order.
    pub fn offsets(&self) -> impl Iterator<Item = (u32, usize)> + '_ {
        self.entries
            .values()
            .filter_map(|entry| entry.offset().map(|offset| (entry.number, offset)))
    }
}

impl FromIterator<ObjectRef> for ObjectTable {
    fn from_iter<I: IntoIterator<Item = ObjectRef>>(iter: I) -> Self {
        ObjectTable::new().with_missing(iter)
    }
}

/// Build the object table for a document.
pub fn locate_objects(bytes: &[u8], options: &ExtractOptions) -> ObjectTable {
    let mut table = ObjectTable::new();

    match find_startxref(bytes, options.startxref_window) {
        Some(offset) => match parse_classic_xref(bytes, offset) {
            Ok(entries) => {
                let listed = entries.len();
                let verified: Vec<ObjectRef> = entries
                    .into_iter()
                    .filter_map(|entry| verify_entry(bytes, entry))
                    .collect();
                log::debug!(
                    "xref at {} lists {} objects, {} verified",
                    offset,
                    listed,
                    verified.len()
                );
                table.merge_missing(verified);
            },
            Err(e) => log::warn!("{}", e),
        },
        None => log::warn!(
            "No usable startxref in the last {} bytes, relying on object scan",
            options.startxref_window
        ),
    }

    let added = table.merge_missing(scan_objects(bytes));
    log::debug!("Object scan added {} objects ({} total)", added, table.len());
    table
}

/// Find the offset named by the last `startxref` in the file tail.
///
/// Offsets that point past the end of the buffer are ignored.
pub fn find_startxref(bytes: &[u8], window: usize) -> Option<usize> {
    let tail_start = bytes.len().saturating_sub(window);
    let tail = &bytes[tail_start..];

    let captures = RE_STARTXREF.captures_iter(tail).last()?;
    let offset: usize = std::str::from_utf8(captures.get(1)?.as_bytes())
        .ok()?
        .parse()
        .ok()?;

    if offset >= bytes.len() {
        log::warn!(
            "startxref offset {} is beyond the end of the file ({} bytes)",
            offset,
            bytes.len()
        );
        return None;
    }
    Some(offset)
}

/// Parse a classic cross-reference section starting at `offset`.
///
/// ```text
/// xref
/// 0 3
/// 0000000000 65535 f
/// 0000000015 00000 n
/// 0000000074 00000 n
/// trailer
/// ```
///
/// Only in-use (`n`) entries with a positive offset are returned. Parsing
/// stops at `trailer`, or at the first line that is neither an entry nor a
/// subsection header.
pub fn parse_classic_xref(bytes: &[u8], offset: usize) -> Result<Vec<ObjectRef>> {
    let section = bytes.get(offset..).ok_or_else(|| Error::InvalidXref {
        offset,
        reason: "offset beyond end of file".to_string(),
    })?;

    let mut lines = split_lines(section)
        .map(|line| std::str::from_utf8(line).unwrap_or("").trim())
        .filter(|line| !line.is_empty());

    match lines.next() {
        Some(first) if first.starts_with("xref") => {},
        _ => {
            return Err(Error::InvalidXref {
                offset,
                reason: "missing xref keyword".to_string(),
            })
        },
    }

    let mut entries = Vec::new();
    while let Some(line) = lines.next() {
        if line.starts_with("trailer") || line.starts_with("startxref") {
            break;
        }

        let Some((start, count)) = parse_subsection_header(line) else {
            log::debug!("Skipping unexpected line in xref section at {}: {:?}", offset, line);
            continue;
        };
        if count > MAX_SUBSECTION_ENTRIES {
            return Err(Error::InvalidXref {
                offset,
                reason: format!("subsection count {} exceeds limit", count),
            });
        }

        for index in 0..count {
            let Some(line) = lines.next() else {
                break;
            };
            let number = start.saturating_add(index);
            match parse_entry(line) {
                Some((entry_offset, true)) if entry_offset > 0 => {
                    entries.push(ObjectRef::at_offset(number, entry_offset));
                },
                Some(_) => {},
                None => log::debug!("Malformed xref entry for object {}: {:?}", number, line),
            }
        }
    }

    Ok(entries)
}

/// Check that an xref entry really points at its object header. Slightly
/// shifted offsets are corrected by searching nearby; entries that cannot
/// be confirmed are dropped so the scan can supply them.
fn verify_entry(bytes: &[u8], entry: ObjectRef) -> Option<ObjectRef> {
    let offset = entry.offset()?;
    if object_header_at(bytes, offset) == Some(entry.number) {
        return Some(entry);
    }
    match search_nearby_for_object(bytes, entry.number, offset) {
        Some(actual) => {
            log::debug!(
                "Object {} listed at {} found at {}",
                entry.number,
                offset,
                actual
            );
            Some(ObjectRef::at_offset(entry.number, actual as u64))
        },
        None => {
            log::warn!("xref entry for object {} at {} is stale", entry.number, offset);
            None
        },
    }
}

fn parse_subsection_header(line: &str) -> Option<(u32, u32)> {
    let mut parts = line.split_whitespace();
    let start = parts.next()?.parse().ok()?;
    let count = parts.next()?.parse().ok()?;
    match parts.next() {
        None => Some((start, count)),
        Some(_) => None,
    }
}

/// Parse `nnnnnnnnnn ggggg n|f` into `(offset, in_use)`.
fn parse_entry(line: &str) -> Option<(u64, bool)> {
    let mut parts = line.split_whitespace();
    let offset: u64 = parts.next()?.parse().ok()?;
    let _generation: u32 = parts.next()?.parse().ok()?;
    let in_use = match parts.next()?.chars().next()? {
        'n' | 'N' => true,
        'f' | 'F' => false,
        _ => return None,
    };
    Some((offset, in_use))
}

/// Split on `\r\n`, `\n` or a lone `\r`.
fn split_lines(bytes: &[u8]) -> impl Iterator<Item = &[u8]> + '_ {
    let mut rest = bytes;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.iter().position(|&b| b == b'\r' || b == b'\n') {
            Some(end) => {
                let line = &rest[..end];
                let skip = if rest[end] == b'\r' && rest.get(end + 1) == Some(&b'\n') {
                    2
                } else {
                    1
                };
                rest = &rest[end + skip..];
                Some(line)
            },
            None => {
                let line = rest;
                rest = &[];
                Some(line)
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pdf(eol: &str) -> Vec<u8> {
        let header = "%PDF-1.4\n";
        let obj1 = "1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let obj2 = "2 0 obj\n(Hello)\nendobj\n";
        let off1 = header.len();
        let off2 = off1 + obj1.len();
        let xref_at = off2 + obj2.len();
        let mut pdf = String::new();
        pdf.push_str(header);
        pdf.push_str(obj1);
        pdf.push_str(obj2);
        pdf.push_str(&format!("xref{eol}0 3{eol}"));
        pdf.push_str(&format!("0000000000 65535 f{eol}"));
        pdf.push_str(&format!("{:010} 00000 n{eol}", off1));
        pdf.push_str(&format!("{:010} 00000 n{eol}", off2));
        pdf.push_str(&format!("trailer{eol}<< /Size 3 /Root 1 0 R >>{eol}"));
        pdf.push_str(&format!("startxref{eol}{}{eol}%%EOF", xref_at));
        pdf.into_bytes()
    }

    #[test]
    fn test_find_startxref() {
        let pdf = sample_pdf("\n");
        let offset = find_startxref(&pdf, 1024).unwrap();
        assert!(pdf[offset..].starts_with(b"xref"));
    }

    #[test]
    fn test_find_startxref_uses_last_marker() {
        let mut pdf = sample_pdf("\n");
        let first = find_startxref(&pdf, 1024).unwrap();
        pdf.extend_from_slice(b"\nstartxref\n9\n%%EOF");
        assert_ne!(find_startxref(&pdf, 1024), Some(first));
        assert_eq!(find_startxref(&pdf, 1024), Some(9));
    }

    #[test]
    fn test_find_startxref_missing() {
        assert_eq!(find_startxref(b"%PDF-1.4\n1 0 obj\n1\nendobj\n", 1024), None);
    }

    #[test]
    fn test_find_startxref_past_end_ignored() {
        assert_eq!(find_startxref(b"%PDF-1.4\nstartxref\n999999\n%%EOF", 1024), None);
    }

    #[test]
    fn test_find_startxref_outside_window() {
        let mut pdf = b"startxref\n0\n".to_vec();
        pdf.extend(std::iter::repeat(b' ').take(2000));
        assert_eq!(find_startxref(&pdf, 1024), None);
        assert_eq!(find_startxref(&pdf, 4096), Some(0));
    }

    #[test]
    fn test_parse_classic_xref_line_endings() {
        for eol in ["\n", "\r\n", "\r"] {
            let pdf = sample_pdf(eol);
            let offset = find_startxref(&pdf, 1024).unwrap();
            let entries = parse_classic_xref(&pdf, offset).unwrap();
            let numbers: Vec<u32> = entries.iter().map(|e| e.number).collect();
            assert_eq!(numbers, vec![1, 2], "line ending {:?}", eol);
            assert_eq!(entries[0].offset(), Some(9));
        }
    }

    #[test]
    fn test_parse_classic_xref_skips_free_and_zero_offsets() {
        let section = b"xref\n0 3\n0000000000 65535 f \n0000000000 00000 n \n0000000042 00000 f \ntrailer\n";
        assert!(parse_classic_xref(section, 0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_classic_xref_multiple_subsections() {
        let section = b"xref\n0 1\n0000000000 65535 f \n5 2\n0000000100 00000 n \n0000000200 00000 n \ntrailer\n";
        let entries = parse_classic_xref(section, 0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], ObjectRef::at_offset(5, 100));
        assert_eq!(entries[1], ObjectRef::at_offset(6, 200));
    }

    #[test]
    fn test_parse_classic_xref_skips_stray_lines() {
        let section = b"xref\n0 2\n0000000000 65535 f \n0000000100 00000 n \n%%%% damaged %%%%\n\
                        7 1\n0000000300 00000 n \ntrailer\n";
        let entries = parse_classic_xref(section, 0).unwrap();
        assert_eq!(entries, vec![ObjectRef::at_offset(1, 100), ObjectRef::at_offset(7, 300)]);
    }

    #[test]
    fn test_parse_classic_xref_requires_keyword() {
        let result = parse_classic_xref(b"1 0 obj\n<<>>\nendobj\n", 0);
        assert!(matches!(result, Err(Error::InvalidXref { .. })));
    }

    #[test]
    fn test_object_ref_byte_offset_sentinel() {
        assert_eq!(ObjectRef::at_offset(3, 120).byte_offset(), 120);
        assert_eq!(ObjectRef::in_stream(7, 12).byte_offset(), -12);
        assert_eq!(ObjectRef::in_stream(7, 12).offset(), None);
    }

    #[test]
    fn test_merge_missing_never_overwrites() {
        let mut table = ObjectTable::new();
        table.insert_if_absent(ObjectRef::at_offset(1, 10));
        let added = table.merge_missing(vec![
            ObjectRef::at_offset(1, 99),
            ObjectRef::in_stream(2, 5),
        ]);
        assert_eq!(added, 1);
        assert_eq!(table.get(1), Some(&ObjectRef::at_offset(1, 10)));
        assert_eq!(table.get(2), Some(&ObjectRef::in_stream(2, 5)));
        assert_eq!(table.offsets().collect::<Vec<_>>(), vec![(1, 10)]);
    }

    #[test]
    fn test_locate_objects_with_xref() {
        let pdf = sample_pdf("\r\n");
        let table = locate_objects(&pdf, &ExtractOptions::default());
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).and_then(|e| e.offset()), Some(9));
    }

    #[test]
    fn test_locate_objects_without_xref() {
        let pdf = b"%PDF-1.4\n4 0 obj\n<< >>\nendobj\n7 0 obj\n(x)\nendobj\n";
        let table = locate_objects(pdf, &ExtractOptions::default());
        let numbers: Vec<u32> = table.iter().map(|e| e.number).collect();
        assert_eq!(numbers, vec![4, 7]);
    }

    #[test]
    fn test_locate_objects_corrects_shifted_offsets() {
        let body = "%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";
        let xref_at = body.len();
        // Object 1 is listed 4 bytes early, object 3 does not exist
        let pdf = format!(
            "{body}xref\n0 4\n0000000000 65535 f \n0000000005 00000 n \n0000000000 65535 f \n0000000020 00000 n \ntrailer\n<< >>\nstartxref\n{xref_at}\n%%EOF"
        );
        let table = locate_objects(pdf.as_bytes(), &ExtractOptions::default());
        assert_eq!(table.get(1).and_then(|e| e.offset()), Some(9));
        assert!(!table.contains(3));
    }

    #[test]
    fn test_locate_objects_unverifiable_entry_falls_back_to_scan() {
        let padding = " ".repeat(2048);
        let body = format!("%PDF-1.4\n{padding}\n2 0 obj\n<< /Type /Pages >>\nendobj\n");
        let object_at = body.find("2 0 obj").unwrap();
        let xref_at = body.len();
        // Listed inside the file header, more than 1 KiB away from the object
        let pdf = format!(
            "{body}xref\n0 3\n0000000000 65535 f \n0000000000 65535 f \n0000000005 00000 n \ntrailer\n<< >>\nstartxref\n{xref_at}\n%%EOF"
        );
        let table = locate_objects(pdf.as_bytes(), &ExtractOptions::default());
        assert_eq!(table.get(2).and_then(|e| e.offset()), Some(object_at));
    }

    #[test]
    fn test_split_lines() {
        let lines: Vec<&[u8]> = split_lines(b"a\r\nb\rc\nd").collect();
        assert_eq!(lines, vec![&b"a"[..], b"b", b"c", b"d"]);
    }
}
