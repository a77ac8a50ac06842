//! Object streams (`/Type /ObjStm`).
//!
//! An object stream packs several objects into one compressed stream:
//!
//! ```text
//! 12 0 obj
//! << /Type /ObjStm /N 3 /First 16 /Filter /FlateDecode >>
//! stream
//! 20 0 21 15 22 28    % (object number, offset) pairs
//! << ... >>           % object 20 at /First + 0
//! ...
//! endstream
//! endobj
//! ```
//!
//! Only the index is read. Member objects are registered in the object
//! table as owned by their container, and their byte ranges are computed
//! for diagnostics, but they are not decoded for text.

use crate::config::ExtractOptions;
use crate::error::{Error, Result};
use crate::object::{ObjectCache, ObjectDict};
use crate::stream::decode_stream;
use crate::xref::ObjectRef;
use std::ops::Range;

/// Sanity caps on the header values.
const MAX_MEMBERS: i64 = 1_000_000;
const MAX_FIRST: i64 = 10_000_000;

/// One object stored inside an object stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStreamMember {
    /// Object number of the member
    pub number: u32,
    /// Byte range of the member inside the decoded stream
    pub range: Range<usize>,
}

/// Read `/N` and `/First` from an object stream dictionary.
pub fn read_header(container: u32, dict: &ObjectDict<'_>) -> Result<(usize, usize)> {
    let invalid = |reason: String| Error::InvalidObjectStream {
        number: container,
        reason,
    };
    let count = dict
        .get_integer("N")
        .ok_or_else(|| invalid("missing /N entry".to_string()))?;
    let first = dict
        .get_integer("First")
        .ok_or_else(|| invalid("missing /First entry".to_string()))?;

    if !(0..=MAX_MEMBERS).contains(&count) {
        return Err(invalid(format!("invalid /N value: {}", count)));
    }
    if !(0..=MAX_FIRST).contains(&first) {
        return Err(invalid(format!("invalid /First value: {}", first)));
    }
    Ok((count as usize, first as usize))
}

/// Parse the index of a decoded object stream.
///
/// At most `count` pairs are read from the bytes before `first`. A short
/// index is accepted with a warning.
pub fn parse_index(
    container: u32,
    decoded: &[u8],
    count: usize,
    first: usize,
) -> Result<Vec<ObjectStreamMember>> {
    if decoded.len() < first {
        return Err(Error::InvalidObjectStream {
            number: container,
            reason: format!(
                "stream data too short: {} bytes, /First is {}",
                decoded.len(),
                first
            ),
        });
    }

    let numbers: Vec<usize> = decoded[..first]
        .split(|b| b.is_ascii_whitespace() || *b == 0)
        .filter(|token| !token.is_empty())
        .map_while(|token| std::str::from_utf8(token).ok()?.parse().ok())
        .collect();

    let pairs: Vec<(u32, usize)> = numbers
        .chunks_exact(2)
        .take(count)
        .filter_map(|pair| Some((u32::try_from(pair[0]).ok()?, pair[1])))
        .collect();
    if pairs.len() < count {
        log::warn!(
            "Object stream {} lists {} of {} objects",
            container,
            pairs.len(),
            count
        );
    }

    let objects_len = decoded.len() - first;
    let members = pairs
        .iter()
        .enumerate()
        .map(|(i, &(number, offset))| {
            let start = first + offset.min(objects_len);
            let end = pairs
                .get(i + 1)
                .map_or(objects_len, |&(_, next)| next.min(objects_len));
            let end = (first + end).max(start);
            ObjectStreamMember {
                number,
                range: start..end,
            }
        })
        .collect();
    Ok(members)
}

/// Find every object stream and return its members as table entries.
///
/// The caller merges the entries into the object table; numbers that are
/// already located keep their existing entry.
pub fn register_object_streams(cache: &ObjectCache<'_>, options: &ExtractOptions) -> Vec<ObjectRef> {
    let mut entries = Vec::new();

    for object in cache.objects() {
        let dict = object.dict();
        if !dict.has_type("ObjStm") {
            continue;
        }

        let members = read_header(object.number, &dict).and_then(|(count, first)| {
            let decoded = decode_stream(object.bytes, options)?;
            parse_index(object.number, &decoded, count, first)
        });

        match members {
            Ok(members) => {
                log::debug!(
                    "Object stream {} holds {} objects",
                    object.number,
                    members.len()
                );
                for member in &members {
                    log::trace!(
                        "  object {} at bytes {:?} of stream {}",
                        member.number,
                        member.range,
                        object.number
                    );
                }
                entries.extend(
                    members
                        .iter()
                        .map(|member| ObjectRef::in_stream(member.number, object.number)),
                );
            },
            Err(e) => log::warn!("{}", e),
        }
    }

    entries
}
