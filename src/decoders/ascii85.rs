//! ASCII85Decode (base-85) implementation.
//!
//! Five characters in the range '!'..='u' encode four bytes; 'z' stands
//! for four zero bytes. An optional `<~` prefix and the `~>` end marker
//! are accepted.

use crate::decoders::StreamDecoder;
use crate::error::{Error, Result};

/// ASCII85Decode filter.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
        let body = trim_markers(input);
        let mut output = Vec::with_capacity(body.len() * 4 / 5 + 4);
        let mut group: u64 = 0;
        let mut count = 0usize;

        for &byte in body {
            match byte {
                b'z' if count == 0 => output.extend_from_slice(&[0, 0, 0, 0]),
                b'z' => {
                    return Err(Error::Decode(
                        "ASCII85Decode: 'z' inside a group".to_string(),
                    ))
                },
                b'!'..=b'u' => {
                    group = group * 85 + u64::from(byte - b'!');
                    count += 1;
                    if count == 5 {
                        let value = u32::try_from(group).map_err(|_| {
                            Error::Decode("ASCII85Decode: group overflow".to_string())
                        })?;
                        output.extend_from_slice(&value.to_be_bytes());
                        group = 0;
                        count = 0;
                    }
                },
                b if b.is_ascii_whitespace() => {},
                other => {
                    return Err(Error::Decode(format!(
                        "ASCII85Decode: invalid character '{}'",
                        other as char
                    )))
                },
            }
        }

        match count {
            0 => {},
            1 => {
                return Err(Error::Decode(
                    "ASCII85Decode: final group has a single character".to_string(),
                ))
            },
            _ => {
                // Pad with 'u' and keep count-1 bytes
                for _ in count..5 {
                    group = group * 85 + 84;
                }
                let value = u32::try_from(group).map_err(|_| {
                    Error::Decode("ASCII85Decode: group overflow".to_string())
                })?;
                output.extend_from_slice(&value.to_be_bytes()[..count - 1]);
            },
        }

        Ok(output)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

/// Strip surrounding whitespace, a leading `<~` and everything from `~`.
fn trim_markers(input: &[u8]) -> &[u8] {
    let start = input
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(input.len());
    let mut body = &input[start..];
    if body.starts_with(b"<~") {
        body = &body[2..];
    }
    match body.iter().position(|&b| b == b'~') {
        Some(end) => &body[..end],
        None => body,
    }
}
