//! Raw indirect objects and a byte-level view of their dictionaries.
//!
//! There is no PDF object model here. An object is the byte slice from its
//! `N G obj` header through the first following `endobj`, and dictionary
//! questions ("is /FlateDecode present?", "what does /ToUnicode point
//! at?") are answered by matching bytes. [`ObjectDict`] is the only place
//! that does this, so callers never see how the answers are obtained.

use crate::content::lexer::decode_name_escapes;
use crate::xref::ObjectTable;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0, multispace1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};
use std::cell::RefCell;
use std::collections::HashMap;

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// The bytes of one indirect object, header through `endobj`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawObject<'a> {
    /// Object number
    pub number: u32,
    /// Byte offset of the header in the file
    pub offset: usize,
    /// Object bytes including `endobj`
    pub bytes: &'a [u8],
}

impl<'a> RawObject<'a> {
    /// Slice object `number` out of `data`, starting at `offset`.
    ///
    /// Returns `None` when the offset is out of range or no `endobj`
    /// follows it.
    pub fn slice(data: &'a [u8], number: u32, offset: usize) -> Option<Self> {
        let rest = data.get(offset..)?;
        let end = find_bytes(rest, b"endobj")? + b"endobj".len();
        Some(Self {
            number,
            offset,
            bytes: &rest[..end],
        })
    }

    /// Dictionary view of this object.
    pub fn dict(&self) -> ObjectDict<'a> {
        ObjectDict::new(self.bytes)
    }

    /// Whether the object contains a `stream` keyword.
    pub fn has_stream(&self) -> bool {
        find_bytes(self.bytes, b"stream").is_some()
    }
}

/// Lazily filled, append-only cache of raw objects.
///
/// Lookups slice the object out of the document the first time and reuse
/// the result afterwards, including misses.
pub struct ObjectCache<'a> {
    data: &'a [u8],
    table: &'a ObjectTable,
    cache: RefCell<HashMap<u32, Option<RawObject<'a>>>>,
}

impl<'a> ObjectCache<'a> {
    /// Create a cache over `data` using the locations in `table`.
    pub fn new(data: &'a [u8], table: &'a ObjectTable) -> Self {
        Self {
            data,
            table,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The whole document.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Fetch an object by number.
    ///
    /// Objects stored inside object streams are not dereferenced and
    /// return `None`.
    pub fn get(&self, number: u32) -> Option<RawObject<'a>> {
        if let Some(cached) = self.cache.borrow().get(&number) {
            return *cached;
        }

        let object = self
            .table
            .get(number)
            .and_then(|entry| entry.offset())
            .and_then(|offset| RawObject::slice(self.data, number, offset));
        if object.is_none() {
            log::debug!("Object {} could not be sliced", number);
        }
        self.cache.borrow_mut().insert(number, object);
        object
    }

    /// Every directly stored object that could be sliced, in object-number
    /// order.
    pub fn objects(&self) -> Vec<RawObject<'a>> {
        self.table
            .offsets()
            .filter_map(|(number, _)| self.get(number))
            .collect()
    }

    /// Number of cached lookups.
    pub fn len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether nothing has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.cache.borrow().is_empty()
    }
}

/// Byte-pattern view of an object's dictionary.
///
/// Only the part before the `stream` keyword is inspected, so compressed
/// payload bytes never produce false matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectDict<'a> {
    bytes: &'a [u8],
}

impl<'a> ObjectDict<'a> {
    /// View over raw object bytes.
    pub fn new(object_bytes: &'a [u8]) -> Self {
        let end = find_bytes(object_bytes, b"stream").unwrap_or(object_bytes.len());
        Self {
            bytes: &object_bytes[..end],
        }
    }

    /// The bytes being inspected.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Whether `/name` occurs as a complete name token.
    pub fn contains_name(&self, name: &str) -> bool {
        key_positions(self.bytes, name).next().is_some()
    }

    /// Whether a filter with this name is listed.
    pub fn has_filter(&self, filter: &str) -> bool {
        self.contains_name(filter)
    }

    /// Whether `/Type /name` is present.
    pub fn has_type(&self, name: &str) -> bool {
        self.get_name("Type").is_some_and(|value| value == name)
    }

    /// Object number of an indirect reference `/key N G R`.
    pub fn get_reference(&self, key: &str) -> Option<u32> {
        self.find_value(key, reference)
    }

    /// Direct integer value of `/key`. References yield `None`.
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.find_value(key, |input| {
            let (rest, value) = integer(input)?;
            if reference(input).is_ok() {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Verify,
                )));
            }
            Ok((rest, value))
        })
    }

    /// Name value of `/key`, without the slash.
    pub fn get_name(&self, key: &str) -> Option<String> {
        self.find_value(key, preceded(multispace0, name))
    }

    /// References held by `/key`, either a single reference or an array of
    /// them (`/DescendantFonts [12 0 R]`).
    pub fn references(&self, key: &str) -> Vec<u32> {
        self.find_value(key, |input| {
            alt((
                preceded(
                    multispace0,
                    delimited(char('['), many0(reference), preceded(multispace0, char(']'))),
                ),
                map(reference, |number| vec![number]),
            ))(input)
        })
        .unwrap_or_default()
    }

    /// Name → reference pairs of an inline sub-dictionary such as
    /// `/Font << /F1 5 0 R /F2 6 0 R >>`.
    pub fn reference_map(&self, key: &str) -> Vec<(String, u32)> {
        self.find_value(key, |input| {
            preceded(
                multispace0,
                delimited(
                    tag(b"<<"),
                    many0(pair(preceded(multispace0, name), reference)),
                    preceded(multispace0, tag(b">>")),
                ),
            )(input)
        })
        .unwrap_or_default()
    }

    /// Every `/Name N G R` pair in byte order. Used for dictionaries that
    /// are themselves a name → object table, like an indirect `/Font`
    /// resource dictionary.
    pub fn name_references(&self) -> Vec<(String, u32)> {
        let bytes = self.bytes;
        bytes
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'/')
            .filter_map(|(i, _)| pair(name, reference)(&bytes[i..]).ok().map(|(_, entry)| entry))
            .collect()
    }

    /// Run `parser` after each occurrence of `/key`; first success wins.
    fn find_value<T, P>(&self, key: &str, mut parser: P) -> Option<T>
    where
        P: FnMut(&'a [u8]) -> IResult<&'a [u8], T>,
    {
        let bytes = self.bytes;
        key_positions(bytes, key)
            .find_map(|position| parser(&bytes[position..]).ok().map(|(_, value)| value))
    }
}

/// Positions just past each complete `/key` token.
fn key_positions<'b>(bytes: &'b [u8], key: &'b str) -> impl Iterator<Item = usize> + 'b {
    let needle_len = key.len() + 1;
    let mut search_from = 0;
    std::iter::from_fn(move || {
        while search_from < bytes.len() {
            let found = bytes[search_from..]
                .windows(needle_len)
                .position(|w| w[0] == b'/' && &w[1..] == key.as_bytes())?;
            let end = search_from + found + needle_len;
            search_from = end;
            if bytes.get(end).map_or(true, |&b| !is_regular(b)) {
                return Some(end);
            }
        }
        None
    })
}

/// Regular characters continue a name or keyword.
pub(crate) fn is_regular(byte: u8) -> bool {
    !matches!(
        byte,
        b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'['
            | b']' | b'{' | b'}'
    )
}

fn unsigned(input: &[u8]) -> IResult<&[u8], u32> {
    map_res(digit1, |digits: &[u8]| {
        std::str::from_utf8(digits)
            .map_err(|_| ())
            .and_then(|s| s.parse::<u32>().map_err(|_| ()))
    })(input)
}

fn integer(input: &[u8]) -> IResult<&[u8], i64> {
    preceded(
        multispace0,
        map_res(recognize(pair(opt(one_of("+-")), digit1)), |digits: &[u8]| {
            std::str::from_utf8(digits)
                .map_err(|_| ())
                .and_then(|s| s.parse::<i64>().map_err(|_| ()))
        }),
    )(input)
}

/// `N G R`, returning `N`.
fn reference(input: &[u8]) -> IResult<&[u8], u32> {
    map(
        tuple((
            multispace0,
            terminated(unsigned, multispace1),
            terminated(unsigned, multispace1),
            char('R'),
        )),
        |(_, number, _, _)| number,
    )(input)
}

/// `/Name` with `#XX` escapes decoded.
fn name(input: &[u8]) -> IResult<&[u8], String> {
    preceded(char('/'), map(take_while1(is_regular), decode_name_escapes))(input)
}
