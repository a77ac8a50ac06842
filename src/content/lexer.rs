//! Content stream tokenizer.
//!
//! Produces the flat token sequence the text extractors walk. Only what
//! text extraction needs is distinguished:
//!
//! - Strings: literal `(...)` (escapes decoded) and hex `<...>` (decoded to bytes)
//! - Names: `/F1`
//! - Arrays: `[...]`, reduced to their strings and numbers
//! - Numbers: `12`, `-150`, `.5`
//! - Operators: any other bare word (`Tj`, `TJ`, `T*`, `'`, `BT`)
//!
//! Whitespace, comments and dictionary delimiters are skipped. Bytes that
//! start no valid token are skipped one at a time, so a damaged stream
//! still yields the tokens around the damage.

use crate::content::operators::TextElement;
use crate::decoders::hex_value;
use crate::object::{find_bytes, is_regular};
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize, value},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

/// A content stream token.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentToken {
    /// Hex string, decoded to bytes
    Hex(Vec<u8>),
    /// Literal string with escapes decoded
    Literal(Vec<u8>),
    /// Name without the slash, `#XX` escapes decoded
    Name(String),
    /// Array of strings and numbers
    Array(Vec<TextElement>),
    /// Integer or real number
    Number(f64),
    /// Operator keyword
    Operator(String),
}

/// PDF whitespace: space, tab, CR, LF, NUL, form feed.
fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x00 | 0x0C)
}

/// Parse a comment (% to end of line).
fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    value((), preceded(char('%'), take_till(|c| c == b'\r' || c == b'\n')))(input)
}

/// Skip whitespace, comments and the delimiters text extraction ignores
/// (`<<`, `>>`, `{`, `}`).
fn skip_ws(input: &[u8]) -> &[u8] {
    let mut remaining = input;
    loop {
        let spaces = remaining.iter().take_while(|&&c| is_whitespace(c)).count();
        remaining = &remaining[spaces..];
        if let Ok((rest, _)) = comment(remaining) {
            remaining = rest;
            continue;
        }
        if remaining.starts_with(b"<<") || remaining.starts_with(b">>") {
            remaining = &remaining[2..];
            continue;
        }
        if matches!(remaining.first(), Some(b'{') | Some(b'}')) {
            remaining = &remaining[1..];
            continue;
        }
        return remaining;
    }
}

/// Parse an integer or real number.
///
/// Accepts a leading sign and a missing integer or fractional part
/// (`.5`, `5.`, `-.002`).
fn parse_number(input: &[u8]) -> IResult<&[u8], ContentToken> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(pair(digit1, opt(pair(char('.'), opt(digit1))))),
                recognize(pair(char('.'), digit1)),
            )),
        ))),
        |text: &[u8]| {
            let text = std::str::from_utf8(text).map_err(|_| ())?;
            // "5." is not valid Rust float syntax
            let text = text.strip_suffix('.').unwrap_or(text);
            text.parse::<f64>().map(ContentToken::Number).map_err(|_| ())
        },
    )(input)
}

/// Parse a literal string, decoding escapes.
///
/// Handles balanced nested parentheses, `\n \r \t \b \f \( \) \\`, octal
/// `\ddd` and line continuations. An unknown escape yields the escaped
/// byte. Unbalanced strings fail.
fn parse_literal_string(input: &[u8]) -> IResult<&[u8], ContentToken> {
    let (remaining, _) = char('(')(input)?;
    let mut out = Vec::new();
    let mut depth = 1;
    let mut pos = 0;

    while pos < remaining.len() {
        let byte = remaining[pos];
        pos += 1;
        match byte {
            b'\\' => {
                let Some(&escaped) = remaining.get(pos) else {
                    break;
                };
                pos += 1;
                match escaped {
                    b'n' => out.push(b'\n'),
                    b'r' => out.push(b'\r'),
                    b't' => out.push(b'\t'),
                    b'b' => out.push(0x08),
                    b'f' => out.push(0x0C),
                    b'0'..=b'7' => {
                        let mut code = u32::from(escaped - b'0');
                        for _ in 0..2 {
                            match remaining.get(pos) {
                                Some(&d @ b'0'..=b'7') => {
                                    code = code * 8 + u32::from(d - b'0');
                                    pos += 1;
                                },
                                _ => break,
                            }
                        }
                        out.push((code & 0xFF) as u8);
                    },
                    // Line continuation
                    b'\r' => {
                        if remaining.get(pos) == Some(&b'\n') {
                            pos += 1;
                        }
                    },
                    b'\n' => {},
                    other => out.push(other),
                }
            },
            b'(' => {
                depth += 1;
                out.push(byte);
            },
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&remaining[pos..], ContentToken::Literal(out)));
                }
                out.push(byte);
            },
            _ => out.push(byte),
        }
    }

    Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)))
}

/// Parse a hex string. Whitespace inside is ignored; an odd trailing digit
/// is dropped.
fn parse_hex_string(input: &[u8]) -> IResult<&[u8], ContentToken> {
    if input.starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }

    map(
        delimited(
            char('<'),
            take_while(|c: u8| c.is_ascii_hexdigit() || is_whitespace(c)),
            char('>'),
        ),
        |digits: &[u8]| ContentToken::Hex(decode_hex_digits(digits)),
    )(input)
}

/// Hex digits to bytes, ignoring whitespace and dropping an odd last digit.
pub fn decode_hex_digits(digits: &[u8]) -> Vec<u8> {
    let nibbles: Vec<u8> = digits.iter().filter_map(|&c| hex_value(c)).collect();
    nibbles.chunks_exact(2).map(|pair| (pair[0] << 4) | pair[1]).collect()
}

/// Decode `#XX` escape sequences in PDF names.
///
/// Invalid sequences are kept as written. Other bytes map one-to-one to
/// the first 256 code points.
///
/// ```
/// use pdf_ingest::content::lexer::decode_name_escapes;
///
/// assert_eq!(decode_name_escapes(b"A#20B#23C"), "A B#C");
/// assert_eq!(decode_name_escapes(b"F1"), "F1");
/// assert_eq!(decode_name_escapes(b"A#"), "A#");
/// ```
pub fn decode_name_escapes(name: &[u8]) -> String {
    let mut result = String::with_capacity(name.len());
    let mut i = 0;
    while i < name.len() {
        if name[i] == b'#' {
            let escaped = name
                .get(i + 1..i + 3)
                .and_then(|hex| Some((hex_value(hex[0])? << 4) | hex_value(hex[1])?));
            if let Some(byte) = escaped {
                result.push(char::from(byte));
                i += 3;
                continue;
            }
        }
        result.push(char::from(name[i]));
        i += 1;
    }
    result
}

fn parse_name(input: &[u8]) -> IResult<&[u8], ContentToken> {
    preceded(
        char('/'),
        map(take_while(is_regular), |bytes: &[u8]| {
            ContentToken::Name(decode_name_escapes(bytes))
        }),
    )(input)
}

/// Parse an array, keeping strings and numbers. Other elements are
/// dropped and nested arrays are flattened. An array cut off by the end
/// of the stream keeps what was read.
///
/// Nesting is tracked with a counter rather than recursion, so any depth
/// of `[` is handled in constant stack space.
fn parse_array(input: &[u8]) -> IResult<&[u8], ContentToken> {
    let (mut remaining, _) = char('[')(input)?;
    let mut elements = Vec::new();
    let mut depth = 1usize;

    while depth > 0 {
        remaining = skip_ws(remaining);
        match remaining.first() {
            None => break,
            Some(b'[') => {
                depth += 1;
                remaining = &remaining[1..];
                continue;
            },
            Some(b']') => {
                depth -= 1;
                remaining = &remaining[1..];
                continue;
            },
            Some(_) => {},
        }
        match array_element(remaining) {
            Ok((rest, parsed)) => {
                match parsed {
                    ContentToken::Hex(bytes) => elements.push(TextElement::Hex(bytes)),
                    ContentToken::Literal(bytes) => elements.push(TextElement::Literal(bytes)),
                    ContentToken::Number(n) => elements.push(TextElement::Adjustment(n)),
                    ContentToken::Name(_) | ContentToken::Operator(_) | ContentToken::Array(_) => {},
                }
                remaining = rest;
            },
            Err(_) => remaining = &remaining[1..],
        }
    }

    Ok((remaining, ContentToken::Array(elements)))
}

/// Any token that can appear inside an array except a nested array.
fn array_element(input: &[u8]) -> IResult<&[u8], ContentToken> {
    alt((
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
        parse_operator,
    ))(input)
}

/// Operators and other bare keywords.
fn parse_operator(input: &[u8]) -> IResult<&[u8], ContentToken> {
    map(take_while1(is_regular), |bytes: &[u8]| {
        ContentToken::Operator(String::from_utf8_lossy(bytes).into_owned())
    })(input)
}

/// Parse a single token after skipping whitespace and comments.
pub fn token(input: &[u8]) -> IResult<&[u8], ContentToken> {
    let input = skip_ws(input);
    alt((
        parse_name,
        parse_number,
        parse_literal_string,
        parse_hex_string,
        parse_array,
        parse_operator,
    ))(input)
}

/// Tokenize a whole content stream.
///
/// Inline image data (`ID` ... `EI`) is skipped.
pub fn tokenize(content: &[u8]) -> Vec<ContentToken> {
    let mut tokens = Vec::new();
    let mut remaining = content;
    let mut skipped = 0usize;

    loop {
        remaining = skip_ws(remaining);
        if remaining.is_empty() {
            break;
        }
        match token(remaining) {
            Ok((rest, parsed)) => {
                remaining = rest;
                if matches!(&parsed, ContentToken::Operator(op) if op == "ID") {
                    remaining = skip_inline_image(remaining);
                }
                tokens.push(parsed);
            },
            Err(_) => {
                skipped += 1;
                remaining = &remaining[1..];
            },
        }
    }

    if skipped > 0 {
        log::trace!("Skipped {} unparsable bytes in content stream", skipped);
    }
    tokens
}

/// Skip inline image bytes up to and including the `EI` that ends them.
fn skip_inline_image(data: &[u8]) -> &[u8] {
    let mut from = 0;
    while let Some(found) = find_bytes(&data[from..], b"EI") {
        let at = from + found;
        let before_ok = at == 0 || is_whitespace(data[at - 1]);
        let after_ok = data.get(at + 2).map_or(true, |&b| !is_regular(b));
        if before_ok && after_ok {
            return &data[at + 2..];
        }
        from = at + 2;
    }
    &[]
}
