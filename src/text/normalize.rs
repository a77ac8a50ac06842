//! Final cleanup of joined extraction output.

/// Normalize extracted text.
///
/// NBSP, tab, CR and LF become spaces. NUL, other control characters,
/// format characters, private-use characters and noncharacters are removed.
/// Whitespace runs collapse to a single space and the result is trimmed.
///
/// ```
/// use pdf_ingest::text::clean_extracted_text;
///
/// assert_eq!(clean_extracted_text("  Ala\u{00A0}ma\t\r\nkota\u{200B} "), "Ala ma kota");
/// ```
pub fn clean_extracted_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch == '\u{00A0}' || ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if is_removed(ch) {
            continue;
        }
        if pending_space && !cleaned.is_empty() {
            cleaned.push(' ');
        }
        pending_space = false;
        cleaned.push(ch);
    }

    cleaned
}

fn is_removed(ch: char) -> bool {
    ch.is_control() || is_format(ch) || is_private_use(ch) || is_noncharacter(ch)
}

/// The 66 permanently unassigned noncharacters: U+FDD0..U+FDEF and the last
/// two code points of every plane.
fn is_noncharacter(ch: char) -> bool {
    let cp = u32::from(ch);
    (0xFDD0..=0xFDEF).contains(&cp) || cp & 0xFFFE == 0xFFFE
}

/// Unicode general category Cf.
fn is_format(ch: char) -> bool {
    matches!(
        ch,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{0890}'..='\u{0891}'
            | '\u{08E2}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{110BD}'
            | '\u{110CD}'
            | '\u{13430}'..='\u{1343F}'
            | '\u{1BCA0}'..='\u{1BCA3}'
            | '\u{1D173}'..='\u{1D17A}'
            | '\u{E0001}'
            | '\u{E0020}'..='\u{E007F}'
    )
}

/// Unicode general category Co.
fn is_private_use(ch: char) -> bool {
    matches!(
        ch,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}
