//! Font diagnostics. Log output only; nothing here affects extracted text.

use crate::fonts::cmap::CharMap;
use crate::object::ObjectCache;
use lazy_static::lazy_static;
use regex::bytes::Regex;

lazy_static! {
    static ref RE_FONT_DESCRIPTOR_REF: Regex = Regex::new(r"/FontDescriptor\s+(\d+)\s+\d+\s+R").unwrap();
    static ref RE_ENCODING_REF: Regex = Regex::new(r"/Encoding\s+(\d+)\s+\d+\s+R").unwrap();
    static ref RE_DIFFERENCES: Regex = Regex::new(r"(?s-u)/Differences\s*\[(.*?)\]").unwrap();
    static ref RE_INLINE_DIFFERENCES: Regex =
        Regex::new(r"(?s-u)/Encoding\s*<<[^>]*?/Differences\s*\[(.*?)\]").unwrap();
}

const BASIC_LETTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const POLISH_LETTERS: &str = "ąćęłńóśźżĄĆĘŁŃÓŚŹŻ";
const SAMPLE_MAPPINGS: usize = 10;
const SAMPLE_LENGTH: usize = 200;

/// Letters of `alphabet` split into (mapped, missing).
pub fn letter_coverage(map: &CharMap, alphabet: &str) -> (String, String) {
    alphabet.chars().partition(|&ch| map.produces(ch))
}

/// Per-CMap detail at debug level: letter coverage and a few mappings.
pub fn log_character_analysis(map: &CharMap) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let (mapped, missing) = letter_coverage(map, BASIC_LETTERS);
    log::debug!("Mapped basic letters: {}", mapped);
    log::debug!("Missing basic letters: {}", missing);
    let (mapped, missing) = letter_coverage(map, POLISH_LETTERS);
    log::debug!("Mapped Polish letters: {}", mapped);
    log::debug!("Missing Polish letters: {}", missing);

    for (code, text) in map.iter().take(SAMPLE_MAPPINGS) {
        let scalars: Vec<String> = text.chars().map(|ch| format!("U+{:04X}", u32::from(ch))).collect();
        log::debug!("  {} -> {:?} ({})", code.to_hex(), text, scalars.join(" "));
    }
}

/// Report basic Latin letters the merged map cannot produce.
pub fn check_character_coverage(map: &CharMap) {
    let (_, missing) = letter_coverage(map, BASIC_LETTERS);
    if !missing.is_empty() {
        log::info!("Missing basic characters: {}", missing);
    }
}

/// Inventory of font resources: descriptors with their embedded programs
/// and encodings with `/Differences` arrays.
pub fn log_font_resources(cache: &ObjectCache<'_>) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    let data = cache.data();
    log::debug!("Font resource scan");

    for number in referenced(&RE_FONT_DESCRIPTOR_REF, data) {
        log::debug!("FontDescriptor at object {}", number);
        let Some(descriptor) = cache.get(number) else {
            continue;
        };
        let dict = descriptor.dict();
        if let Some(program) = dict.get_reference("FontFile2") {
            log::debug!("  -> Has FontFile2 at object {}", program);
        } else if let Some(program) = dict.get_reference("FontFile") {
            log::debug!("  -> Has FontFile at object {}", program);
        }
    }

    for number in referenced(&RE_ENCODING_REF, data) {
        log::debug!("Encoding at object {}", number);
        let Some(encoding) = cache.get(number) else {
            continue;
        };
        if let Some(differences) = RE_DIFFERENCES.captures(encoding.bytes).and_then(|c| c.get(1)) {
            log::debug!("  -> Has Differences array: {}", sample(differences.as_bytes()));
        }
    }

    for captures in RE_INLINE_DIFFERENCES.captures_iter(data) {
        if let Some(differences) = captures.get(1) {
            log::debug!("Inline Differences array: {}", sample(differences.as_bytes()));
        }
    }
}

fn referenced(pattern: &Regex, data: &[u8]) -> Vec<u32> {
    pattern
        .captures_iter(data)
        .filter_map(|captures| std::str::from_utf8(captures.get(1)?.as_bytes()).ok()?.parse().ok())
        .collect()
}

fn sample(bytes: &[u8]) -> String {
    String::from_utf8_lossy(&bytes[..bytes.len().min(SAMPLE_LENGTH)]).into_owned()
}
