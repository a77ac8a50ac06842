//! Font registry: which character map applies to which font name.
//!
//! The registry is built once per document, before any mapped extraction,
//! and is read-only afterwards. Maps come from two sources, in priority
//! order:
//!
//! 1. ToUnicode CMaps (`/ToUnicode N 0 R` on a font or its descendant)
//! 2. Unicode `cmap` tables of embedded TrueType programs (`/FontFile2`)
//!
//! A lower-priority source never replaces a code a higher one mapped. All
//! maps are also merged into one document-wide map, used for every name
//! that has no map of its own.
//!
//! Names registered for a font: the resource alias used in content streams
//! (`F1`), the full `/BaseFont` name (`ABCDEF+Aptos`), and the base name
//! with the subset tag removed (`Aptos`). Several names share one map.

use crate::config::ExtractOptions;
use crate::error::{Error, Result};
use crate::fonts::cmap::{parse_tounicode_cmap, CharMap};
use crate::fonts::diagnostics;
use crate::fonts::truetype_parser::TrueTypeFont;
use crate::object::{ObjectCache, ObjectDict};
use crate::stream::decode_stream;
use indexmap::{IndexMap, IndexSet};
use lazy_static::lazy_static;
use regex::bytes::Regex;
use std::sync::Arc;

lazy_static! {
    static ref RE_TOUNICODE_REF: Regex = Regex::new(r"/ToUnicode\s+(\d+)\s+\d+\s+R").unwrap();
    static ref RE_FONTFILE2_REF: Regex = Regex::new(r"/FontFile2\s+(\d+)\s+\d+\s+R").unwrap();
}

/// Character maps by font name, in registration order.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: IndexMap<String, Arc<CharMap>>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` unless it is already taken. Returns whether it was added.
    pub fn register(&mut self, name: &str, map: &Arc<CharMap>) -> bool {
        if name.is_empty() || self.fonts.contains_key(name) {
            return false;
        }
        self.fonts.insert(name.to_string(), Arc::clone(map));
        true
    }

    /// Map registered under exactly `name`.
    pub fn get(&self, name: &str) -> Option<&Arc<CharMap>> {
        self.fonts.get(name)
    }

    /// Pick the map for a font selected in a content stream.
    ///
    /// Tiers, first hit wins: exact name, name without subset tag, first
    /// registered name that contains or is contained in the name, and
    /// finally the first registered map.
    pub fn resolve(&self, name: &str) -> Option<&Arc<CharMap>> {
        if let Some(map) = self.get(name) {
            return Some(map);
        }
        if let Some(map) = self.get(strip_subset_prefix(name)) {
            return Some(map);
        }
        if !name.is_empty() {
            let overlapping = self
                .fonts
                .iter()
                .find(|(key, _)| key.contains(name) || name.contains(key.as_str()));
            if let Some((key, map)) = overlapping {
                log::trace!("Font {} matched registered name {}", name, key);
                return Some(map);
            }
        }
        self.fonts.first().map(|(_, map)| map)
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }
}

/// Remove a subset tag: six upper-case letters and `+` (`ABCDEF+Aptos`).
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// What a `/Type /Font` object says about its character mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
struct FontEntry {
    object: u32,
    base_font: Option<String>,
    tounicode: Option<u32>,
    font_file: Option<u32>,
}

/// Build the registry for a document.
///
/// `base_fonts` is the `/BaseFont` inventory of the whole buffer; names in
/// it that no font object claims still get the merged map. Nothing in here
/// fails the build: unreadable CMaps, fonts and references are logged and
/// skipped.
pub fn build_font_registry(
    cache: &ObjectCache<'_>,
    base_fonts: &[String],
    options: &ExtractOptions,
) -> FontRegistry {
    let tounicode_maps: IndexMap<u32, Arc<CharMap>> = referenced_objects(&RE_TOUNICODE_REF, cache.data())
        .into_iter()
        .filter_map(|number| match load_tounicode(cache, number, options) {
            Ok(map) => {
                log::debug!("ToUnicode object {}: {} mappings", number, map.len());
                diagnostics::log_character_analysis(&map);
                Some((number, Arc::new(map)))
            },
            Err(e) => {
                log::debug!("Skipping ToUnicode object {}: {}", number, e);
                None
            },
        })
        .collect();
    log::info!("Loaded {} ToUnicode CMaps", tounicode_maps.len());

    let font_files: IndexMap<u32, Arc<CharMap>> = referenced_objects(&RE_FONTFILE2_REF, cache.data())
        .into_iter()
        .filter_map(|number| match load_font_file(cache, number, options) {
            Ok(map) => {
                log::debug!("FontFile2 object {}: {} mappings", number, map.len());
                Some((number, Arc::new(map)))
            },
            Err(e) => {
                log::debug!("Skipping FontFile2 object {}: {}", number, e);
                None
            },
        })
        .collect();

    let mut merged = CharMap::new();
    for map in tounicode_maps.values() {
        merged.fill_missing(map);
    }
    let from_tounicode = merged.len();
    for map in font_files.values() {
        merged.fill_missing(map);
    }
    log::info!(
        "Merged CMap has {} mappings ({} from ToUnicode, {} from FontFile2)",
        merged.len(),
        from_tounicode,
        merged.len() - from_tounicode
    );
    if !merged.is_empty() {
        diagnostics::check_character_coverage(&merged);
    }
    let merged = Arc::new(merged);

    let fonts: IndexMap<u32, FontEntry> = cache
        .objects()
        .into_iter()
        .filter(|object| object.dict().has_type("Font"))
        .map(|object| (object.number, font_entry(cache, object.number, &object.dict())))
        .collect();
    log::debug!("Found {} font objects", fonts.len());

    // A font's own maps win; otherwise it shares the merged map.
    let map_for = |entry: &FontEntry| -> Option<Arc<CharMap>> {
        let own_cmap = entry.tounicode.and_then(|n| tounicode_maps.get(&n));
        let own_program = entry.font_file.and_then(|n| font_files.get(&n));
        match (own_cmap, own_program) {
            (Some(cmap), Some(program)) => {
                let mut map = CharMap::clone(cmap);
                map.fill_missing(program);
                Some(Arc::new(map))
            },
            (Some(map), None) | (None, Some(map)) => Some(Arc::clone(map)),
            (None, None) => (!merged.is_empty()).then(|| Arc::clone(&merged)),
        }
    };

    let mut registry = FontRegistry::new();
    let mut entry_maps: IndexMap<u32, Arc<CharMap>> = IndexMap::new();
    for entry in fonts.values() {
        if let Some(map) = map_for(entry) {
            entry_maps.insert(entry.object, map);
        }
    }

    for (alias, object) in font_aliases(cache) {
        let Some(map) = entry_maps.get(&object) else {
            log::debug!("Font alias {} points at object {} without a map", alias, object);
            continue;
        };
        if registry.register(&alias, map) {
            log::debug!(
                "Font alias {} -> object {} ({})",
                alias,
                object,
                fonts
                    .get(&object)
                    .and_then(|entry| entry.base_font.as_deref())
                    .unwrap_or("no BaseFont")
            );
        }
    }

    for entry in fonts.values() {
        let (Some(base_font), Some(map)) = (&entry.base_font, entry_maps.get(&entry.object)) else {
            continue;
        };
        registry.register(base_font, map);
        registry.register(strip_subset_prefix(base_font), map);
    }

    if !merged.is_empty() {
        for name in base_fonts {
            registry.register(name, &merged);
            registry.register(strip_subset_prefix(name), &merged);
        }
    }

    log::info!("Font registry holds {} names", registry.len());
    registry
}

/// Object numbers referenced by `pattern` anywhere in the buffer, first-seen
/// order, without duplicates.
fn referenced_objects(pattern: &Regex, bytes: &[u8]) -> IndexSet<u32> {
    pattern
        .captures_iter(bytes)
        .filter_map(|captures| std::str::from_utf8(captures.get(1)?.as_bytes()).ok()?.parse().ok())
        .collect()
}

fn load_tounicode(cache: &ObjectCache<'_>, number: u32, options: &ExtractOptions) -> Result<CharMap> {
    let object = cache.get(number).ok_or(Error::ObjectNotFound(number))?;
    let data = decode_stream(object.bytes, options)?;
    parse_tounicode_cmap(&data, options.max_bfrange_span)
}

fn load_font_file(cache: &ObjectCache<'_>, number: u32, options: &ExtractOptions) -> Result<CharMap> {
    let object = cache.get(number).ok_or(Error::ObjectNotFound(number))?;
    let data = decode_stream(object.bytes, options)?;
    let font = TrueTypeFont::parse(&data)?;
    log::debug!("FontFile2 object {} is {:?}", number, font);
    Ok(font.unicode_map()?)
}

/// Collect the mapping-relevant references of a font, following
/// `/DescendantFonts` for composite fonts.
fn font_entry(cache: &ObjectCache<'_>, number: u32, dict: &ObjectDict<'_>) -> FontEntry {
    let mut entry = FontEntry {
        object: number,
        base_font: dict.get_name("BaseFont"),
        tounicode: dict.get_reference("ToUnicode"),
        font_file: font_file_of(cache, dict),
    };

    for descendant in dict.references("DescendantFonts") {
        let Some(object) = cache.get(descendant) else {
            log::debug!("Font {}: DescendantFont {} not found", number, descendant);
            continue;
        };
        let descendant_dict = object.dict();
        log::debug!("Font {} has DescendantFont at {}", number, descendant);
        if entry.tounicode.is_none() {
            entry.tounicode = descendant_dict.get_reference("ToUnicode");
        }
        if entry.font_file.is_none() {
            entry.font_file = font_file_of(cache, &descendant_dict);
        }
    }
    entry
}

/// `/FontDescriptor` → `/FontFile2` of a font dictionary.
fn font_file_of(cache: &ObjectCache<'_>, dict: &ObjectDict<'_>) -> Option<u32> {
    let descriptor = cache.get(dict.get_reference("FontDescriptor")?)?;
    descriptor.dict().get_reference("FontFile2")
}

/// Resource aliases (`/F1 5 0 R`) of every `/Font` resource dictionary,
/// inline or indirect.
fn font_aliases(cache: &ObjectCache<'_>) -> Vec<(String, u32)> {
    let mut aliases = Vec::new();
    for object in cache.objects() {
        let dict = object.dict();
        aliases.extend(dict.reference_map("Font"));
        if let Some(number) = dict.get_reference("Font") {
            if let Some(fonts) = cache.get(number) {
                aliases.extend(fonts.dict().name_references());
            }
        }
    }
    aliases
}
