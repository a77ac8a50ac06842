//! Extraction pipeline over one in-memory document.

use crate::analyzer::{analyze, DocumentAnalysis};
use crate::config::ExtractOptions;
use crate::error::{Error, Result};
use crate::extractors::{extract_mapped, extract_plain};
use crate::fonts::diagnostics::log_font_resources;
use crate::fonts::{build_font_registry, FontRegistry};
use crate::object::ObjectCache;
use crate::objstm::register_object_streams;
use crate::stream::extract_all_streams;
use crate::text::clean_extracted_text;
use crate::xref::locate_objects;
use indexmap::IndexSet;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};

/// Characters of each fragment shown in debug output.
const PREVIEW_LENGTH: usize = 50;

/// What a pipeline run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Byte-pattern analysis of the document
    pub analysis: DocumentAnalysis,
    /// Objects in the final object table
    pub object_count: usize,
    /// Decoded streams, structured and raw
    pub stream_count: usize,
    /// Names in the font registry
    pub font_count: usize,
    /// Per-stream text that survived deduplication, in first-seen order
    pub fragments: Vec<String>,
}

impl ExtractionReport {
    /// Joined and normalized text.
    pub fn text(&self) -> String {
        clean_extracted_text(&self.fragments.join(" "))
    }
}

/// Text extractor for one PDF held in memory.
///
/// # Example
///
/// ```
/// use pdf_ingest::{ExtractOptions, PdfTextParser};
///
/// let pdf = b"%PDF-1.4\n1 0 obj\n<< /Length 17 >>\nstream\nBT (Hello) Tj ET\nendstream\nendobj\n%%EOF";
/// let parser = PdfTextParser::with_options(pdf, ExtractOptions::default());
/// assert_eq!(parser.parse(), "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct PdfTextParser<'a> {
    bytes: &'a [u8],
    options: ExtractOptions,
}

impl<'a> PdfTextParser<'a> {
    /// Parser with default options.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self::with_options(bytes, ExtractOptions::default())
    }

    /// Parser with custom options.
    pub fn with_options(bytes: &'a [u8], options: ExtractOptions) -> Self {
        Self { bytes, options }
    }

    /// Options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract the document text.
    ///
    /// Never fails: anything that goes wrong yields an empty string.
    pub fn parse(&self) -> String {
        match self.parse_detailed() {
            Ok(report) => {
                let text = report.text();
                log::info!("Total extracted: {} characters", text.chars().count());
                text
            },
            Err(e) => {
                log::error!("Error during parsing: {}", e);
                String::new()
            },
        }
    }

    /// Run the pipeline and return the intermediate results.
    ///
    /// Returns [`Error::Aborted`] if any stage panicked.
    pub fn parse_detailed(&self) -> Result<ExtractionReport> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run())).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Error::Aborted(message)
        })
    }

    fn run(&self) -> ExtractionReport {
        let options = &self.options;
        let analysis = analyze(self.bytes);
        log::info!(
            "PDF analysis: kind={:?} literal={} hex={} tounicode={} objstm={} fonts={}",
            analysis.kind,
            analysis.has_literal_text,
            analysis.has_hex_text,
            analysis.has_tounicode,
            analysis.has_object_streams,
            analysis.fonts.len()
        );

        let mut table = locate_objects(self.bytes, options);
        if analysis.has_object_streams {
            let members = register_object_streams(&ObjectCache::new(self.bytes, &table), options);
            table = table.with_missing(members);
        }
        let cache = ObjectCache::new(self.bytes, &table);

        let registry = if analysis.wants_font_registry() {
            let registry = build_font_registry(&cache, &analysis.fonts, options);
            log::info!("Found {} font mappings", registry.len());
            registry
        } else {
            FontRegistry::new()
        };

        let streams = extract_all_streams(&cache, options);
        log::info!("Found {} content streams", streams.len());

        let use_maps = !registry.is_empty() || analysis.has_hex_text;
        let mut seen: IndexSet<String> = IndexSet::new();
        for (index, stream) in streams.iter().enumerate() {
            let text = if use_maps {
                extract_mapped(&stream.data, &registry, options)
            } else {
                extract_plain(&stream.data, options)
            };
            if text.trim().is_empty() {
                continue;
            }

            let chars = text.chars().count();
            let preview: String = text.chars().take(PREVIEW_LENGTH).collect();
            if seen.insert(text) {
                log::debug!("Stream {} ({:?}): {} chars {:?}", index, stream.source, chars, preview);
            } else {
                log::debug!("Stream {} ({:?}): {} chars (duplicate, skipping)", index, stream.source, chars);
            }
        }

        log_font_resources(&cache);

        ExtractionReport {
            analysis,
            object_count: table.len(),
            stream_count: streams.len(),
            font_count: registry.len(),
            fragments: seen.into_iter().collect(),
        }
    }
}
