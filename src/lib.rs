// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::manual_find)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Ingest
//!
//! Best-effort plain-text extraction from raw PDF bytes.
//!
//! There is no object model here. Objects, dictionaries and streams are found
//! by matching byte patterns, which keeps extraction working on files a strict
//! parser would reject: broken cross-reference tables, missing `endobj`
//! keywords, truncated Flate streams.
//!
//! ## Pipeline
//!
//! 1. **Analyze**: byte-pattern flags (literal text, hex text, ToUnicode,
//!    object streams) and the `/BaseFont` inventory ([`analyzer`])
//! 2. **Locate objects**: classic xref table plus a scan for `N G obj`
//!    headers ([`xref`], [`xref_reconstruction`], [`objstm`])
//! 3. **Character maps**: ToUnicode CMaps and embedded TrueType `cmap`
//!    tables, registered under font names ([`fonts`])
//! 4. **Streams**: filter chains of located objects plus a raw
//!    `stream`...`endstream` scan ([`stream`], [`decoders`])
//! 5. **Text**: text-showing operators decoded per stream ([`content`],
//!    [`extractors`], [`text`])
//! 6. **Merge**: identical stream texts dropped, the rest joined and
//!    normalized ([`document`])
//!
//! ## Quick Start
//!
//! ```no_run
//! let bytes = std::fs::read("paper.pdf")?;
//! let text = pdf_ingest::parse(&bytes);
//! if text.is_empty() {
//!     eprintln!("no text could be extracted");
//! }
//! # Ok::<(), std::io::Error>(())
//! ```
//!
//! [`parse`] never fails and never panics: anything that goes wrong yields an
//! empty string. Use [`PdfTextParser::parse_detailed`] to see what each stage
//! produced.
//!
//! ## Logging
//!
//! Progress and recovered problems are reported through the [`log`] facade.
//! The library never installs a logger.

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Object location
pub mod object;
pub mod objstm;
pub mod xref;
pub mod xref_reconstruction;

// Streams
pub mod decoders;
pub mod stream;

// Fonts and text
pub mod analyzer;
pub mod content;
pub mod extractors;
pub mod fonts;
pub mod text;

// Orchestration
pub mod document;

// Re-exports
pub use config::ExtractOptions;
pub use document::{ExtractionReport, PdfTextParser};
pub use error::{Error, Result};

/// Extract the text of a PDF held in memory with default options.
///
/// Returns an empty string when nothing could be extracted.
///
/// # Example
///
/// ```
/// assert_eq!(pdf_ingest::parse(b"not a pdf"), "");
/// ```
pub fn parse(bytes: &[u8]) -> String {
    PdfTextParser::new(bytes).parse()
}

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
