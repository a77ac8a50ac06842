//! Configuration for text extraction.
//!
//! Every tunable constant of the pipeline lives here so tests and callers
//! can adjust them without touching the components.

/// Default number of trailing bytes searched for `startxref`.
pub const DEFAULT_STARTXREF_WINDOW: usize = 1024;

/// Default TJ adjustment below which a word space is emitted.
pub const DEFAULT_TJ_SPACE_THRESHOLD: f64 = -100.0;

/// Default cap on codes expanded from one `bfrange` line.
pub const DEFAULT_MAX_BFRANGE_SPAN: u32 = 256;

/// Default decompression ratio limit (compressed:decompressed).
pub const DEFAULT_MAX_DECOMPRESSION_RATIO: u32 = 100;

/// Default decompressed size limit per stream.
pub const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// Text extraction options.
///
/// # Example
///
/// ```
/// use pdf_ingest::ExtractOptions;
///
/// let options = ExtractOptions::new()
///     .with_tj_space_threshold(-250.0)
///     .with_raw_stream_scan(false);
/// assert_eq!(options.tj_space_threshold, -250.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractOptions {
    /// Number of bytes at the end of the file searched for `startxref`.
    pub startxref_window: usize,

    /// TJ numeric adjustments strictly below this value become a space.
    pub tj_space_threshold: f64,

    /// Maximum number of codes expanded from a single `bfrange` entry.
    pub max_bfrange_span: u32,

    /// Marker emitted for a 2-byte code the active font cannot map.
    pub missing_glyph_placeholder: char,

    /// Maximum decompression ratio. 0 disables the check.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed size of one stream in bytes. 0 disables the check.
    pub max_decompressed_size: usize,

    /// Run the brute-force `stream`...`endstream` pass over the whole file.
    pub scan_raw_streams: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtractOptions {
    /// Create options with the default values.
    pub fn new() -> Self {
        Self {
            startxref_window: DEFAULT_STARTXREF_WINDOW,
            tj_space_threshold: DEFAULT_TJ_SPACE_THRESHOLD,
            max_bfrange_span: DEFAULT_MAX_BFRANGE_SPAN,
            missing_glyph_placeholder: '?',
            max_decompression_ratio: DEFAULT_MAX_DECOMPRESSION_RATIO,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            scan_raw_streams: true,
        }
    }

    /// Set the `startxref` search window.
    pub fn with_startxref_window(mut self, bytes: usize) -> Self {
        self.startxref_window = bytes;
        self
    }

    /// Set the TJ word-space threshold.
    pub fn with_tj_space_threshold(mut self, threshold: f64) -> Self {
        self.tj_space_threshold = threshold;
        self
    }

    /// Set the per-line `bfrange` expansion cap.
    pub fn with_max_bfrange_span(mut self, span: u32) -> Self {
        self.max_bfrange_span = span;
        self
    }

    /// Set the placeholder for unmapped codes.
    pub fn with_missing_glyph_placeholder(mut self, placeholder: char) -> Self {
        self.missing_glyph_placeholder = placeholder;
        self
    }

    /// Set decompression bomb limits.
    pub fn with_decompression_limits(mut self, max_ratio: u32, max_size: usize) -> Self {
        self.max_decompression_ratio = max_ratio;
        self.max_decompressed_size = max_size;
        self
    }

    /// Enable or disable the brute-force stream scan.
    pub fn with_raw_stream_scan(mut self, enable: bool) -> Self {
        self.scan_raw_streams = enable;
        self
    }
}
