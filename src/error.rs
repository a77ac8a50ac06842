//! Error types for the extraction pipeline.
//!
//! None of these ever reach a caller of [`crate::parse`]: every component
//! recovers locally and the orchestrator turns anything left over into an
//! empty result. They exist so the internals can use `?` and so diagnostics
//! can say what went wrong.

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting text.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// The classic cross-reference section could not be read
    #[error("Invalid cross-reference section at byte {offset}: {reason}")]
    InvalidXref {
        /// Byte offset the `startxref` marker pointed at
        offset: usize,
        /// Reason the section was rejected
        reason: String,
    },

    /// Referenced object not found in the object table
    #[error("Object not found: {0}")]
    ObjectNotFound(u32),

    /// Object bytes contain no `stream`...`endstream` span
    #[error("No stream span in object")]
    MissingStream,

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// Decompressed output exceeded the configured limits
    #[error("Decompression limit exceeded: {0}")]
    DecompressionLimit(String),

    /// ToUnicode CMap could not be interpreted
    #[error("CMap error: {0}")]
    CMap(String),

    /// Font program error
    #[error("Font error: {0}")]
    Font(String),

    /// Object stream header or index is unusable
    #[error("Invalid object stream {number}: {reason}")]
    InvalidObjectStream {
        /// Object number of the /ObjStm container
        number: u32,
        /// Reason the container was rejected
        reason: String,
    },

    /// A panic was caught at the pipeline boundary
    #[error("Extraction aborted: {0}")]
    Aborted(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<crate::fonts::truetype_parser::TrueTypeError> for Error {
    fn from(err: crate::fonts::truetype_parser::TrueTypeError) -> Self {
        Error::Font(err.to_string())
    }
}
