//! Text decoding and normalization.

pub mod decode;
pub mod normalize;

pub use decode::{decode_bytes, DECODER_CHAIN};
pub use normalize::clean_extracted_text;
