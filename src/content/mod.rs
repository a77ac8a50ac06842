//! Content stream tokenizing and text operator pairing.

pub mod lexer;
pub mod operators;

pub use lexer::{tokenize, ContentToken};
pub use operators::{text_operations, TextElement, TextOperation, TextString};
