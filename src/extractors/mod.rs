//! Text extraction strategies for decoded content streams.
//!
//! - [`plain`]: no character maps; strings go through the byte decoder chain.
//! - [`mapped`]: hex strings are decoded through the font registry.
//!
//! Both return one string per stream: the non-empty fragments joined with
//! single spaces.

pub mod mapped;
pub mod plain;

pub use mapped::extract_mapped;
pub use plain::extract_plain;

use crate::content::TextElement;

/// Render a `TJ` array.
///
/// Strings are concatenated without separators; an adjustment strictly
/// below `space_threshold` contributes one space.
pub(crate) fn render_array<F>(elements: &[TextElement], space_threshold: f64, mut decode: F) -> String
where
    F: FnMut(&TextElement) -> String,
{
    let mut text = String::new();
    for element in elements {
        match element {
            TextElement::Adjustment(amount) => {
                if *amount < space_threshold {
                    text.push(' ');
                }
            },
            string => text.push_str(&decode(string)),
        }
    }
    text
}

/// Fragments collected from one stream.
#[derive(Debug, Default)]
pub(crate) struct Fragments {
    parts: Vec<String>,
}

impl Fragments {
    /// Keep `text` without NULs unless only whitespace remains.
    pub(crate) fn push(&mut self, text: String) {
        let text = if text.contains('\0') {
            text.replace('\0', "")
        } else {
            text
        };
        if !text.trim().is_empty() {
            self.parts.push(text);
        }
    }

    pub(crate) fn join(self) -> String {
        self.parts.join(" ")
    }
}
