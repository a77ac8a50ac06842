//! Text-showing operators and their operands.
//!
//! Text extraction only cares about three things in a content stream:
//! font selection (`Tf`), string showing (`Tj`, `'`, `"`) and array showing
//! (`TJ`). [`text_operations`] pairs each of these operators with the
//! operand token that precedes it and drops everything else.

use crate::content::lexer::{tokenize, ContentToken};

/// Element of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    /// Literal string bytes
    Literal(Vec<u8>),
    /// Hex string bytes
    Hex(Vec<u8>),
    /// Positioning adjustment in thousandths of text space
    Adjustment(f64),
}

/// String operand of a text-showing operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextString {
    /// From a literal string `(...)`
    Literal(Vec<u8>),
    /// From a hex string `<...>`
    Hex(Vec<u8>),
}

/// A text operation found in a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum TextOperation {
    /// `/Name size Tf`
    SetFont(String),
    /// `string Tj`, `string '` or `aw ac string "`
    Show(TextString),
    /// `[...] TJ`
    ShowArray(Vec<TextElement>),
}

/// Pairing state between operators.
///
/// Holds the operand awaiting an operator, plus the last name operand for
/// `Tf`, whose font name is not the token right before it.
#[derive(Debug, Default)]
struct OperatorPairing {
    pending_operand: Option<ContentToken>,
    font_operand: Option<String>,
}

impl OperatorPairing {
    fn push(&mut self, token: ContentToken) -> Option<TextOperation> {
        let operator = match token {
            ContentToken::Operator(operator) => operator,
            ContentToken::Name(name) => {
                self.font_operand = Some(name.clone());
                self.pending_operand = Some(ContentToken::Name(name));
                return None;
            },
            operand => {
                self.pending_operand = Some(operand);
                return None;
            },
        };

        let operand = self.pending_operand.take();
        let font = self.font_operand.take();
        match (operator.as_str(), operand) {
            ("Tf", _) => font.map(TextOperation::SetFont),
            ("Tj" | "'" | "\"", Some(ContentToken::Literal(bytes))) => {
                Some(TextOperation::Show(TextString::Literal(bytes)))
            },
            ("Tj" | "'" | "\"", Some(ContentToken::Hex(bytes))) => {
                Some(TextOperation::Show(TextString::Hex(bytes)))
            },
            ("TJ", Some(ContentToken::Array(elements))) => Some(TextOperation::ShowArray(elements)),
            _ => None,
        }
    }
}

/// Text operations of a content stream, in stream order.
pub fn text_operations(content: &[u8]) -> Vec<TextOperation> {
    let mut pairing = OperatorPairing::default();
    tokenize(content)
        .into_iter()
        .filter_map(|token| pairing.push(token))
        .collect()
}
