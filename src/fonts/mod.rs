//! Character code to Unicode mapping.
//!
//! ToUnicode CMaps are the primary source; Unicode `cmap` tables of
//! embedded TrueType programs fill the gaps. The registry ties the
//! resulting maps to the font names content streams select.

pub mod cmap;
pub mod diagnostics;
pub mod registry;
pub mod truetype_parser;

pub use cmap::{parse_tounicode_cmap, CharCode, CharMap};
pub use registry::{build_font_registry, FontRegistry};
