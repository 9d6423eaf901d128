//! ASS subtitle script parsing and font embedding.
//!
//! The parser walks a script once, keeping a live (font, weight, italic)
//! key per dialogue line, and records which codepoints each key must be
//! able to render. The writer emits the script back out with subset fonts
//! spliced into a `[Fonts]` section.

mod content;
mod error;
mod event;
mod format;
mod parser;
mod style;
mod uuencode;
mod writer;

pub use content::{ContentLine, Section};
pub use error::{ParseError, Result};
pub use event::{CodepointSet, FontSetMap};
pub use format::{FieldMap, FormatSpec};
pub use parser::AssParser;
pub use style::{
    calc_bold, calc_italic, FieldValueError, FontKey, StyleTable, BOLD_WEIGHT, DEFAULT_SLANT,
    DEFAULT_WEIGHT, ITALIC_SLANT,
};
pub use uuencode::uuencode;
