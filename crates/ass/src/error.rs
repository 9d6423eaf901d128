//! Error types for ASS script parsing.

use std::{io, result};

/// Errors that can occur while parsing an ASS script.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("failed to read script: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: data row before its section's Format header")]
    MissingFormat { line: u32 },

    #[error("line {line}: cannot split data row")]
    InvalidRow { line: u32 },

    #[error("line {line}: style \"{style}\" not found and no Default style exists")]
    UnknownStyle { line: u32, style: String },

    #[error("no style rows found")]
    StyleParseFailed,

    #[error("no event rows found")]
    EventParseFailed,
}

pub type Result<T> = result::Result<T, ParseError>;
