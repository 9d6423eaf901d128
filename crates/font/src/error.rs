//! Error types for the font index and subset pipeline.

use std::path::PathBuf;
use std::{io, result};

use assfonts_ass::FontKey;

use crate::db::FaceLocation;

/// Errors raised while building, loading, matching against, or subsetting
/// from the font database.
#[derive(Debug, thiserror::Error)]
pub enum FontError {
    #[error("cannot access font database {path:?}: {source}")]
    DatabaseIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode font database {path:?}: {source}")]
    DatabaseFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read font file {path:?}: {source}")]
    FontIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no font files found")]
    NoFontFiles,

    #[error("no font face found for {key}")]
    MissingFontFace { key: FontKey },

    #[error("{location} is missing glyphs for {key}: {}", format_codepoints(.missing))]
    CoverageGap {
        key: FontKey,
        location: FaceLocation,
        missing: Vec<char>,
    },

    #[error("failed to subset {key} from {location}: {reason}")]
    Subset {
        key: FontKey,
        location: FaceLocation,
        reason: anyhow::Error,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error("no subset font data collected")]
    EmptySubsetData,
}

pub type Result<T> = result::Result<T, FontError>;

fn format_codepoints(missing: &[char]) -> String {
    missing
        .iter()
        .map(|c| format!("U+{:04X}", *c as u32))
        .collect::<Vec<_>>()
        .join(" ")
}
