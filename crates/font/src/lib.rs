//! Font library indexing, matching, and subsetting.
//!
//! A [`FontDatabase`] scans font directories once, persists the extracted
//! name/weight/slant metadata as JSON, resolves the font keys an ASS
//! script uses against that index, and produces subset font binaries ready
//! for embedding.

mod backend;
mod db;
mod error;
mod paths;
mod subset;

pub use backend::{FaceMeta, FaceParser, FontSubsetter, HbSubsetter, SfntParser, LAYOUT_FEATURES};
pub use db::{FaceLocation, FaceRecord, FontDatabase};
pub use error::{FontError, Result};
pub use paths::{find_font_files, system_font_dirs};
pub use subset::{ancillary_codepoints, ErrorHook, SubsetOptions, SubsetRequest};
