//! Font keys and the named style table.

use std::collections::HashMap;
use std::fmt;

use crate::format::FieldMap;

pub const DEFAULT_WEIGHT: u32 = 400;
pub const BOLD_WEIGHT: u32 = 700;
pub const DEFAULT_SLANT: u32 = 0;
pub const ITALIC_SLANT: u32 = 100;

/// Events referencing an undeclared style fall back to this one.
pub const DEFAULT_STYLE: &str = "Default";

/// A font as far as ASS is concerned: family name plus numeric weight and
/// slant. Equality and hashing are by the exact triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontKey {
    pub name: String,
    pub weight: u32,
    pub italic: u32,
}

impl FontKey {
    pub fn new(name: impl Into<String>, weight: u32, italic: u32) -> FontKey {
        FontKey { name: name.into(), weight, italic }
    }
}

impl fmt::Display for FontKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" ({},{})", self.name, self.weight, self.italic)
    }
}

/// A rejected `Bold`/`Italic` field value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldValueError {
    #[error("not a number: {0:?}")]
    NotANumber(String),
    #[error("negative value: {0}")]
    Negative(i64),
}

/// Interpret a `Bold` style field or `\b` override argument.
///
/// `1` and `-1` enable bold (700), `0` restores the default weight (400),
/// and other positive values pass through as an explicit weight.
pub fn calc_bold(raw: &str) -> Result<u32, FieldValueError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| FieldValueError::NotANumber(raw.to_string()))?;
    match value {
        1 | -1 => Ok(BOLD_WEIGHT),
        0 => Ok(DEFAULT_WEIGHT),
        v if v < 0 => Err(FieldValueError::Negative(v)),
        v => Ok(v as u32),
    }
}

/// Interpret an `Italic` style field or `\i` override argument. Only `1`
/// and `-1` enable the 100 slant.
pub fn calc_italic(raw: &str) -> Result<u32, FieldValueError> {
    let value: i64 = raw
        .parse()
        .map_err(|_| FieldValueError::NotANumber(raw.to_string()))?;
    match value {
        1 | -1 => Ok(ITALIC_SLANT),
        0 => Ok(DEFAULT_SLANT),
        v if v < 0 => Err(FieldValueError::Negative(v)),
        v => Ok(v as u32),
    }
}

/// Named styles declared in a `[V4 Styles]` / `[V4+ Styles]` section,
/// resolved down to the font key each one selects.
#[derive(Debug, Default)]
pub struct StyleTable {
    keys: HashMap<String, FontKey>,
}

impl StyleTable {
    /// Register a `Style:` row. A missing or empty `Name` field registers
    /// the `Default` style; a leading `@` (vertical layout marker) on the
    /// font name is stripped.
    pub fn push(&mut self, fields: &FieldMap) {
        let name = match fields.get("Name") {
            Some(n) if !n.is_empty() => n.clone(),
            _ => DEFAULT_STYLE.to_string(),
        };
        let fontname = fields
            .get("Fontname")
            .map(|f| f.strip_prefix('@').unwrap_or(f))
            .unwrap_or("");
        let mut key = FontKey::new(fontname, DEFAULT_WEIGHT, DEFAULT_SLANT);
        if let Some(bold) = fields.get("Bold") {
            key.weight = calc_bold(bold).unwrap_or(DEFAULT_WEIGHT);
        }
        if let Some(italic) = fields.get("Italic") {
            key.italic = calc_italic(italic).unwrap_or(DEFAULT_SLANT);
        }
        self.keys.insert(name, key);
    }

    pub fn get(&self, name: &str) -> Option<&FontKey> {
        self.keys.get(name)
    }

    /// Resolve the initial key for an event's `Style` field, falling back
    /// to the `Default` style when the named one does not exist.
    pub fn initial(&self, style: &str) -> Option<&FontKey> {
        self.keys.get(style).or_else(|| self.keys.get(DEFAULT_STYLE))
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn from_keys(keys: HashMap<String, FontKey>) -> StyleTable {
        StyleTable { keys }
    }
}
