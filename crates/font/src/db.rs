//! The persistent face database: build, save/load, and matching.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use assfonts_ass::FontKey;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::backend::{FaceParser, FontSubsetter, HbSubsetter, SfntParser};
use crate::paths::find_font_files;
use crate::{FontError, Result};

/// One face inside a font file; collections hold several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub path: PathBuf,
    pub index: u32,
}

impl fmt::Display for FaceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"[{}]", self.path.display(), self.index)
    }
}

/// Persisted typographic metadata for one face. Names are stored
/// lowercase; weight is clamped to 100..=900 and slant is 0 or 110.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRecord {
    pub source: FaceLocation,
    pub family_names: Vec<String>,
    pub full_names: Vec<String>,
    pub ps_names: Vec<String>,
    pub weight: u16,
    pub slant: u16,
    pub modified: DateTime<Utc>,
}

/// The face database plus the backends used to build it and subset from
/// it. Records are keyed by path in sorted order, which keeps matching
/// deterministic.
pub struct FontDatabase {
    pub(crate) parser: Box<dyn FaceParser>,
    pub(crate) subsetter: Box<dyn FontSubsetter>,
    pub(crate) records: BTreeMap<PathBuf, Vec<FaceRecord>>,
    pub(crate) cache: HashMap<PathBuf, Vec<u8>>,
    pub(crate) big_memory: bool,
}

impl Default for FontDatabase {
    fn default() -> FontDatabase {
        FontDatabase::new()
    }
}

impl FontDatabase {
    /// A database with the standard read-fonts/HarfBuzz backends.
    pub fn new() -> FontDatabase {
        FontDatabase::with_backend(Box::new(SfntParser), Box::new(HbSubsetter))
    }

    /// A database with caller-supplied backends. Tests plug mocks in here.
    pub fn with_backend(
        parser: Box<dyn FaceParser>,
        subsetter: Box<dyn FontSubsetter>,
    ) -> FontDatabase {
        FontDatabase {
            parser,
            subsetter,
            records: BTreeMap::new(),
            cache: HashMap::new(),
            big_memory: false,
        }
    }

    /// Keep every indexed font file's bytes in memory. Costs RAM, saves
    /// re-reading files during subsetting.
    pub fn big_memory_mode(mut self, enabled: bool) -> FontDatabase {
        self.big_memory = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn face_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Scan `dirs` (plus the system font directories when requested) and
    /// index every face found. Unreadable or nameless files are reported
    /// and skipped, not fatal.
    pub fn build(&mut self, dirs: &[PathBuf], with_system: bool) -> Result<()> {
        for path in find_font_files(dirs, with_system)? {
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(err) => {
                    warn!("failed to read font file {path:?}: {err}");
                    continue;
                }
            };
            let faces = match self.parser.parse(&data) {
                Ok(faces) if !faces.is_empty() => faces,
                Ok(_) => {
                    warn!("no usable faces in {path:?}");
                    continue;
                }
                Err(err) => {
                    warn!("failed to parse font {path:?}: {err}");
                    continue;
                }
            };
            let modified = fs::metadata(&path)
                .and_then(|meta| meta.modified())
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            let records = faces
                .into_iter()
                .map(|meta| FaceRecord {
                    source: FaceLocation { path: path.clone(), index: meta.index },
                    family_names: meta.family_names,
                    full_names: meta.full_names,
                    ps_names: meta.ps_names,
                    weight: meta.weight,
                    slant: meta.slant,
                    modified,
                })
                .collect();
            if self.big_memory {
                self.cache.insert(path.clone(), data);
            }
            self.records.insert(path, records);
        }
        Ok(())
    }

    /// Serialize the path → faces map as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(&self.records).map_err(|source| {
            FontError::DatabaseFormat { path: path.to_path_buf(), source }
        })?;
        fs::write(path, data)
            .map_err(|source| FontError::DatabaseIo { path: path.to_path_buf(), source })
    }

    /// Load a previously saved database. A missing or malformed file is
    /// fatal here; the caller may choose to rebuild instead.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)
            .map_err(|source| FontError::DatabaseIo { path: path.to_path_buf(), source })?;
        self.records = serde_json::from_slice(&data).map_err(|source| {
            FontError::DatabaseFormat { path: path.to_path_buf(), source }
        })?;
        if self.big_memory {
            for font_path in self.records.keys() {
                let bytes = fs::read(font_path).map_err(|source| FontError::FontIo {
                    path: font_path.clone(),
                    source,
                })?;
                self.cache.insert(font_path.clone(), bytes);
            }
        }
        Ok(())
    }

    /// Resolve a font key to the best matching face and its score.
    ///
    /// Two passes run over the index, one for TrueType containers and one
    /// for OpenType. An exact full-name or PostScript-name hit scores 0;
    /// a family-name hit scores the weight/slant distance. The TrueType
    /// pass wins ties.
    pub fn find_face(&self, key: &FontKey) -> Result<(FaceLocation, u64)> {
        let target = key.name.to_lowercase();
        let ttf = self.scan_pass(&["ttf", "ttc"], &target, key);
        let otf = self.scan_pass(&["otf", "otc"], &target, key);
        let best = match (ttf, otf) {
            (None, None) => return Err(FontError::MissingFontFace { key: key.clone() }),
            (Some(t), None) => t,
            (None, Some(o)) => o,
            (Some(t), Some(o)) => {
                if t.1 <= o.1 {
                    t
                } else {
                    o
                }
            }
        };
        Ok((best.0.clone(), best.1))
    }

    fn scan_pass(
        &self,
        extensions: &[&str],
        target: &str,
        key: &FontKey,
    ) -> Option<(&FaceLocation, u64)> {
        let mut best: Option<(&FaceLocation, u64)> = None;
        for (path, faces) in &self.records {
            let wanted = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
            if !wanted {
                continue;
            }
            for face in faces {
                let score = if contains(&face.full_names, target)
                    || contains(&face.ps_names, target)
                {
                    0
                } else if contains(&face.family_names, target) {
                    (i64::from(key.weight) - i64::from(face.weight)).unsigned_abs()
                        + (i64::from(key.italic) - i64::from(face.slant)).unsigned_abs()
                } else {
                    continue;
                };
                if best.is_none_or(|(_, s)| score < s) {
                    best = Some((&face.source, score));
                }
                if score == 0 {
                    return best;
                }
            }
        }
        best
    }

    #[cfg(test)]
    pub(crate) fn insert_face(&mut self, record: FaceRecord, bytes: Vec<u8>) {
        self.cache.insert(record.source.path.clone(), bytes);
        self.records
            .entry(record.source.path.clone())
            .or_default()
            .push(record);
    }
}

fn contains(names: &[String], target: &str) -> bool {
    names.iter().any(|name| name == target)
}
