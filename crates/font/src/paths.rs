//! Font file discovery over user and system directories.

use std::path::{Path, PathBuf};

use glob::glob;
use log::warn;

use crate::{FontError, Result};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "otc"];

/// Whether a path names a font container we can index. Extensions match
/// case-insensitively.
pub(crate) fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| FONT_EXTENSIONS.iter().any(|want| ext.eq_ignore_ascii_case(want)))
}

/// Recursively enumerate font files under `dirs`, optionally extended with
/// the operating system's font directories.
pub fn find_font_files(dirs: &[PathBuf], with_system: bool) -> Result<Vec<PathBuf>> {
    let mut roots = dirs.to_vec();
    if with_system {
        roots.extend(system_font_dirs());
    }
    let mut files = Vec::new();
    for root in &roots {
        let pattern = root.join("**").join("*");
        let Some(pattern) = pattern.to_str() else {
            warn!("skipping non-UTF-8 font directory {root:?}");
            continue;
        };
        match glob(pattern) {
            Ok(paths) => files.extend(
                paths
                    .filter_map(|p| p.ok())
                    .filter(|p| p.is_file() && is_font_file(p)),
            ),
            Err(err) => warn!("cannot scan {root:?}: {err}"),
        }
    }
    if files.is_empty() {
        return Err(FontError::NoFontFiles);
    }
    Ok(files)
}

/// The operating system's font directories, filtered to those that exist.
pub fn system_font_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    if cfg!(target_os = "macos") {
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(Path::new(&home).join("Library/Fonts"));
        }
    } else if cfg!(target_os = "windows") {
        if let Ok(windir) = std::env::var("WINDIR") {
            dirs.push(Path::new(&windir).join("Fonts"));
        }
    } else {
        dirs.push(PathBuf::from("/usr/share/fonts"));
        if let Ok(home) = std::env::var("HOME") {
            dirs.push(Path::new(&home).join(".local/share/fonts"));
        }
    }
    dirs.retain(|dir| dir.is_dir());
    dirs
}
