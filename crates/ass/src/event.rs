//! Dialogue text scanning and override-tag interpretation.

use std::collections::{BTreeSet, HashMap};

use log::warn;

use crate::style::{
    calc_bold, calc_italic, FieldValueError, FontKey, StyleTable, DEFAULT_SLANT, DEFAULT_WEIGHT,
};

/// The Unicode scalar values one [`FontKey`] must be able to render.
pub type CodepointSet = BTreeSet<char>;

/// Every font key used by the script, with its collected codepoints.
pub type FontSetMap = HashMap<FontKey, CodepointSet>;

/// Scan one event's `Text` field, attributing every visible codepoint to
/// the font key active at that position.
///
/// `\h`, `\n` and `\N` produce nothing; `\{` and `\}` emit literal braces;
/// a `{...}` block runs the tag interpreter. An unterminated `{` is emitted
/// as a literal and scanning resumes at the next codepoint.
pub(crate) fn scan_text(
    text: &str,
    line: u32,
    initial: &FontKey,
    styles: &StyleTable,
    sets: &mut FontSetMap,
) {
    let runes: Vec<char> = text.chars().collect();
    let mut current = initial.clone();
    let mut i = 0;
    while i < runes.len() {
        match runes[i] {
            '\\' if i + 1 < runes.len() && matches!(runes[i + 1], 'h' | 'n' | 'N') => i += 2,
            '\\' if i + 1 < runes.len() && matches!(runes[i + 1], '{' | '}') => {
                emit(sets, &current, runes[i + 1]);
                i += 2;
            }
            '{' => match runes[i + 1..].iter().position(|&c| c == '}') {
                Some(offset) => {
                    let end = i + 1 + offset;
                    apply_overrides(&runes[i + 1..end], line, initial, styles, &mut current);
                    i = end + 1;
                }
                None => {
                    emit(sets, &current, '{');
                    i += 1;
                }
            },
            c => {
                emit(sets, &current, c);
                i += 1;
            }
        }
    }
}

/// Keys with an empty name intentionally collect nothing.
fn emit(sets: &mut FontSetMap, key: &FontKey, cp: char) {
    if key.name.is_empty() {
        return;
    }
    sets.entry(key.clone()).or_default().insert(cp);
}

/// Interpret the inside of a `{...}` override block. Only `\fn`, `\b`,
/// `\i` and `\r` touch the font key; every other tag is consumed up to the
/// next `\` and dropped.
fn apply_overrides(
    code: &[char],
    line: u32,
    initial: &FontKey,
    styles: &StyleTable,
    current: &mut FontKey,
) {
    let mut i = 0;
    while i < code.len() {
        if code[i] != '\\' {
            i += 1;
            continue;
        }
        i += 1;
        match code.get(i) {
            Some('f') if code.get(i + 1) == Some(&'n') => {
                let (arg, next) = read_arg(code, i + 2);
                let name = arg.trim();
                let name = name.strip_prefix('@').unwrap_or(name);
                if !name.is_empty() {
                    current.name = name.to_string();
                }
                i = next;
            }
            Some('b') => {
                i = numeric_tag(code, i + 1, |arg| match calc_bold(arg) {
                    Ok(weight) => current.weight = weight,
                    Err(FieldValueError::Negative(_)) => current.weight = DEFAULT_WEIGHT,
                    Err(FieldValueError::NotANumber(_)) => {}
                });
            }
            Some('i') => {
                i = numeric_tag(code, i + 1, |arg| match calc_italic(arg) {
                    Ok(slant) => current.italic = slant,
                    Err(FieldValueError::Negative(_)) => current.italic = DEFAULT_SLANT,
                    Err(FieldValueError::NotANumber(_)) => {}
                });
            }
            Some('r') => {
                // \rnd… is the random tag, not a reset
                if code.get(i + 1) == Some(&'n') && code.get(i + 2) == Some(&'d') {
                    i += 3;
                    continue;
                }
                let (arg, next) = read_arg(code, i + 1);
                let name = arg.trim();
                if name.is_empty() {
                    *current = initial.clone();
                } else if let Some(key) = styles.get(name) {
                    *current = key.clone();
                } else {
                    warn!("style \"{name}\" not found (line {line})");
                }
                i = next;
            }
            Some(_) => {
                let (_, next) = read_arg(code, i);
                i = next;
            }
            None => break,
        }
    }
}

/// `\b` and `\i` only take effect when what follows looks like a number;
/// anything else (`\bord`, `\blur`, `\iclip`, …) is a different tag.
fn numeric_tag(code: &[char], from: usize, apply: impl FnOnce(&str)) -> usize {
    match code.get(from) {
        Some(&c) if c.is_ascii_digit() || c == '-' || c == ' ' => {
            let (arg, next) = read_arg(code, from);
            let arg = arg.trim();
            if !arg.is_empty() {
                apply(arg);
            }
            next
        }
        _ => from,
    }
}

/// Collect characters up to the next `\` (or the end of the block) and
/// return them with the index of that `\`.
fn read_arg(code: &[char], from: usize) -> (String, usize) {
    let from = from.min(code.len());
    let end = code[from..]
        .iter()
        .position(|&c| c == '\\')
        .map(|p| from + p)
        .unwrap_or(code.len());
    (code[from..end].iter().collect(), end)
}
