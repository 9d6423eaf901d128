//! The parser proper: content lines in, a font-usage map out.

use std::io::BufRead;

use crate::content::{read_content, ContentLine, Section};
use crate::event::{scan_text, FontSetMap};
use crate::format::FormatSpec;
use crate::style::{StyleTable, DEFAULT_STYLE};
use crate::{ParseError, Result};

/// Parses an ASS script and records, for every font key the script uses,
/// the set of codepoints that key must be able to render.
#[derive(Debug, Default)]
pub struct AssParser {
    contents: Vec<ContentLine>,
    styles: StyleTable,
    font_sets: FontSetMap,
}

/// Parse-time cursor: the current section and the `Format:` spec each data
/// section has declared so far.
#[derive(Default)]
struct ParseState {
    section: Option<Section>,
    styles_format: Option<FormatSpec>,
    events_format: Option<FormatSpec>,
    saw_style: bool,
    saw_event: bool,
}

impl ParseState {
    fn enter(&mut self, section: Section) {
        self.section = Some(section);
        match section {
            Section::Styles => self.styles_format = None,
            Section::Events => self.events_format = None,
            _ => {}
        }
    }
}

impl AssParser {
    /// Ingest a script, dropping any embedded `[Fonts]` payload.
    pub fn from_reader(reader: impl BufRead) -> Result<AssParser> {
        Ok(AssParser {
            contents: read_content(reader)?,
            ..AssParser::default()
        })
    }

    pub fn contents(&self) -> &[ContentLine] {
        &self.contents
    }

    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    pub fn font_sets(&self) -> &FontSetMap {
        &self.font_sets
    }

    pub fn into_font_sets(self) -> FontSetMap {
        self.font_sets
    }

    /// Walk every content line, building the style table and attributing
    /// dialogue codepoints to font keys. Fails unless the script declares
    /// at least one style and one event; keys that end up with no
    /// codepoints are purged.
    pub fn parse(&mut self) -> Result<()> {
        let mut state = ParseState::default();
        for line in &self.contents {
            parse_line(line, &mut state, &mut self.styles, &mut self.font_sets)?;
        }
        if !state.saw_style {
            return Err(ParseError::StyleParseFailed);
        }
        if !state.saw_event {
            return Err(ParseError::EventParseFailed);
        }
        self.font_sets.retain(|_, set| !set.is_empty());
        Ok(())
    }
}

fn parse_line(
    line: &ContentLine,
    state: &mut ParseState,
    styles: &mut StyleTable,
    sets: &mut FontSetMap,
) -> Result<()> {
    let text = line.text.trim();
    if let Some(section) = Section::from_header(text) {
        state.enter(section);
        return Ok(());
    }

    match state.section {
        Some(Section::Styles) => {
            if has_prefix_ci(text, "format:") {
                state.styles_format = FormatSpec::parse(text);
            } else if has_prefix_ci(text, "style:") {
                let format = state
                    .styles_format
                    .as_ref()
                    .ok_or(ParseError::MissingFormat { line: line.number })?;
                let fields = format
                    .split_row(text)
                    .ok_or(ParseError::InvalidRow { line: line.number })?;
                styles.push(&fields);
                state.saw_style = true;
            }
        }
        Some(Section::Events) => {
            if has_prefix_ci(text, "format:") {
                state.events_format = FormatSpec::parse(text);
            } else if has_prefix_ci(text, "dialogue:") || has_prefix_ci(text, "comment:") {
                let format = state
                    .events_format
                    .as_ref()
                    .ok_or(ParseError::MissingFormat { line: line.number })?;
                let fields = format
                    .split_row(text)
                    .ok_or(ParseError::InvalidRow { line: line.number })?;
                let style = fields
                    .get("Style")
                    .map(String::as_str)
                    .unwrap_or(DEFAULT_STYLE);
                let initial = styles
                    .initial(style)
                    .ok_or_else(|| ParseError::UnknownStyle {
                        line: line.number,
                        style: style.to_string(),
                    })?
                    .clone();
                // surface declared-but-unused keys so the final purge sees them
                if !initial.name.is_empty() {
                    sets.entry(initial.clone()).or_default();
                }
                if let Some(dialogue) = fields.get("Text") {
                    scan_text(dialogue, line.number, &initial, styles, sets);
                }
                state.saw_event = true;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Case-insensitive ASCII prefix test, safe on multi-byte input.
fn has_prefix_ci(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
