//! SRT subtitle parsing and conversion to ASS.

use std::io::{self, BufRead, Write};
use std::result;

/// A stock V4+ header for converted scripts: one `Default` style and the
/// standard event format, ready for dialogue rows to be appended.
pub const DEFAULT_ASS_HEADER: &str = "\
[Script Info]
ScriptType: v4.00+
WrapStyle: 0
ScaledBorderAndShadow: yes

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H000000FF,&H00000000,&H00000000,0,0,0,0,100,100,0,0,1,2,0,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

#[derive(Debug, thiserror::Error)]
pub enum SrtError {
    #[error("failed to read subtitle: {0}")]
    Io(#[from] io::Error),

    #[error("line {line}: expected a cue index")]
    BadIndex { line: usize },

    #[error("line {line}: expected a time range")]
    BadTimeRange { line: usize },

    #[error("no cues to convert")]
    Empty,
}

pub type Result<T> = result::Result<T, SrtError>;

/// One subtitle cue: index, raw SRT timestamps, and the (possibly
/// multi-line) text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub index: u64,
    pub start: String,
    pub end: String,
    pub text: String,
}

/// A parsed SRT file.
#[derive(Debug, Default)]
pub struct SrtParser {
    cues: Vec<Cue>,
}

impl SrtParser {
    /// Parse an SRT stream. Cues are index line, `-->` time line, then
    /// text lines up to the next blank line.
    pub fn from_reader(reader: impl BufRead) -> Result<SrtParser> {
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>()?;
        let mut cues = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i].trim();
            if line.is_empty() {
                i += 1;
                continue;
            }

            let index: u64 = line.parse().map_err(|_| SrtError::BadIndex { line: i + 1 })?;
            i += 1;

            let time = lines
                .get(i)
                .map(|l| l.trim())
                .ok_or(SrtError::BadTimeRange { line: i + 1 })?;
            let (start, end) = time
                .split_once("-->")
                .ok_or(SrtError::BadTimeRange { line: i + 1 })?;
            let (start, end) = (start.trim().to_string(), end.trim().to_string());
            i += 1;

            let mut text_lines = Vec::new();
            while let Some(line) = lines.get(i) {
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                text_lines.push(line.to_string());
                i += 1;
            }

            cues.push(Cue { index, start, end, text: text_lines.join("\n") });
        }
        Ok(SrtParser { cues })
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Write the cues as an ASS script: `header` first (it must end with
    /// an `[Events]` format row), then one `Dialogue:` per cue with `\N`
    /// line breaks.
    pub fn to_ass<W: Write>(&self, mut writer: W, header: &str) -> Result<()> {
        if self.cues.is_empty() {
            return Err(SrtError::Empty);
        }
        writer.write_all(header.as_bytes())?;
        for cue in &self.cues {
            writeln!(
                writer,
                "Dialogue: 0,{},{},Default,,0,0,0,,{}",
                convert_time(&cue.start),
                convert_time(&cue.end),
                cue.text.replace('\n', "\\N"),
            )?;
        }
        Ok(())
    }
}

/// Normalize an SRT timestamp for ASS: comma to dot, fraction clipped or
/// padded to centiseconds.
fn convert_time(raw: &str) -> String {
    let raw = raw.replacen(',', ".", 1);
    match raw.split_once('.') {
        None => format!("{raw}.00"),
        Some((base, fraction)) => {
            let centis = match fraction.len() {
                0 => "00".to_string(),
                1 => format!("{fraction}0"),
                _ => fraction.get(..2).unwrap_or("00").to_string(),
            };
            format!("{base}.{centis}")
        }
    }
}
