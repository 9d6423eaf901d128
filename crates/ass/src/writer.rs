//! Script output with the synthesized `[Fonts]` block.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::parser::AssParser;
use crate::uuencode::uuencode;

impl AssParser {
    /// Write the script back out, each line `\n`-terminated, inserting a
    /// `[Fonts]` block immediately before the `[Events]` header. Entries
    /// are emitted in name order so the output is deterministic.
    pub fn write_embedded<W: Write>(
        &self,
        fonts: &BTreeMap<String, Vec<u8>>,
        mut writer: W,
    ) -> io::Result<()> {
        let mut inserted = false;
        for line in self.contents() {
            if !inserted && line.text.trim().to_lowercase() == "[events]" {
                write_fonts_block(fonts, &mut writer)?;
                inserted = true;
            }
            writer.write_all(line.text.as_bytes())?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }
}

fn write_fonts_block<W: Write>(
    fonts: &BTreeMap<String, Vec<u8>>,
    writer: &mut W,
) -> io::Result<()> {
    writer.write_all(b"[Fonts]\n")?;
    for (name, data) in fonts {
        writeln!(writer, "fontname: {name}")?;
        let mut encoded = String::new();
        uuencode(data, true, &mut encoded);
        writer.write_all(encoded.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.write_all(b"\n")
}
