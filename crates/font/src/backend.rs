//! Backend seams: face metadata parsing and font subsetting.
//!
//! The two traits cover what the pipeline needs from a font stack: SFNT
//! name/weight/slant extraction plus glyph coverage on one side, and
//! subsetting on the other. The default implementations are read-fonts
//! and HarfBuzz; tests plug in mocks.

use anyhow::{Context, Result};
use assfonts_ass::CodepointSet;
use encoding_rs::{BIG5, GBK, UTF_16BE};
use hb_subset::{Blob, FontFace, SubsetInput, Tag};
use log::debug;
use read_fonts::tables::head::MacStyle;
use read_fonts::{FileRef, FontRef, TableProvider};
use write_fonts::FontBuilder;

const PLATFORM_MICROSOFT: u16 = 3;
const NAME_ID_FAMILY: u16 = 1;
const NAME_ID_FULL: u16 = 4;
const NAME_ID_PS: u16 = 6;
// Microsoft encoding ids carried by CJK name records
const MS_ENCODING_BIG5: u16 = 3;
const MS_ENCODING_PRC: u16 = 21;

/// Layout features retained in subsets. CJK subtitle fonts lean on the
/// width/vertical/locl machinery, so the whole set is kept.
pub const LAYOUT_FEATURES: &[&[u8; 4]] = &[
    b"aalt", b"ccmp", b"dlig", b"fwid", b"hwid", b"jp78", b"jp83", b"jp90", b"liga", b"locl",
    b"nlck", b"pwid", b"vert", b"vjmo", b"vrt2", b"halt", b"vhal", b"kern", b"mark", b"mkmk",
];

/// Typographic metadata for one face of a font file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceMeta {
    pub index: u32,
    pub family_names: Vec<String>,
    pub full_names: Vec<String>,
    pub ps_names: Vec<String>,
    pub weight: u16,
    pub slant: u16,
}

/// Extracts face metadata and answers glyph-coverage queries.
pub trait FaceParser: Send + Sync {
    /// Parse every face in a font or collection file.
    fn parse(&self, data: &[u8]) -> Result<Vec<FaceMeta>>;

    /// Whether the face maps `cp` to a glyph.
    fn has_glyph(&self, data: &[u8], index: u32, cp: char) -> Result<bool>;
}

/// Produces a reduced font binary covering a set of codepoints.
pub trait FontSubsetter: Send + Sync {
    fn subset(&self, data: &[u8], index: u32, codepoints: &CodepointSet) -> Result<Vec<u8>>;
}

/// Face metadata extraction backed by read-fonts.
#[derive(Debug, Default, Clone, Copy)]
pub struct SfntParser;

impl FaceParser for SfntParser {
    fn parse(&self, data: &[u8]) -> Result<Vec<FaceMeta>> {
        let mut faces = Vec::new();
        match FileRef::new(data).context("failed to parse font container")? {
            FileRef::Font(font) => faces.extend(parse_face(&font, 0)),
            FileRef::Collection(collection) => {
                for index in 0..collection.len() {
                    let font = collection
                        .get(index)
                        .with_context(|| format!("failed to open face {index}"))?;
                    faces.extend(parse_face(&font, index));
                }
            }
        }
        Ok(faces)
    }

    fn has_glyph(&self, data: &[u8], index: u32, cp: char) -> Result<bool> {
        let font = FontRef::from_index(data, index)
            .with_context(|| format!("failed to open face {index}"))?;
        let cmap = font
            .cmap()
            .with_context(|| format!("face {index} has no cmap table"))?;
        Ok(cmap.map_codepoint(cp).is_some())
    }
}

fn parse_face(font: &FontRef, index: u32) -> Option<FaceMeta> {
    let mut meta = FaceMeta {
        index,
        weight: face_weight(font),
        slant: face_slant(font),
        ..FaceMeta::default()
    };
    collect_names(font, &mut meta);
    if meta.family_names.is_empty() && meta.full_names.is_empty() && meta.ps_names.is_empty() {
        debug!("face {index}: no usable names");
        return None;
    }
    Some(meta)
}

/// Collect Microsoft-platform family/full/PostScript names, lowercased and
/// deduplicated. Placeholder `undefined` entries are dropped.
fn collect_names(font: &FontRef, meta: &mut FaceMeta) {
    let Ok(name) = font.name() else { return };
    let storage = name.string_data();
    for record in name.name_record() {
        if record.platform_id() != PLATFORM_MICROSOFT {
            continue;
        }
        let name_id = record.name_id().to_u16();
        if !matches!(name_id, NAME_ID_FAMILY | NAME_ID_FULL | NAME_ID_PS) {
            continue;
        }
        let start = record.string_offset().non_null().unwrap_or(0);
        let end = start + record.length() as usize;
        let Some(raw) = storage.as_bytes().get(start..end) else {
            continue;
        };
        let Some(decoded) = decode_name(record.encoding_id(), raw) else {
            continue;
        };
        let value = decoded.trim_end_matches('\0').to_lowercase();
        if value.is_empty() || value == "undefined" {
            continue;
        }
        let target = match name_id {
            NAME_ID_FAMILY => &mut meta.family_names,
            NAME_ID_FULL => &mut meta.full_names,
            _ => &mut meta.ps_names,
        };
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

/// Decode one name record. PRC and Big5 records are tried through their
/// legacy charsets first (NULs stripped), falling back to UTF-16BE.
fn decode_name(encoding_id: u16, raw: &[u8]) -> Option<String> {
    match encoding_id {
        MS_ENCODING_PRC => decode_legacy(GBK, raw),
        MS_ENCODING_BIG5 => decode_legacy(BIG5, raw),
        _ => decode_utf16be(raw),
    }
}

fn decode_legacy(encoding: &'static encoding_rs::Encoding, raw: &[u8]) -> Option<String> {
    let stripped: Vec<u8> = raw.iter().copied().filter(|&b| b != 0).collect();
    let (text, had_errors) = encoding.decode_without_bom_handling(&stripped);
    if had_errors {
        decode_utf16be(raw)
    } else {
        Some(text.into_owned())
    }
}

fn decode_utf16be(raw: &[u8]) -> Option<String> {
    let (text, had_errors) = UTF_16BE.decode_without_bom_handling(raw);
    if had_errors {
        None
    } else {
        Some(text.into_owned())
    }
}

fn face_weight(font: &FontRef) -> u16 {
    let os2_weight = font.os2().map(|t| t.us_weight_class()).unwrap_or(400);
    normalize_weight(os2_weight, style_flag(font, MacStyle::BOLD))
}

/// Normalize OS/2 `usWeightClass`: legacy 1..9 codes map to their class
/// values, 0 resolves through the bold style flag, and anything outside
/// 100..=900 falls back to 400.
fn normalize_weight(os2_weight: u16, bold: bool) -> u16 {
    let weight = match os2_weight {
        0 => {
            if bold {
                700
            } else {
                400
            }
        }
        1 => 100,
        2 => 200,
        3 => 300,
        4 => 350,
        5 => 400,
        6 => 600,
        7 => 700,
        8 => 800,
        9 => 900,
        w => w,
    };
    if (100..=900).contains(&weight) {
        weight
    } else {
        400
    }
}

fn face_slant(font: &FontRef) -> u16 {
    if style_flag(font, MacStyle::ITALIC) {
        110
    } else {
        0
    }
}

fn style_flag(font: &FontRef, flag: MacStyle) -> bool {
    font.head()
        .map(|head| head.mac_style().contains(flag))
        .unwrap_or(false)
}

/// HarfBuzz-backed subsetting. Every call opens its own face from the byte
/// buffer, so parallel tasks never share a handle.
#[derive(Debug, Default, Clone, Copy)]
pub struct HbSubsetter;

impl FontSubsetter for HbSubsetter {
    fn subset(&self, data: &[u8], index: u32, codepoints: &CodepointSet) -> Result<Vec<u8>> {
        let flattened;
        let data = if index == 0 {
            data
        } else {
            flattened = flatten_face(data, index)?;
            flattened.as_slice()
        };

        let mut input = SubsetInput::new()?;
        {
            let mut features = input.layout_feature_tag_set();
            for tag in LAYOUT_FEATURES {
                features.insert(Tag::new(*tag));
            }
        }
        {
            let mut unicodes = input.unicode_set();
            for &cp in codepoints {
                unicodes.insert(cp);
            }
        }

        let face = FontFace::new(Blob::from_bytes(data)?)?;
        let subset = input.subset_font(&face)?;
        Ok(subset.underlying_blob().to_vec())
    }
}

/// Copy one face of a collection into a standalone font, so the subsetter
/// always works from a single-font buffer.
fn flatten_face(data: &[u8], index: u32) -> Result<Vec<u8>> {
    let font = FontRef::from_index(data, index)
        .with_context(|| format!("failed to open face {index}"))?;
    let mut builder = FontBuilder::new();
    for record in font.table_directory.table_records() {
        let tag = record.tag();
        if let Some(table) = font.table_data(tag) {
            builder.add_raw(
                write_fonts::types::Tag::new(&tag.to_be_bytes()),
                table.as_bytes().to_vec(),
            );
        }
    }
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use write_fonts::tables::cmap::Cmap;
    use write_fonts::tables::name::{Name, NameRecord};
    use write_fonts::tables::os2::Os2;
    use write_fonts::types::{GlyphId, NameId};

    fn test_font(family: &str, weight: u16) -> Vec<u8> {
        let name = Name::new(vec![
            NameRecord::new(3, 1, 0x409, NameId::new(1), family.to_string().into()),
            NameRecord::new(3, 1, 0x409, NameId::new(4), format!("{family} Regular").into()),
            NameRecord::new(3, 1, 0x409, NameId::new(6), format!("{family}-Regular").into()),
            // non-Microsoft platforms are ignored
            NameRecord::new(1, 0, 0, NameId::new(1), "mac only".to_string().into()),
        ]);
        let os2 = Os2 {
            us_weight_class: weight,
            ..Os2::default()
        };
        let cmap =
            Cmap::from_mappings([('A', GlyphId::new(1)), ('文', GlyphId::new(2))]).unwrap();

        let mut builder = FontBuilder::new();
        builder.add_table(&name).unwrap();
        builder.add_table(&os2).unwrap();
        builder.add_table(&cmap).unwrap();
        builder.build()
    }

    #[test]
    fn extracts_names_and_weight() {
        let data = test_font("My Family", 600);
        let faces = SfntParser.parse(&data).unwrap();
        assert_eq!(faces.len(), 1);
        let face = &faces[0];
        assert_eq!(face.index, 0);
        assert_eq!(face.family_names, ["my family"]);
        assert_eq!(face.full_names, ["my family regular"]);
        assert_eq!(face.ps_names, ["my family-regular"]);
        assert_eq!(face.weight, 600);
        assert_eq!(face.slant, 0);
    }

    #[test]
    fn glyph_coverage_queries_cmap() {
        let data = test_font("My Family", 400);
        assert!(SfntParser.has_glyph(&data, 0, 'A').unwrap());
        assert!(SfntParser.has_glyph(&data, 0, '文').unwrap());
        assert!(!SfntParser.has_glyph(&data, 0, 'Z').unwrap());
    }

    #[test]
    fn garbage_is_not_a_font() {
        assert!(SfntParser.parse(b"not a font at all").is_err());
    }

    #[test]
    fn weight_normalization() {
        assert_eq!(normalize_weight(0, false), 400);
        assert_eq!(normalize_weight(0, true), 700);
        assert_eq!(normalize_weight(4, false), 350);
        assert_eq!(normalize_weight(5, false), 400);
        assert_eq!(normalize_weight(9, false), 900);
        assert_eq!(normalize_weight(653, false), 653);
        assert_eq!(normalize_weight(1000, false), 400);
        assert_eq!(normalize_weight(42, false), 400);
    }

    #[test]
    fn decodes_prc_records() {
        // GB2312 bytes for 宋体, with a stray NUL the way broken name
        // tables carry them
        assert_eq!(
            decode_name(MS_ENCODING_PRC, &[0x00, 0xCB, 0xCE, 0xCC, 0xE5]),
            Some("宋体".to_string())
        );
    }

    #[test]
    fn decodes_utf16be_records() {
        assert_eq!(
            decode_name(1, &[0x5B, 0x8B, 0x4F, 0x53]),
            Some("宋体".to_string())
        );
    }
}
