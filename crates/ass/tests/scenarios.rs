//! End-to-end dialogue scanning fixtures over complete scripts.

use std::collections::BTreeMap;

use assfonts_ass::{AssParser, CodepointSet, FontKey, FontSetMap};

const STYLE_FORMAT: &str = "Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, \
    OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, \
    Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding";
const EVENT_FORMAT: &str =
    "Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

fn script_with(style: &str, text: &str) -> String {
    let style_tail = "48,&H00FFFFFF,&HF0000000,&H00665806,&H0058281B,0,0,0,0,100,100,1,0,1,2,0,2,30,30,10,1";
    format!(
        "[Script Info]\nTitle: fixture\n\n\
         [V4+ Styles]\n{STYLE_FORMAT}\n\
         Style: style1,楷体,{style_tail}\n\
         Style: style2,宋体,{style_tail}\n\n\
         [Events]\n{EVENT_FORMAT}\n\
         Dialogue: 0,0:00:00.88,0:59:59.82,{style},,0,0,0,,{text}\n"
    )
}

fn font_sets(style: &str, text: &str) -> FontSetMap {
    let script = script_with(style, text);
    let mut parser = AssParser::from_reader(script.as_bytes()).unwrap();
    parser.parse().unwrap();
    parser.into_font_sets()
}

fn set(chars: &str) -> CodepointSet {
    chars.chars().collect()
}

fn expect(entries: &[(FontKey, &str)]) -> FontSetMap {
    entries
        .iter()
        .map(|(key, chars)| (key.clone(), set(chars)))
        .collect()
}

#[test]
fn plain_text() {
    assert_eq!(
        font_sets("style1", "简单文本"),
        expect(&[(FontKey::new("楷体", 400, 0), "简单文本")])
    );
}

#[test]
fn reset_to_initial() {
    assert_eq!(
        font_sets("style1", r"{\fn宋体\b1}重置前{\r}重置后"),
        expect(&[
            (FontKey::new("宋体", 700, 0), "重置前"),
            (FontKey::new("楷体", 400, 0), "重置后"),
        ])
    );
}

#[test]
fn reset_to_named_style() {
    // style1's eagerly-created entry stays empty and is purged
    assert_eq!(
        font_sets("style1", r"{\rstyle2}指定样式"),
        expect(&[(FontKey::new("宋体", 400, 0), "指定样式")])
    );
}

#[test]
fn escaped_braces() {
    assert_eq!(
        font_sets("style1", r"转义\{字符\}测试"),
        expect(&[(FontKey::new("楷体", 400, 0), "转义{字符}测试")])
    );
}

#[test]
fn mixed_override_tags() {
    assert_eq!(
        font_sets("style1", r"{\fnA\b1}粗体A{\rstyle2\i1}斜体B{\r}普通"),
        expect(&[
            (FontKey::new("A", 700, 0), "粗体A"),
            (FontKey::new("宋体", 400, 100), "斜体B"),
            (FontKey::new("楷体", 400, 0), "普通"),
        ])
    );
}

#[test]
fn special_characters() {
    assert_eq!(
        font_sets("style1", r"特殊字符: \n \h \{ \} \\"),
        expect(&[(FontKey::new("楷体", 400, 0), "特殊字符: {}\\")])
    );
}

#[test]
fn nested_style_switches() {
    assert_eq!(
        font_sets(
            "style1",
            r"开始{\fnA}样式A{\fnB\b1}样式B{\r}重置{\rstyle2}样式2{\r}结束"
        ),
        expect(&[
            (FontKey::new("楷体", 400, 0), "开始重置结束"),
            (FontKey::new("A", 400, 0), "样式A"),
            (FontKey::new("B", 700, 0), "样式B"),
            (FontKey::new("宋体", 400, 0), "样式2"),
        ])
    );
}

#[test]
fn comments_code_blocks_and_escapes_mixed() {
    let text = r"我{你甚至可以在这里写注释\CODE_HERE\前面可以是一段代码，但无需关注}能{这里是\rndx10}吞下{\fn宋体\b1\i1}玻璃而{\pos(400,400)}不{\r}伤身{\rstyle2}体\{这是转义的\n括号\}";
    assert_eq!(
        font_sets("style1", text),
        expect(&[
            (FontKey::new("楷体", 400, 0), "我能吞下伤身"),
            (FontKey::new("宋体", 700, 100), "玻璃而不"),
            (FontKey::new("宋体", 400, 0), "体{这是转义的括号}"),
        ])
    );
}

#[test]
fn embed_round_trip_strips_old_fonts() {
    let script = script_with("style1", "简单文本");
    let mut parser = AssParser::from_reader(script.as_bytes()).unwrap();
    parser.parse().unwrap();

    let mut fonts = BTreeMap::new();
    fonts.insert("楷体.ttf".to_string(), vec![1u8, 2, 3, 4]);
    let mut first = Vec::new();
    parser.write_embedded(&fonts, &mut first).unwrap();
    let first = String::from_utf8(first).unwrap();
    let fonts_at = first.find("[Fonts]").unwrap();
    let events_at = first.find("[Events]").unwrap();
    assert!(fonts_at < events_at);

    // re-ingesting the embedded output drops the payload again
    let mut reparsed = AssParser::from_reader(first.as_bytes()).unwrap();
    reparsed.parse().unwrap();
    let mut second = Vec::new();
    reparsed.write_embedded(&BTreeMap::new(), &mut second).unwrap();
    let second = String::from_utf8(second).unwrap();
    assert_eq!(second.matches("[Fonts]").count(), 1);
    assert!(!second.contains("fontname: 楷体.ttf"));
    assert_eq!(reparsed.font_sets(), parser.font_sets());
}
