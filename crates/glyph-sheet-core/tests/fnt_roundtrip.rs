use glyph_sheet_core::prelude::*;

type Tuple = (i64, u32, u32, u32, u32, i32, i32, i32);

fn tuple(g: &Glyph) -> Tuple {
    (g.code_point(), g.x, g.y, g.width, g.height, g.xoffset, g.yoffset, g.xadvance)
}

fn labeled_set() -> Vec<Glyph> {
    let mut glyphs: Vec<Glyph> = (0..6u32)
        .map(|i| Glyph::new(i, i * 20, 4, 8 + i, 10 + 2 * i))
        .collect();
    assign_sequence(&mut glyphs, "Ag! é");
    glyphs[1].yoffset = 6;
    glyphs
}

#[test]
fn packed_set_roundtrips_through_fnt_text() {
    let glyphs = labeled_set();
    let atlas = pack_layout(&glyphs, &PackConfig::default()).expect("pack");
    let info = FontInfo::default().derive_metrics(&atlas.glyphs);
    let text = to_fnt_text(&atlas.glyphs, &info, atlas.width, atlas.height);

    let parsed = parse_fnt_text(&text).expect("parse");
    assert_eq!(parsed.glyphs.len(), atlas.glyphs.len());
    for (a, b) in atlas.glyphs.iter().zip(&parsed.glyphs) {
        assert_eq!(tuple(a), tuple(b));
    }
    assert_eq!(parsed.scale_w, atlas.width);
    assert_eq!(parsed.scale_h, atlas.height);
    assert_eq!(parsed.info.line_height, info.line_height);
    assert_eq!(parsed.info.base, info.base);
    assert_eq!(parsed.info.page_file, "atlas.png");
}

#[test]
fn fnt_layout_has_header_lines_then_chars() {
    let glyphs = labeled_set();
    let info = FontInfo {
        face: "Hand Drawn".into(),
        size: 24,
        bold: true,
        ..Default::default()
    };
    let text = to_fnt_text(&glyphs, &info, 128, 64);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4 + glyphs.len());
    assert!(lines[0].starts_with("info face=\"Hand Drawn\" size=24 bold=1 italic=0"));
    assert!(lines[1].starts_with("common lineHeight=0 base=0 scaleW=128 scaleH=64"));
    assert_eq!(lines[2], "page id=0 file=\"atlas.png\"");
    assert_eq!(lines[3], "chars count=6");
    assert_eq!(
        lines[4],
        "char id=65 x=0 y=4 width=8 height=10 xoffset=0 yoffset=0 xadvance=9 page=0 chnl=15"
    );
    // whitespace is skipped, so only four glyphs are labeled
    assert!(lines[9].starts_with("char id=-1 "));

    let parsed = parse_fnt_text(&text).expect("parse");
    assert_eq!(parsed.info.face, "Hand Drawn");
    assert!(parsed.info.bold);
    assert_eq!(parsed.glyphs[3].character, Some('é'));
    assert_eq!(parsed.glyphs[5].character, None);
}

#[test]
fn tracking_is_added_to_advance_and_clamped() {
    let glyphs = vec![Glyph::new(0, 0, 0, 4, 4)];
    let wide = FontInfo {
        tracking: 3,
        ..Default::default()
    };
    let text = to_fnt_text(&glyphs, &wide, 128, 8);
    assert!(text.contains("xadvance=8 "));

    let tight = FontInfo {
        tracking: -20,
        ..Default::default()
    };
    let text = to_fnt_text(&glyphs, &tight, 128, 8);
    assert!(text.contains("xadvance=0 "));
}

#[test]
fn malformed_char_line_reports_line_number() {
    let text = "info face=\"x\" size=12\nchars count=1\nchar id=65 x=abc y=0 width=1 height=1\n";
    match parse_fnt_text(text) {
        Err(GlyphSheetError::Parse { line, message }) => {
            assert_eq!(line, 3);
            assert!(message.contains("x="));
        }
        other => panic!("expected parse error, got {:?}", other.map(|f| f.glyphs.len())),
    }

    let missing = "char id=65 x=1 y=0 width=1\n";
    assert!(matches!(
        parse_fnt_text(missing),
        Err(GlyphSheetError::Parse { line: 1, .. })
    ));
}

#[test]
fn json_export_reads_back() {
    let glyphs = labeled_set();
    let info = FontInfo::default().derive_metrics(&glyphs);
    let value = to_json(&glyphs, &info, 128, 64);
    assert_eq!(value["common"]["scaleW"], 128);
    assert_eq!(value["glyphs"][0]["codePoint"], 65);
    let back = glyphs_from_json(&value).expect("json");
    assert_eq!(back, glyphs);

    let bare = serde_json::to_value(&glyphs).expect("value");
    assert_eq!(glyphs_from_json(&bare).expect("bare"), glyphs);
}
