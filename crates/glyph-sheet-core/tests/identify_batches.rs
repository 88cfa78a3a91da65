use glyph_sheet_core::identify::{apply_batch, parse_identification_response};
use glyph_sheet_core::prelude::*;
use image::RgbaImage;

/// Answers every image with a letter derived from its global position.
struct Alphabet {
    seen: usize,
    batch_sizes: Vec<usize>,
    fail_on_batch: Option<usize>,
}

impl Alphabet {
    fn new(fail_on_batch: Option<usize>) -> Self {
        Self {
            seen: 0,
            batch_sizes: Vec::new(),
            fail_on_batch,
        }
    }
}

impl GlyphIdentifier for Alphabet {
    fn identify(&mut self, images: &[RgbaImage]) -> Result<Vec<Identification>> {
        let batch_no = self.batch_sizes.len();
        self.batch_sizes.push(images.len());
        if self.fail_on_batch == Some(batch_no) {
            return Err(GlyphSheetError::Identify("upstream unavailable".into()));
        }
        let answers = (0..images.len())
            .map(|i| Identification {
                index: i,
                character: ((b'a' + ((self.seen + i) % 26) as u8) as char).to_string(),
            })
            .collect();
        self.seen += images.len();
        Ok(answers)
    }
}

fn grid_and_glyphs(n: u32) -> (PixelGrid, Vec<Glyph>) {
    let grid = PixelGrid::new(RgbaImage::new(400, 400));
    let glyphs = (0..n)
        .map(|i| Glyph::new(i, (i % 40) * 10, (i / 40) * 10, 4, 4))
        .collect();
    (grid, glyphs)
}

#[test]
fn glyphs_are_sent_in_batches() {
    let (grid, mut glyphs) = grid_and_glyphs(120);
    let mut id = Alphabet::new(None);
    let report = identify_glyphs(&grid, &mut glyphs, &mut id, DEFAULT_BATCH_SIZE).expect("identify");
    assert_eq!(id.batch_sizes, vec![50, 50, 20]);
    assert!(report.is_complete());
    assert_eq!(report.labeled, 120);
    assert_eq!(glyphs[0].character, Some('a'));
    assert_eq!(glyphs[27].character, Some('b'));
    assert_eq!(glyphs[119].character, Some((b'a' + (119 % 26) as u8) as char));
}

#[test]
fn failing_batch_keeps_earlier_labels() {
    let (grid, mut glyphs) = grid_and_glyphs(120);
    let mut id = Alphabet::new(Some(1));
    let report = identify_glyphs(&grid, &mut glyphs, &mut id, 50).expect("identify");
    assert_eq!(id.batch_sizes, vec![50, 50]);
    assert_eq!(report.batches_done, 1);
    assert_eq!(report.batches_total, 3);
    assert_eq!(report.labeled, 50);
    assert!(matches!(report.error, Some(GlyphSheetError::Identify(_))));
    assert!(!report.is_complete());
    assert!(glyphs[..50].iter().all(|g| g.character.is_some()));
    assert!(glyphs[50..].iter().all(|g| g.character.is_none()));
}

#[test]
fn out_of_bounds_glyph_fails_before_any_batch() {
    let (grid, mut glyphs) = grid_and_glyphs(3);
    glyphs.push(Glyph::new(9, 398, 398, 4, 4));
    let mut id = Alphabet::new(None);
    let result = identify_glyphs(&grid, &mut glyphs, &mut id, 50);
    assert!(matches!(result, Err(GlyphSheetError::GlyphOutOfBounds { id: 9, .. })));
    assert!(id.batch_sizes.is_empty());
}

#[test]
fn sparse_and_empty_answers() {
    let mut glyphs: Vec<Glyph> = (0..4).map(|i| Glyph::new(i, 0, 0, 1, 1)).collect();
    glyphs[2].character = Some('z');
    let answers = vec![
        Identification { index: 0, character: "Q".into() },
        Identification { index: 2, character: String::new() },
        Identification { index: 3, character: " ?!".into() },
        Identification { index: 11, character: "x".into() },
    ];
    let labeled = apply_batch(&mut glyphs, &answers);
    assert_eq!(labeled, 2);
    let chars: Vec<Option<char>> = glyphs.iter().map(|g| g.character).collect();
    assert_eq!(chars, vec![Some('Q'), None, Some('z'), Some('?')]);
}

#[test]
fn response_parsing_tolerates_fences() {
    let plain = r#"[{"index": 0, "character": "A"}, {"index": 1, "character": ""}]"#;
    assert_eq!(parse_identification_response(plain).expect("plain").len(), 2);

    let fenced = "Here you go:\n```json\n[{\"index\": 4, \"char\": \"%\"}]\n```";
    let list = parse_identification_response(fenced).expect("fenced");
    assert_eq!(list, vec![Identification { index: 4, character: "%".into() }]);

    assert!(parse_identification_response("sorry, I cannot help").is_none());
    assert!(parse_identification_response("] broken [").is_none());
}

#[test]
fn unparseable_response_labels_nothing_but_continues() {
    let (grid, mut glyphs) = grid_and_glyphs(60);
    let mut calls = 0usize;
    let mut id = JsonResponseIdentifier::new(|images: &[RgbaImage]| {
        calls += 1;
        if calls == 1 {
            Ok("not json at all".to_string())
        } else {
            let answers: Vec<String> = (0..images.len())
                .map(|i| format!("{{\"index\": {}, \"character\": \"k\"}}", i))
                .collect();
            Ok(format!("[{}]", answers.join(",")))
        }
    });
    let report = identify_glyphs(&grid, &mut glyphs, &mut id, 50).expect("identify");
    assert!(report.is_complete());
    assert_eq!(report.batches_done, 2);
    assert_eq!(report.labeled, 10);
    assert!(glyphs[..50].iter().all(|g| g.character.is_none()));
    assert!(glyphs[50..].iter().all(|g| g.character == Some('k')));
}

#[test]
fn labels_carry_over_when_counts_match() {
    let mut previous: Vec<Glyph> = (0..3).map(|i| Glyph::new(i, i * 10, 0, 5, 5)).collect();
    assign_sequence(&mut previous, "xyz");
    let mut fresh: Vec<Glyph> = (0..3).map(|i| Glyph::new(i, i * 10 + 1, 0, 5, 6)).collect();
    assert!(carry_over_labels(&previous, &mut fresh));
    assert_eq!(fresh[2].character, Some('z'));

    let mut fewer: Vec<Glyph> = (0..2).map(|i| Glyph::new(i, 0, 0, 1, 1)).collect();
    assert!(!carry_over_labels(&previous, &mut fewer));
    assert!(fewer.iter().all(|g| g.character.is_none()));
}
