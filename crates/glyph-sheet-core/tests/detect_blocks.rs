use glyph_sheet_core::prelude::*;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

fn fill_rect(img: &mut RgbaImage, x: u32, y: u32, w: u32, h: u32, color: Rgba<u8>) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, color);
        }
    }
}

fn boxes(glyphs: &[Glyph]) -> Vec<(u32, u32, u32, u32)> {
    glyphs.iter().map(|g| (g.x, g.y, g.width, g.height)).collect()
}

#[test]
fn is_ink_alpha_mode_on_transparent_background() {
    let bg = Rgba([0, 0, 0, 0]);
    assert!(!is_ink(Rgba([255, 255, 255, 20]), bg, 20));
    assert!(is_ink(Rgba([0, 0, 0, 21]), bg, 20));
}

#[test]
fn is_ink_rgb_distance_on_opaque_background() {
    assert!(!is_ink(Rgba([255, 255, 235, 255]), WHITE, 20));
    assert!(is_ink(Rgba([255, 255, 234, 255]), WHITE, 20));
    // sqrt(3 * 12^2) ~= 20.78
    assert!(is_ink(Rgba([243, 243, 243, 255]), WHITE, 20));
    // alpha is ignored against an opaque background
    assert!(!is_ink(Rgba([255, 255, 255, 0]), WHITE, 20));
}

#[test]
fn uniform_sheet_yields_no_glyphs() {
    let grid = PixelGrid::new(RgbaImage::from_pixel(48, 32, WHITE));
    let glyphs = detect_glyphs(&grid, &DetectConfig::default()).expect("detect");
    assert!(glyphs.is_empty());

    // noise within tolerance is still background
    let mut img = RgbaImage::from_pixel(48, 32, WHITE);
    fill_rect(&mut img, 10, 10, 5, 5, Rgba([250, 250, 250, 255]));
    let glyphs = detect_glyphs(&PixelGrid::new(img), &DetectConfig::default()).expect("detect");
    assert!(glyphs.is_empty());
}

#[test]
fn single_rectangle_on_transparent_sheet() {
    let mut img = RgbaImage::new(64, 64);
    fill_rect(&mut img, 5, 5, 10, 14, Rgba([200, 30, 30, 255]));
    let grid = PixelGrid::new(img);

    let glyphs = detect_glyphs(&grid, &DetectConfig::default()).expect("detect");
    assert_eq!(glyphs.len(), 1);
    let g = &glyphs[0];
    assert_eq!((g.x, g.y, g.width, g.height), (5, 5, 10, 14));
    assert_eq!(g.yoffset, 0);
    assert_eq!(g.xoffset, 0);
    assert_eq!(g.xadvance, 11);
    assert_eq!(g.character, None);
}

#[test]
fn separated_blocks_keep_their_true_extents() {
    let mut img = RgbaImage::from_pixel(200, 120, WHITE);
    let blocks = [
        (10, 10, 10, 12),
        (40, 10, 10, 12),
        (70, 10, 10, 12),
        (10, 60, 10, 12),
        (40, 60, 10, 12),
        (70, 60, 10, 12),
    ];
    for &(x, y, w, h) in &blocks {
        fill_rect(&mut img, x, y, w, h, BLACK);
    }
    let glyphs = detect_glyphs(&PixelGrid::new(img), &DetectConfig::default()).expect("detect");
    assert_eq!(glyphs.len(), blocks.len());
    // reading order: top row left to right, then the next row
    assert_eq!(boxes(&glyphs), blocks.to_vec());
}

#[test]
fn diagonal_pixels_are_separate_components() {
    let mut img = RgbaImage::new(8, 8);
    img.put_pixel(2, 2, BLACK);
    img.put_pixel(3, 3, BLACK);
    let blobs = extract_blobs(&PixelGrid::new(img), DEFAULT_TOLERANCE);
    assert_eq!(blobs.len(), 2);
}

#[test]
fn extraction_ids_follow_row_major_discovery() {
    let mut img = RgbaImage::new(40, 40);
    // a U shape is discovered once, from its top-left arm
    fill_rect(&mut img, 20, 5, 2, 10, BLACK);
    fill_rect(&mut img, 26, 5, 2, 10, BLACK);
    fill_rect(&mut img, 20, 15, 8, 2, BLACK);
    fill_rect(&mut img, 2, 30, 3, 3, BLACK);
    let grid = PixelGrid::new(img);

    let first = extract_blobs(&grid, DEFAULT_TOLERANCE);
    let second = extract_blobs(&grid, DEFAULT_TOLERANCE);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].id, 0);
    assert_eq!(boxes(&first[..1]), vec![(20, 5, 8, 12)]);
    assert_eq!(first[1].id, 1);
    assert_eq!(boxes(&first[1..]), vec![(2, 30, 3, 3)]);
}

#[test]
fn crop_copies_exact_rectangle() {
    let mut img = RgbaImage::new(16, 16);
    fill_rect(&mut img, 4, 6, 3, 2, BLACK);
    img.put_pixel(6, 7, Rgba([9, 8, 7, 255]));
    let grid = PixelGrid::new(img);
    let glyph = Glyph::new(0, 4, 6, 3, 2);
    let crop = crop_glyph(&grid, &glyph).expect("crop");
    assert_eq!(crop.dimensions(), (3, 2));
    assert_eq!(*crop.get_pixel(2, 1), Rgba([9, 8, 7, 255]));

    let outside = Glyph::new(7, 14, 14, 4, 4);
    match crop_glyph(&grid, &outside) {
        Err(GlyphSheetError::GlyphOutOfBounds { id, .. }) => assert_eq!(id, 7),
        other => panic!("expected GlyphOutOfBounds, got {:?}", other.map(|c| c.dimensions())),
    }
}

#[test]
fn decode_and_detect_png_bytes() {
    let mut img = RgbaImage::new(32, 32);
    fill_rect(&mut img, 3, 4, 6, 7, BLACK);
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode");
    let glyphs = glyph_sheet_core::decode_and_detect(bytes.get_ref(), &DetectConfig::default())
        .expect("detect");
    assert_eq!(boxes(&glyphs), vec![(3, 4, 6, 7)]);
}

#[test]
fn malformed_image_is_a_hard_error() {
    let result = glyph_sheet_core::decode_and_detect(b"not an image", &DetectConfig::default());
    assert!(matches!(result, Err(GlyphSheetError::Image(_))));
}

#[test]
fn raw_buffer_length_is_checked() {
    assert!(PixelGrid::from_raw(4, 4, vec![0; 64]).is_ok());
    assert!(matches!(
        PixelGrid::from_raw(4, 4, vec![0; 60]),
        Err(GlyphSheetError::InvalidInput(_))
    ));
}
