use crate::error::{GlyphSheetError, Result};
use crate::model::Glyph;
use crate::pixels::PixelGrid;
use image::RgbaImage;
use image::imageops;
use std::collections::VecDeque;
use tracing::debug;

/// Extracts one bounding box per 4-connected ink region.
///
/// Pixels are scanned row-major; the first unvisited ink pixel seeds a
/// breadth-first flood fill. Ids are handed out in discovery order, so the
/// output is identical for identical pixel data.
pub fn extract_blobs(grid: &PixelGrid, tolerance: u32) -> Vec<Glyph> {
    let (w, h) = grid.dimensions();
    if grid.is_empty() {
        return Vec::new();
    }
    let bg = grid.background();
    let mut visited = vec![false; (w as usize) * (h as usize)];
    let mut queue: VecDeque<(u32, u32)> = VecDeque::new();
    let mut blobs: Vec<Glyph> = Vec::new();
    let mut next_id = 0u32;

    for y in 0..h {
        for x in 0..w {
            let idx = (y as usize) * (w as usize) + x as usize;
            if visited[idx] || !grid.is_ink(x, y, bg, tolerance) {
                continue;
            }
            visited[idx] = true;
            queue.push_back((x, y));
            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);

            while let Some((cx, cy)) = queue.pop_front() {
                min_x = min_x.min(cx);
                min_y = min_y.min(cy);
                max_x = max_x.max(cx);
                max_y = max_y.max(cy);

                let mut visit = |nx: u32, ny: u32| {
                    let nidx = (ny as usize) * (w as usize) + nx as usize;
                    if !visited[nidx] && grid.is_ink(nx, ny, bg, tolerance) {
                        visited[nidx] = true;
                        queue.push_back((nx, ny));
                    }
                };
                if cx > 0 {
                    visit(cx - 1, cy);
                }
                if cx + 1 < w {
                    visit(cx + 1, cy);
                }
                if cy > 0 {
                    visit(cx, cy - 1);
                }
                if cy + 1 < h {
                    visit(cx, cy + 1);
                }
            }

            let bw = max_x - min_x + 1;
            let bh = max_y - min_y + 1;
            blobs.push(Glyph::new(next_id, min_x, min_y, bw, bh));
            next_id += 1;
        }
    }
    debug!(count = blobs.len(), width = w, height = h, "extracted blobs");
    blobs
}

/// Checks that a glyph rectangle lies within the grid.
pub fn check_bounds(grid: &PixelGrid, glyph: &Glyph) -> Result<()> {
    let (iw, ih) = grid.dimensions();
    let fits = glyph.width > 0
        && glyph.height > 0
        && (glyph.x as u64 + glyph.width as u64) <= iw as u64
        && (glyph.y as u64 + glyph.height as u64) <= ih as u64;
    if fits {
        Ok(())
    } else {
        Err(GlyphSheetError::GlyphOutOfBounds {
            id: glyph.id,
            x: glyph.x,
            y: glyph.y,
            width: glyph.width,
            height: glyph.height,
            image_width: iw,
            image_height: ih,
        })
    }
}

/// Copies the exact pixel rectangle of `glyph` into an independent image.
pub fn crop_glyph(grid: &PixelGrid, glyph: &Glyph) -> Result<RgbaImage> {
    check_bounds(grid, glyph)?;
    Ok(imageops::crop_imm(grid.as_rgba(), glyph.x, glyph.y, glyph.width, glyph.height).to_image())
}

/// Crops every glyph, in input order.
pub fn crop_glyphs(grid: &PixelGrid, glyphs: &[Glyph]) -> Result<Vec<RgbaImage>> {
    glyphs.iter().map(|g| crop_glyph(grid, g)).collect()
}
