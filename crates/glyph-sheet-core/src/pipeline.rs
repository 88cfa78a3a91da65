use crate::config::{DetectConfig, PackConfig};
use crate::detect::{check_bounds, crop_glyphs, extract_blobs};
use crate::error::{GlyphSheetError, Result};
use crate::merge::merge_blobs;
use crate::model::{Glyph, PackedAtlas};
use crate::packer::{ShelfPacker, atlas_width};
use crate::pixels::PixelGrid;
use crate::rows::organize_rows;
use image::RgbaImage;
use tracing::{debug, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Output of a repack: atlas metadata and the composited RGBA canvas.
pub struct PackOutput {
    pub atlas: PackedAtlas,
    pub rgba: RgbaImage,
}

impl PackOutput {
    /// Computes packing statistics for this output.
    /// This is a convenience method that delegates to `atlas.stats()`.
    pub fn stats(&self) -> crate::model::AtlasStats {
        self.atlas.stats()
    }
}

#[instrument(skip_all)]
/// Runs the detection pipeline: extract blobs, merge multi-part glyphs, organize rows.
///
/// Notes:
/// - A uniform sheet yields an empty list, not an error.
/// - Output is in reading order (rows top to bottom, glyphs left to right) with
///   `yoffset` relative to each row's top.
pub fn detect_glyphs(grid: &PixelGrid, cfg: &DetectConfig) -> Result<Vec<Glyph>> {
    cfg.validate()?;

    let blobs = extract_blobs(grid, cfg.tolerance);
    if blobs.is_empty() {
        return Ok(blobs);
    }
    let merged = if cfg.merge {
        merge_blobs(blobs, cfg)
    } else {
        blobs
    };
    let glyphs = organize_rows(merged, cfg);
    debug!(glyphs = glyphs.len(), "detection finished");
    Ok(glyphs)
}

/// Decodes an encoded sheet (PNG/JPEG) and detects its glyphs.
/// A malformed image fails the whole call.
pub fn decode_and_detect(bytes: &[u8], cfg: &DetectConfig) -> Result<Vec<Glyph>> {
    let grid = PixelGrid::decode(bytes)?;
    detect_glyphs(&grid, cfg)
}

/// Detects glyphs on several independent sheets.
///
/// Each sheet is its own pipeline run. With the `parallel` feature the runs are
/// spread over the rayon pool, one sheet per task; results keep input order.
pub fn detect_many(grids: &[PixelGrid], cfg: &DetectConfig) -> Vec<Result<Vec<Glyph>>> {
    #[cfg(feature = "parallel")]
    {
        grids.par_iter().map(|g| detect_glyphs(g, cfg)).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        grids.iter().map(|g| detect_glyphs(g, cfg)).collect()
    }
}

/// Copies characters from a previous detection when the glyph counts match.
///
/// Alignment is by index only; returns false (and changes nothing) otherwise.
pub fn carry_over_labels(previous: &[Glyph], fresh: &mut [Glyph]) -> bool {
    if previous.len() != fresh.len() {
        debug!(
            previous = previous.len(),
            fresh = fresh.len(),
            "glyph count changed; labels not carried over"
        );
        return false;
    }
    for (old, new) in previous.iter().zip(fresh.iter_mut()) {
        new.character = old.character;
    }
    true
}

/// Labels glyphs in order from `text`, skipping whitespace.
/// Returns how many glyphs were labeled; surplus glyphs keep their label.
pub fn assign_sequence(glyphs: &mut [Glyph], text: &str) -> usize {
    let mut count = 0;
    for (glyph, ch) in glyphs
        .iter_mut()
        .zip(text.chars().filter(|c| !c.is_whitespace()))
    {
        glyph.character = Some(ch);
        count += 1;
    }
    count
}

// ---------------- Repacking ----------------

struct Placement {
    index: usize,
    x: u32,
    y: u32,
}

fn plan_shelves(glyphs: &[Glyph], cfg: &PackConfig) -> Result<(u32, u32, Vec<Placement>)> {
    let mut order: Vec<usize> = (0..glyphs.len()).collect();
    // stable: equal heights keep input order
    order.sort_by(|&a, &b| glyphs[b].height.cmp(&glyphs[a].height));

    let sizes: Vec<(u32, u32)> = glyphs.iter().map(|g| (g.width, g.height)).collect();
    let width = atlas_width(&sizes, cfg)?;
    let mut packer = ShelfPacker::new(width, cfg.padding);
    let placements = order
        .into_iter()
        .map(|index| {
            let g = &glyphs[index];
            let (x, y) = packer.place(g.width, g.height)?;
            Ok(Placement { index, x, y })
        })
        .collect::<Result<Vec<Placement>>>()?;
    let height = u32::try_from(packer.height()).map_err(|_| GlyphSheetError::Surface {
        width: width as u64,
        height: packer.height(),
    })?;
    debug!(
        width,
        height,
        shelves = packer.shelves(),
        "planned shelf layout"
    );
    Ok((width, height, placements))
}

fn relocate(glyphs: &[Glyph], placements: &[Placement]) -> Vec<Glyph> {
    let mut out: Vec<Glyph> = placements
        .iter()
        .map(|p| Glyph {
            x: p.x,
            y: p.y,
            ..glyphs[p.index].clone()
        })
        .collect();
    out.sort_by_key(|g| g.id);
    out
}

#[instrument(skip_all)]
/// Repacks the pixel content of `glyphs` from `grid` into a power-of-two-wide atlas.
///
/// Notes:
/// - Glyphs are placed tallest first on left-to-right shelves.
/// - Output glyphs differ from the input only in `x`/`y` and are sorted by id.
/// - The canvas starts fully transparent.
pub fn pack_glyphs(grid: &PixelGrid, glyphs: &[Glyph], cfg: &PackConfig) -> Result<PackOutput> {
    cfg.validate()?;

    if glyphs.is_empty() {
        return Err(GlyphSheetError::Empty);
    }
    let crops = crop_glyphs(grid, glyphs)?;
    let (width, height, placements) = plan_shelves(glyphs, cfg)?;

    let mut canvas = crate::compositing::transparent_canvas(width, height)?;
    for p in &placements {
        crate::compositing::blit_rgba(&crops[p.index], &mut canvas, p.x, p.y, cfg.outlines);
    }
    let atlas = PackedAtlas {
        width,
        height,
        glyphs: relocate(glyphs, &placements),
    };
    Ok(PackOutput {
        atlas,
        rgba: canvas,
    })
}

// ---------------- Layout-only API ----------------

/// Computes the same placements as `pack_glyphs` without touching pixel data.
pub fn pack_layout(glyphs: &[Glyph], cfg: &PackConfig) -> Result<PackedAtlas> {
    cfg.validate()?;

    if glyphs.is_empty() {
        return Err(GlyphSheetError::Empty);
    }
    if let Some(bad) = glyphs.iter().find(|g| g.width == 0 || g.height == 0) {
        return Err(GlyphSheetError::InvalidInput(format!(
            "glyph {} has zero width or height",
            bad.id
        )));
    }
    let (width, height, placements) = plan_shelves(glyphs, cfg)?;
    Ok(PackedAtlas {
        width,
        height,
        glyphs: relocate(glyphs, &placements),
    })
}

/// Validates that every glyph rectangle lies within `grid`.
pub fn validate_glyphs(grid: &PixelGrid, glyphs: &[Glyph]) -> Result<()> {
    glyphs.iter().try_for_each(|g| check_bounds(grid, g))
}
