use serde::{Deserialize, Serialize};

/// Metadata of one character cell on a sheet (pixels).
///
/// `x,y` is the top-left of the ink bounding box; `width,height` are sizes.
/// A freshly extracted blob is a `Glyph` whose `character` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Glyph {
    pub id: u32,
    /// Identified character, `None` while unidentified.
    #[serde(default)]
    pub character: Option<char>,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub xoffset: i32,
    #[serde(default)]
    pub yoffset: i32,
    pub xadvance: i32,
}

impl Glyph {
    /// New unidentified glyph covering `(x, y, width, height)` with `xadvance = width + 1`.
    pub fn new(id: u32, x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            id,
            character: None,
            x,
            y,
            width,
            height,
            xoffset: 0,
            yoffset: 0,
            xadvance: width as i32 + 1,
        }
    }

    /// Exclusive right edge (`x + width`).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge (`y + height`).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }

    /// Returns true if the bounding box of `other` is fully inside `self`.
    pub fn contains(&self, other: &Glyph) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns true if the two bounding boxes share at least one pixel.
    pub fn intersects(&self, other: &Glyph) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Numeric code point of the identified character, or -1 when unset.
    pub fn code_point(&self) -> i64 {
        self.character.map(|c| c as i64).unwrap_or(-1)
    }
}

/// Result of repacking a glyph set: atlas size plus relocated glyphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackedAtlas {
    pub width: u32,
    pub height: u32,
    /// Glyphs sorted by id; only `x`/`y` differ from the input set.
    pub glyphs: Vec<Glyph>,
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtlasStats {
    pub num_glyphs: usize,
    /// Atlas area (width * height).
    pub atlas_area: u64,
    /// Sum of glyph areas.
    pub used_area: u64,
    /// Occupancy ratio: used_area / atlas_area (0.0 to 1.0).
    pub occupancy: f64,
    pub tallest_glyph: u32,
    pub widest_glyph: u32,
}

impl PackedAtlas {
    /// Computes packing statistics for this atlas.
    pub fn stats(&self) -> AtlasStats {
        let atlas_area = (self.width as u64) * (self.height as u64);
        let used_area: u64 = self.glyphs.iter().map(Glyph::area).sum();
        let occupancy = if atlas_area > 0 {
            used_area as f64 / atlas_area as f64
        } else {
            0.0
        };
        AtlasStats {
            num_glyphs: self.glyphs.len(),
            atlas_area,
            used_area,
            occupancy,
            tallest_glyph: self.glyphs.iter().map(|g| g.height).max().unwrap_or(0),
            widest_glyph: self.glyphs.iter().map(|g| g.width).max().unwrap_or(0),
        }
    }
}

impl AtlasStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Glyphs: {}, Occupancy: {:.2}%, Atlas Area: {} px², Used Area: {} px², Tallest: {}, Widest: {}",
            self.num_glyphs,
            self.occupancy * 100.0,
            self.atlas_area,
            self.used_area,
            self.tallest_glyph,
            self.widest_glyph,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.atlas_area.saturating_sub(self.used_area)
    }

    /// Returns wasted space as a percentage (0.0 to 100.0).
    pub fn waste_percentage(&self) -> f64 {
        if self.atlas_area > 0 {
            (self.wasted_area() as f64 / self.atlas_area as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Font-level metadata written alongside the glyph records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontInfo {
    pub face: String,
    pub size: u32,
    pub bold: bool,
    pub italic: bool,
    /// Distance between baselines. 0 means "derive from glyphs".
    #[serde(default)]
    pub line_height: u32,
    /// Baseline offset from the top of a line. 0 means "derive from glyphs".
    #[serde(default)]
    pub base: u32,
    /// Extra advance added to every glyph on export (may be negative).
    #[serde(default)]
    pub tracking: i32,
    /// Atlas image file name referenced by the `page` line.
    pub page_file: String,
}

impl Default for FontInfo {
    fn default() -> Self {
        Self {
            face: "glyph-sheet".into(),
            size: 32,
            bold: false,
            italic: false,
            line_height: 0,
            base: 0,
            tracking: 0,
            page_file: "atlas.png".into(),
        }
    }
}

impl FontInfo {
    /// Fills unset `line_height` and `base` from the glyph set.
    ///
    /// `line_height` becomes the largest `yoffset + height`; `base` follows it.
    pub fn derive_metrics(mut self, glyphs: &[Glyph]) -> Self {
        let tallest = glyphs
            .iter()
            .map(|g| (g.yoffset.max(0) as u32) + g.height)
            .max()
            .unwrap_or(0);
        if self.line_height == 0 {
            self.line_height = tallest;
        }
        if self.base == 0 {
            self.base = self.line_height;
        }
        self
    }
}
