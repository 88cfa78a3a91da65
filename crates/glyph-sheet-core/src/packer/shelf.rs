use crate::config::PackConfig;
use crate::error::{GlyphSheetError, Result};

/// Chooses the atlas width for a set of `(width, height)` items.
///
/// The side estimate is `ceil(sqrt(total_area * area_slack))`, rounded up to a
/// power of two and floored at `min_width`. The width also has to fit the
/// widest item plus padding on both sides.
pub fn atlas_width(sizes: &[(u32, u32)], cfg: &PackConfig) -> Result<u32> {
    let total_area: u64 = sizes.iter().map(|&(w, h)| (w as u64) * (h as u64)).sum();
    let side = ((total_area as f64) * cfg.area_slack).sqrt().ceil() as u64;
    let widest = sizes
        .iter()
        .map(|&(w, _)| w as u64 + 2 * cfg.padding as u64)
        .max()
        .unwrap_or(0);
    let need = side.max(widest).max(cfg.min_width as u64).max(1);
    let width = need.next_power_of_two();
    let height = sizes.iter().map(|&(_, h)| h as u64).max().unwrap_or(0);
    u32::try_from(width).map_err(|_| GlyphSheetError::Surface { width, height })
}

/// Left-to-right shelf placement into a fixed-width strip that grows downward.
///
/// The cursor starts at `(padding, padding)`. An item that would run past
/// `width - padding` opens a new shelf below the tallest item of the current one.
/// Corners are tracked in `u64`; one that no longer fits `u32` is a `Surface` error.
#[derive(Debug, Clone)]
pub struct ShelfPacker {
    width: u32,
    padding: u32,
    x: u64,
    y: u64,
    shelf_height: u64,
    shelves: usize,
}

impl ShelfPacker {
    pub fn new(width: u32, padding: u32) -> Self {
        Self {
            width,
            padding,
            x: padding as u64,
            y: padding as u64,
            shelf_height: 0,
            shelves: 1,
        }
    }

    /// Places a `w x h` item and returns its top-left corner.
    pub fn place(&mut self, w: u32, h: u32) -> Result<(u32, u32)> {
        let pad = self.padding as u64;
        if self.x + w as u64 + pad > self.width as u64 {
            self.x = pad;
            self.y += self.shelf_height + pad;
            self.shelf_height = 0;
            self.shelves += 1;
        }
        let (x, y) = match (u32::try_from(self.x), u32::try_from(self.y)) {
            (Ok(x), Ok(y)) => (x, y),
            _ => {
                return Err(GlyphSheetError::Surface {
                    width: self.width as u64,
                    height: self.y + h as u64 + pad,
                });
            }
        };
        self.shelf_height = self.shelf_height.max(h as u64);
        self.x += w as u64 + pad;
        Ok((x, y))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    /// Strip height so far: bottom of the last shelf plus padding.
    pub fn height(&self) -> u64 {
        self.y + self.shelf_height + self.padding as u64
    }

    pub fn shelves(&self) -> usize {
        self.shelves
    }
}
