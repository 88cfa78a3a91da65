use crate::error::{GlyphSheetError, Result};
use image::{ImageReader, Rgba, RgbaImage};
use std::path::Path;

/// Default ink tolerance (alpha units or RGB distance).
pub const DEFAULT_TOLERANCE: u32 = 20;

/// Returns true if `pixel` counts as ink against `background`.
///
/// A transparent background (alpha 0) switches to alpha thresholding: a pixel
/// is ink when its alpha exceeds `tolerance`. Otherwise the Euclidean RGB
/// distance to the background must exceed `tolerance`. Compared on squared
/// integers so the result never depends on float rounding.
#[inline]
pub fn is_ink(pixel: Rgba<u8>, background: Rgba<u8>, tolerance: u32) -> bool {
    if background[3] == 0 {
        return pixel[3] as u32 > tolerance;
    }
    let dr = pixel[0] as i64 - background[0] as i64;
    let dg = pixel[1] as i64 - background[1] as i64;
    let db = pixel[2] as i64 - background[2] as i64;
    let dist_sq = dr * dr + dg * dg + db * db;
    let tol = tolerance as i64;
    dist_sq > tol * tol
}

/// Immutable RGBA sheet.
///
/// The grid is never mutated by detection or packing; callers keep ownership
/// and may share a reference across one pipeline run.
#[derive(Debug, Clone)]
pub struct PixelGrid {
    rgba: RgbaImage,
}

impl PixelGrid {
    pub fn new(rgba: RgbaImage) -> Self {
        Self { rgba }
    }

    /// Wraps a raw, row-major RGBA8 buffer. The length must be `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let len = data.len();
        RgbaImage::from_raw(width, height, data)
            .map(Self::new)
            .ok_or_else(|| {
                GlyphSheetError::InvalidInput(format!(
                    "RGBA buffer of {} bytes does not match {}x{}",
                    len, width, height
                ))
            })
    }

    /// Decodes an encoded raster (PNG/JPEG). Failure yields no grid at all.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(bytes)?;
        Ok(Self::new(img.to_rgba8()))
    }

    /// Opens and decodes an image file, guessing the format from its content.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Ok(Self::new(img.to_rgba8()))
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.rgba.width() == 0 || self.rgba.height() == 0
    }

    /// Pixel at `(x, y)`. Panics when out of bounds, like `RgbaImage::get_pixel`.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.rgba.get_pixel(x, y)
    }

    /// Background color sampled from the top-left pixel.
    pub fn background(&self) -> Rgba<u8> {
        if self.is_empty() {
            Rgba([0, 0, 0, 0])
        } else {
            self.pixel(0, 0)
        }
    }

    #[inline]
    pub fn is_ink(&self, x: u32, y: u32, background: Rgba<u8>, tolerance: u32) -> bool {
        is_ink(self.pixel(x, y), background, tolerance)
    }

    /// Read-only access to the underlying buffer (for cropping and blitting).
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.rgba
    }
}

impl From<RgbaImage> for PixelGrid {
    fn from(rgba: RgbaImage) -> Self {
        Self::new(rgba)
    }
}
