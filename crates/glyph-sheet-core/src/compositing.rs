use crate::error::{GlyphSheetError, Result};
use image::{Rgba, RgbaImage};

/// Allocates a cleared, fully transparent canvas.
///
/// Fails with `Surface` when the byte size of the canvas cannot be addressed.
pub fn transparent_canvas(width: u32, height: u32) -> Result<RgbaImage> {
    let bytes = (width as u64)
        .checked_mul(height as u64)
        .and_then(|px| px.checked_mul(4));
    match bytes {
        Some(b) if width > 0 && height > 0 && b <= isize::MAX as u64 => {
            Ok(RgbaImage::new(width, height))
        }
        _ => Err(GlyphSheetError::Surface {
            width: width as u64,
            height: height as u64,
        }),
    }
}

/// Blit `src` into `canvas` with its top-left at (dx, dy), clipped to the canvas.
///
/// - outlines: if true, draw a red 1px outline around the blitted area
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32, outlines: bool) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();

    for yy in 0..sh {
        for xx in 0..sw {
            if dx + xx < cw && dy + yy < ch {
                let px = *src.get_pixel(xx, yy);
                canvas.put_pixel(dx + xx, dy + yy, px);
            }
        }
    }

    if outlines && sw > 0 && sh > 0 {
        let red = Rgba([255, 0, 0, 255]);
        let by = dy + sh - 1;
        let rx = dx + sw - 1;
        for xx in 0..sw {
            if dx + xx < cw && dy < ch {
                canvas.put_pixel(dx + xx, dy, red);
            }
            if dx + xx < cw && by < ch {
                canvas.put_pixel(dx + xx, by, red);
            }
        }
        for yy in 0..sh {
            if dx < cw && dy + yy < ch {
                canvas.put_pixel(dx, dy + yy, red);
            }
            if rx < cw && dy + yy < ch {
                canvas.put_pixel(rx, dy + yy, red);
            }
        }
    }
}
