//! Character identification through an external recognizer.
//!
//! The recognizer sees ordered batches of cropped glyph images and answers
//! with `{index, character}` pairs relative to the batch. A failing batch
//! stops the run, but labels from earlier batches stay applied.

use crate::detect::crop_glyphs;
use crate::error::{GlyphSheetError, Result};
use crate::model::Glyph;
use crate::pixels::PixelGrid;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

/// Batch size that keeps request payloads within common upstream limits.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// One answer from the recognizer. An empty `character` means "unrecognized".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    pub index: usize,
    #[serde(default, alias = "char")]
    pub character: String,
}

/// External recognizer seam.
///
/// `images` is one ordered batch; returned indices refer to positions in it.
/// The answer may be sparse.
pub trait GlyphIdentifier {
    fn identify(&mut self, images: &[RgbaImage]) -> Result<Vec<Identification>>;
}

/// Outcome of `identify_glyphs`.
#[derive(Debug)]
pub struct IdentifyReport {
    /// Glyphs that received a character.
    pub labeled: usize,
    pub batches_done: usize,
    pub batches_total: usize,
    /// Error of the batch that aborted the run, if any.
    pub error: Option<GlyphSheetError>,
}

impl IdentifyReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.batches_done == self.batches_total
    }
}

#[instrument(skip_all)]
/// Crops every glyph and asks `identifier` for its character, `batch_size` at a time.
///
/// Cropping errors fail the call before any batch is sent. A batch error is
/// recorded in the report and aborts the remaining batches only.
pub fn identify_glyphs<I: GlyphIdentifier + ?Sized>(
    grid: &PixelGrid,
    glyphs: &mut [Glyph],
    identifier: &mut I,
    batch_size: usize,
) -> Result<IdentifyReport> {
    let batch_size = batch_size.max(1);
    let crops = crop_glyphs(grid, glyphs)?;
    let batches_total = crops.len().div_ceil(batch_size);
    let mut report = IdentifyReport {
        labeled: 0,
        batches_done: 0,
        batches_total,
        error: None,
    };

    for (batch_no, batch) in crops.chunks(batch_size).enumerate() {
        let offset = batch_no * batch_size;
        let answers = match identifier.identify(batch) {
            Ok(a) => a,
            Err(e) => {
                warn!(batch = batch_no, error = %e, "identification batch failed; stopping");
                report.error = Some(e);
                break;
            }
        };
        let labeled = apply_batch(&mut glyphs[offset..offset + batch.len()], &answers);
        debug!(batch = batch_no, labeled, "identification batch applied");
        report.labeled += labeled;
        report.batches_done += 1;
    }
    Ok(report)
}

/// Applies batch-relative answers; returns how many glyphs got a character.
///
/// Only the first non-whitespace character of an answer is used. Empty answers
/// and out-of-range indices leave glyphs untouched.
pub fn apply_batch(batch: &mut [Glyph], answers: &[Identification]) -> usize {
    let mut labeled = 0;
    for ans in answers {
        let Some(glyph) = batch.get_mut(ans.index) else {
            debug!(index = ans.index, len = batch.len(), "answer index out of range");
            continue;
        };
        if let Some(ch) = ans.character.chars().find(|c| !c.is_whitespace()) {
            glyph.character = Some(ch);
            labeled += 1;
        }
    }
    labeled
}

/// Parses a recognizer response: a JSON array of `{index, character}` objects.
///
/// Surrounding prose or a fenced code block around the array is tolerated.
/// Returns `None` when no array can be parsed.
pub fn parse_identification_response(text: &str) -> Option<Vec<Identification>> {
    let trimmed = text.trim();
    if let Ok(list) = serde_json::from_str::<Vec<Identification>>(trimmed) {
        return Some(list);
    }
    let start = trimmed.find('[')?;
    let end = trimmed.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&trimmed[start..=end]).ok()
}

/// Adapts a raw-text transport into a `GlyphIdentifier`.
///
/// Transport errors propagate (and abort the run); a response that does not
/// parse is logged and counts as "nothing labeled in this batch".
pub struct JsonResponseIdentifier<F> {
    transport: F,
}

impl<F> JsonResponseIdentifier<F>
where
    F: FnMut(&[RgbaImage]) -> Result<String>,
{
    pub fn new(transport: F) -> Self {
        Self { transport }
    }
}

impl<F> GlyphIdentifier for JsonResponseIdentifier<F>
where
    F: FnMut(&[RgbaImage]) -> Result<String>,
{
    fn identify(&mut self, images: &[RgbaImage]) -> Result<Vec<Identification>> {
        let raw = (self.transport)(images)?;
        match parse_identification_response(&raw) {
            Some(list) => Ok(list),
            None => {
                warn!(
                    images = images.len(),
                    response_len = raw.len(),
                    "unparseable identification response; batch left unlabeled"
                );
                Ok(Vec::new())
            }
        }
    }
}
