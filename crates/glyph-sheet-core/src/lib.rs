//! Core library for turning drawn character sheets into bitmap-font metadata.
//!
//! - Detection: background-relative ink classification, 4-connected blob extraction,
//!   fixed-point merging of multi-part characters, row-aware `yoffset` computation
//! - Repacking: tallest-first shelf packing into a power-of-two-wide atlas
//! - Export: BMFont text (`.fnt`) and JSON; identification through a pluggable recognizer
//!
//! Quick example:
//! ```ignore
//! use glyph_sheet_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let grid = PixelGrid::open("sheet.png")?;
//! let mut glyphs = detect_glyphs(&grid, &DetectConfig::default())?;
//! assign_sequence(&mut glyphs, "ABCDEFGHIJKLMNOPQRSTUVWXYZ");
//! let out = pack_glyphs(&grid, &glyphs, &PackConfig::default())?;
//! out.rgba.save("atlas.png")?;
//! let info = FontInfo::default().derive_metrics(&out.atlas.glyphs);
//! let fnt = to_fnt_text(&out.atlas.glyphs, &info, out.atlas.width, out.atlas.height);
//! std::fs::write("atlas.fnt", fnt)?;
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod detect;
pub mod error;
pub mod export;
pub mod identify;
pub mod merge;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod pixels;
pub mod rows;

pub use config::*;
pub use detect::*;
pub use error::*;
pub use export::*;
pub use identify::*;
pub use merge::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use pixels::*;
pub use rows::*;

/// Convenience prelude for common types and functions.
/// Importing `glyph_sheet_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{DetectConfig, DetectConfigBuilder, PackConfig, PackConfigBuilder};
    pub use crate::error::{GlyphSheetError, Result};
    pub use crate::export::{ParsedFont, glyphs_from_json, parse_fnt_text, to_fnt_text, to_json};
    pub use crate::identify::{
        DEFAULT_BATCH_SIZE, GlyphIdentifier, Identification, IdentifyReport,
        JsonResponseIdentifier, identify_glyphs,
    };
    pub use crate::model::{AtlasStats, FontInfo, Glyph, PackedAtlas};
    pub use crate::pixels::{DEFAULT_TOLERANCE, PixelGrid, is_ink};
    pub use crate::rows::Row;
    pub use crate::{
        PackOutput, assign_sequence, carry_over_labels, crop_glyph, crop_glyphs,
        decode_and_detect, detect_glyphs, detect_many, extract_blobs, group_rows, merge_blobs,
        organize_rows, pack_glyphs, pack_layout, should_merge, validate_glyphs,
    };
}
