use serde::{Deserialize, Serialize};

/// Detection configuration.
/// Key notes:
///   - `tolerance` is shared by both classifier modes (alpha threshold or RGB distance)
///   - the merge window is `-vertical_overlap <= distY < max(min_gap, gap_ratio * tallest)`
///   - `row_bucket` and `row_join_divisor` drive reading-order sort and row clustering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectConfig {
    /// Ink threshold: alpha on transparent sheets, Euclidean RGB distance otherwise.
    #[serde(default = "default_tolerance")]
    pub tolerance: u32,
    /// Run the blob merger (reunites dotted and multi-part characters).
    #[serde(default = "default_merge")]
    pub merge: bool,
    /// Maximum vertical overlap (pixels) still treated as a gap between two parts.
    #[serde(default = "default_vertical_overlap")]
    pub vertical_overlap: u32,
    /// Minimum allowed gap between two parts, in pixels.
    #[serde(default = "default_min_gap")]
    pub min_gap: u32,
    /// Allowed gap relative to the taller part's height.
    #[serde(default = "default_gap_ratio")]
    pub gap_ratio: f64,
    /// Y bucket size (pixels) for the reading-order sort.
    #[serde(default = "default_row_bucket")]
    pub row_bucket: u32,
    /// A glyph joins the open row when its center is within `max(h, row_h) / row_join_divisor`.
    #[serde(default = "default_row_join_divisor")]
    pub row_join_divisor: f64,
}

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            tolerance: default_tolerance(),
            merge: default_merge(),
            vertical_overlap: default_vertical_overlap(),
            min_gap: default_min_gap(),
            gap_ratio: default_gap_ratio(),
            row_bucket: default_row_bucket(),
            row_join_divisor: default_row_join_divisor(),
        }
    }
}

impl DetectConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `row_bucket` is zero
    /// - `gap_ratio` is negative or not finite
    /// - `row_join_divisor` is not strictly positive
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::GlyphSheetError;

        if self.row_bucket == 0 {
            return Err(GlyphSheetError::InvalidConfig(
                "row_bucket must be at least 1 pixel".into(),
            ));
        }
        if !self.gap_ratio.is_finite() || self.gap_ratio < 0.0 {
            return Err(GlyphSheetError::InvalidConfig(format!(
                "gap_ratio ({}) must be a finite, non-negative number",
                self.gap_ratio
            )));
        }
        if !self.row_join_divisor.is_finite() || self.row_join_divisor <= 0.0 {
            return Err(GlyphSheetError::InvalidConfig(format!(
                "row_join_divisor ({}) must be greater than zero",
                self.row_join_divisor
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `DetectConfig`.
    pub fn builder() -> DetectConfigBuilder {
        DetectConfigBuilder::new()
    }
}

/// Atlas repacking configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackConfig {
    /// Pixels around the atlas border and between glyphs.
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Smallest atlas width; must be a power of two.
    #[serde(default = "default_min_width")]
    pub min_width: u32,
    /// Multiplier on the summed glyph area when estimating the atlas side.
    #[serde(default = "default_area_slack")]
    pub area_slack: f64,
    /// Draw red outlines around placed glyphs (debug).
    #[serde(default)]
    pub outlines: bool,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            padding: default_padding(),
            min_width: default_min_width(),
            area_slack: default_area_slack(),
            outlines: false,
        }
    }
}

impl PackConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - `min_width` is not a power of two
    /// - both paddings together do not leave room inside `min_width`
    /// - `area_slack` is below 1
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::GlyphSheetError;

        if 2 * self.padding as u64 >= self.min_width as u64 {
            return Err(GlyphSheetError::InvalidConfig(format!(
                "padding ({}) leaves no room inside min_width ({})",
                self.padding, self.min_width
            )));
        }

        if !self.min_width.is_power_of_two() {
            return Err(GlyphSheetError::InvalidConfig(format!(
                "min_width ({}) must be a power of two",
                self.min_width
            )));
        }
        if !self.area_slack.is_finite() || self.area_slack < 1.0 {
            return Err(GlyphSheetError::InvalidConfig(format!(
                "area_slack ({}) must be at least 1.0",
                self.area_slack
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `PackConfig`.
    pub fn builder() -> PackConfigBuilder {
        PackConfigBuilder::new()
    }
}

fn default_tolerance() -> u32 {
    20
}
fn default_merge() -> bool {
    true
}
fn default_vertical_overlap() -> u32 {
    5
}
fn default_min_gap() -> u32 {
    5
}
fn default_gap_ratio() -> f64 {
    0.5
}
fn default_row_bucket() -> u32 {
    20
}
fn default_row_join_divisor() -> f64 {
    1.5
}
fn default_padding() -> u32 {
    2
}
fn default_min_width() -> u32 {
    128
}
fn default_area_slack() -> f64 {
    1.1
}

/// Builder for `DetectConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct DetectConfigBuilder {
    cfg: DetectConfig,
}

impl DetectConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: DetectConfig::default(),
        }
    }
    pub fn tolerance(mut self, v: u32) -> Self {
        self.cfg.tolerance = v;
        self
    }
    pub fn merge(mut self, v: bool) -> Self {
        self.cfg.merge = v;
        self
    }
    pub fn vertical_overlap(mut self, v: u32) -> Self {
        self.cfg.vertical_overlap = v;
        self
    }
    pub fn min_gap(mut self, v: u32) -> Self {
        self.cfg.min_gap = v;
        self
    }
    pub fn gap_ratio(mut self, v: f64) -> Self {
        self.cfg.gap_ratio = v;
        self
    }
    pub fn row_bucket(mut self, v: u32) -> Self {
        self.cfg.row_bucket = v;
        self
    }
    pub fn row_join_divisor(mut self, v: f64) -> Self {
        self.cfg.row_join_divisor = v;
        self
    }
    pub fn build(self) -> DetectConfig {
        self.cfg
    }
}

/// Builder for `PackConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct PackConfigBuilder {
    cfg: PackConfig,
}

impl PackConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: PackConfig::default(),
        }
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn min_width(mut self, v: u32) -> Self {
        self.cfg.min_width = v;
        self
    }
    pub fn area_slack(mut self, v: f64) -> Self {
        self.cfg.area_slack = v;
        self
    }
    pub fn outlines(mut self, v: bool) -> Self {
        self.cfg.outlines = v;
        self
    }
    pub fn build(self) -> PackConfig {
        self.cfg
    }
}
