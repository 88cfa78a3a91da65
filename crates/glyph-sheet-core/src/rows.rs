use crate::config::DetectConfig;
use crate::model::Glyph;
use tracing::debug;

/// A horizontal band of glyphs treated as one text line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// Smallest member top; the reference for `yoffset`.
    pub min_y: u32,
    /// Largest member bottom (exclusive).
    pub max_y: u32,
    pub members: Vec<Glyph>,
}

impl Row {
    fn open(glyph: Glyph) -> Self {
        Self {
            min_y: glyph.y,
            max_y: glyph.bottom(),
            members: vec![glyph],
        }
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> f64 {
        (self.min_y as f64 + self.max_y as f64) / 2.0
    }

    fn accepts(&self, glyph: &Glyph, divisor: f64) -> bool {
        let center = glyph.y as f64 + glyph.height as f64 / 2.0;
        let reach = glyph.height.max(self.height()) as f64 / divisor;
        (center - self.center()).abs() <= reach
    }

    fn push(&mut self, glyph: Glyph) {
        self.min_y = self.min_y.min(glyph.y);
        self.max_y = self.max_y.max(glyph.bottom());
        self.members.push(glyph);
    }
}

/// Groups glyphs into rows in approximate reading order.
///
/// Glyphs are sorted by `(y / row_bucket, x)` and then assigned first-fit to
/// the open row; a glyph that does not fit closes it. The grouping depends on
/// input order and is not a global clustering. Members of each returned row
/// are sorted by X.
pub fn group_rows(glyphs: Vec<Glyph>, cfg: &DetectConfig) -> Vec<Row> {
    let bucket = cfg.row_bucket.max(1);
    let mut sorted = glyphs;
    sorted.sort_by_key(|g| (g.y / bucket, g.x));

    let mut rows: Vec<Row> = Vec::new();
    let mut open: Option<Row> = None;
    for glyph in sorted {
        match open.as_mut() {
            Some(row) if row.accepts(&glyph, cfg.row_join_divisor) => row.push(glyph),
            _ => {
                if let Some(done) = open.take() {
                    rows.push(done);
                }
                open = Some(Row::open(glyph));
            }
        }
    }
    rows.extend(open);

    for row in &mut rows {
        row.members.sort_by_key(|g| g.x);
    }
    rows
}

/// Assigns `yoffset = y - row.min_y` and flattens rows top to bottom, left to right.
pub fn organize_rows(glyphs: Vec<Glyph>, cfg: &DetectConfig) -> Vec<Glyph> {
    let rows = group_rows(glyphs, cfg);
    debug!(rows = rows.len(), "organized glyph rows");
    rows.into_iter()
        .flat_map(|row| {
            let min_y = row.min_y;
            row.members.into_iter().map(move |mut g| {
                g.yoffset = (g.y - min_y) as i32;
                g
            })
        })
        .collect()
}
