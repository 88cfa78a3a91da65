//! Reunites characters drawn as several disjoint ink blobs (`i`, `!`, `:`, `;`, `=`, `?`).
//!
//! Merging runs to a fixed point. Each pass sorts the working set by top Y,
//! scans every ordered pair and applies the first qualifying merge, then
//! restarts. A pass without a merge ends the run.
//!
//! The working set is a slot-indexed store plus an ordered list of active
//! slots: a merge updates the survivor in place and drops the absorbed slot
//! from the active list, so no position is ever invalidated.

use crate::config::DetectConfig;
use crate::model::Glyph;
use tracing::{debug, trace};

/// Returns true if `lower` should be merged into `upper`.
///
/// Any positive horizontal overlap qualifies. The vertical gap
/// `top(lower) - bottom(upper)` must satisfy
/// `-vertical_overlap <= gap < max(min_gap, gap_ratio * max(h1, h2))`; the upper
/// bound is exclusive.
pub fn should_merge(upper: &Glyph, lower: &Glyph, cfg: &DetectConfig) -> bool {
    let overlap_x = (upper.right().min(lower.right()) as i64) - (upper.x.max(lower.x) as i64);
    if overlap_x <= 0 {
        return false;
    }
    let dist_y = lower.y as i64 - upper.bottom() as i64;
    let tallest = upper.height.max(lower.height) as f64;
    let allowed_gap = (cfg.min_gap as f64).max(cfg.gap_ratio * tallest);
    dist_y >= -(cfg.vertical_overlap as i64) && (dist_y as f64) < allowed_gap
}

/// Union of two boxes. Keeps `a`'s id, offsets and label (falls back to `b`'s
/// label), and resets `xadvance` to the new width + 1.
pub fn union(a: &Glyph, b: &Glyph) -> Glyph {
    let x = a.x.min(b.x);
    let y = a.y.min(b.y);
    let right = a.right().max(b.right());
    let bottom = a.bottom().max(b.bottom());
    let width = right - x;
    Glyph {
        id: a.id,
        character: a.character.or(b.character),
        x,
        y,
        width,
        height: bottom - y,
        xoffset: a.xoffset,
        yoffset: a.yoffset,
        xadvance: width as i32 + 1,
    }
}

/// Merges blobs belonging to one logical glyph until no pair qualifies.
///
/// Output is ordered by top Y (stable). Re-running on the output is a no-op.
pub fn merge_blobs(glyphs: Vec<Glyph>, cfg: &DetectConfig) -> Vec<Glyph> {
    let mut store = glyphs;
    let mut active: Vec<usize> = (0..store.len()).collect();
    let mut merges = 0usize;

    loop {
        active.sort_by_key(|&slot| store[slot].y);
        let Some((keep, absorb)) = find_merge(&store, &active, cfg) else {
            break;
        };
        let merged = union(&store[keep], &store[absorb]);
        trace!(
            keep = store[keep].id,
            absorb = store[absorb].id,
            x = merged.x,
            y = merged.y,
            w = merged.width,
            h = merged.height,
            "merged blobs"
        );
        store[keep] = merged;
        active.retain(|&slot| slot != absorb);
        merges += 1;
    }

    debug!(merges, remaining = active.len(), "blob merge finished");
    let mut slots: Vec<Option<Glyph>> = store.into_iter().map(Some).collect();
    active
        .into_iter()
        .filter_map(|slot| slots[slot].take())
        .collect()
}

fn find_merge(store: &[Glyph], active: &[usize], cfg: &DetectConfig) -> Option<(usize, usize)> {
    for &a in active {
        for &b in active {
            if a != b && should_merge(&store[a], &store[b], cfg) {
                return Some((a, b));
            }
        }
    }
    None
}
