//! Scan converter: walks a flattened path's vertex list, emits edges, then
//! sweeps each scanline's edges into a sorted, disjoint span set using the
//! non-zero winding rule.

use crate::edge::{EdgeArena, ScanBuffer};
use crate::flatten::{flatten_cubic, PenState};
use crate::path::{self, Path};

/// A half-open horizontal interval `[x1, x2)` at a given row, encoded as a
/// biased 64-bit key pair so that signed offset arithmetic during widening
/// (`widen::overlap_region`) never wraps. See spec §3 "Span".
pub type Span = (u64, u64);

/// The `+0x4000_0000` bias applied to both the x and y halves of a span
/// key, doubled up since both halves of the 64-bit pair carry `y<<32 + x`.
/// Chosen so that adding any signed 32-bit `dx`/`dy` during widening stays
/// representable without underflowing the unsigned domain.
pub const SPAN_BIAS: i64 = 0x4000_0000_4000_0000;

#[inline]
pub fn span_key(y: i32, x: i32) -> u64 {
    (((y as i64) << 32) + x as i64 + SPAN_BIAS) as u64
}

/// Inverse of [`span_key`]: recovers `(y, x)` from a biased key.
#[inline]
pub fn span_unkey(key: u64) -> (i32, i32) {
    let signed = key as i64 - SPAN_BIAS;
    let y = (signed >> 32) as i32;
    let x = (signed & 0xffff_ffff) as i32;
    (y, x)
}

/// Result of [`scan_convert`]: the filled-region span set plus the
/// translated bounding box. `width == 0 && height == 0` marks an empty or
/// degenerate path (spec §7: both collapse to "treated as empty path").
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub outline: Vec<Span>,
    pub width: i32,
    pub height: i32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Scan-convert `path` into a disjoint, row-sorted span set using the
/// non-zero winding rule. Never fails: an empty or degenerate path simply
/// produces an empty [`ScanResult`] (spec §7).
pub fn scan_convert(path: &Path) -> ScanResult {
    if path.is_empty() {
        return ScanResult::default();
    }

    let mut minx = i32::MAX;
    let mut miny = i32::MAX;
    let mut maxx = i32::MIN;
    let mut maxy = i32::MIN;
    for &(x, y) in &path.points {
        minx = minx.min(x);
        maxx = maxx.max(x);
        miny = miny.min(y);
        maxy = maxy.max(y);
    }
    minx = (minx >> 3) & !7;
    miny = (miny >> 3) & !7;
    maxx = (maxx + 7) >> 3;
    maxy = (maxy + 7) >> 3;

    if minx > maxx || miny > maxy {
        return ScanResult::default();
    }

    let mut points: Vec<(i32, i32)> = path
        .points
        .iter()
        .map(|&(x, y)| (x - minx * 8, y - miny * 8))
        .collect();

    let width = maxx + 1 - minx;
    let height = maxy + 1 - miny;

    let mut arena = EdgeArena::new();
    let mut scan = ScanBuffer::new(height as usize);
    let mut pen = PenState::new();
    let mut have_moveto = false;

    // Some path providers emit PT_CLOSEFIGURE inconsistently, so every open
    // subpath is closed here regardless of the flag (spec §6).
    let n = points.len();
    let mut i = 0usize;
    while i < n {
        let t = path::base_type(path.types[i]);
        match t {
            t if t == path::MOVETO => {
                if have_moveto && pen.firstp() != pen.lastp() {
                    let (lx, ly) = pen.lastp();
                    let (fx, fy) = pen.firstp();
                    pen.evaluate_line(&mut arena, &mut scan, lx, ly, fx, fy);
                }
                have_moveto = true;
                let (x, y) = points[i];
                pen.start_subpath(x, y);
            }
            t if t == path::MOVETO_NOCLOSE => {
                have_moveto = true;
                let (x, y) = points[i];
                pen.start_subpath(x, y);
            }
            t if t == path::LINETO => {
                if i >= 1 {
                    let (x0, y0) = points[i - 1];
                    let (x1, y1) = points[i];
                    pen.evaluate_line(&mut arena, &mut scan, x0, y0, x1, y1);
                }
            }
            t if t == path::BEZIER_TO => {
                if i >= 1 && n - (i - 1) >= 4 {
                    let pts = [points[i - 1], points[i], points[i + 1], points[i + 2]];
                    flatten_cubic(&mut pen, &mut arena, &mut scan, &pts, false);
                }
                i += 2;
            }
            t if t == path::BSPLINE_TO => {
                if i >= 1 && n - (i - 1) >= 4 {
                    let pts = [points[i - 1], points[i], points[i + 1], points[i + 2]];
                    flatten_cubic(&mut pen, &mut arena, &mut scan, &pts, true);
                }
                i += 2;
            }
            t if t == path::BSPLINE_PATCH_TO => {
                if i >= 3 && n - (i - 3) >= 4 {
                    let pts = [points[i - 3], points[i - 2], points[i - 1], points[i]];
                    flatten_cubic(&mut pen, &mut arena, &mut scan, &pts, true);
                }
            }
            _ => {}
        }
        i += 1;
    }
    if have_moveto && pen.firstp() != pen.lastp() {
        let (lx, ly) = pen.lastp();
        let (fx, fy) = pen.firstp();
        pen.evaluate_line(&mut arena, &mut scan, lx, ly, fx, fy);
    }
    points.clear();

    let mut outline: Vec<Span> = Vec::with_capacity(arena.len() / 2);
    let mut heap: Vec<i32> = Vec::new();
    for y in 0..height {
        heap.clear();
        arena.collect_row(scan.heads[y as usize], &mut heap);
        heap.sort_unstable();
        let mut count = 0i32;
        let mut x1 = 0i32;
        for &v in &heap {
            if count == 0 {
                x1 = v >> 1;
            }
            if v & 1 != 0 {
                count += 1;
            } else {
                count -= 1;
            }
            if count == 0 {
                let x2 = v >> 1;
                if x2 > x1 {
                    outline.push((span_key(y, x1), span_key(y, x2)));
                }
            }
        }
    }

    ScanResult {
        outline,
        width,
        height,
        offset_x: minx,
        offset_y: miny,
    }
}
