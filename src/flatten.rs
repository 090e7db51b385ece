//! Curve flattening: converts cubic Bézier and uniform cubic B-spline
//! segments into short line segments using a curvature-bounded step size,
//! and tracks the pen state needed to close subpaths correctly.

use crate::edge::{evaluate_line as edge_evaluate_line, EdgeArena, ScanBuffer};

/// Tracks `(firstp, lastp, fFirstSet)` across a subpath: `firstp` is the
/// first vertex actually drawn to (not merely moved to), `lastp` is the
/// most recently emitted vertex, used to splice in a gap-filling segment
/// whenever a caller's start point doesn't match the pen.
#[derive(Debug, Clone, Copy)]
pub struct PenState {
    first_set: bool,
    firstp: (i32, i32),
    lastp: (i32, i32),
}

impl PenState {
    pub fn new() -> Self {
        Self {
            first_set: false,
            firstp: (0, 0),
            lastp: (0, 0),
        }
    }

    pub fn lastp(&self) -> (i32, i32) {
        self.lastp
    }

    pub fn firstp(&self) -> (i32, i32) {
        self.firstp
    }

    pub fn first_set(&self) -> bool {
        self.first_set
    }

    /// Reset the pen at a `MOVETO`/`MOVETO_NOCLOSE` vertex. Does not touch
    /// `firstp` — if this subpath never emits a line, `firstp` keeps
    /// whatever the previous subpath left it at (matches the original's
    /// observed behavior, see spec §9 open questions).
    pub fn start_subpath(&mut self, x: i32, y: i32) {
        self.first_set = false;
        self.lastp = (x, y);
    }

    /// Emit a line from `(x0,y0)` to `(x1,y1)`, first splicing in a
    /// gap-filler if the pen isn't already at `(x0,y0)`.
    pub fn evaluate_line(&mut self, arena: &mut EdgeArena, scan: &mut ScanBuffer, x0: i32, y0: i32, x1: i32, y1: i32) {
        if self.lastp != (x0, y0) {
            let (lx, ly) = self.lastp;
            self.emit(arena, scan, lx, ly, x0, y0);
        }
        self.emit(arena, scan, x0, y0, x1, y1);
    }

    fn emit(&mut self, arena: &mut EdgeArena, scan: &mut ScanBuffer, x0: i32, y0: i32, x1: i32, y1: i32) {
        if !self.first_set {
            self.firstp = (x0, y0);
            self.first_set = true;
        }
        self.lastp = (x1, y1);
        edge_evaluate_line(arena, scan, x0, y0, x1, y1);
    }
}

impl Default for PenState {
    fn default() -> Self {
        Self::new()
    }
}

/// Monomial coefficients of a flattened cubic: `p(t) = c0 + t(c1 + t(c2 + t*c3))`.
struct Monomial {
    cx0: f64,
    cx1: f64,
    cx2: f64,
    cx3: f64,
    cy0: f64,
    cy1: f64,
    cy2: f64,
    cy3: f64,
}

fn to_monomial(pts: &[(f64, f64); 4], bspline: bool) -> Monomial {
    let (x0, y0) = pts[0];
    let (x1, y1) = pts[1];
    let (x2, y2) = pts[2];
    let (x3, y3) = pts[3];
    if bspline {
        let d = 1.0 / 6.0;
        Monomial {
            cx3: d * (-x0 + 3.0 * x1 - 3.0 * x2 + x3),
            cx2: d * (3.0 * x0 - 6.0 * x1 + 3.0 * x2),
            cx1: d * (-3.0 * x0 + 3.0 * x2),
            cx0: d * (x0 + 4.0 * x1 + x2),
            cy3: d * (-y0 + 3.0 * y1 - 3.0 * y2 + y3),
            cy2: d * (3.0 * y0 - 6.0 * y1 + 3.0 * y2),
            cy1: d * (-3.0 * y0 + 3.0 * y2),
            cy0: d * (y0 + 4.0 * y1 + y2),
        }
    } else {
        Monomial {
            cx3: -x0 + 3.0 * x1 - 3.0 * x2 + x3,
            cx2: 3.0 * x0 - 6.0 * x1 + 3.0 * x2,
            cx1: -3.0 * x0 + 3.0 * x1,
            cx0: x0,
            cy3: -y0 + 3.0 * y1 - 3.0 * y2 + y3,
            cy2: 3.0 * y0 - 6.0 * y1 + 3.0 * y2,
            cy1: -3.0 * y0 + 3.0 * y1,
            cy0: y0,
        }
    }
}

/// Curvature-bounded step size for a cubic's monomial form. The worst-case
/// chord error is bounded by the curve's second derivative (linear in t),
/// whose absolute maximum occurs at either endpoint; see Graphics Gems I.
/// If both axes are affine in t (`c2 = c3 = 0`), the curve is a line and a
/// single step suffices.
fn step_size(m: &Monomial) -> f64 {
    let maxaccel_y = (2.0 * m.cy2).abs() + (6.0 * m.cy3).abs();
    let maxaccel_x = (2.0 * m.cx2).abs() + (6.0 * m.cx3).abs();
    let maxaccel = maxaccel_y.max(maxaccel_x);
    if maxaccel > 8.0 {
        (8.0 / maxaccel).sqrt()
    } else {
        1.0
    }
}

/// Flatten a cubic Bézier (`bspline = false`) or uniform cubic B-spline
/// (`bspline = true`) given its four control points, emitting line segments
/// through `pen` into `arena`/`scan`.
pub fn flatten_cubic(
    pen: &mut PenState,
    arena: &mut EdgeArena,
    scan: &mut ScanBuffer,
    pts: &[(i32, i32); 4],
    bspline: bool,
) {
    let fpts: [(f64, f64); 4] = [
        (pts[0].0 as f64, pts[0].1 as f64),
        (pts[1].0 as f64, pts[1].1 as f64),
        (pts[2].0 as f64, pts[2].1 as f64),
        (pts[3].0 as f64, pts[3].1 as f64),
    ];
    let m = to_monomial(&fpts, bspline);
    let h = step_size(&m);

    if !pen.first_set() {
        // The original writes firstp/lastp/fFirstSet directly here rather
        // than through evaluate_line's gap-filler (ground: `_EvaluateBezier`).
        pen.prime((m.cx0 as i32, m.cy0 as i32));
    }

    let mut t = 0.0;
    while t < 1.0 {
        let x = m.cx0 + t * (m.cx1 + t * (m.cx2 + t * m.cx3));
        let y = m.cy0 + t * (m.cy1 + t * (m.cy2 + t * m.cy3));
        let (lx, ly) = pen.lastp();
        pen.evaluate_line(arena, scan, lx, ly, x as i32, y as i32);
        t += h;
    }
    let x = m.cx0 + m.cx1 + m.cx2 + m.cx3;
    let y = m.cy0 + m.cy1 + m.cy2 + m.cy3;
    let (lx, ly) = pen.lastp();
    pen.evaluate_line(arena, scan, lx, ly, x as i32, y as i32);
}

impl PenState {
    /// Directly prime `firstp`/`lastp`/`first_set` without emitting an
    /// edge. Used only when a flattened cubic is the very first thing in
    /// the whole path (ground: `_EvaluateBezier`'s `if(!fFirstSet) {...}`).
    fn prime(&mut self, p: (i32, i32)) {
        self.firstp = p;
        self.lastp = p;
        self.first_set = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_bezier_collapses_to_one_step() {
        // A "curve" whose control points are collinear has zero acceleration.
        let m = to_monomial(&[(0.0, 0.0), (40.0, 0.0), (80.0, 0.0), (120.0, 0.0)], false);
        let h = step_size(&m);
        assert_eq!(h, 1.0);
    }

    #[test]
    fn flatten_line_bezier_emits_no_outline_edges() {
        let mut pen = PenState::new();
        let mut arena = EdgeArena::new();
        let mut scan = ScanBuffer::new(4);
        let pts = [(0, 0), (40, 0), (80, 0), (120, 0)];
        flatten_cubic(&mut pen, &mut arena, &mut scan, &pts, false);
        // A horizontal line contributes no edges (dy == 0 everywhere).
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn bspline_uses_one_sixth_scaled_basis() {
        let m = to_monomial(&[(0.0, 0.0), (6.0, 0.0), (12.0, 0.0), (18.0, 0.0)], true);
        // Collinear control points still produce a straight line for bsplines.
        assert!((m.cx0 - 6.0).abs() < 1e-9);
    }
}
