//! Top-level orchestration: owns a [`Path`], turns it into filled and
//! widened span sets, rasterizes both into an [`Overlay`], and applies the
//! requested blur passes.
//!
//! Ground: `Rasterizer` in
//! `examples/original_source/src/subtitles/Rasterizer.cpp` (`ScanConvert`,
//! `CreateWidenedRegion`, `Rasterize`). The pipeline stages themselves live
//! in their own modules ([`crate::scan`], [`crate::widen`],
//! [`crate::overlay`], [`crate::gaussian`], [`crate::box_blur`]); this
//! struct just sequences them and is the crate's main public entry point.

use crate::box_blur::box_blur;
use crate::error::{RasterError, Result};
use crate::gaussian::gaussian_blur;
use crate::overlay::{build_overlay, Overlay};
use crate::path::Path;
use crate::scan::{scan_convert, Span};
use crate::widen::widen;

/// Owns the incoming path and the span sets derived from it.
///
/// Lifetime: built once per glyph/line by the caller, consumed by
/// [`Rasterizer::rasterize`]; [`Rasterizer::delete_outlines`] lets a caller
/// rerun [`Rasterizer::create_widened_region`] with new radii without
/// re-flattening the path (supplemented feature, see SPEC_FULL.md §10).
#[derive(Debug, Clone, Default)]
pub struct Rasterizer {
    path: Path,
    outline: Vec<Span>,
    wide_outline: Vec<Span>,
    wide_border: i32,
    width: i32,
    height: i32,
    path_offset_x: i32,
    path_offset_y: i32,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_mut(&mut self) -> &mut Path {
        &mut self.path
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Clear the derived span sets (but not the path itself). Supplemented
    /// feature: ground `Rasterizer::_TrashPath`/`DeleteOutlines` split, here
    /// narrowed to just the outlines so a caller can re-widen without
    /// re-scan-converting.
    pub fn delete_outlines(&mut self) {
        self.outline.clear();
        self.wide_outline.clear();
        self.wide_border = 0;
    }

    /// Scan-convert the current path into the filled-region span set. Never
    /// fails: an empty or degenerate path produces a zero-sized result
    /// (spec §7).
    pub fn scan_convert(&mut self) {
        let result = scan_convert(&self.path);
        self.outline = result.outline;
        self.width = result.width;
        self.height = result.height;
        self.path_offset_x = result.offset_x;
        self.path_offset_y = result.offset_y;
        self.wide_outline.clear();
        self.wide_border = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Widen the filled region by an `rx`×`ry` half-disk, producing the
    /// border span set (spec §4.5). A no-op on an empty outline.
    pub fn create_widened_region(&mut self, rx: i32, ry: i32) {
        if self.outline.is_empty() {
            return;
        }
        let (wide, border) = widen(&self.outline, rx, ry);
        self.wide_outline = wide;
        self.wide_border = border;
    }

    /// Rasterize the filled and widened span sets into a two-plane
    /// coverage [`Overlay`] and apply the requested blur passes in place.
    /// `sub_x`/`sub_y` are the sub-pixel placement phase (`0..8`),
    /// `blur_passes` the box-blur pass count, `gaussian_sigma` the Gaussian
    /// radius (`<= 0.1` bypasses it, spec §7). Returns
    /// [`RasterError::EmptyPath`] only if `scan_convert` was never called
    /// on a non-empty path; an empty path itself is not an error (spec §7)
    /// — it produces an empty [`Overlay`].
    pub fn rasterize(
        &self,
        sub_x: i32,
        sub_y: i32,
        blur_passes: u32,
        gaussian_sigma: f64,
    ) -> Result<Overlay> {
        if self.is_empty() {
            return Ok(Overlay::empty());
        }

        let mut overlay = build_overlay(
            &self.outline,
            &self.wide_outline,
            self.wide_border,
            self.width,
            self.height,
            self.path_offset_x,
            self.path_offset_y,
            sub_x,
            sub_y,
            blur_passes,
            gaussian_sigma,
        );

        if overlay.is_empty() {
            return Ok(overlay);
        }

        if gaussian_sigma > 0.1 {
            let plane = overlay.blur_target(!self.wide_outline.is_empty());
            gaussian_blur(plane, overlay.width, overlay.height, overlay.pitch, gaussian_sigma);
        }
        if blur_passes > 0 {
            let plane = overlay.blur_target(!self.wide_outline.is_empty());
            box_blur(plane, overlay.width, overlay.height, overlay.pitch, blur_passes);
        }

        Ok(overlay)
    }
}

/// Convenience error classification matching spec §7's taxonomy, exposed
/// for callers that want to branch on "nothing to draw" vs. a hard failure
/// without inspecting [`Rasterizer`] internals.
pub fn classify_empty(path: &Path) -> Option<RasterError> {
    if path.is_empty() {
        Some(RasterError::EmptyPath)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathBuilder;

    #[test]
    fn empty_path_rasterizes_to_empty_overlay() {
        let mut r = Rasterizer::new();
        r.scan_convert();
        let overlay = r.rasterize(0, 0, 0, 0.0).unwrap();
        assert!(overlay.is_empty());
        assert!(overlay.body.is_empty());
    }

    #[test]
    fn unit_square_rasterizes_to_single_cell_full_coverage() {
        let mut pb = PathBuilder::new();
        pb.move_to(0, 0).line_to(64, 0).line_to(64, 64).line_to(0, 64).close_figure();
        let mut r = Rasterizer::new();
        *r.path_mut() = pb.build();
        r.scan_convert();
        let overlay = r.rasterize(0, 0, 0, 0.0).unwrap();
        assert!(!overlay.is_empty());
        assert_eq!(overlay.body[0], 64);
    }

    #[test]
    fn widening_produces_nonempty_border_plane() {
        let mut pb = PathBuilder::new();
        pb.move_to(0, 0).line_to(8, 0).line_to(8, 8).line_to(0, 8).close_figure();
        let mut r = Rasterizer::new();
        *r.path_mut() = pb.build();
        r.scan_convert();
        r.create_widened_region(8, 8);
        let overlay = r.rasterize(0, 0, 0, 0.0).unwrap();
        assert!(overlay.border.iter().any(|&b| b > 0));
    }

    #[test]
    fn delete_outlines_clears_widened_border_without_touching_path() {
        let mut pb = PathBuilder::new();
        pb.move_to(0, 0).line_to(8, 0).line_to(8, 8).line_to(0, 8).close_figure();
        let mut r = Rasterizer::new();
        *r.path_mut() = pb.build();
        r.scan_convert();
        r.create_widened_region(4, 4);
        assert!(!r.wide_outline.is_empty());
        r.delete_outlines();
        assert!(r.wide_outline.is_empty());
        assert_eq!(r.path().len(), 4);
    }
}
