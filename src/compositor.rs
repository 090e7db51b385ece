//! Compositor: blends the combined alpha plane onto a destination surface
//! using a color run array, with variants for single- vs. multi-color fill
//! and packed BGRA8888 vs. planar AYUV destinations.
//!
//! Ground: `Rasterizer::Draw`/`pixmix`/`pixmix_sse2` in
//! `examples/original_source/src/subtitles/Rasterizer.cpp`. The blend
//! arithmetic (`pixmix`) is transcribed verbatim rather than re-derived —
//! it folds the per-run color's own alpha channel into the combined alpha
//! a second time for the multi-color path, which only makes sense once you
//! know the alpha combiner was called with `color_alpha = 0xff` for that
//! path and `color_alpha = color >> 24` for the single-color path (see
//! [`crate::alpha`]); preserved as observed rather than simplified.

use crate::alpha::AlphaSource;
use crate::overlay::Overlay;

/// Destination pixel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 32bpp packed BGRA, one `u32` per pixel.
    PackedBgra8888,
    /// Four plane-sized strips of `pitch * height` bytes each, in order
    /// A, Y, U, V, starting at `bits` (spec §6).
    PlanarAyuv,
}

/// Caller-owned destination surface. `bits` is sized for `format`:
/// `pitch * height * bytes_per_pixel` for packed, `4 * pitch * height` for
/// planar (one byte per plane per pixel regardless of `bytes_per_pixel`).
pub struct DestSurface<'a> {
    pub bits: &'a mut [u8],
    pub pitch: i32,
    pub width: i32,
    pub height: i32,
    pub bytes_per_pixel: i32,
    pub format: PixelFormat,
}

/// Closed-open integer rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn empty() -> Self {
        Rect { left: 0, top: 0, right: 0, bottom: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.right <= self.left || self.bottom <= self.top
    }

    fn intersect(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
    }
}

/// Interleaved `[color0, end0, color1, end1, ...]` color run array,
/// terminated by `end = 0xFFFFFFFF` (spec §3 "ColorRunArray"). A
/// single-color fill degenerates to `[color, 0xFFFFFFFF]`.
#[derive(Debug, Clone)]
pub struct ColorRun {
    switchpts: Vec<u32>,
}

impl ColorRun {
    /// `pts` must be non-empty, interleaved `(color, end)`, with the last
    /// `end` equal to `0xFFFF_FFFF`.
    pub fn new(pts: Vec<u32>) -> Self {
        debug_assert!(!pts.is_empty() && pts.len() % 2 == 0);
        debug_assert_eq!(*pts.last().unwrap(), 0xFFFF_FFFF);
        ColorRun { switchpts: pts }
    }

    pub fn single(color: u32) -> Self {
        ColorRun { switchpts: vec![color, 0xFFFF_FFFF] }
    }

    /// A single-element array is the compositor's fast path (spec §3).
    pub fn is_single_color(&self) -> bool {
        self.switchpts[1] == 0xFFFF_FFFF
    }

    pub fn first_color(&self) -> u32 {
        self.switchpts[0]
    }
}

/// Verbatim port of the original `pixmix`: blends one packed 32-bit pixel
/// (either a real BGRA pixel or a temporary `COMBINE_AYUV`-packed one) with
/// `color` under `alpha`, an already-combined 0..255-ish coverage value.
#[inline]
fn pixmix(dst: u32, color: u32, alpha: u32) -> u32 {
    let a = ((alpha.wrapping_mul(color >> 24)) >> 6) & 0xff;
    let ia = 256 - a;
    let a = a + 1;
    (((dst & 0x00ff00ff).wrapping_mul(ia) + (color & 0x00ff00ff).wrapping_mul(a)) & 0xff00ff00) >> 8
        | (((dst & 0x0000ff00).wrapping_mul(ia) + (color & 0x0000ff00).wrapping_mul(a)) & 0x00ff0000) >> 8
        | (((dst >> 8) & 0x00ff0000).wrapping_mul(ia) & 0xff000000)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn pixmix_sse2(dst: u32, color: u32, alpha: u32) -> u32 {
    use std::arch::x86_64::*;
    let color_rgb = color & 0xffffff;
    let a = ((alpha.wrapping_mul(color >> 24)) >> 6) & 0xff;
    let packed = ((a + 1) << 16) | (0x100 - a);
    let av = _mm_set1_epi32(packed as i32);
    let zero = _mm_setzero_si128();
    let d = _mm_unpacklo_epi8(_mm_cvtsi32_si128(dst as i32), zero);
    let s = _mm_unpacklo_epi8(_mm_cvtsi32_si128(color_rgb as i32), zero);
    let r = _mm_unpacklo_epi16(d, s);
    let r = _mm_madd_epi16(r, av);
    let r = _mm_srli_epi32(r, 8);
    let r = _mm_packs_epi32(r, r);
    let r = _mm_packus_epi16(r, r);
    _mm_cvtsi128_si32(r) as u32
}

/// Color-run cursor: advances `sw_idx` while the current pixel's
/// destination-space x has passed the active run's end, then returns the
/// now-current color (spec §4.10 step 1; ground: the `while(wt+xo>=sw[1])
/// sw+=2; color=sw[-2];` cursor in `Rasterizer::Draw`).
struct RunCursor<'a> {
    switchpts: &'a [u32],
    idx: usize,
    color: u32,
}

impl<'a> RunCursor<'a> {
    fn new(switchpts: &'a [u32]) -> Self {
        RunCursor { switchpts, idx: 0, color: switchpts[0] }
    }

    #[inline]
    fn color_at(&mut self, x: i64) -> u32 {
        if x >= self.switchpts[self.idx + 1] as i64 {
            while x >= self.switchpts[self.idx + 1] as i64 {
                self.idx += 2;
            }
            self.color = self.switchpts[self.idx - 2];
        }
        self.color
    }
}

/// Render parameters shared by every `draw` variant.
pub struct DrawParams<'a> {
    pub overlay: &'a Overlay,
    pub clip: Rect,
    pub clip_mask: Option<(&'a [u8], i32)>,
    pub xsub: i32,
    pub ysub: i32,
    pub colors: &'a ColorRun,
    pub body: bool,
    pub border: bool,
    pub use_sse2: bool,
}

/// Composite the overlay onto `surface`. Returns the tight bounding
/// rectangle touched, intersected with the surface and clip rect (spec
/// §4.10 / §8 "bounded output rectangle"). An empty rect with no writes is
/// returned when body/border selection is empty, the geometry clips away
/// entirely, or the overlay itself is empty (spec §7 `EmptyPath`).
pub fn draw(surface: &mut DestSurface, params: &DrawParams) -> Rect {
    if params.overlay.is_empty() || (!params.body && !params.border) {
        return Rect::empty();
    }
    let Some(source) = AlphaSource::select(params.body, params.border) else {
        return Rect::empty();
    };

    let surface_rect = Rect { left: 0, top: 0, right: surface.width, bottom: surface.height };
    let r = surface_rect.intersect(&params.clip);

    let mut x = (params.xsub + params.overlay.offset_x + 4) >> 3;
    let mut y = (params.ysub + params.overlay.offset_y + 4) >> 3;
    let mut w = params.overlay.width;
    let mut h = params.overlay.height;
    let mut xo = 0;
    let mut yo = 0;
    if x < r.left {
        xo = r.left - x;
        w -= r.left - x;
        x = r.left;
    }
    if y < r.top {
        yo = r.top - y;
        h -= r.top - y;
        y = r.top;
    }
    if x + w > r.right {
        w = r.right - x;
    }
    if y + h > r.bottom {
        h = r.bottom - y;
    }
    if w <= 0 || h <= 0 {
        return Rect::empty();
    }

    let bbox = Rect { left: x, top: y, right: x + w, bottom: y + h }.intersect(&surface_rect);

    let pitch = params.overlay.pitch as usize;
    let color_alpha = if params.colors.is_single_color() {
        params.colors.first_color() >> 24
    } else {
        0xff
    };

    // Combined alpha row, rebuilt on demand for the clipped window.
    let mut row_alpha = vec![0u8; w as usize];
    let single_color = params.colors.is_single_color();

    for row in 0..h {
        let overlay_row = (yo + row) as usize;
        let body_row = &params.overlay.body[overlay_row * pitch + xo as usize..overlay_row * pitch + xo as usize + w as usize];
        let border_row = &params.overlay.border[overlay_row * pitch + xo as usize..overlay_row * pitch + xo as usize + w as usize];
        let mask_row = params.clip_mask.map(|(mask, mask_pitch)| {
            let base = ((y + row) as usize) * mask_pitch as usize + x as usize;
            &mask[base..base + w as usize]
        });

        #[cfg(target_arch = "x86_64")]
        if params.use_sse2 && std::is_x86_feature_detected!("sse2") {
            unsafe {
                crate::alpha::combine_row_sse2(&mut row_alpha, source, body_row, border_row, mask_row, color_alpha);
            }
        } else {
            crate::alpha::combine_row_scalar(&mut row_alpha, source, body_row, border_row, mask_row, color_alpha);
        }
        #[cfg(not(target_arch = "x86_64"))]
        crate::alpha::combine_row_scalar(&mut row_alpha, source, body_row, border_row, mask_row, color_alpha);

        let dst_y = (y + row) as usize;
        match surface.format {
            PixelFormat::PackedBgra8888 => {
                let stride = surface.pitch as usize;
                let row_bytes = &mut surface.bits[dst_y * stride..dst_y * stride + surface.width as usize * 4];
                let dst_pixels = bytes_as_u32_mut(row_bytes);
                let dst_slice = &mut dst_pixels[x as usize..x as usize + w as usize];
                blend_row(dst_slice, &row_alpha, params.colors, single_color, xo, params.use_sse2);
            }
            PixelFormat::PlanarAyuv => {
                let plane_len = surface.pitch as usize * surface.height as usize;
                let stride = surface.pitch as usize;
                let base = dst_y * stride + x as usize;
                let (a, rest) = surface.bits.split_at_mut(plane_len);
                let (yy, rest) = rest.split_at_mut(plane_len);
                let (u, v) = rest.split_at_mut(plane_len);
                let mut cursor = RunCursor::new(&params.colors.switchpts);
                for wt in 0..w as usize {
                    let color = if single_color { params.colors.first_color() } else { cursor.color_at((wt as i32 + xo) as i64) };
                    let combined = ((a[base + wt] as u32) << 24)
                        | ((yy[base + wt] as u32) << 16)
                        | ((u[base + wt] as u32) << 8)
                        | v[base + wt] as u32;
                    // FillAlphaMash was called with color_alpha = 0xff for the
                    // multi-color path, so each per-run color's own alpha
                    // channel must still be folded in here, per pixel
                    // (ground: pixmix(&temp, color, (s[wt]*(color>>24))>>8)).
                    let alpha = if single_color {
                        row_alpha[wt] as u32
                    } else {
                        (row_alpha[wt] as u32 * (color >> 24)) >> 8
                    };
                    let blended = pixmix(combined, color, alpha);
                    a[base + wt] = (blended >> 24) as u8;
                    yy[base + wt] = (blended >> 16) as u8;
                    u[base + wt] = (blended >> 8) as u8;
                    v[base + wt] = blended as u8;
                }
            }
        }
    }

    bbox
}

fn blend_row(dst: &mut [u32], alpha: &[u8], colors: &ColorRun, single_color: bool, xo: i32, use_sse2: bool) {
    if single_color {
        let color = colors.first_color();
        for (d, &a) in dst.iter_mut().zip(alpha) {
            *d = apply_pixmix(*d, color, a as u32, use_sse2);
        }
        return;
    }
    // FillAlphaMash was called with color_alpha = 0xff for the multi-color
    // path (see `draw` above), so each run's own color alpha must still be
    // folded in here, per pixel (ground: pixmix(&dst[wt], color,
    // (s[wt]*(color>>24))>>8) in the non-single-color Draw cases).
    let mut cursor = RunCursor::new(&colors.switchpts);
    for (wt, (d, &a)) in dst.iter_mut().zip(alpha).enumerate() {
        let color = cursor.color_at((wt as i32 + xo) as i64);
        let scaled = (a as u32 * (color >> 24)) >> 8;
        *d = apply_pixmix(*d, color, scaled, use_sse2);
    }
}

#[inline]
fn apply_pixmix(dst: u32, color: u32, alpha: u32, use_sse2: bool) -> u32 {
    #[cfg(target_arch = "x86_64")]
    {
        if use_sse2 && std::is_x86_feature_detected!("sse2") {
            return unsafe { pixmix_sse2(dst, color, alpha) };
        }
    }
    let _ = use_sse2;
    pixmix(dst, color, alpha)
}

fn bytes_as_u32_mut(bytes: &mut [u8]) -> &mut [u32] {
    debug_assert_eq!(bytes.len() % 4, 0);
    debug_assert_eq!(bytes.as_ptr() as usize % 4, 0, "destination surface must be 4-byte aligned");
    // Safety: length and alignment checked above; BGRA8888 surfaces are
    // caller-allocated with at least 16-byte alignment (spec §6).
    unsafe { std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut u32, bytes.len() / 4) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::Overlay;

    fn flat_overlay(w: i32, h: i32, body_val: u8) -> Overlay {
        Overlay {
            body: vec![body_val; (w * h) as usize],
            border: vec![0u8; (w * h) as usize],
            width: w,
            height: h,
            pitch: w,
            offset_x: 0,
            offset_y: 0,
        }
    }

    #[test]
    fn zero_alpha_leaves_destination_unchanged() {
        let mut bits = vec![0x11u8; 4 * 4 * 4];
        let overlay = flat_overlay(4, 4, 0);
        let colors = ColorRun::single(0xFFFFFFFF);
        let mut surface = DestSurface {
            bits: &mut bits,
            pitch: 16,
            width: 4,
            height: 4,
            bytes_per_pixel: 4,
            format: PixelFormat::PackedBgra8888,
        };
        let params = DrawParams {
            overlay: &overlay,
            clip: Rect { left: 0, top: 0, right: 4, bottom: 4 },
            clip_mask: None,
            xsub: 0,
            ysub: 0,
            colors: &colors,
            body: true,
            border: false,
            use_sse2: false,
        };
        let before = surface.bits.to_vec();
        draw(&mut surface, &params);
        assert_eq!(surface.bits, before.as_slice());
    }

    #[test]
    fn full_alpha_opaque_color_overwrites_destination() {
        let mut bits = vec![0x00u8; 4 * 4 * 4];
        let overlay = flat_overlay(4, 4, 64);
        let colors = ColorRun::single(0xFF00FF00); // opaque green, BGRA
        let mut surface = DestSurface {
            bits: &mut bits,
            pitch: 16,
            width: 4,
            height: 4,
            bytes_per_pixel: 4,
            format: PixelFormat::PackedBgra8888,
        };
        let params = DrawParams {
            overlay: &overlay,
            clip: Rect { left: 0, top: 0, right: 4, bottom: 4 },
            clip_mask: None,
            xsub: 0,
            ysub: 0,
            colors: &colors,
            body: true,
            border: false,
            use_sse2: false,
        };
        let bbox = draw(&mut surface, &params);
        assert_eq!(bbox, Rect { left: 0, top: 0, right: 4, bottom: 4 });
        let pixels = bytes_as_u32_mut(surface.bits);
        assert_eq!(pixels[0] & 0xffffff, 0x00FF00);
    }

    #[test]
    fn bbox_is_clipped_to_clip_rect_and_surface() {
        let mut bits = vec![0u8; 8 * 8 * 4];
        let overlay = flat_overlay(8, 8, 64);
        let colors = ColorRun::single(0xFFFFFFFF);
        let mut surface = DestSurface {
            bits: &mut bits,
            pitch: 32,
            width: 8,
            height: 8,
            bytes_per_pixel: 4,
            format: PixelFormat::PackedBgra8888,
        };
        let params = DrawParams {
            overlay: &overlay,
            clip: Rect { left: 2, top: 2, right: 6, bottom: 6 },
            clip_mask: None,
            xsub: 0,
            ysub: 0,
            colors: &colors,
            body: true,
            border: false,
            use_sse2: false,
        };
        let bbox = draw(&mut surface, &params);
        assert!(bbox.left >= 2 && bbox.top >= 2 && bbox.right <= 6 && bbox.bottom <= 6);
    }

    #[test]
    fn multi_color_run_folds_in_per_run_color_alpha() {
        // A translucent run color (alpha 0x80) must blend at roughly half
        // strength even though FillAlphaMash was invoked with color_alpha =
        // 0xff for the multi-color path; the run's own alpha channel is
        // folded in per pixel inside the Draw loop (ground:
        // pixmix(&dst[wt], color, (s[wt]*(color>>24))>>8)).
        let mut bits_translucent = vec![0u8; 4 * 1 * 4];
        let mut bits_opaque = bits_translucent.clone();
        let overlay = flat_overlay(4, 1, 64);
        // Two runs of the same color so `is_single_color` stays false and the
        // multi-color code path (with its per-pixel color-alpha fold-in) is
        // actually exercised.
        let translucent = ColorRun::new(vec![0x80FFFFFF, 2, 0x80FFFFFF, 0xFFFF_FFFF]);
        let opaque = ColorRun::new(vec![0xFFFFFFFF, 2, 0xFFFFFFFF, 0xFFFF_FFFF]);

        for (bits, colors) in [(&mut bits_translucent, &translucent), (&mut bits_opaque, &opaque)] {
            let mut surface = DestSurface {
                bits,
                pitch: 16,
                width: 4,
                height: 1,
                bytes_per_pixel: 4,
                format: PixelFormat::PackedBgra8888,
            };
            let params = DrawParams {
                overlay: &overlay,
                clip: Rect { left: 0, top: 0, right: 4, bottom: 1 },
                clip_mask: None,
                xsub: 0,
                ysub: 0,
                colors,
                body: true,
                border: false,
                use_sse2: false,
            };
            draw(&mut surface, &params);
        }

        let translucent_pixel = bytes_as_u32_mut(&mut bits_translucent)[0] & 0xff;
        let opaque_pixel = bytes_as_u32_mut(&mut bits_opaque)[0] & 0xff;
        assert!(
            translucent_pixel < opaque_pixel,
            "translucent run color should blend weaker than opaque: {translucent_pixel} vs {opaque_pixel}"
        );
    }
}
