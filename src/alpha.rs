//! Alpha combiner: derives the per-pixel source alpha for the compositor
//! from the body/border coverage planes, an optional clip mask, and a
//! caller-supplied color-alpha weight.
//!
//! Ground: `Overlay::_DoFillAlphaMash` in
//! `examples/original_source/src/subtitles/Rasterizer.cpp`. The original's
//! branch selector (`FillAlphaMash`) has commented-out alpha-mask paths and
//! two branches with identical bodies that, read literally, swap body and
//! border; spec §9 directs us to preserve the *observed* behavior rather
//! than the confused selector: body-only when `fBody && !fBorder`,
//! border-only when `fBorder && !fBody`, and the `safe_sub(border, body)`
//! path otherwise (`fBody && fBorder`, which is the only combination the
//! real renderer ever issues in practice).

/// Which plane(s) contribute to the combined alpha for a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaSource {
    BodyOnly,
    BorderOnly,
    /// Border coverage minus body coverage, so the body does not receive
    /// double weight where the two planes overlap (spec §4.9).
    BorderMinusBody,
}

impl AlphaSource {
    pub fn select(body: bool, border: bool) -> Option<Self> {
        match (body, border) {
            (true, false) => Some(AlphaSource::BodyOnly),
            (false, true) => Some(AlphaSource::BorderOnly),
            (true, true) => Some(AlphaSource::BorderMinusBody),
            (false, false) => None,
        }
    }
}

#[inline]
fn saturating_sub_u8(a: u8, b: u8) -> u8 {
    a.saturating_sub(b)
}

/// Combine one row's worth of coverage into `dst`, scalar reference
/// implementation. `color_alpha` is in `0..=64`. `mask`, if present, is an
/// independent per-pixel clip weight in `0..=255` with its own stride
/// (already sliced to this row by the caller).
pub fn combine_row_scalar(
    dst: &mut [u8],
    source: AlphaSource,
    body: &[u8],
    border: &[u8],
    mask: Option<&[u8]>,
    color_alpha: u32,
) {
    let n = dst.len();
    match (source, mask) {
        (AlphaSource::BodyOnly, None) => {
            for i in 0..n {
                dst[i] = ((body[i] as u32 * color_alpha) >> 6) as u8;
            }
        }
        (AlphaSource::BorderOnly, None) => {
            for i in 0..n {
                dst[i] = ((border[i] as u32 * color_alpha) >> 6) as u8;
            }
        }
        (AlphaSource::BorderMinusBody, None) => {
            for i in 0..n {
                let diff = saturating_sub_u8(border[i], body[i]);
                dst[i] = ((diff as u32 * color_alpha) >> 6) as u8;
            }
        }
        (AlphaSource::BodyOnly, Some(m)) => {
            for i in 0..n {
                dst[i] = ((body[i] as u32 * m[i] as u32 * color_alpha) >> 12) as u8;
            }
        }
        (AlphaSource::BorderOnly, Some(m)) => {
            for i in 0..n {
                dst[i] = ((border[i] as u32 * m[i] as u32 * color_alpha) >> 12) as u8;
            }
        }
        (AlphaSource::BorderMinusBody, Some(m)) => {
            for i in 0..n {
                let diff = saturating_sub_u8(border[i], body[i]);
                dst[i] = ((diff as u32 * m[i] as u32 * color_alpha) >> 12) as u8;
            }
        }
    }
}

/// Emulates `_mm_mullo_epi32` (SSE4.1) on plain SSE2: multiplies two vectors
/// of four 32-bit lanes and keeps the low 32 bits of each product, via the
/// classic `_mm_mul_epu32` even/odd-lane trick.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn mullo_epi32_sse2(a: std::arch::x86_64::__m128i, b: std::arch::x86_64::__m128i) -> std::arch::x86_64::__m128i {
    use std::arch::x86_64::*;
    let even = _mm_mul_epu32(a, b);
    let odd = _mm_mul_epu32(_mm_srli_si128(a, 4), _mm_srli_si128(b, 4));
    _mm_unpacklo_epi32(_mm_shuffle_epi32(even, 0x08), _mm_shuffle_epi32(odd, 0x08))
}

/// Widens one 8-lane `u16` vector (exact values, no overflow yet) to two
/// 4-lane `u32` halves, multiplies each by `factor`, shifts right by `shift`,
/// and narrows back to an 8-lane `u16` vector. Used to avoid overflowing the
/// 16-bit lanes `_mm_mullo_epi16` would otherwise wrap when `value * mask *
/// color_alpha` exceeds `u16::MAX` (it can reach up to `64 * 255 * 64 =
/// 1_044_480`).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
unsafe fn scale_widened(v16: std::arch::x86_64::__m128i, factor: i32, shift: i32) -> std::arch::x86_64::__m128i {
    use std::arch::x86_64::*;
    let zero = _mm_setzero_si128();
    let lo32 = _mm_unpacklo_epi16(v16, zero);
    let hi32 = _mm_unpackhi_epi16(v16, zero);
    let f = _mm_set1_epi32(factor);
    let lo_mul = mullo_epi32_sse2(lo32, f);
    let hi_mul = mullo_epi32_sse2(hi32, f);
    let lo_shifted = _mm_srli_epi32(lo_mul, shift);
    let hi_shifted = _mm_srli_epi32(hi_mul, shift);
    _mm_packs_epi32(lo_shifted, hi_shifted)
}

/// SSE2 reference-equivalent combiner, processing 16 bytes per iteration.
/// Falls back to [`combine_row_scalar`] on any tail shorter than 16 bytes.
/// Must be called only behind `is_x86_feature_detected!("sse2")` — CPU
/// feature detection is an external collaborator's job (spec §1); the
/// crate exposes both and lets the caller pick (spec §4.9).
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse2")]
pub unsafe fn combine_row_sse2(
    dst: &mut [u8],
    source: AlphaSource,
    body: &[u8],
    border: &[u8],
    mask: Option<&[u8]>,
    color_alpha: u32,
) {
    use std::arch::x86_64::*;

    let n = dst.len();
    let chunks = n / 16;
    for c in 0..chunks {
        let off = c * 16;
        let diff: __m128i = match source {
            AlphaSource::BodyOnly => _mm_loadu_si128(body[off..].as_ptr() as *const __m128i),
            AlphaSource::BorderOnly => _mm_loadu_si128(border[off..].as_ptr() as *const __m128i),
            AlphaSource::BorderMinusBody => {
                let b = _mm_loadu_si128(border[off..].as_ptr() as *const __m128i);
                let bo = _mm_loadu_si128(body[off..].as_ptr() as *const __m128i);
                _mm_subs_epu8(b, bo)
            }
        };
        let zero = _mm_setzero_si128();
        let lo = _mm_unpacklo_epi8(diff, zero);
        let hi = _mm_unpackhi_epi8(diff, zero);
        let (lo, hi, shift) = match mask {
            None => {
                let ca = _mm_set1_epi16(color_alpha as i16);
                (_mm_mullo_epi16(lo, ca), _mm_mullo_epi16(hi, ca), 6)
            }
            Some(m) => {
                let mv = _mm_loadu_si128(m[off..].as_ptr() as *const __m128i);
                let mlo = _mm_unpacklo_epi8(mv, zero);
                let mhi = _mm_unpackhi_epi8(mv, zero);
                // value * mask fits exactly in 16 bits (max 64 * 255 =
                // 16320), but the following * color_alpha can reach
                // 1_044_480 and would wrap `_mm_mullo_epi16`'s 16-bit
                // lanes, diverging from the scalar `u32` reference. Widen
                // to 32-bit lanes for that multiply instead.
                let vm_lo = _mm_mullo_epi16(lo, mlo);
                let vm_hi = _mm_mullo_epi16(hi, mhi);
                let lo = scale_widened(vm_lo, color_alpha as i32, 12);
                let hi = scale_widened(vm_hi, color_alpha as i32, 12);
                (lo, hi, 0)
            }
        };
        let lo = _mm_srli_epi16(lo, shift);
        let hi = _mm_srli_epi16(hi, shift);
        let packed = _mm_packus_epi16(lo, hi);
        _mm_storeu_si128(dst[off..].as_mut_ptr() as *mut __m128i, packed);
    }
    let tail = chunks * 16;
    if tail < n {
        let mask_tail = mask.map(|m| &m[tail..]);
        combine_row_scalar(
            &mut dst[tail..],
            source,
            &body[tail..],
            &border[tail..],
            mask_tail,
            color_alpha,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_only_shifts_by_six() {
        let body = [64u8, 32, 0];
        let border = [0u8; 3];
        let mut dst = [0u8; 3];
        combine_row_scalar(&mut dst, AlphaSource::BodyOnly, &body, &border, None, 64);
        assert_eq!(dst, [64, 32, 0]);
    }

    #[test]
    fn border_minus_body_saturates_at_zero() {
        let body = [10u8, 50];
        let border = [5u8, 60];
        let mut dst = [0u8; 2];
        combine_row_scalar(&mut dst, AlphaSource::BorderMinusBody, &body, &border, None, 64);
        // body > border on index 0: safe_sub clamps to 0.
        assert_eq!(dst[0], 0);
        assert_eq!(dst[1], 10);
    }

    #[test]
    fn mask_applies_extra_shift() {
        let body = [64u8];
        let border = [0u8];
        let mut dst = [0u8];
        let mask = [128u8];
        combine_row_scalar(&mut dst, AlphaSource::BodyOnly, &body, &border, Some(&mask), 64);
        assert_eq!(dst[0], ((64u32 * 128 * 64) >> 12) as u8);
    }

    #[test]
    fn zero_color_alpha_is_identity_preserving() {
        let body = [64u8, 64, 64];
        let border = [0u8; 3];
        let mut dst = [1u8; 3];
        combine_row_scalar(&mut dst, AlphaSource::BodyOnly, &body, &border, None, 0);
        assert_eq!(dst, [0, 0, 0]);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn sse2_matches_scalar_reference() {
        if !is_x86_feature_detected!("sse2") {
            return;
        }
        let body: Vec<u8> = (0..40).map(|i| (i * 3) as u8).collect();
        let border: Vec<u8> = (0..40).map(|i| (i * 5) as u8).collect();
        let mask: Vec<u8> = (0..40).map(|i| (255 - i) as u8).collect();
        for source in [
            AlphaSource::BodyOnly,
            AlphaSource::BorderOnly,
            AlphaSource::BorderMinusBody,
        ] {
            for use_mask in [false, true] {
                let mask_slice = if use_mask { Some(mask.as_slice()) } else { None };
                let mut scalar_dst = vec![0u8; body.len()];
                combine_row_scalar(&mut scalar_dst, source, &body, &border, mask_slice, 40);
                let mut simd_dst = vec![0u8; body.len()];
                unsafe {
                    combine_row_sse2(&mut simd_dst, source, &body, &border, mask_slice, 40);
                }
                assert_eq!(scalar_dst, simd_dst);
            }
        }
    }
}
