//! Tabulated, volume-normalized separable Gaussian blur.
//!
//! Ground: `ass_synth_priv`/`ass_gauss_blur` in
//! `examples/original_source/src/subtitles/Rasterizer.cpp` (the libass
//! routine the original renderer borrows). The kernel and the temp
//! accumulator buffer are both cached process-wide, keyed by `sigma` and by
//! required element count respectively (spec §5), using `OnceLock` +
//! `RwLock<HashMap<...>>` in place of the original's `boost::flyweight`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

/// A tabulated separable Gaussian kernel for one `sigma`.
///
/// `g_w` is forced odd so the kernel has a single center tap at `g_r`.
/// `gt2` is a "value times weight" lookup: `gt2[tap + 256*value] = value *
/// g[tap]`, built once so the blur's inner loop is an array index and an
/// add instead of a multiply (ground: `this->gt2[mx + i * this->g_w] =
/// i * this->g[mx]`).
pub struct GaussianKernel {
    pub sigma: f64,
    pub g_w: usize,
    pub g_r: usize,
    pub g: Vec<u32>,
    pub gt2: Vec<u32>,
}

impl GaussianKernel {
    fn build(sigma: f64) -> Self {
        let g_w = ((sigma * 3.0).ceil() as i64 | 1) as usize;
        let g_r = g_w / 2;
        let a = -1.0 / (2.0 * sigma * sigma);
        let kernel: Vec<f64> = (0..g_w)
            .map(|i| {
                let d = i as f64 - g_r as f64;
                (a * d * d).exp()
            })
            .collect();

        // Bisection search for the largest scale factor such that the
        // rounded, integer-quantized kernel still sums to at most 0x10000
        // (a "volume" of 256.0 in 16.16 fixed point).
        let mut volume_factor = 0.0f64;
        let mut diff = 10_000_000.0f64;
        let mut g = vec![0u32; g_w];
        while diff > 0.0000001 {
            volume_factor += diff;
            let mut volume: u64 = 0;
            for (i, &k) in kernel.iter().enumerate() {
                g[i] = (k * volume_factor + 0.5) as u32;
                volume += g[i] as u64;
            }
            if volume > 0x10000 {
                volume_factor -= diff;
            }
            diff *= 0.5;
        }
        for (i, &k) in kernel.iter().enumerate() {
            g[i] = (k * volume_factor + 0.5) as u32;
        }

        let mut gt2 = vec![0u32; 256 * g_w];
        for (mx, &gm) in g.iter().enumerate() {
            for i in 0..256u32 {
                gt2[mx + i as usize * g_w] = i * gm;
            }
        }

        GaussianKernel { sigma, g_w, g_r, g, gt2 }
    }

    fn weight_row(&self, value: u8) -> &[u32] {
        let base = value as usize * self.g_w;
        &self.gt2[base..base + self.g_w]
    }
}

fn kernel_cache() -> &'static RwLock<HashMap<u64, Arc<GaussianKernel>>> {
    static CACHE: OnceLock<RwLock<HashMap<u64, Arc<GaussianKernel>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Fetch (or build and cache) the kernel for `sigma`. Keyed on the raw bit
/// pattern of `sigma` since `f64` has no `Eq`/`Hash`; equal `sigma` always
/// shares the same cached, immutable entry (spec §5).
pub fn kernel_for_sigma(sigma: f64) -> Arc<GaussianKernel> {
    let key = sigma.to_bits();
    if let Some(k) = kernel_cache().read().unwrap().get(&key) {
        return k.clone();
    }
    let built = Arc::new(GaussianKernel::build(sigma));
    kernel_cache().write().unwrap().entry(key).or_insert(built).clone()
}

fn tmp_buf_cache() -> &'static RwLock<HashMap<usize, Arc<Vec<u32>>>> {
    static CACHE: OnceLock<RwLock<HashMap<usize, Arc<Vec<u32>>>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Fetch (or allocate and cache) a zeroed scratch buffer of at least `size`
/// `u32`s. Callers must not retain the buffer beyond the call (spec §5); the
/// buffer is re-zeroed by the caller before reuse since a cached buffer may
/// carry stale data from a previous, differently-shaped blur.
fn tmp_buf(size: usize) -> Arc<Vec<u32>> {
    if let Some(b) = tmp_buf_cache().read().unwrap().get(&size) {
        if b.len() >= size {
            return b.clone();
        }
    }
    let built = Arc::new(vec![0u32; size]);
    tmp_buf_cache().write().unwrap().insert(size, built.clone());
    built
}

/// Apply a separable Gaussian blur of the given `sigma` to `plane`, an
/// `width`×`height` byte plane with row stride `pitch`. `sigma <= 0.1` is a
/// no-op per spec §7 (the tabulated kernel would collapse to nothing useful
/// and would otherwise waste a scratch allocation); a kernel wider than
/// either dimension is also bypassed (spec §8 "blur identity").
pub fn gaussian_blur(plane: &mut [u8], width: i32, height: i32, pitch: i32, sigma: f64) {
    if sigma <= 0.1 {
        log::trace!("gaussian blur bypassed: sigma {sigma} <= 0.1");
        return;
    }
    let kernel = kernel_for_sigma(sigma);
    if (width as usize) < kernel.g_w || (height as usize) < kernel.g_w {
        log::trace!(
            "gaussian blur bypassed: plane {width}x{height} smaller than kernel width {}",
            kernel.g_w
        );
        return;
    }
    let w = width as usize;
    let h = height as usize;
    let pitch = pitch as usize;
    let r = kernel.g_r;
    let mwidth = kernel.g_w;

    let shared = tmp_buf((w + 1) * (h + 1));
    // The cache may hand back a buffer sized for a larger previous call;
    // only the prefix this call needs is ever touched or read.
    let mut tmp = match Arc::try_unwrap(shared) {
        Ok(v) => v,
        Err(arc) => (*arc).clone(),
    };
    for v in tmp.iter_mut().take((w + 1) * (h + 1)) {
        *v = 0;
    }

    // Horizontal pass: for each row, scatter each source byte's weighted
    // kernel taps into a (w+1)-wide u32 accumulator row (index 0 is a
    // sentinel so taps can run one column left of the row start). The two
    // edge columns (x=0 and x=w-1) don't just drop the kernel taps that
    // would spill off the plane; they fold that mass back onto the valid
    // range via a reverse prefix sum, so no energy is lost at the boundary
    // (ground: `ass_gauss_blur`'s `x < r` / `x == width - 1` blocks).
    for y in 0..h {
        let src_row = &plane[y * pitch..y * pitch + w];
        let dst_row = &mut tmp[y * (w + 1)..y * (w + 1) + w + 1];

        if r > 0 {
            let src = src_row[0];
            if src != 0 {
                let weights = kernel.weight_row(src);
                let mut sum = 0u32;
                for mx in (r..mwidth).rev() {
                    sum += weights[mx];
                    dst_row[mx - r] += sum;
                }
            }
        }

        let start = if r > 0 { 1 } else { 0 };
        let end = if r > 0 && w > 1 { w - 1 } else { w };
        for x in start..end {
            let src = src_row[x];
            if src == 0 {
                continue;
            }
            let weights = kernel.weight_row(src);
            let lo = r.saturating_sub(x);
            let hi = if x + mwidth > r + w { r + w - x } else { mwidth };
            for mx in lo..hi {
                let dst_idx = (x + mx).wrapping_sub(r);
                dst_row[dst_idx] += weights[mx];
            }
        }

        if r > 0 && w > 1 {
            let x = w - 1;
            let src = src_row[x];
            if src != 0 {
                let weights = kernel.weight_row(src);
                let x2 = r + 1;
                let mut sum = 0u32;
                for mx in 0..x2 {
                    sum += weights[mx];
                    dst_row[x + mx - r] += sum;
                }
            }
        }
    }

    // Vertical pass: read the horizontal accumulator column-wise as a
    // 16.16 fixed-point quantity, round (`+1<<15 >>16`) to index the same
    // table again, and scatter into a second accumulation pass in place.
    // Same reverse-prefix-sum boundary fold as the horizontal pass, applied
    // to the top (y=0) and bottom (y=h-1) rows.
    for x in 0..w {
        if r > 0 {
            let idx = x;
            let src = tmp[idx];
            if src != 0 {
                let src2 = ((src + (1 << 15)) >> 16) as u8;
                tmp[idx] = 1 << 15;
                let weights = kernel.weight_row(src2);
                let mut sum = 0u32;
                for my in (r..mwidth).rev() {
                    sum += weights[my];
                    let dst_y = my - r;
                    tmp[dst_y * (w + 1) + x] += sum;
                }
            }
        }

        let start = if r > 0 { 1 } else { 0 };
        let end = if r > 0 && h > 1 { h - 1 } else { h };
        for y in start..end {
            let idx = y * (w + 1) + x;
            let src = tmp[idx];
            if src == 0 {
                continue;
            }
            let src2 = ((src + (1 << 15)) >> 16) as u8;
            tmp[idx] = 1 << 15;
            let weights = kernel.weight_row(src2);
            let lo = r.saturating_sub(y);
            let hi = if y + mwidth > r + h { r + h - y } else { mwidth };
            for my in lo..hi {
                let dst_y = (y + my).wrapping_sub(r);
                tmp[dst_y * (w + 1) + x] += weights[my];
            }
        }

        if r > 0 && h > 1 {
            let y = h - 1;
            let idx = y * (w + 1) + x;
            let src = tmp[idx];
            if src != 0 {
                let src2 = ((src + (1 << 15)) >> 16) as u8;
                tmp[idx] = 1 << 15;
                let weights = kernel.weight_row(src2);
                let y2 = r + 1;
                let mut sum = 0u32;
                for my in 0..y2 {
                    sum += weights[my];
                    tmp[(y + my - r) * (w + 1) + x] += sum;
                }
            }
        }
    }

    for y in 0..h {
        let dst_row = &mut plane[y * pitch..y * pitch + w];
        let src_row = &tmp[y * (w + 1)..y * (w + 1) + w];
        for x in 0..w {
            dst_row[x] = (src_row[x] >> 16) as u8;
        }
    }
}
