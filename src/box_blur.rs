//! Box-style `[1 2 1]²` blur: one or more passes of a separable running-sum
//! 1-D kernel, matching the classic `(old + new) >> 2` recurrence.
//!
//! Ground: `be_blur` in `examples/original_source/src/subtitles/Rasterizer.cpp`.
//! Only the interior `(W-2)x(H-2)` region is blurred, matching the original's
//! `be_blur(plan_selected+1+pitch, width-2, height-2, pitch)` call — the
//! outermost ring of pixels is left untouched. Horizontal rows and vertical
//! columns are each independent, so both passes parallelize over `rayon`
//! (ground: the teacher's own `rayon::prelude::par_chunks_mut` usage in
//! `ops/filters.rs`/`ops/effects.rs`, replacing the original's `#pragma omp
//! parallel for`).

use rayon::prelude::*;

/// Run `passes` box-blur passes over `plane`'s interior `(width-2)x(height-2)`
/// region. A no-op if `width < 3 || height < 3` (spec §8 "blur identity" —
/// there is no interior to blur).
pub fn box_blur(plane: &mut [u8], width: i32, height: i32, pitch: i32, passes: u32) {
    if width < 3 || height < 3 {
        log::trace!("box blur bypassed: plane {width}x{height} too small");
        return;
    }
    let pitch = pitch as usize;
    let inner_w = (width - 2) as usize;
    let inner_h = (height - 2) as usize;
    // Start of the interior: row 1, column 1 (ground: `+1+pitch`).
    let origin = pitch + 1;

    for _ in 0..passes {
        horizontal_pass(plane, origin, pitch, inner_w, inner_h);
        vertical_pass(plane, origin, pitch, inner_w, inner_h);
    }
}

fn horizontal_pass(plane: &mut [u8], origin: usize, pitch: usize, w: usize, h: usize) {
    plane[origin..origin + (h.saturating_sub(1)) * pitch + w]
        .par_chunks_mut(pitch)
        .take(h)
        .for_each(|row| {
            let row = &mut row[..w];
            let mut old_sum = 2 * row[0] as i32;
            for x in 0..w - 1 {
                let new_sum = row[x] as i32 + row[x + 1] as i32;
                row[x] = ((old_sum + new_sum) >> 2) as u8;
                old_sum = new_sum;
            }
        });
}

fn vertical_pass(plane: &mut [u8], origin: usize, pitch: usize, w: usize, h: usize) {
    // Columns are independent but interleaved in memory, so each column is
    // extracted into its own scratch vec before the parallel pass and
    // scattered back afterward.
    let columns: Vec<Vec<u8>> = (0..w)
        .map(|x| (0..h).map(|y| plane[origin + y * pitch + x]).collect())
        .collect();
    let blurred: Vec<Vec<u8>> = columns
        .into_par_iter()
        .map(|mut col| {
            let mut old_sum = 2 * col[0] as i32;
            for y in 0..h - 1 {
                let new_sum = col[y] as i32 + col[y + 1] as i32;
                col[y] = ((old_sum + new_sum) >> 2) as u8;
                old_sum = new_sum;
            }
            col
        })
        .collect();
    for (x, col) in blurred.into_iter().enumerate() {
        for (y, v) in col.into_iter().enumerate() {
            plane[origin + y * pitch + x] = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_plane_is_idempotent_on_interior() {
        let w = 8i32;
        let h = 8i32;
        let mut plane = vec![40u8; (w * h) as usize];
        box_blur(&mut plane, w, h, w, 1);
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                assert_eq!(plane[(y * w + x) as usize], 40);
            }
        }
    }

    #[test]
    fn too_small_plane_is_untouched() {
        let mut plane = vec![5u8, 6, 7, 8];
        let before = plane.clone();
        box_blur(&mut plane, 2, 2, 2, 3);
        assert_eq!(plane, before);
    }

    #[test]
    fn spike_spreads_to_neighbors() {
        let w = 6i32;
        let h = 6i32;
        let mut plane = vec![0u8; (w * h) as usize];
        plane[(3 * w + 3) as usize] = 64;
        box_blur(&mut plane, w, h, w, 1);
        assert!(plane[(3 * w + 2) as usize] > 0);
        assert!(plane[(3 * w + 3) as usize] < 64);
    }
}
