//! Region widener: grows a span set outward by a half-disk radius using
//! repeated sorted-merge unions, producing the Minkowski sum of the filled
//! region with an `rx`×`ry` ellipse. Ground: `Rasterizer::CreateWidenedRegion`
//! / `_OverlapRegion` in the original renderer.

use crate::scan::Span;

/// Merge `src`, offset by `(dx, dy)`, into `dst`, producing the union of the
/// two span sets (each individually already disjoint and sorted). Both
/// halves of a span key carry `y<<32 + x` plus a shared bias, so an offset
/// by `(dx, dy)` is just `(dy<<32) ± dx` added to each half — the bias
/// cancels out of every comparison and never overflows because both
/// operands carry it identically.
fn overlap_region(dst: Vec<Span>, src: &[Span], dx: i32, dy: i32) -> Vec<Span> {
    let offset1 = (((dy as i64) << 32) - dx as i64) as u64;
    let offset2 = (((dy as i64) << 32) + dx as i64) as u64;

    let mut out: Vec<Span> = Vec::with_capacity(dst.len() + src.len());
    let mut a = dst.iter();
    let mut b = src.iter();
    let mut pa = a.next();
    let mut pb = b.next();

    loop {
        match (pa, pb) {
            (None, None) => break,
            (Some(_), None) => {
                out.push(*pa.unwrap());
                pa = a.next();
            }
            (None, Some(_)) => {
                let (x1, x2) = *pb.unwrap();
                out.push((x1.wrapping_add(offset1), x2.wrapping_add(offset2)));
                pb = b.next();
            }
            (Some(&(ax1, ax2)), Some(&(bx1, bx2))) => {
                let b_shifted_x1 = bx1.wrapping_add(offset1);
                if b_shifted_x1 < ax1 {
                    let x1 = b_shifted_x1;
                    let mut x2 = bx2.wrapping_add(offset2);
                    pb = b.next();
                    loop {
                        match pa {
                            Some(&(nax1, nax2)) if nax1 <= x2 => {
                                x2 = x2.max(nax2);
                                pa = a.next();
                            }
                            _ => break,
                        }
                        match pb {
                            Some(&(nbx1, nbx2)) if nbx1.wrapping_add(offset1) <= x2 => {
                                x2 = x2.max(nbx2.wrapping_add(offset2));
                                pb = b.next();
                            }
                            _ => break,
                        }
                    }
                    out.push((x1, x2));
                } else {
                    let x1 = ax1;
                    let mut x2 = ax2;
                    pa = a.next();
                    loop {
                        match pb {
                            Some(&(nbx1, nbx2)) if nbx1.wrapping_add(offset1) <= x2 => {
                                x2 = x2.max(nbx2.wrapping_add(offset2));
                                pb = b.next();
                            }
                            _ => break,
                        }
                        match pa {
                            Some(&(nax1, nax2)) if nax1 <= x2 => {
                                x2 = x2.max(nax2);
                                pa = a.next();
                            }
                            _ => break,
                        }
                    }
                    out.push((x1, x2));
                }
            }
        }
    }
    out
}

/// Widen `outline` by an `rx`×`ry` half-disk to produce the border span set
/// (the "wide outline"), plus the border thickness to carry into overlay
/// sizing. Negative radii are clamped to zero. `ry == 0 && rx > 0` takes the
/// degenerate horizontal-only path, doubled to avoid single-overlap seams
/// (ground: the original's explicit "artifacts if we don't overlap twice"
/// comment).
pub fn widen(outline: &[Span], rx: i32, ry: i32) -> (Vec<Span>, i32) {
    let rx = rx.max(0);
    let ry = ry.max(0);
    let wide_border = rx.max(ry);

    let mut wide = Vec::new();
    if ry > 0 {
        for y in -ry..=ry {
            let x = (0.5 + ((ry * ry - y * y) as f64).sqrt() * rx as f64 / ry as f64) as i32;
            wide = overlap_region(wide, outline, x, y);
        }
    } else if rx > 0 {
        wide = overlap_region(wide, outline, rx, 0);
        wide = overlap_region(wide, outline, rx, 0);
    }
    (wide, wide_border)
}
