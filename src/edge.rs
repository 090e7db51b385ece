//! Edge builder: per-scanline singly-linked lists of opening/closing edges.
//!
//! Mirrors the original renderer's `Edge` arena: a flat buffer addressed by
//! `u32` index instead of a pointer, with index 0 reserved as a sentinel so
//! an empty list is representable as `0`. The arena grows by doubling
//! (`Vec::push`'s own amortized growth gives us this for free, but we keep
//! the struct name and the "never allocate per edge" framing from the
//! original `_ReallocEdgeBuffer`).

/// One entry in a scanline's singly-linked edge list.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    /// Index of the next edge in this row's list, or 0 at the end.
    pub next: u32,
    /// `x<<1` with bit 0 set for a downward (opening) edge, clear for an
    /// upward (closing) edge.
    pub pos_and_flag: i32,
}

/// Arena of [`Edge`] records addressed by index. Index 0 is a sentinel.
pub struct EdgeArena {
    edges: Vec<Edge>,
}

impl EdgeArena {
    pub fn new() -> Self {
        Self {
            edges: vec![Edge { next: 0, pos_and_flag: 0 }],
        }
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Prepend a new edge to the list whose current head is `*head`,
    /// updating `*head` to the new edge's index.
    fn prepend(&mut self, head: &mut u32, x: i32, downward: bool) {
        let pos_and_flag = x * 2 + if downward { 1 } else { 0 };
        self.edges.push(Edge { next: *head, pos_and_flag });
        *head = (self.edges.len() - 1) as u32;
    }

    /// Collect every `pos_and_flag` reachable from `head` into `out`,
    /// following the linked list. `out` is not cleared first.
    pub fn collect_row(&self, head: u32, out: &mut Vec<i32>) {
        let mut ptr = head;
        while ptr != 0 {
            let e = &self.edges[ptr as usize];
            out.push(e.pos_and_flag);
            ptr = e.next;
        }
    }
}

impl Default for EdgeArena {
    fn default() -> Self {
        Self::new()
    }
}

/// One head index per output scanline row.
pub struct ScanBuffer {
    pub heads: Vec<u32>,
}

impl ScanBuffer {
    pub fn new(height: usize) -> Self {
        Self { heads: vec![0; height] }
    }
}

/// Appends one edge per scanline covered by the line segment `(x0,y0)` →
/// `(x1,y1)`, in 1/8-pixel units, orienting so the loop always walks
/// downward in y. Zero-length and horizontal segments contribute nothing.
///
/// Ground: `Rasterizer::_EvaluateLine(int,int,int,int)`. `xacc` is a 64-bit
/// fixed-point x accumulator; `invslope` is `dx/dy` in 16.16 fixed point.
/// An output scanline is sampled at its center (`+4` sub-pixel units into
/// an 8-unit row), so the first and last covered row are found by
/// prestepping `y0` up and backing `y1` off by 5 before dividing by 8.
pub fn evaluate_line(arena: &mut EdgeArena, scan: &mut ScanBuffer, x0: i32, y0: i32, x1: i32, y1: i32) {
    if y1 > y0 {
        append_edges(arena, scan, x0, y0, x1, y1, true);
    } else if y1 < y0 {
        append_edges(arena, scan, x1, y1, x0, y0, false);
    }
}

/// `lo` is the y-lesser endpoint, `hi` the y-greater one. `downward` marks
/// the edges as opening (`true`, original segment went down) or closing
/// (`false`, original segment went up); the x endpoints are passed in the
/// same order as `lo`/`hi` regardless of original direction, matching the
/// original's separate "down" and "up" branches.
#[allow(clippy::too_many_arguments)]
fn append_edges(
    arena: &mut EdgeArena,
    scan: &mut ScanBuffer,
    x_lo: i32,
    y_lo: i32,
    x_hi: i32,
    y_hi: i32,
    downward: bool,
) {
    let dy = (y_hi - y_lo) as i64;
    if dy == 0 {
        return;
    }
    let mut xacc: i64 = (x_lo as i64) << 13;
    // Prestep to the first sampled scanline center.
    let y = ((y_lo + 3) & !7) + 4;
    let mut iy = y >> 3;
    let last_row = (y_hi - 5) >> 3;
    if iy > last_row {
        return;
    }
    let invslope: i64 = ((x_hi - x_lo) as i64) << 16;
    let invslope = invslope / dy;
    xacc += (invslope * (y - y_lo) as i64) >> 3;
    while iy <= last_row {
        let ix = ((xacc + 32768) >> 16) as i32;
        arena.prepend(&mut scan.heads[iy as usize], ix, downward);
        iy += 1;
        xacc += invslope;
    }
}
