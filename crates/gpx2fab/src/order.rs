//! Stroke ordering for minimizing plotter travel.
//!
//! Hatching emits strokes band by band, so the pen zig-zags back across the
//! shape between every pair. Re-ordering (and flipping) strokes so each one
//! starts close to where the last one ended cuts the pen-up travel.
//!
//! ## Algorithms
//!
//! - **Nearest Neighbor**: Simple greedy approach - O(n²) but usually good enough

use crate::geometry::{Coord, LineString};

/// Ordering strategy for strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingStrategy {
    /// Keep emission order
    #[default]
    Document,
    /// Nearest neighbor greedy optimization
    NearestNeighbor,
}

#[inline]
fn dist_sq(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

/// Order strokes using the nearest-neighbour heuristic.
///
/// Starting from `home`, repeatedly pick the unvisited stroke whose nearer
/// end is closest to the pen, reversing it when its far end is the nearer
/// one. Ties go to the lower index, so the result depends only on the input.
pub fn order_nearest_neighbor(strokes: &[LineString], home: Coord) -> Vec<LineString> {
    let n = strokes.len();
    let mut visited = vec![false; n];
    let mut out = Vec::with_capacity(n);
    let mut pen = home;

    for _ in 0..n {
        let mut best: Option<(usize, bool, f64)> = None;
        for (i, stroke) in strokes.iter().enumerate() {
            if visited[i] {
                continue;
            }
            let (Some(&first), Some(&last)) = (stroke.0.first(), stroke.0.last()) else {
                continue;
            };
            let (d_first, d_last) = (dist_sq(pen, first), dist_sq(pen, last));
            let (reverse, d) = if d_last < d_first { (true, d_last) } else { (false, d_first) };
            if best.is_none_or(|(_, _, b)| d < b) {
                best = Some((i, reverse, d));
            }
        }

        let Some((i, reverse, _)) = best else {
            break;
        };
        visited[i] = true;
        let mut stroke = strokes[i].clone();
        if reverse {
            stroke.0.reverse();
        }
        if let Some(&end) = stroke.0.last() {
            pen = end;
        }
        out.push(stroke);
    }

    out
}

/// Pen-up travel for drawing strokes in the given order, starting at `home`.
pub fn travel_distance(strokes: &[LineString], home: Coord) -> f64 {
    let mut pen = home;
    let mut total = 0.0;
    for stroke in strokes {
        if let (Some(&first), Some(&last)) = (stroke.0.first(), stroke.0.last()) {
            total += dist_sq(pen, first).sqrt();
            pen = last;
        }
    }
    total
}

/// Apply an ordering strategy.
pub fn order_strokes(strokes: Vec<LineString>, strategy: OrderingStrategy) -> Vec<LineString> {
    match strategy {
        OrderingStrategy::Document => strokes,
        OrderingStrategy::NearestNeighbor => order_nearest_neighbor(&strokes, Coord { x: 0.0, y: 0.0 }),
    }
}
