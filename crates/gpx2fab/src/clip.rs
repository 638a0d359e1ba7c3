//! Segment clipping primitives, plus segment-set distances on top of `geo`.
//!
//! This is the HOT PATH for hatching - every construction line runs
//! through [`clip_line_to_polygon`], so it stays allocation-light.

use geo::{Distance, Euclidean};

use crate::geometry::{Coord, Line, LineString, Polygon, polygon_rings};

/// Segments shorter than this are treated as points.
const EPSILON: f64 = 1e-10;

// ============================================================================
// POINT IN POLYGON (Ray Casting Algorithm)
// ============================================================================
//
// ## Rust Lesson #8: References & Slices
//
// `&[Coord]` is a "slice" - a borrowed view into a contiguous sequence.
// It works with a LineString's backing Vec without copying it.

/// Test if a point is inside a ring using ray casting.
///
/// Casts a ray to the right and counts edge crossings.
/// Odd crossings = inside, even = outside.
#[inline]
pub fn point_in_ring(px: f64, py: f64, ring: &[Coord]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;

    for i in 0..n {
        let (xi, yi) = (ring[i].x, ring[i].y);
        let (xj, yj) = (ring[j].x, ring[j].y);

        if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
            inside = !inside;
        }

        j = i;
    }

    inside
}

/// Inside the exterior ring and outside every hole.
#[inline]
pub fn point_in_body(px: f64, py: f64, polygon: &Polygon) -> bool {
    if !point_in_ring(px, py, &polygon.exterior().0) {
        return false;
    }
    !polygon.interiors().iter().any(|hole| point_in_ring(px, py, &hole.0))
}

// ============================================================================
// LINE-LINE INTERSECTION
// ============================================================================

/// Parameter along `a` where it crosses `b`, if the two segments cross.
///
/// The parameter runs from 0 at `a.start` to 1 at `a.end`. Parallel and
/// coincident segments report no crossing.
#[inline]
pub fn crossing_parameter(a: Line, b: Line) -> Option<f64> {
    let (x1, y1, x2, y2) = (a.start.x, a.start.y, a.end.x, a.end.y);
    let (x3, y3, x4, y4) = (b.start.x, b.start.y, b.end.x, b.end.y);
    let denom = (y4 - y3) * (x2 - x1) - (x4 - x3) * (y2 - y1);

    // Parallel or coincident lines
    if denom.abs() < EPSILON {
        return None;
    }

    let ua = ((x4 - x3) * (y1 - y3) - (y4 - y3) * (x1 - x3)) / denom;
    let ub = ((x2 - x1) * (y1 - y3) - (y2 - y1) * (x1 - x3)) / denom;

    ((0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub)).then_some(ua)
}

// ============================================================================
// LINE-POLYGON CLIPPING
// ============================================================================

/// Parameters `t` along `line` where it crosses any ring of the polygon.
fn crossing_parameters(line: Line, polygon: &Polygon) -> Vec<f64> {
    let mut ts = Vec::new();
    for ring in polygon_rings(polygon) {
        for edge in ring.lines() {
            ts.extend(crossing_parameter(line, edge));
        }
    }
    ts
}

/// Clip a segment to a polygon, holes included.
///
/// Collects the crossings with every ring (exterior and holes), splits the
/// segment there and keeps the pieces whose midpoint is inside the body.
/// Output pieces run in the same direction as the input.
pub fn clip_line_to_polygon(line: Line, polygon: &Polygon) -> Vec<Line> {
    let dx = line.end.x - line.start.x;
    let dy = line.end.y - line.start.y;
    if dx.hypot(dy) < EPSILON {
        return Vec::new();
    }

    // Fast bounding box rejection
    if let Some(bbox) = geo::BoundingRect::bounding_rect(polygon) {
        let (min, max) = (bbox.min(), bbox.max());
        if line.start.x.max(line.end.x) < min.x
            || line.start.x.min(line.end.x) > max.x
            || line.start.y.max(line.end.y) < min.y
            || line.start.y.min(line.end.y) > max.y
        {
            return Vec::new();
        }
    } else {
        return Vec::new();
    }

    let mut ts = crossing_parameters(line, polygon);
    ts.push(0.0);
    ts.push(1.0);
    ts.sort_by(f64::total_cmp);
    ts.dedup_by(|a, b| (*a - *b).abs() < EPSILON);

    let at = |t: f64| Coord {
        x: line.start.x + t * dx,
        y: line.start.y + t * dy,
    };

    // ## Rust Lesson #14: Iterators & Collecting
    //
    // .windows(2) gives sliding windows of size 2: [a,b], [b,c], [c,d], ...
    // .filter_map() combines filter + map: return Some(x) to keep, None to skip
    let mut pieces: Vec<Line> = ts
        .windows(2)
        .filter_map(|pair| {
            let mid = at((pair[0] + pair[1]) / 2.0);
            point_in_body(mid.x, mid.y, polygon).then(|| Line::new(at(pair[0]), at(pair[1])))
        })
        .collect();

    // Re-join pieces split at a vertex touch that stays inside
    pieces.dedup_by(|next, prev| {
        if prev.end == next.start {
            prev.end = next.end;
            true
        } else {
            false
        }
    });
    pieces
}

// ============================================================================
// DISTANCES
// ============================================================================

/// Segments of a line string; a single-coordinate string yields a
/// zero-length segment so distances still work.
pub fn segments_of(ls: &LineString) -> Vec<Line> {
    match ls.0.len() {
        0 => Vec::new(),
        1 => vec![Line::new(ls.0[0], ls.0[0])],
        _ => ls.lines().collect(),
    }
}

/// Minimum distance between two sets of segments.
pub fn segments_distance(a: &[Line], b: &[Line]) -> f64 {
    let mut best = f64::INFINITY;
    for sa in a {
        for sb in b {
            best = best.min(Euclidean.distance(sa, sb));
            if best == 0.0 {
                return 0.0;
            }
        }
    }
    best
}

// ============================================================================
// TESTS
// ============================================================================
