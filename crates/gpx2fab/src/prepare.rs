//! Geometry preparation: clip raw features to the region of interest and
//! throw away what does not belong on the page.
//!
//! Every function here is pure. Inputs are borrowed, outputs are new values,
//! and an empty output is a perfectly good answer.

use geo::{BoundingRect, Intersects, Simplify};
use tracing::debug;

use crate::boolean::BooleanEngine;
use crate::chain::{ChainConfig, chain_line_strings};
use crate::clip::{point_in_body, segments_distance, segments_of};
use crate::geometry::{
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPolygon, Polygon, Rect,
    bounding_box, collect_line_strings, collect_points, collect_polygons, empty_geometry,
    line_string_length, polygon_rings,
};

/// Intersect a geometry with a boundary.
///
/// Every part of a split result is kept. An entirely outside geometry
/// yields the empty geometry.
pub fn clip_to_region(geometry: &Geometry, boundary: &Geometry, engine: &BooleanEngine) -> Geometry {
    engine.intersection(geometry, boundary)
}

/// Clip line strings to a boundary, returning the surviving pieces.
pub fn clip_lines(lines: &[LineString], boundary: &Geometry, engine: &BooleanEngine) -> Vec<LineString> {
    if lines.is_empty() {
        return Vec::new();
    }
    let input = Geometry::MultiLineString(MultiLineString::new(lines.to_vec()));
    collect_line_strings(&engine.intersection(&input, boundary))
}

/// Keep only lines connected to `anchor`, directly or through other kept lines.
///
/// Two geometries are connected when they come within `tolerance` of each
/// other; a line lying inside an areal anchor touches it. The search is a
/// flood fill seeded by the lines touching the anchor; output keeps the
/// input order.
pub fn filter_connected(lines: &[LineString], anchor: &Geometry, tolerance: f64) -> Vec<LineString> {
    let tolerance = tolerance.max(0.0);
    let anchor_segments = anchor_segments(anchor);
    if lines.is_empty() || anchor_segments.is_empty() {
        return Vec::new();
    }

    let segments: Vec<Vec<Line>> = lines.iter().map(segments_of).collect();
    let boxes: Vec<Option<Rect>> = lines.iter().map(|ls| ls.bounding_rect()).collect();
    let anchor_box = bounding_box(anchor);
    let anchor_polygons = collect_polygons(anchor);
    let inside_anchor = |ls: &LineString| {
        ls.0.first()
            .is_some_and(|c| anchor_polygons.iter().any(|p| point_in_body(c.x, c.y, p)))
    };

    let near = |a: Option<Rect>, b: Option<Rect>| match (a, b) {
        (Some(a), Some(b)) => grown(a, tolerance).intersects(&b),
        _ => false,
    };

    let mut connected = vec![false; lines.len()];
    let mut frontier: Vec<usize> = Vec::new();
    for i in 0..lines.len() {
        if !near(boxes[i], anchor_box) {
            continue;
        }
        if inside_anchor(&lines[i]) || segments_distance(&segments[i], &anchor_segments) <= tolerance {
            connected[i] = true;
            frontier.push(i);
        }
    }

    // ## Rust Lesson #21: Vec as a work stack
    //
    // `pop()` hands back ownership of the last element, so the loop runs
    // until no newly connected line is left to expand from.
    while let Some(current) = frontier.pop() {
        for j in 0..lines.len() {
            if connected[j] || !near(boxes[current], boxes[j]) {
                continue;
            }
            if segments_distance(&segments[current], &segments[j]) <= tolerance {
                connected[j] = true;
                frontier.push(j);
            }
        }
    }

    let kept: Vec<LineString> = lines
        .iter()
        .zip(&connected)
        .filter(|(_, keep)| **keep)
        .map(|(ls, _)| ls.clone())
        .collect();
    debug!(total = lines.len(), kept = kept.len(), "filtered orphan lines");
    kept
}

/// Segments describing an anchor: polygon rings, lines, and points.
fn anchor_segments(anchor: &Geometry) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::new();
    for polygon in collect_polygons(anchor) {
        for ring in polygon_rings(&polygon) {
            out.extend(segments_of(&ring));
        }
    }
    for ls in collect_line_strings(anchor) {
        out.extend(segments_of(&ls));
    }
    for p in collect_points(anchor) {
        out.push(Line::new(p.0, p.0));
    }
    out
}

/// A box enlarged by `margin` on every side.
#[inline]
fn grown(rect: Rect, margin: f64) -> Rect {
    let pad = Coord { x: margin, y: margin };
    Rect::new(rect.min() - pad, rect.max() + pad)
}

/// Remove vertices that deviate less than `tolerance` from the shape
/// (Ramer-Douglas-Peucker). A non-positive tolerance returns the input.
///
/// Polygons or lines that collapse below a valid shape are dropped.
pub fn simplify(geometry: &Geometry, tolerance: f64) -> Geometry {
    if tolerance <= 0.0 {
        return geometry.clone();
    }
    match geometry {
        Geometry::LineString(ls) => {
            let s = ls.simplify(tolerance);
            if s.0.len() >= 2 { Geometry::LineString(s) } else { empty_geometry() }
        }
        Geometry::MultiLineString(mls) => Geometry::MultiLineString(MultiLineString::new(
            mls.simplify(tolerance).into_iter().filter(|ls| ls.0.len() >= 2).collect(),
        )),
        Geometry::Polygon(p) => {
            let s = p.simplify(tolerance);
            if s.exterior().0.len() >= 4 { Geometry::Polygon(s) } else { empty_geometry() }
        }
        Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(MultiPolygon::new(
            mp.simplify(tolerance)
                .into_iter()
                .filter(|p| p.exterior().0.len() >= 4)
                .collect(),
        )),
        Geometry::GeometryCollection(gc) => Geometry::GeometryCollection(GeometryCollection::new_from(
            gc.0.iter().map(|g| simplify(g, tolerance)).collect(),
        )),
        other => other.clone(),
    }
}

/// Join line strings whose endpoints meet within `tolerance`.
pub fn merge_lines(lines: &[LineString], tolerance: f64) -> Vec<LineString> {
    chain_line_strings(lines, &ChainConfig::with_tolerance(tolerance))
}

/// The longest line string, ties going to the earliest.
pub fn longest_line(lines: &[LineString]) -> Option<&LineString> {
    let mut best: Option<(&LineString, f64)> = None;
    for ls in lines {
        let len = line_string_length(ls);
        if best.is_none_or(|(_, b)| len > b) {
            best = Some((ls, len));
        }
    }
    best.map(|(ls, _)| ls)
}

/// Exterior and interior rings of every polygon, as line strings.
pub fn outline_rings(polygons: &[Polygon]) -> Vec<LineString> {
    polygons.iter().flat_map(polygon_rings).collect()
}

// ============================================================================
// TESTS
// ============================================================================
