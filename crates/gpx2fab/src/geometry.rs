//! Core geometry helpers for gpx2fab.
//!
//! The geometry *types* come from the `geo` crate; this module adds the
//! small set of measurements and conversions the pipeline keeps reaching for.
//!
//! ## Rust Lesson #3: Enums as polymorphic values
//!
//! `geo::Geometry` is an enum over Point, LineString, Polygon, the Multi*
//! variants and GeometryCollection. A function that accepts `&Geometry`
//! handles every shape with one `match`, and the compiler checks that no
//! variant was forgotten.
//!
//! All helpers are pure: they borrow their input and return new values.

use std::f64::consts::TAU;

pub use geo::{
    Coord, Geometry, GeometryCollection, Line, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Point, Polygon, Rect,
};
use geo::{Area, BoundingRect, Euclidean, Length};

/// The canonical empty geometry.
pub fn empty_geometry() -> Geometry {
    Geometry::GeometryCollection(GeometryCollection::default())
}

/// True when the geometry has nothing drawable left in it.
pub fn is_empty(geometry: &Geometry) -> bool {
    match geometry {
        Geometry::Point(_) | Geometry::Line(_) | Geometry::Rect(_) | Geometry::Triangle(_) => false,
        Geometry::LineString(ls) => ls.0.len() < 2,
        Geometry::Polygon(p) => p.exterior().0.len() < 3,
        Geometry::MultiPoint(mp) => mp.0.is_empty(),
        Geometry::MultiLineString(mls) => mls.0.iter().all(|ls| ls.0.len() < 2),
        Geometry::MultiPolygon(mp) => mp.0.iter().all(|p| p.exterior().0.len() < 3),
        Geometry::GeometryCollection(gc) => gc.0.iter().all(is_empty),
    }
}

/// Collect every line-like part of a geometry as line strings.
///
/// Polygons are NOT converted to their rings here; use [`polygon_rings`]
/// for that. Degenerate parts (fewer than 2 coordinates) are dropped.
pub fn collect_line_strings(geometry: &Geometry) -> Vec<LineString> {
    let mut out = Vec::new();
    push_line_strings(geometry, &mut out);
    out
}

fn push_line_strings(geometry: &Geometry, out: &mut Vec<LineString>) {
    match geometry {
        Geometry::Line(l) => out.push(LineString::from(vec![l.start, l.end])),
        Geometry::LineString(ls) if ls.0.len() >= 2 => out.push(ls.clone()),
        Geometry::MultiLineString(mls) => {
            out.extend(mls.0.iter().filter(|ls| ls.0.len() >= 2).cloned());
        }
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                push_line_strings(g, out);
            }
        }
        _ => {}
    }
}

/// Collect every areal part of a geometry as polygons.
pub fn collect_polygons(geometry: &Geometry) -> Vec<Polygon> {
    let mut out = Vec::new();
    push_polygons(geometry, &mut out);
    out
}

fn push_polygons(geometry: &Geometry, out: &mut Vec<Polygon>) {
    match geometry {
        Geometry::Polygon(p) if p.exterior().0.len() >= 3 => out.push(p.clone()),
        Geometry::MultiPolygon(mp) => {
            out.extend(mp.0.iter().filter(|p| p.exterior().0.len() >= 3).cloned());
        }
        Geometry::Rect(r) => out.push(r.to_polygon()),
        Geometry::Triangle(t) => out.push(t.to_polygon()),
        Geometry::GeometryCollection(gc) => {
            for g in &gc.0 {
                push_polygons(g, out);
            }
        }
        _ => {}
    }
}

/// Collect every point-like part of a geometry.
pub fn collect_points(geometry: &Geometry) -> Vec<Point> {
    match geometry {
        Geometry::Point(p) => vec![*p],
        Geometry::MultiPoint(mp) => mp.0.clone(),
        Geometry::GeometryCollection(gc) => gc.0.iter().flat_map(collect_points).collect(),
        _ => Vec::new(),
    }
}

/// Exterior ring followed by interior rings, as closed line strings.
pub fn polygon_rings(polygon: &Polygon) -> Vec<LineString> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .filter(|ring| ring.0.len() >= 2)
        .cloned()
        .collect()
}

/// Bounding box of any geometry, `None` when it has no coordinates.
pub fn bounding_box(geometry: &Geometry) -> Option<Rect> {
    geometry.bounding_rect()
}

/// Axis-aligned rectangle as a polygon.
pub fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon {
    Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y }).to_polygon()
}

/// Regular polygon approximating a circle.
pub fn circle_polygon(center: Coord, radius: f64, segments: usize) -> Polygon {
    let segments = segments.max(8);
    let ring: Vec<Coord> = (0..segments)
        .map(|i| {
            let theta = TAU * i as f64 / segments as f64;
            Coord {
                x: center.x + radius * theta.cos(),
                y: center.y + radius * theta.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

/// Length of a line string.
#[inline]
pub fn line_string_length(ls: &LineString) -> f64 {
    Euclidean.length(ls)
}

/// Total ring length of a polygon (exterior plus holes).
pub fn polygon_perimeter(polygon: &Polygon) -> f64 {
    polygon_rings(polygon).iter().map(line_string_length).sum()
}

/// Area of a polygon body (exterior minus holes).
#[inline]
pub fn polygon_area(polygon: &Polygon) -> f64 {
    polygon.unsigned_area()
}

/// Mean width of a polygon, `2 * area / perimeter`.
///
/// A long thin sliver of width `w` scores roughly `w`, no matter how long
/// it is, which makes this the right measure for sliver suppression.
pub fn effective_width(polygon: &Polygon) -> f64 {
    let perimeter = polygon_perimeter(polygon);
    if perimeter <= 0.0 {
        return 0.0;
    }
    2.0 * polygon_area(polygon) / perimeter
}

/// Round a coordinate onto a grid of the given size.
#[inline]
pub fn snap_coord(c: Coord, grid: f64) -> Coord {
    if grid <= 0.0 {
        return c;
    }
    Coord {
        x: (c.x / grid).round() * grid,
        y: (c.y / grid).round() * grid,
    }
}

/// Snap a line string, dropping consecutive duplicates created by the snap.
pub fn snap_line_string(ls: &LineString, grid: f64) -> LineString {
    let mut coords: Vec<Coord> = ls.0.iter().map(|c| snap_coord(*c, grid)).collect();
    coords.dedup();
    LineString::from(coords)
}

/// Snap every ring of a polygon.
pub fn snap_polygon(polygon: &Polygon, grid: f64) -> Polygon {
    Polygon::new(
        snap_line_string(polygon.exterior(), grid),
        polygon
            .interiors()
            .iter()
            .map(|ring| snap_line_string(ring, grid))
            .collect(),
    )
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Polygon {
        rect_polygon(0.0, 0.0, size, size)
    }

    #[test]
    fn empty_collection_is_empty() {
        assert!(is_empty(&empty_geometry()));
        assert!(!is_empty(&Geometry::Polygon(square(1.0))));
        assert!(is_empty(&Geometry::LineString(LineString::from(vec![(0.0, 0.0)]))));
    }

    #[test]
    fn collect_walks_nested_collections() {
        let gc = Geometry::GeometryCollection(GeometryCollection::new_from(vec![
            Geometry::Polygon(square(1.0)),
            Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])),
            Geometry::GeometryCollection(GeometryCollection::new_from(vec![Geometry::Polygon(
                square(2.0),
            )])),
        ]));
        assert_eq!(collect_polygons(&gc).len(), 2);
        assert_eq!(collect_line_strings(&gc).len(), 1);
    }

    #[test]
    fn length_sums_segments() {
        let ls = LineString::from(vec![(0.0, 0.0), (3.0, 4.0), (3.0, 10.0)]);
        assert!((line_string_length(&ls) - 11.0).abs() < 1e-12);
    }

    #[test]
    fn polygon_area_subtracts_holes() {
        let poly = Polygon::new(
            square(10.0).exterior().clone(),
            vec![rect_polygon(2.0, 2.0, 4.0, 4.0).exterior().clone()],
        );
        assert!((polygon_area(&poly) - 96.0).abs() < 1e-10);
    }

    #[test]
    fn sliver_has_small_effective_width() {
        let sliver = rect_polygon(0.0, 0.0, 100.0, 0.001);
        let w = effective_width(&sliver);
        assert!(w < 0.0011 && w > 0.0009, "got {}", w);
    }

    #[test]
    fn circle_radius_is_respected() {
        let c = circle_polygon(Coord { x: 5.0, y: 5.0 }, 2.0, 32);
        for coord in &c.exterior().0 {
            let r = (coord.x - 5.0).hypot(coord.y - 5.0);
            assert!((r - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn snapping_removes_duplicates() {
        let ls = LineString::from(vec![(0.0, 0.0), (0.00001, 0.0), (1.0, 0.0)]);
        let snapped = snap_line_string(&ls, 0.001);
        assert_eq!(snapped.0.len(), 2);
    }
}
