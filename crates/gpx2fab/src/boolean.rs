//! Boolean operations between layers: buffer, difference, intersection.
//!
//! The heavy lifting is done by `geo`'s `BooleanOps` (an `i_overlay`
//! sweep). This module adds the numeric policy the pipeline needs on top:
//!
//! - inputs are snapped to a fixed grid so nearly-coincident edges from two
//!   datasets become exactly coincident,
//! - results thinner (polygons) or shorter (lines) than the tolerance are
//!   dropped instead of surfacing as hairline slivers.
//!
//! An empty result is a normal value, never an error.

use geo::{BooleanOps, Buffer, Contains};

use crate::geometry::{
    Geometry, GeometryCollection, MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
    collect_line_strings, collect_points, collect_polygons, effective_width, empty_geometry,
    line_string_length, snap_line_string, snap_polygon,
};

/// Default sliver/snap tolerance in page millimetres.
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Boolean operations with a fixed numeric tolerance.
#[derive(Debug, Clone, Copy)]
pub struct BooleanEngine {
    tolerance: f64,
}

impl Default for BooleanEngine {
    fn default() -> Self {
        Self { tolerance: DEFAULT_TOLERANCE }
    }
}

impl BooleanEngine {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance: tolerance.max(0.0) }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Snap grid: well below the sliver tolerance so snapping never
    /// creates a sliver on its own.
    #[inline]
    fn grid(&self) -> f64 {
        self.tolerance / 10.0
    }

    // ========================================================================
    // AREAL PRIMITIVES
    // ========================================================================

    /// Snap and filter the polygonal part of a geometry.
    pub fn areal(&self, geometry: &Geometry) -> MultiPolygon {
        self.clean(MultiPolygon::new(
            collect_polygons(geometry)
                .iter()
                .map(|p| snap_polygon(p, self.grid()))
                .collect(),
        ))
    }

    /// Drop polygons thinner than the tolerance, and holes likewise.
    pub fn clean(&self, mp: MultiPolygon) -> MultiPolygon {
        let tol = self.tolerance;
        MultiPolygon::new(
            mp.into_iter()
                .filter(|p| p.exterior().0.len() >= 4 && effective_width(p) >= tol)
                .map(|p| {
                    let (exterior, interiors) = p.into_inner();
                    let interiors = interiors
                        .into_iter()
                        .filter(|ring| {
                            let hole = Polygon::new(ring.clone(), vec![]);
                            ring.0.len() >= 4 && effective_width(&hole) >= tol
                        })
                        .collect();
                    Polygon::new(exterior, interiors)
                })
                .collect(),
        )
    }

    /// Drop line strings shorter than the tolerance.
    fn clean_lines(&self, mls: MultiLineString) -> MultiLineString {
        MultiLineString::new(
            mls.into_iter()
                .filter(|ls| ls.0.len() >= 2 && line_string_length(ls) >= self.tolerance)
                .collect(),
        )
    }

    fn linear(&self, geometry: &Geometry) -> MultiLineString {
        MultiLineString::new(
            collect_line_strings(geometry)
                .iter()
                .map(|ls| snap_line_string(ls, self.grid()))
                .filter(|ls| ls.0.len() >= 2)
                .collect(),
        )
    }

    /// Union of many polygons.
    pub fn union<'a, I>(&self, polygons: I) -> MultiPolygon
    where
        I: IntoIterator<Item = &'a Polygon>,
    {
        let snapped: Vec<Polygon> = polygons
            .into_iter()
            .map(|p| snap_polygon(p, self.grid()))
            .collect();
        if snapped.is_empty() {
            return MultiPolygon::new(vec![]);
        }
        self.clean(geo::unary_union(&snapped))
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Geometry present in both `a` and `b`.
    ///
    /// `b` acts as the clip region: only its areal part is used. Lines and
    /// points of `a` are clipped to it; polygons of `a` are intersected.
    pub fn intersection(&self, a: &Geometry, b: &Geometry) -> Geometry {
        self.overlay(a, b, false)
    }

    /// Geometry present in `a` but not in `b` (areal part of `b`).
    pub fn difference(&self, a: &Geometry, b: &Geometry) -> Geometry {
        self.overlay(a, b, true)
    }

    fn overlay(&self, a: &Geometry, b: &Geometry, invert: bool) -> Geometry {
        let region = self.areal(b);
        let mut parts: Vec<Geometry> = Vec::new();

        let polys = self.areal(a);
        if !polys.0.is_empty() {
            let out = if invert {
                polys.difference(&region)
            } else {
                polys.intersection(&region)
            };
            let out = self.clean(out);
            if !out.0.is_empty() {
                parts.push(Geometry::MultiPolygon(out));
            }
        }

        let lines = self.linear(a);
        if !lines.0.is_empty() {
            let out = if region.0.is_empty() {
                if invert { lines } else { MultiLineString::new(vec![]) }
            } else {
                region.clip(&lines, invert)
            };
            let out = self.clean_lines(out);
            if !out.0.is_empty() {
                parts.push(Geometry::MultiLineString(out));
            }
        }

        let points: Vec<Point> = collect_points(a)
            .into_iter()
            .filter(|p| region.contains(p) != invert)
            .collect();
        if !points.is_empty() {
            parts.push(Geometry::MultiPoint(MultiPoint::new(points)));
        }

        match parts.len() {
            0 => empty_geometry(),
            1 => parts.remove(0),
            _ => Geometry::GeometryCollection(GeometryCollection::new_from(parts)),
        }
    }

    /// Expand a geometry into a polygon.
    ///
    /// - Points and lines become a corridor of total width `distance`
    ///   (`distance / 2` on each side) with round caps and joins.
    /// - Polygons are offset by `distance`: positive grows the boundary
    ///   outward, negative shrinks it inward.
    ///
    /// A non-positive distance on a point or line yields an empty result.
    pub fn buffer(&self, geometry: &Geometry, distance: f64) -> MultiPolygon {
        let mut parts: Vec<MultiPolygon> = Vec::new();

        if distance > 0.0 {
            let radius = distance / 2.0;
            let points = collect_points(geometry);
            if !points.is_empty() {
                parts.push(MultiPoint::new(points).buffer(radius));
            }
            let lines = self.linear(geometry);
            if !lines.0.is_empty() {
                parts.push(lines.buffer(radius));
            }
        }

        let polygons = collect_polygons(geometry);
        if !polygons.is_empty() {
            parts.push(self.offset_polygons(&polygons, distance));
        }

        match parts.len() {
            0 => MultiPolygon::new(vec![]),
            1 => self.clean(parts.remove(0)),
            _ => self.clean(geo::unary_union(&parts)),
        }
    }

    /// Offset polygons by `distance` (positive = outward).
    ///
    /// Outward offsets round the corners; inward offsets keep them sharp.
    pub fn offset_polygons(&self, polygons: &[Polygon], distance: f64) -> MultiPolygon {
        let body = self.union(polygons.iter());
        if distance == 0.0 || body.0.is_empty() {
            return body;
        }
        self.clean(body.buffer(distance))
    }
}

// ============================================================================
// TESTS
// ============================================================================
