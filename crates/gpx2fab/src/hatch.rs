//! Hatch line generation.
//!
//! A plotter pen draws one fixed width, so filled areas and wide corridors
//! are rendered as families of thin parallel strokes. The construction is:
//!
//! 1. pick the direction `d` from the angle and its normal `n`
//! 2. project the polygon onto `n` to find the band it occupies
//! 3. place one construction line every `spacing` across that band,
//!    starting one spacing in from the edge so no stroke lies on the outline
//! 4. clip every construction line to the polygon (holes included)
//!
//! Nothing here is random: the same polygon, spacing and angle always give
//! the same strokes in the same order.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::boolean::BooleanEngine;
use crate::clip::clip_line_to_polygon;
use crate::geometry::{Coord, Geometry, Line, LineString, Polygon, collect_polygons};

/// Most construction lines one polygon may get. A 1 m wide shape at the
/// finest configurable spacing stays well below this.
pub const MAX_HATCH_LINES: usize = 200_000;

/// Spacing and angle of a hatch fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HatchSettings {
    /// Distance between neighbouring strokes in page units.
    pub spacing: f64,
    /// Stroke direction in degrees, measured from the +x axis.
    pub angle_deg: f64,
}

impl Default for HatchSettings {
    fn default() -> Self {
        Self { spacing: 0.5, angle_deg: 45.0 }
    }
}

impl HatchSettings {
    pub fn new(spacing: f64, angle_deg: f64) -> Self {
        Self { spacing, angle_deg }
    }

    /// Unit direction of the strokes and its normal.
    ///
    /// ## Rust Lesson #17: f64 Methods
    ///
    /// Rust's f64 has methods for math: `.sin()`, `.cos()`, `.to_radians()`.
    /// These compile to native CPU instructions - zero overhead.
    fn axes(&self) -> (Coord, Coord) {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        (Coord { x: cos, y: sin }, Coord { x: -sin, y: cos })
    }

    fn is_usable(&self) -> bool {
        self.spacing.is_finite() && self.spacing > 0.0 && self.angle_deg.is_finite()
    }
}

#[inline]
fn dot(a: Coord, b: Coord) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Construction lines covering a set of coordinates.
///
/// Lines run along the hatch direction and extend one unit past the
/// extremes so clipping always sees both crossings.
pub fn construction_lines<'a, I>(coords: I, settings: &HatchSettings) -> Vec<Line>
where
    I: IntoIterator<Item = &'a Coord>,
{
    if !settings.is_usable() {
        return Vec::new();
    }
    let (dir, normal) = settings.axes();

    let mut o_range = (f64::INFINITY, f64::NEG_INFINITY);
    let mut t_range = (f64::INFINITY, f64::NEG_INFINITY);
    for &c in coords {
        let (o, t) = (dot(c, normal), dot(c, dir));
        o_range = (o_range.0.min(o), o_range.1.max(o));
        t_range = (t_range.0.min(t), t_range.1.max(t));
    }
    if o_range.0 > o_range.1 {
        return Vec::new();
    }
    let (t0, t1) = (t_range.0 - 1.0, t_range.1 + 1.0);

    // ## Rust Lesson #19: Integer Math
    //
    // Stepping by `k as f64 * spacing` instead of accumulating `o += spacing`
    // keeps every offset exact to one rounding, so long runs do not drift.
    let count = ((o_range.1 - o_range.0) / settings.spacing).ceil();
    if count > MAX_HATCH_LINES as f64 {
        warn!(spacing = settings.spacing, lines = count, "hatch spacing too fine for shape; skipping fill");
        return Vec::new();
    }
    let count = count as usize;
    let mut lines = Vec::with_capacity(count);
    for k in 1..=count {
        let o = o_range.0 + k as f64 * settings.spacing;
        if o >= o_range.1 {
            break;
        }
        let base = Coord { x: normal.x * o, y: normal.y * o };
        lines.push(Line::new(
            Coord { x: base.x + dir.x * t0, y: base.y + dir.y * t0 },
            Coord { x: base.x + dir.x * t1, y: base.y + dir.y * t1 },
        ));
    }
    lines
}

/// Hatch strokes filling one polygon.
pub fn hatch_polygon(polygon: &Polygon, settings: &HatchSettings) -> Vec<Line> {
    construction_lines(&polygon.exterior().0, settings)
        .into_iter()
        .flat_map(|line| clip_line_to_polygon(line, polygon))
        .collect()
}

/// Hatch strokes filling every areal part of a geometry, polygon by polygon.
pub fn hatch_geometry(geometry: &Geometry, settings: &HatchSettings) -> Vec<Line> {
    collect_polygons(geometry)
        .iter()
        .flat_map(|p| hatch_polygon(p, settings))
        .collect()
}

/// Hatch strokes filling a line's corridor of total width `width`.
///
/// The corridor is the engine's buffer of the line, so caps and joins are
/// round and self-overlaps are merged before hatching.
pub fn hatch_corridor(
    line: &LineString,
    width: f64,
    settings: &HatchSettings,
    engine: &BooleanEngine,
) -> Vec<Line> {
    let corridor = engine.buffer(&Geometry::LineString(line.clone()), width);
    corridor
        .iter()
        .flat_map(|p| hatch_polygon(p, settings))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::rect_polygon;

    fn square() -> Polygon {
        rect_polygon(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn horizontal_hatch_stays_inside() {
        let lines = hatch_polygon(&square(), &HatchSettings::new(10.0, 0.0));

        for line in &lines {
            assert!(line.start.x >= -0.01 && line.start.x <= 100.01);
            assert!(line.end.x >= -0.01 && line.end.x <= 100.01);
            assert!((line.start.y - line.end.y).abs() < 1e-9, "strokes should be horizontal");
        }

        // Offsets 10, 20, ... 90: the edges themselves are never stroked
        assert_eq!(lines.len(), 9, "got {} lines", lines.len());
    }

    #[test]
    fn hatch_is_deterministic() {
        let poly = Polygon::new(
            LineString::from(vec![(0.0, 0.0), (30.0, 5.0), (25.0, 40.0), (3.0, 22.0)]),
            vec![],
        );
        let settings = HatchSettings::new(0.7, 33.0);
        let a = hatch_polygon(&poly, &settings);
        let b = hatch_polygon(&poly, &settings);
        assert_eq!(a.len(), b.len());
        for (la, lb) in a.iter().zip(&b) {
            assert_eq!(la.start.x.to_bits(), lb.start.x.to_bits());
            assert_eq!(la.end.y.to_bits(), lb.end.y.to_bits());
        }
    }

    #[test]
    fn hole_is_not_hatched() {
        let poly = Polygon::new(
            square().exterior().clone(),
            vec![rect_polygon(40.0, 0.0 + 40.0, 60.0, 60.0).exterior().clone()],
        );
        let lines = hatch_polygon(&poly, &HatchSettings::new(10.0, 0.0));
        let through_hole: Vec<&Line> = lines.iter().filter(|l| (l.start.y - 50.0).abs() < 1e-9).collect();
        assert_eq!(through_hole.len(), 2, "the y=50 stroke should be split by the hole");
    }

    #[test]
    fn thin_polygon_gets_few_strokes() {
        let thin = rect_polygon(0.0, 0.0, 100.0, 0.3);
        let lines = hatch_polygon(&thin, &HatchSettings::new(0.5, 0.0));
        assert!(lines.len() <= 1, "got {}", lines.len());
    }

    #[test]
    fn diagonal_spacing_is_respected() {
        let settings = HatchSettings::new(2.0, 45.0);
        let lines = construction_lines(&square().exterior().0, &settings);
        let (_, normal) = settings.axes();
        for pair in lines.windows(2) {
            let gap = dot(pair[1].start, normal) - dot(pair[0].start, normal);
            assert!((gap - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unusable_settings_give_nothing() {
        assert!(hatch_polygon(&square(), &HatchSettings::new(0.0, 45.0)).is_empty());
        assert!(hatch_polygon(&square(), &HatchSettings::new(f64::NAN, 45.0)).is_empty());
    }

    #[test]
    fn microscopic_spacing_is_refused() {
        let settings = HatchSettings::new(1e-9, 0.0);
        assert!(hatch_polygon(&square(), &settings).is_empty());
    }

    #[test]
    fn corridor_hatch_covers_line() {
        let engine = BooleanEngine::default();
        let line = LineString::from(vec![(0.0, 0.0), (20.0, 0.0)]);
        let strokes = hatch_corridor(&line, 1.5, &HatchSettings::new(0.5, 0.0), &engine);
        // Offsets inside a 1.5 wide band: -0.25, 0.25 (edge -0.75 excluded, 0.75 excluded)
        assert_eq!(strokes.len(), 2, "got {}", strokes.len());
    }
}
