//! Text to outline conversion.
//!
//! Captions reach the layer model as ordinary polygons. The
//! [`TextOutliner`] trait is the seam: the pipeline asks for outlines of a
//! string in a font at a size and gets closed shapes back, glyph holes
//! included.
//!
//! [`SvgTextOutliner`] lays text out through usvg (which shapes it with the
//! system fonts) and converts the resulting glyph paths to polygons.
//!
//! ## Curve Flattening
//!
//! Glyph outlines are quadratic and cubic Béziers. They are "flattened"
//! into line segments with lyon_geom before anything else sees them.

use std::path::Path;
use std::sync::Arc;

use lyon_geom::{CubicBezierSegment, QuadraticBezierSegment, point};
use usvg::tiny_skia_path::PathSegment;

use crate::clip::point_in_ring;
use crate::error::{Error, Result};
use crate::geometry::{Coord, LineString, Polygon, polygon_area};

/// Converts a string into glyph outlines.
pub trait TextOutliner: Send + Sync {
    /// Outline `text` in `font` with an em size of `size_mm`.
    ///
    /// The baseline lies on y = 0 with the text starting at x = 0; y grows
    /// downward, so glyphs sit at negative y.
    fn outline(&self, text: &str, font: &str, size_mm: f64) -> Result<Vec<Polygon>>;
}

/// Tolerance for curve flattening, in millimetres.
const CURVE_TOLERANCE: f32 = 0.01;

/// Where the baseline sits inside the scratch SVG document.
const SCRATCH_BASELINE: f64 = 500.0;

/// Text outliner backed by usvg text layout.
#[derive(Clone)]
pub struct SvgTextOutliner {
    fontdb: Arc<usvg::fontdb::Database>,
}

impl std::fmt::Debug for SvgTextOutliner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgTextOutliner").field("fonts", &self.fontdb.len()).finish()
    }
}

impl Default for SvgTextOutliner {
    /// An outliner with no fonts; any non-blank text fails to outline.
    fn default() -> Self {
        Self { fontdb: Arc::new(usvg::fontdb::Database::new()) }
    }
}

impl SvgTextOutliner {
    /// Outliner using the fonts installed on this system.
    pub fn with_system_fonts() -> Self {
        let mut db = usvg::fontdb::Database::new();
        db.load_system_fonts();
        Self { fontdb: Arc::new(db) }
    }

    /// Outliner using a single font file, independent of the system.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut db = usvg::fontdb::Database::new();
        db.load_font_file(path.as_ref())?;
        Ok(Self { fontdb: Arc::new(db) })
    }

    pub fn font_count(&self) -> usize {
        self.fontdb.len()
    }

    fn parse(&self, svg: &str) -> Result<usvg::Tree> {
        let mut options = usvg::Options::default();
        options.fontdb = Arc::clone(&self.fontdb);
        usvg::Tree::from_str(svg, &options).map_err(|e| Error::Text(e.to_string()))
    }
}

impl TextOutliner for SvgTextOutliner {
    fn outline(&self, text: &str, font: &str, size_mm: f64) -> Result<Vec<Polygon>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="1000" height="1000" viewBox="0 0 1000 1000"><text x="0" y="{SCRATCH_BASELINE}" font-family="{}" font-size="{size_mm}">{}</text></svg>"#,
            quick_xml::escape::escape(font),
            quick_xml::escape::escape(text),
        );
        let tree = self.parse(&svg)?;

        let mut rings = Vec::new();
        collect_rings(tree.root(), &mut rings);
        let polygons: Vec<Polygon> = rings_to_polygons(rings)
            .into_iter()
            .map(|p| shift(&p, 0.0, -SCRATCH_BASELINE))
            .collect();

        if polygons.is_empty() {
            return Err(Error::Text(format!("no glyph outlines for {text:?} in font {font:?}")));
        }
        Ok(polygons)
    }
}

/// Polygons of every filled shape in an SVG document, in document order.
pub fn svg_polygons(outliner: &SvgTextOutliner, svg: &str) -> Result<Vec<Polygon>> {
    let tree = outliner.parse(svg)?;
    let mut rings = Vec::new();
    collect_rings(tree.root(), &mut rings);
    Ok(rings_to_polygons(rings))
}

fn shift(polygon: &Polygon, dx: f64, dy: f64) -> Polygon {
    let move_ring = |ring: &LineString| -> LineString {
        ring.0.iter().map(|c| Coord { x: c.x + dx, y: c.y + dy }).collect()
    };
    Polygon::new(
        move_ring(polygon.exterior()),
        polygon.interiors().iter().map(move_ring).collect(),
    )
}

// ============================================================================
// TREE WALK
// ============================================================================

/// Recursively collect closed rings from a usvg Group.
fn collect_rings(group: &usvg::Group, rings: &mut Vec<Vec<Coord>>) {
    // ## Rust Lesson #22: Pattern Matching on Enums with Data
    //
    // usvg::Node is an enum with variants that carry different data.
    // Text nodes carry a `flattened` group holding the glyphs as paths.
    for node in group.children() {
        match node {
            usvg::Node::Group(g) => collect_rings(g, rings),
            usvg::Node::Path(path) => path_rings(path, rings),
            usvg::Node::Text(text) => collect_rings(text.flattened(), rings),
            usvg::Node::Image(_) => {}
        }
    }
}

/// Flatten one usvg path into rings in absolute coordinates.
fn path_rings(path: &usvg::Path, rings: &mut Vec<Vec<Coord>>) {
    let ts = path.abs_transform();
    let apply = |x: f32, y: f32| Coord {
        x: f64::from(ts.sx * x + ts.kx * y + ts.tx),
        y: f64::from(ts.ky * x + ts.sy * y + ts.ty),
    };

    let mut current: Vec<Coord> = Vec::new();
    let mut last = point(0.0_f32, 0.0_f32);

    let finish = |ring: &mut Vec<Coord>, rings: &mut Vec<Vec<Coord>>| {
        ring.dedup_by(|a, b| (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9);
        if ring.len() >= 3 {
            rings.push(std::mem::take(ring));
        } else {
            ring.clear();
        }
    };

    for segment in path.data().segments() {
        match segment {
            PathSegment::MoveTo(p) => {
                finish(&mut current, rings);
                current.push(apply(p.x, p.y));
                last = point(p.x, p.y);
            }
            PathSegment::LineTo(p) => {
                current.push(apply(p.x, p.y));
                last = point(p.x, p.y);
            }
            PathSegment::QuadTo(ctrl, p) => {
                let curve = QuadraticBezierSegment {
                    from: last,
                    ctrl: point(ctrl.x, ctrl.y),
                    to: point(p.x, p.y),
                };
                curve.for_each_flattened(CURVE_TOLERANCE, &mut |seg| {
                    current.push(apply(seg.to.x, seg.to.y));
                });
                last = point(p.x, p.y);
            }
            PathSegment::CubicTo(ctrl1, ctrl2, p) => {
                let curve = CubicBezierSegment {
                    from: last,
                    ctrl1: point(ctrl1.x, ctrl1.y),
                    ctrl2: point(ctrl2.x, ctrl2.y),
                    to: point(p.x, p.y),
                };
                curve.for_each_flattened(CURVE_TOLERANCE, &mut |seg| {
                    current.push(apply(seg.to.x, seg.to.y));
                });
                last = point(p.x, p.y);
            }
            PathSegment::Close => {
                finish(&mut current, rings);
            }
        }
    }
    finish(&mut current, rings);
}

// ============================================================================
// RING NESTING
// ============================================================================

/// Assemble rings into polygons by containment depth.
///
/// A ring inside an even number of other rings is an exterior; a ring at
/// odd depth is a hole of the smallest exterior that contains it. This is
/// the even-odd reading of a glyph, so "O", "B" and "8" come out with their
/// counters as holes regardless of the font's winding convention.
pub fn rings_to_polygons(rings: Vec<Vec<Coord>>) -> Vec<Polygon> {
    let areas: Vec<f64> = rings
        .iter()
        .map(|r| polygon_area(&Polygon::new(LineString::from(r.clone()), vec![])))
        .collect();
    let contains = |outer: usize, inner: usize| -> bool {
        outer != inner
            && areas[outer] > areas[inner]
            && point_in_ring(rings[inner][0].x, rings[inner][0].y, &rings[outer])
    };

    let depth: Vec<usize> = (0..rings.len())
        .map(|i| (0..rings.len()).filter(|&j| contains(j, i)).count())
        .collect();

    let mut exteriors: Vec<usize> = (0..rings.len()).filter(|&i| depth[i] % 2 == 0).collect();
    exteriors.sort_by(|&a, &b| {
        let ra = &rings[a][0];
        let rb = &rings[b][0];
        ra.x.total_cmp(&rb.x).then(ra.y.total_cmp(&rb.y)).then(a.cmp(&b))
    });
    let mut holes: Vec<Vec<usize>> = vec![Vec::new(); rings.len()];

    for i in (0..rings.len()).filter(|&i| depth[i] % 2 == 1) {
        let parent = exteriors
            .iter()
            .copied()
            .filter(|&e| depth[e] + 1 == depth[i] && contains(e, i))
            .min_by(|&a, &b| areas[a].total_cmp(&areas[b]));
        if let Some(parent) = parent {
            holes[parent].push(i);
        }
    }

    let close = |ring: &[Coord]| -> LineString {
        let mut coords = ring.to_vec();
        if coords.first() != coords.last() {
            if let Some(&first) = coords.first() {
                coords.push(first);
            }
        }
        LineString::from(coords)
    };

    exteriors
        .iter()
        .map(|&e| Polygon::new(close(&rings[e]), holes[e].iter().map(|&h| close(&rings[h])).collect()))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_outliner() -> SvgTextOutliner {
        SvgTextOutliner::default()
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord> {
        vec![
            Coord { x, y },
            Coord { x: x + size, y },
            Coord { x: x + size, y: y + size },
            Coord { x, y: y + size },
        ]
    }

    #[test]
    fn nested_rings_become_holes() {
        // An "O" and a separate dot
        let rings = vec![square(0.0, 0.0, 10.0), square(3.0, 3.0, 4.0), square(20.0, 0.0, 2.0)];
        let polygons = rings_to_polygons(rings);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons[0].interiors().len(), 1, "the counter of the O is a hole");
        assert!(polygons[1].interiors().is_empty());
    }

    #[test]
    fn island_in_hole_is_exterior() {
        let rings = vec![square(0.0, 0.0, 10.0), square(2.0, 2.0, 6.0), square(4.0, 4.0, 2.0)];
        let polygons = rings_to_polygons(rings);
        assert_eq!(polygons.len(), 2);
        assert_eq!(polygons.iter().map(|p| p.interiors().len()).sum::<usize>(), 1);
    }

    #[test]
    fn svg_path_with_hole() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
            <path fill-rule="evenodd" d="M 10,10 L 90,10 L 90,90 L 10,90 Z M 40,40 L 60,40 L 60,60 L 40,60 Z"/>
        </svg>"#;
        let polygons = svg_polygons(&empty_outliner(), svg).unwrap();
        assert_eq!(polygons.len(), 1);
        assert_eq!(polygons[0].interiors().len(), 1);
    }

    #[test]
    fn curves_are_flattened() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
            <circle cx="50" cy="50" r="40"/>
        </svg>"#;
        let polygons = svg_polygons(&empty_outliner(), svg).unwrap();
        assert_eq!(polygons.len(), 1);
        assert!(polygons[0].exterior().0.len() > 20,
            "Circle should have many points from curve flattening, got {}",
            polygons[0].exterior().0.len());
    }

    #[test]
    fn blank_text_has_no_outline() {
        assert!(empty_outliner().outline("  ", "Helvetica", 5.0).unwrap().is_empty());
    }

    #[test]
    fn text_without_fonts_is_an_error() {
        let result = empty_outliner().outline("Kéktúra", "No Such Font", 5.0);
        assert!(matches!(result, Err(Error::Text(_))));
    }
}
