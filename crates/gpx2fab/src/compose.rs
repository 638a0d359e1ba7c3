//! Layer composition for the two output devices.
//!
//! Both devices draw from one [`PreparedGeometry`], already in page
//! millimetres and already reconciled by the boolean stage. Each device has
//! its own composition function; neither knows about the other.
//!
//! | device  | order | layer    | content                                   |
//! |---------|-------|----------|-------------------------------------------|
//! | plotter | 1     | borders  | border polylines                          |
//! | plotter | 2     | water    | rivers, lake outlines, lake hatching      |
//! | plotter | 3     | trail    | slit outlines, slit hatching              |
//! | plotter | 4     | text     | caption outlines and hatching (optional)  |
//! | laser   | 1     | Trail    | slit cut                                  |
//! | laser   | 2     | Contour  | page outline cut                          |
//! | laser   | 3     | Stitch   | stitch hole cuts (optional)               |
//! | laser   | 4     | Engrave  | borders + water fill, caption glyphs      |
//!
//! Cut layers come before the engrave layer, and the trail slit is cut
//! before the contour frees the piece from the sheet.

use tracing::debug;

use crate::config::{GenerationConfig, PageSide};
use crate::error::Result;
use crate::geometry::{
    Coord, Geometry, LineString, MultiPolygon, Polygon, Rect, circle_polygon, rect_polygon,
};
use crate::hatch::{HatchSettings, hatch_polygon};
use crate::layer::{Device, LayerModel, LayerModelBuilder, Paint, StyledPath};
use crate::order::{OrderingStrategy, order_strokes};
use crate::prepare::outline_rings;

/// Segments used for stitch hole circles.
const HOLE_SEGMENTS: usize = 48;

/// Every geometry both devices draw from, in page millimetres.
#[derive(Debug, Clone)]
pub struct PreparedGeometry {
    /// Region of interest
    pub region: MultiPolygon,
    /// De-duplicated, merged border lines
    pub borders: Vec<LineString>,
    /// Connected rivers outside lakes
    pub rivers: Vec<LineString>,
    /// Unioned lakes
    pub lakes: Vec<Polygon>,
    /// Track pieces inside the drawable area
    pub trail: Vec<LineString>,
    /// Laser slit around the track
    pub trail_slit: MultiPolygon,
    /// Laser engrave area: buffered borders and water
    pub engrave: MultiPolygon,
    /// Caption glyphs, already placed on the page
    pub caption: Vec<Polygon>,
}

impl PreparedGeometry {
    pub fn has_caption(&self) -> bool {
        !self.caption.is_empty()
    }
}

fn line_path(ls: LineString, paint: &Paint) -> StyledPath {
    StyledPath::new(Geometry::LineString(ls), paint.clone())
}

/// Hatch strokes for a set of polygons as line strings.
pub fn hatch_strokes(polygons: &[Polygon], settings: &HatchSettings, optimize: bool) -> Vec<LineString> {
    let strokes: Vec<LineString> = polygons
        .iter()
        .flat_map(|p| hatch_polygon(p, settings))
        .map(|l| LineString::from(vec![l.start, l.end]))
        .collect();
    let strategy = if optimize { OrderingStrategy::NearestNeighbor } else { OrderingStrategy::Document };
    order_strokes(strokes, strategy)
}

fn hatch_paths(strokes: Vec<LineString>, paint: &Paint, settings: HatchSettings) -> Vec<StyledPath> {
    strokes
        .into_iter()
        .map(|ls| StyledPath::hatched(Geometry::LineString(ls), paint.clone(), settings))
        .collect()
}

// ============================================================================
// PLOTTER
// ============================================================================

/// Compose the pen-plotter layer model.
pub fn compose_plotter(prepared: &PreparedGeometry, config: &GenerationConfig) -> Result<LayerModel> {
    let fab = &config.fabrication;
    let hatch = fab.hatch();
    let mut builder = LayerModelBuilder::new(Device::Plotter);

    // 1: borders
    let border_pen = Paint::Pen { width_mm: fab.border_stroke_mm };
    let borders = prepared.borders.iter().cloned().map(|ls| line_path(ls, &border_pen)).collect();
    builder.add_layer("borders", 1, Device::Plotter, borders)?;

    // 2: water
    let water_pen = Paint::Pen { width_mm: fab.water_stroke_mm };
    let mut water: Vec<StyledPath> = prepared.rivers.iter().cloned().map(|ls| line_path(ls, &water_pen)).collect();
    water.extend(outline_rings(&prepared.lakes).into_iter().map(|ls| line_path(ls, &water_pen)));
    water.extend(hatch_paths(
        hatch_strokes(&prepared.lakes, &hatch, fab.optimize_travel),
        &water_pen,
        hatch,
    ));
    builder.add_layer("water", 2, Device::Plotter, water)?;

    // 3: trail
    let trail_pen = Paint::Pen { width_mm: config.trail.stroke_mm };
    let slit: Vec<Polygon> = prepared.trail_slit.0.clone();
    let mut trail: Vec<StyledPath> = outline_rings(&slit).into_iter().map(|ls| line_path(ls, &trail_pen)).collect();
    trail.extend(hatch_paths(hatch_strokes(&slit, &hatch, fab.optimize_travel), &trail_pen, hatch));
    builder.add_layer("trail", 3, Device::Plotter, trail)?;

    // 4: text
    if prepared.has_caption() {
        let mut text: Vec<StyledPath> = outline_rings(&prepared.caption)
            .into_iter()
            .map(|ls| line_path(ls, &trail_pen))
            .collect();
        if config.caption.hatch {
            let caption_hatch = HatchSettings::new(config.caption.hatch_spacing_mm, fab.hatch_angle_deg);
            text.extend(hatch_paths(
                hatch_strokes(&prepared.caption, &caption_hatch, fab.optimize_travel),
                &trail_pen,
                caption_hatch,
            ));
        }
        builder.add_layer("text", 4, Device::Plotter, text)?;
    }

    let model = builder.finalize();
    debug!(layers = model.layers().len(), paths = model.path_count(), "composed plotter model");
    Ok(model)
}

// ============================================================================
// LASER
// ============================================================================

/// Compose the laser-cutter layer model.
pub fn compose_laser(prepared: &PreparedGeometry, config: &GenerationConfig) -> Result<LayerModel> {
    let fab = &config.fabrication;
    let cut = Paint::Cut { color: fab.laser_cut_color.clone(), hairline_mm: fab.laser_hairline_mm };
    let engrave = Paint::Engrave { color: fab.laser_engrave_color.clone() };
    let mut builder = LayerModelBuilder::new(Device::Laser);

    let polygon_paths = |polygons: &[Polygon], paint: &Paint| -> Vec<StyledPath> {
        polygons
            .iter()
            .map(|p| StyledPath::new(Geometry::Polygon(p.clone()), paint.clone()))
            .collect()
    };

    builder.add_layer("Trail", 1, Device::Laser, polygon_paths(&prepared.trail_slit.0, &cut))?;
    builder.add_layer("Contour", 2, Device::Laser, polygon_paths(&[contour(config)], &cut))?;
    if config.stitch.enabled {
        builder.add_layer("Stitch", 3, Device::Laser, polygon_paths(&stitch_holes(config), &cut))?;
    }

    let mut engraved = polygon_paths(&prepared.engrave.0, &engrave);
    engraved.extend(polygon_paths(&prepared.caption, &engrave));
    builder.add_layer("Engrave", 4, Device::Laser, engraved)?;

    let model = builder.finalize();
    debug!(layers = model.layers().len(), paths = model.path_count(), "composed laser model");
    Ok(model)
}

/// The page outline.
pub fn contour(config: &GenerationConfig) -> Polygon {
    rect_polygon(0.0, 0.0, config.page.width_mm, config.page.height_mm)
}

/// Stitch hole circles along the resolved page edge.
///
/// Holes sit `offset_mm` in from the edge, the first and last
/// `edge_inset_mm` from the corners, evenly spaced between.
pub fn stitch_holes(config: &GenerationConfig) -> Vec<Polygon> {
    let stitch = &config.stitch;
    let (w, h) = (config.page.width_mm, config.page.height_mm);
    let count = stitch.hole_count;
    if count < 2 {
        return Vec::new();
    }
    let radius = stitch.hole_diameter_mm / 2.0;

    let side = config.resolve_stitch_edge();
    let span = match side {
        PageSide::Top | PageSide::Bottom => w,
        PageSide::Left | PageSide::Right => h,
    };
    let start = stitch.edge_inset_mm;
    let step = (span - 2.0 * stitch.edge_inset_mm) / (count - 1) as f64;

    (0..count)
        .map(|i| {
            let along = start + i as f64 * step;
            let center = match side {
                PageSide::Top => Coord { x: along, y: stitch.offset_mm },
                PageSide::Bottom => Coord { x: along, y: h - stitch.offset_mm },
                PageSide::Left => Coord { x: stitch.offset_mm, y: along },
                PageSide::Right => Coord { x: w - stitch.offset_mm, y: along },
            };
            circle_polygon(center, radius, HOLE_SEGMENTS)
        })
        .collect()
}

/// Move caption glyphs so the text ends at `right_x` with its baseline on
/// `baseline_y`.
///
/// Glyphs arrive with the baseline on y = 0, starting at x = 0.
pub fn place_caption(glyphs: &[Polygon], right_x: f64, baseline_y: f64) -> Vec<Polygon> {
    let extent = glyphs
        .iter()
        .flat_map(|p| p.exterior().0.iter())
        .map(|c| c.x)
        .fold(f64::NEG_INFINITY, f64::max);
    if !extent.is_finite() {
        return Vec::new();
    }
    let (dx, dy) = (right_x - extent, baseline_y);
    let shift = |ring: &LineString| -> LineString {
        ring.0.iter().map(|c| Coord { x: c.x + dx, y: c.y + dy }).collect()
    };
    glyphs
        .iter()
        .map(|p| Polygon::new(shift(p.exterior()), p.interiors().iter().map(shift).collect()))
        .collect()
}

/// The drawable rectangle as a geometry.
pub fn rect_geometry(rect: Rect) -> Geometry {
    Geometry::Polygon(rect.to_polygon())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StitchEdge;
    use crate::geometry::bounding_box;

    fn prepared() -> PreparedGeometry {
        PreparedGeometry {
            region: MultiPolygon::new(vec![rect_polygon(20.0, 20.0, 190.0, 128.0)]),
            borders: vec![LineString::from(vec![(20.0, 20.0), (190.0, 20.0)])],
            rivers: vec![LineString::from(vec![(30.0, 30.0), (60.0, 90.0)])],
            lakes: vec![rect_polygon(100.0, 60.0, 110.0, 70.0)],
            trail: vec![LineString::from(vec![(25.0, 100.0), (180.0, 100.0)])],
            trail_slit: MultiPolygon::new(vec![rect_polygon(25.0, 99.25, 180.0, 100.75)]),
            engrave: MultiPolygon::new(vec![rect_polygon(19.5, 19.5, 190.5, 20.5)]),
            caption: Vec::new(),
        }
    }

    #[test]
    fn plotter_has_three_layers_without_caption() {
        let model = compose_plotter(&prepared(), &GenerationConfig::default()).unwrap();
        let names: Vec<String> = model.layers().iter().map(|l| l.display_name()).collect();
        assert_eq!(names, vec!["1-borders", "2-water", "3-trail"]);
        for layer in model.layers() {
            assert!(!layer.is_empty(), "{} should have paths", layer.name());
        }
    }

    #[test]
    fn plotter_text_layer_with_caption() {
        let mut p = prepared();
        p.caption = vec![rect_polygon(150.0, 135.0, 190.0, 139.0)];
        let model = compose_plotter(&p, &GenerationConfig::default()).unwrap();
        let text = model.layer(4).expect("text layer");
        assert_eq!(text.name(), "text");
        assert!(text.paths().iter().any(|s| s.hatch.is_some()), "caption is hatched by default");
    }

    #[test]
    fn hatching_uses_configured_spacing() {
        let model = compose_plotter(&prepared(), &GenerationConfig::default()).unwrap();
        let water = model.layer(2).unwrap();
        let hatched = water.paths().iter().filter(|s| s.hatch.is_some()).count();
        // 10x10 lake hatched at 45 degrees spans 10 * sqrt(2) across the normal
        assert!(hatched > 20 && hatched < 32, "got {hatched}");
    }

    #[test]
    fn laser_layer_order() {
        let model = compose_laser(&prepared(), &GenerationConfig::default()).unwrap();
        let names: Vec<String> = model.layers().iter().map(|l| l.display_name()).collect();
        assert_eq!(names, vec!["1-Trail", "2-Contour", "3-Stitch", "4-Engrave"]);
        assert!(model.layers()[..3].iter().all(|l| l.paths().iter().all(|p| matches!(p.paint, Paint::Cut { .. }))));
    }

    #[test]
    fn laser_without_stitch() {
        let mut config = GenerationConfig::default();
        config.stitch.enabled = false;
        let model = compose_laser(&prepared(), &config).unwrap();
        assert!(model.layer(3).is_none());
    }

    #[test]
    fn stitch_holes_along_top_edge() {
        let config = GenerationConfig::default();
        let holes = stitch_holes(&config);
        assert_eq!(holes.len(), 5);
        let centers: Vec<f64> = holes
            .iter()
            .filter_map(|h| bounding_box(&Geometry::Polygon(h.clone())))
            .map(|b| b.center().x)
            .collect();
        assert!((centers[0] - 10.0).abs() < 1e-9);
        assert!((centers[4] - 200.0).abs() < 1e-9);
        assert!((centers[1] - 57.5).abs() < 1e-9);
    }

    #[test]
    fn stitch_holes_along_left_edge() {
        let mut config = GenerationConfig::default();
        config.stitch.edge = StitchEdge::Short;
        let holes = stitch_holes(&config);
        let first = bounding_box(&Geometry::Polygon(holes[0].clone())).unwrap().center();
        assert!((first.x - 10.0).abs() < 1e-9 && (first.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn caption_is_right_aligned() {
        let glyphs = vec![rect_polygon(0.0, -3.0, 2.0, 0.0), rect_polygon(3.0, -3.0, 5.0, 0.0)];
        let placed = place_caption(&glyphs, 195.0, 139.0);
        let right = placed.iter().flat_map(|p| p.exterior().0.iter()).map(|c| c.x).fold(f64::MIN, f64::max);
        let bottom = placed.iter().flat_map(|p| p.exterior().0.iter()).map(|c| c.y).fold(f64::MIN, f64::max);
        assert!((right - 195.0).abs() < 1e-12);
        assert!((bottom - 139.0).abs() < 1e-12);
        assert!(place_caption(&[], 195.0, 139.0).is_empty());
    }
}
