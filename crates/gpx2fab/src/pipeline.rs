//! One generation run, from raw inputs to finalized layer models.
//!
//! ```text
//! region lookup -> transformer -> [borders | water | trail] -> booleans -> compose
//! ```
//!
//! The three preparation stages only share the immutable transformer and the
//! geometry source, so they run in parallel. Everything that mixes layers
//! (the engrave union, the trail slit) happens after they join.

use std::time::Instant;

use tracing::{debug, info};

use crate::boolean::BooleanEngine;
use crate::chain::dedup_segments;
use crate::compose::{PreparedGeometry, compose_laser, compose_plotter, hatch_strokes, place_caption, rect_geometry};
use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::geometry::{
    Coord, Geometry, LineString, MultiLineString, MultiPolygon, Polygon, Rect,
    bounding_box, collect_line_strings, collect_polygons, is_empty,
};
use crate::layer::LayerModel;
use crate::prepare::{clip_lines, filter_connected, longest_line, merge_lines, outline_rings, simplify};
use crate::source::{Feature, GeometrySource};
use crate::text::TextOutliner;
use crate::transform::{CoordTransformer, WebMercator};

/// Everything a run produces.
#[derive(Debug)]
pub struct GenerationOutput {
    pub prepared: PreparedGeometry,
    /// `None` when plotter output is switched off
    pub plotter: Option<LayerModel>,
    /// `None` when laser output is switched off
    pub laser: Option<LayerModel>,
}

/// Run the whole pipeline for one track.
///
/// Any error aborts the run; no model is returned for a partial run. A
/// track that misses the page is not an error, its layers are just empty.
pub fn generate(
    config: &GenerationConfig,
    track: &LineString,
    source: &dyn GeometrySource,
    outliner: &dyn TextOutliner,
) -> Result<GenerationOutput> {
    let start = Instant::now();
    config.validate()?;
    let engine = BooleanEngine::new(config.tolerance.boolean_mm);

    let region = find_region(config, source)?;
    let region_bbox = bounding_box(&Geometry::MultiPolygon(region.clone()))
        .ok_or_else(|| Error::RegionNotFound(config.region.clone()))?;

    let drawable = config.drawable_rect();
    let transformer =
        CoordTransformer::new(region_bbox, drawable, Box::new(WebMercator), config.page.fit_inset)?;
    info!(
        region = %config.region,
        scale = transformer.scale(),
        "fitted region onto {:.0}x{:.0} mm drawable area",
        drawable.width(),
        drawable.height()
    );

    let region_page = engine.areal(&transformer.project(&Geometry::MultiPolygon(region.clone())));
    let ctx = StageContext {
        config,
        source,
        transformer: &transformer,
        engine: &engine,
        drawable: rect_geometry(drawable),
        region: &region,
        region_page: &region_page,
    };

    // ## Rust Lesson #26: rayon::join
    //
    // `join` runs both closures, possibly on two threads, and returns both
    // results. Nesting it gives three-way parallelism without a thread pool
    // handle. The closures only borrow, so nothing needs to be cloned.
    let (borders, (water, trail)) = rayon::join(
        || prepare_borders(&ctx),
        || rayon::join(|| prepare_water(&ctx), || prepare_trail(&ctx, track)),
    );
    let mut borders = borders?;
    let (mut rivers, mut lakes) = water?;
    let mut trail = trail;

    let tol = config.tolerance.simplify_mm;
    if tol > 0.0 {
        borders = simplify_lines(&borders, tol);
        rivers = simplify_lines(&rivers, tol);
        trail = simplify_lines(&trail, tol);
        lakes = collect_polygons(&simplify(&Geometry::MultiPolygon(MultiPolygon::new(lakes)), tol));
    }
    info!(
        borders = borders.len(),
        rivers = rivers.len(),
        lakes = lakes.len(),
        trail = trail.len(),
        "prepared geometry"
    );

    let engrave = engrave_area(&ctx, &borders, &rivers, &lakes);
    let trail_slit = trail_slit(&ctx, &trail, &lakes, &engrave);
    let caption = caption_glyphs(config, outliner)?;

    let prepared = PreparedGeometry {
        region: region_page,
        borders,
        rivers,
        lakes,
        trail,
        trail_slit,
        engrave,
        caption,
    };

    let plotter = if config.output_plotter { Some(compose_plotter(&prepared, config)?) } else { None };
    let laser = if config.output_laser { Some(compose_laser(&prepared, config)?) } else { None };

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "generation complete");
    Ok(GenerationOutput { prepared, plotter, laser })
}

/// Shared, read-only inputs of the preparation stages.
struct StageContext<'a> {
    config: &'a GenerationConfig,
    source: &'a dyn GeometrySource,
    transformer: &'a CoordTransformer,
    engine: &'a BooleanEngine,
    /// Drawable rectangle in page millimetres
    drawable: Geometry,
    /// Region polygons in WGS84 degrees
    region: &'a MultiPolygon,
    /// Region polygons in page millimetres
    region_page: &'a MultiPolygon,
}

fn world() -> Rect {
    Rect::new(Coord { x: -180.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 })
}

/// Polygons of the feature named `config.region`.
fn find_region(config: &GenerationConfig, source: &dyn GeometrySource) -> Result<MultiPolygon> {
    let features = source.fetch_features(&config.region_dataset, &world())?;
    let polygons: Vec<Polygon> = features
        .iter()
        .filter(|f| f.is_named(&config.region, &config.name_keys))
        .flat_map(|f| collect_polygons(&f.geometry))
        .collect();
    if polygons.is_empty() {
        return Err(Error::RegionNotFound(config.region.clone()));
    }
    debug!(region = %config.region, polygons = polygons.len(), "found region");
    Ok(MultiPolygon::new(polygons))
}

fn feature_name(feature: &Feature, keys: &[String]) -> String {
    keys.iter()
        .find_map(|k| feature.attributes.get(k))
        .cloned()
        .unwrap_or_default()
}

fn exterior_rings(polygons: &[Polygon]) -> Vec<LineString> {
    polygons.iter().map(|p| p.exterior().clone()).collect()
}

fn simplify_lines(lines: &[LineString], tolerance: f64) -> Vec<LineString> {
    collect_line_strings(&simplify(
        &Geometry::MultiLineString(MultiLineString::new(lines.to_vec())),
        tolerance,
    ))
}

// ============================================================================
// PREPARATION STAGES
// ============================================================================

/// Region outline plus the nearest stretch of every neighbour's border.
fn prepare_borders(ctx: &StageContext) -> Result<Vec<LineString>> {
    let config = ctx.config;
    let tol = ctx.engine.tolerance();
    let region_lines = clip_lines(&exterior_rings(&ctx.region_page.0), &ctx.drawable, ctx.engine);

    let margin = config.borders.search_margin_deg;
    let bbox = bounding_box(&Geometry::MultiPolygon(ctx.region.clone())).unwrap_or_else(world);
    let search = Rect::new(
        Coord { x: bbox.min().x - margin, y: bbox.min().y - margin },
        Coord { x: bbox.max().x + margin, y: bbox.max().y + margin },
    );

    let mut neighbours: Vec<Feature> = ctx
        .source
        .fetch_features(&config.borders.dataset, &search)?
        .into_iter()
        .filter(|f| !f.is_named(&config.region, &config.name_keys))
        .collect();
    neighbours.sort_by_cached_key(|f| feature_name(f, &config.name_keys));

    let mut pieces = region_lines.clone();
    for neighbour in &neighbours {
        let rings: Vec<LineString> = collect_polygons(&neighbour.geometry)
            .iter()
            .map(|p| ctx.transformer.project_polygon(p).exterior().clone())
            .collect();
        let clipped = merge_lines(&clip_lines(&rings, &ctx.drawable, ctx.engine), tol);
        if let Some(longest) = longest_line(&clipped) {
            pieces.push(longest.clone());
        }
    }

    let merged = merge_lines(&dedup_segments(&pieces, tol), tol);
    let anchor = Geometry::MultiLineString(MultiLineString::new(region_lines));
    let borders = filter_connected(&merged, &anchor, config.tolerance.connect_mm);
    debug!(neighbours = neighbours.len(), lines = borders.len(), "prepared borders");
    Ok(borders)
}

/// Rivers and lakes on the drawable area, minus rivers that lead nowhere.
fn prepare_water(ctx: &StageContext) -> Result<(Vec<LineString>, Vec<Polygon>)> {
    let config = ctx.config;
    let engine = ctx.engine;
    let bounds = ctx.transformer.geographic_bounds(config.drawable_rect());

    let mut raw_rivers: Vec<LineString> = Vec::new();
    for dataset in &config.water.river_datasets {
        for feature in ctx.source.fetch_features(dataset, &bounds)? {
            raw_rivers.extend(collect_line_strings(&ctx.transformer.project(&feature.geometry)));
        }
    }
    let mut raw_lakes: Vec<Polygon> = Vec::new();
    for dataset in &config.water.lake_datasets {
        for feature in ctx.source.fetch_features(dataset, &bounds)? {
            raw_lakes.extend(collect_polygons(&ctx.transformer.project(&feature.geometry)));
        }
    }

    let lakes_on_page = engine.intersection(
        &Geometry::MultiPolygon(MultiPolygon::new(raw_lakes)),
        &ctx.drawable,
    );
    let lakes = engine.union(collect_polygons(&lakes_on_page).iter()).0;

    let rivers = merge_lines(&clip_lines(&raw_rivers, &ctx.drawable, engine), engine.tolerance());
    let rivers = if lakes.is_empty() || rivers.is_empty() {
        rivers
    } else {
        collect_line_strings(&engine.difference(
            &Geometry::MultiLineString(MultiLineString::new(rivers)),
            &Geometry::MultiPolygon(MultiPolygon::new(lakes.clone())),
        ))
    };

    let region = Geometry::MultiPolygon(ctx.region_page.clone());
    let mut anchor: Vec<Polygon> = ctx.region_page.0.clone();
    anchor.extend(
        lakes
            .iter()
            .filter(|lake| !is_empty(&engine.intersection(&Geometry::Polygon((*lake).clone()), &region)))
            .cloned(),
    );
    let rivers = filter_connected(
        &rivers,
        &Geometry::MultiPolygon(MultiPolygon::new(anchor)),
        config.tolerance.connect_mm,
    );
    debug!(rivers = rivers.len(), lakes = lakes.len(), "prepared water");
    Ok((rivers, lakes))
}

/// The track in page space, cut to the drawable area.
fn prepare_trail(ctx: &StageContext, track: &LineString) -> Vec<LineString> {
    let projected = collect_line_strings(&ctx.transformer.project(&Geometry::LineString(track.clone())));
    let trail = clip_lines(&projected, &ctx.drawable, ctx.engine);
    if trail.is_empty() {
        info!("track does not cross the drawable area; trail layers will be empty");
    }
    trail
}

// ============================================================================
// CROSS-LAYER BOOLEANS
// ============================================================================

/// Buffered borders and water, clipped to the drawable area.
fn engrave_area(ctx: &StageContext, borders: &[LineString], rivers: &[LineString], lakes: &[Polygon]) -> MultiPolygon {
    let engine = ctx.engine;
    let fab = &ctx.config.fabrication;

    let border_lines = Geometry::MultiLineString(MultiLineString::new(borders.to_vec()));
    let border_band = engine.buffer(&border_lines, fab.laser_border_width_mm);

    let mut water_lines: Vec<LineString> = rivers.to_vec();
    water_lines.extend(outline_rings(lakes));
    water_lines.extend(hatch_strokes(lakes, &fab.hatch(), false));
    let water_band = engine.buffer(
        &Geometry::MultiLineString(MultiLineString::new(water_lines)),
        2.0 * fab.river_buffer_mm,
    );

    let combined = engine.union(border_band.iter().chain(water_band.iter()));
    engine.areal(&engine.intersection(&Geometry::MultiPolygon(combined), &ctx.drawable))
}

/// Laser slit along the trail.
///
/// The slit stays half a border width inside the region and never touches
/// a lake or any engraved area.
fn trail_slit(ctx: &StageContext, trail: &[LineString], lakes: &[Polygon], engrave: &MultiPolygon) -> MultiPolygon {
    if trail.is_empty() {
        return MultiPolygon::new(Vec::new());
    }
    let engine = ctx.engine;
    let config = ctx.config;

    let corridor = engine.buffer(
        &Geometry::MultiLineString(MultiLineString::new(trail.to_vec())),
        config.trail_cut_width_mm(),
    );
    let inner_region = engine.offset_polygons(&ctx.region_page.0, -config.fabrication.laser_border_width_mm / 2.0);
    let keep_out = engine.union(lakes.iter().chain(engrave.iter()));

    let slit = engine.intersection(&Geometry::MultiPolygon(corridor), &ctx.drawable);
    let slit = engine.intersection(&slit, &Geometry::MultiPolygon(inner_region));
    let slit = engine.difference(&slit, &Geometry::MultiPolygon(keep_out));
    engine.areal(&slit)
}

/// Title and subtitle glyphs placed on the page.
fn caption_glyphs(config: &GenerationConfig, outliner: &dyn TextOutliner) -> Result<Vec<Polygon>> {
    let caption = &config.caption;
    if caption.is_empty() {
        return Ok(Vec::new());
    }
    let right = config.drawable_rect().max().x;
    let lines = [
        (&caption.title, caption.title_size_mm, caption.title_y_mm),
        (&caption.subtitle, caption.subtitle_size_mm, caption.subtitle_y_mm),
    ];

    let mut glyphs = Vec::new();
    for (text, size, baseline) in lines {
        if text.trim().is_empty() {
            continue;
        }
        let outline = outliner.outline(text, &caption.font, size)?;
        glyphs.extend(place_caption(&outline, right, baseline));
    }
    debug!(glyphs = glyphs.len(), "outlined caption");
    Ok(glyphs)
}

// ============================================================================
// TESTS
// ============================================================================
