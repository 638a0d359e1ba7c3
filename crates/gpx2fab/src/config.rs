//! Generation configuration.
//!
//! Configs are YAML files; every field has a default, so an empty file (or
//! no file at all) describes the reference A5 landscape design.
//!
//! ```yaml
//! region: Hungary
//! page:
//!   width_mm: 210
//!   height_mm: 148
//! caption:
//!   title: Országos Kéktúra
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry::Rect;
use crate::hatch::HatchSettings;

/// Reference design the auto-scaled values are calibrated on.
const REF_WIDTH_MM: f64 = 210.0;
const REF_HEIGHT_MM: f64 = 148.0;
const REF_CUT_WIDTH_MM: f64 = 1.5;

/// Finest hatch spacing accepted; far below any pen width.
pub const MIN_HATCH_SPACING_MM: f64 = 0.01;

/// Complete configuration of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Name of the region of interest, matched against `name_keys`
    pub region: String,
    /// Dataset the region is looked up in
    pub region_dataset: String,
    /// Attribute keys tried, in order, when matching the region name
    pub name_keys: Vec<String>,
    pub page: PageConfig,
    pub trail: TrailConfig,
    pub fabrication: FabricationConfig,
    pub water: WaterConfig,
    pub borders: BordersConfig,
    pub stitch: StitchConfig,
    pub caption: CaptionConfig,
    pub tolerance: ToleranceConfig,
    pub output_plotter: bool,
    pub output_laser: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            region: "Hungary".to_string(),
            region_dataset: "countries".to_string(),
            name_keys: vec!["NAME".to_string(), "ADMIN".to_string()],
            page: PageConfig::default(),
            trail: TrailConfig::default(),
            fabrication: FabricationConfig::default(),
            water: WaterConfig::default(),
            borders: BordersConfig::default(),
            stitch: StitchConfig::default(),
            caption: CaptionConfig::default(),
            tolerance: ToleranceConfig::default(),
            output_plotter: true,
            output_laser: true,
        }
    }
}

/// Page size and margins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub width_mm: f64,
    pub height_mm: f64,
    pub padding_mm: f64,
    /// Multiplier on the fitted scale, leaving room for neighbour borders
    pub fit_inset: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self { width_mm: REF_WIDTH_MM, height_mm: REF_HEIGHT_MM, padding_mm: 15.0, fit_inset: 0.92 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailConfig {
    /// Laser slit width; `None` scales the reference width with the page
    pub cut_width_mm: Option<f64>,
    /// Plotter pen for the trail layer
    pub stroke_mm: f64,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self { cut_width_mm: None, stroke_mm: 0.1 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FabricationConfig {
    pub border_stroke_mm: f64,
    pub water_stroke_mm: f64,
    /// Width rivers and lake outlines are buffered to on the engrave layer
    pub river_buffer_mm: f64,
    pub hatch_spacing_mm: f64,
    pub hatch_angle_deg: f64,
    pub laser_border_width_mm: f64,
    pub laser_hairline_mm: f64,
    pub laser_cut_color: String,
    pub laser_engrave_color: String,
    /// Re-order hatch strokes to cut pen travel
    pub optimize_travel: bool,
}

impl Default for FabricationConfig {
    fn default() -> Self {
        Self {
            border_stroke_mm: 1.0,
            water_stroke_mm: 0.1,
            river_buffer_mm: 0.15,
            hatch_spacing_mm: 0.5,
            hatch_angle_deg: 45.0,
            laser_border_width_mm: 1.0,
            laser_hairline_mm: 0.01,
            laser_cut_color: "#FF0000".to_string(),
            laser_engrave_color: "#000000".to_string(),
            optimize_travel: true,
        }
    }
}

impl FabricationConfig {
    pub fn hatch(&self) -> HatchSettings {
        HatchSettings::new(self.hatch_spacing_mm, self.hatch_angle_deg)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterConfig {
    pub river_datasets: Vec<String>,
    pub lake_datasets: Vec<String>,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            river_datasets: vec![
                "ne_10m_rivers_lake_centerlines".to_string(),
                "ne_10m_rivers_europe".to_string(),
            ],
            lake_datasets: vec!["ne_10m_lakes".to_string(), "ne_10m_lakes_europe".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BordersConfig {
    pub dataset: String,
    /// Degrees the region box is grown by when searching for neighbours
    pub search_margin_deg: f64,
}

impl Default for BordersConfig {
    fn default() -> Self {
        Self { dataset: "countries".to_string(), search_margin_deg: 1.0 }
    }
}

/// Edge the stitch holes run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StitchEdge {
    #[default]
    Long,
    Short,
    Top,
    Bottom,
    Left,
    Right,
}

/// A concrete page side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSide {
    Top,
    Bottom,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    pub enabled: bool,
    pub edge: StitchEdge,
    pub hole_diameter_mm: f64,
    pub hole_count: usize,
    /// Distance from the page edge to the hole centres
    pub offset_mm: f64,
    /// Distance from the page corners to the first and last hole
    pub edge_inset_mm: f64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            edge: StitchEdge::Long,
            hole_diameter_mm: 1.0,
            hole_count: 5,
            offset_mm: 10.0,
            edge_inset_mm: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionConfig {
    pub title: String,
    pub subtitle: String,
    pub font: String,
    pub title_size_mm: f64,
    pub subtitle_size_mm: f64,
    /// Baselines, measured from the top of the page
    pub title_y_mm: f64,
    pub subtitle_y_mm: f64,
    /// Hatch glyph interiors on the plotter
    pub hatch: bool,
    pub hatch_spacing_mm: f64,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            subtitle: String::new(),
            font: "Helvetica Neue".to_string(),
            title_size_mm: 5.0,
            subtitle_size_mm: 3.5,
            title_y_mm: 139.0,
            subtitle_y_mm: 143.5,
            hatch: true,
            hatch_spacing_mm: 0.3,
        }
    }
}

impl CaptionConfig {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.subtitle.is_empty()
    }
}

/// Numeric tolerances, in page millimetres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Snapping grid and sliver threshold of boolean operations
    pub boolean_mm: f64,
    /// Gap still counted as connected by the orphan filter
    pub connect_mm: f64,
    /// Vertex simplification; 0 turns it off
    pub simplify_mm: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self { boolean_mm: 0.001, connect_mm: 0.15, simplify_mm: 0.0 }
    }
}

impl GenerationConfig {
    /// Load a config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document is null, which serde_yaml will not default
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject values no page could be built from.
    pub fn validate(&self) -> Result<()> {
        let page = &self.page;
        if !(page.width_mm > 0.0 && page.height_mm > 0.0) {
            return Err(Error::Config(format!(
                "page must have a positive size, got {} x {}",
                page.width_mm, page.height_mm
            )));
        }
        if page.padding_mm < 0.0 || 2.0 * page.padding_mm >= page.width_mm.min(page.height_mm) {
            return Err(Error::Config(format!("padding {} leaves no drawable area", page.padding_mm)));
        }
        if !(page.fit_inset > 0.0 && page.fit_inset <= 1.0) {
            return Err(Error::Config(format!("fit_inset must be in (0, 1], got {}", page.fit_inset)));
        }
        let spacing_ok = |s: f64| s >= MIN_HATCH_SPACING_MM;
        if !spacing_ok(self.fabrication.hatch_spacing_mm)
            || (self.caption.hatch && !spacing_ok(self.caption.hatch_spacing_mm))
        {
            return Err(Error::Config(format!("hatch spacing must be at least {MIN_HATCH_SPACING_MM} mm")));
        }
        let tol = &self.tolerance;
        if !(tol.boolean_mm > 0.0) {
            return Err(Error::Config(format!("boolean tolerance must be positive, got {}", tol.boolean_mm)));
        }
        if tol.connect_mm < 0.0 || tol.simplify_mm < 0.0 {
            return Err(Error::Config("tolerances cannot be negative".to_string()));
        }
        if self.trail_cut_width_mm() <= 0.0 {
            return Err(Error::Config("trail cut width must be positive".to_string()));
        }
        if self.stitch.enabled && self.stitch.hole_count < 2 {
            return Err(Error::Config(format!(
                "a stitch row needs at least 2 holes, got {}",
                self.stitch.hole_count
            )));
        }
        Ok(())
    }

    /// Page size relative to the reference design, by diagonal.
    pub fn page_scale(&self) -> f64 {
        self.page.width_mm.hypot(self.page.height_mm) / REF_WIDTH_MM.hypot(REF_HEIGHT_MM)
    }

    /// Explicit trail cut width, or the reference width scaled to this page.
    pub fn trail_cut_width_mm(&self) -> f64 {
        match self.trail.cut_width_mm {
            Some(w) => w,
            None => (REF_CUT_WIDTH_MM * self.page_scale() * 100.0).round() / 100.0,
        }
    }

    /// Whole page rectangle.
    pub fn page_rect(&self) -> Rect {
        Rect::new((0.0, 0.0), (self.page.width_mm, self.page.height_mm))
    }

    /// Page rectangle minus padding on every side.
    pub fn drawable_rect(&self) -> Rect {
        let p = self.page.padding_mm;
        Rect::new((p, p), (self.page.width_mm - p, self.page.height_mm - p))
    }

    /// `long`/`short` resolved against the page orientation.
    pub fn resolve_stitch_edge(&self) -> PageSide {
        let landscape = self.page.width_mm >= self.page.height_mm;
        match self.stitch.edge {
            StitchEdge::Long if landscape => PageSide::Top,
            StitchEdge::Long => PageSide::Left,
            StitchEdge::Short if landscape => PageSide::Left,
            StitchEdge::Short => PageSide::Top,
            StitchEdge::Top => PageSide::Top,
            StitchEdge::Bottom => PageSide::Bottom,
            StitchEdge::Left => PageSide::Left,
            StitchEdge::Right => PageSide::Right,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_reference_design() {
        let config = GenerationConfig::default();
        assert_eq!(config.trail_cut_width_mm(), 1.5);
        assert!((config.page_scale() - 1.0).abs() < 1e-12);
        assert!(config.validate().is_ok());
        let drawable = config.drawable_rect();
        assert_eq!((drawable.width(), drawable.height()), (180.0, 118.0));
    }

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = "region: Austria\npage:\n  width_mm: 297\n  height_mm: 210\n";
        let config = GenerationConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.region, "Austria");
        assert_eq!(config.page.padding_mm, 15.0);
        assert_eq!(config.fabrication.hatch_spacing_mm, 0.5);
        // A4 diagonal / A5 diagonal ~ 1.41
        assert_eq!(config.trail_cut_width_mm(), 2.12);
    }

    #[test]
    fn empty_yaml_is_default() {
        assert_eq!(GenerationConfig::from_yaml("  \n").unwrap(), GenerationConfig::default());
    }

    #[test]
    fn yaml_round_trips() {
        let mut config = GenerationConfig::default();
        config.caption.title = "Kéktúra".to_string();
        config.stitch.edge = StitchEdge::Short;
        let yaml = config.to_yaml().unwrap();
        assert_eq!(GenerationConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn unknown_edge_is_config_error() {
        let result = GenerationConfig::from_yaml("stitch:\n  edge: diagonal\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn stitch_edge_resolution() {
        let mut config = GenerationConfig::default();
        assert_eq!(config.resolve_stitch_edge(), PageSide::Top);
        config.stitch.edge = StitchEdge::Short;
        assert_eq!(config.resolve_stitch_edge(), PageSide::Left);

        config.page.width_mm = 148.0;
        config.page.height_mm = 210.0;
        assert_eq!(config.resolve_stitch_edge(), PageSide::Top);
        config.stitch.edge = StitchEdge::Long;
        assert_eq!(config.resolve_stitch_edge(), PageSide::Left);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = GenerationConfig::default();
        config.page.padding_mm = 80.0;
        assert!(config.validate().is_err(), "padding eats the page");

        let mut config = GenerationConfig::default();
        config.stitch.hole_count = 1;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.fabrication.hatch_spacing_mm = 0.0;
        assert!(config.validate().is_err());

        let mut config = GenerationConfig::default();
        config.fabrication.hatch_spacing_mm = 1e-9;
        assert!(config.validate().is_err(), "spacing finer than any pen");
    }

    #[test]
    fn zero_boolean_tolerance_is_rejected() {
        let config = GenerationConfig::from_yaml("tolerance:\n  boolean_mm: 0\n").unwrap();
        assert!(matches!(config.validate(), Err(Error::Config(msg)) if msg.contains("boolean")));
    }
}
