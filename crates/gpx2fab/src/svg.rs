//! SVG output adapters.
//!
//! Both adapters write a millimetre-sized document whose user units are
//! millimetres (`viewBox="0 0 w h"`), so the plotter and laser files
//! overlay exactly. Every layer becomes an Inkscape layer group labelled
//! with its numbered display name, which is what AxiDraw software and most
//! laser front-ends key on.

use std::fmt::{Display, Write as _};
use std::fs;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use tracing::info;

use crate::error::{Error, Result};
use crate::geometry::{Geometry, LineString, collect_line_strings, collect_polygons, polygon_rings};
use crate::layer::{Device, LayerModel, Paint, StyledPath};

/// Serializes a finalized layer model.
pub trait OutputAdapter {
    /// Device whose models this adapter accepts.
    fn device(&self) -> Device;

    /// Render the model to file bytes.
    fn render(&self, model: &LayerModel) -> Result<Vec<u8>>;

    /// Render and write to `path`.
    fn write(&self, model: &LayerModel, path: &Path) -> Result<()> {
        let bytes = self.render(model)?;
        fs::write(path, &bytes)?;
        info!(path = %path.display(), bytes = bytes.len(), device = %self.device(), "wrote drawing");
        Ok(())
    }
}

/// AxiDraw-compatible plotter drawing: every path is a pen stroke.
#[derive(Debug, Clone, Copy)]
pub struct PlotterSvg {
    pub width_mm: f64,
    pub height_mm: f64,
}

/// Colour-coded laser drawing: cuts are hairline strokes, engraves are fills.
#[derive(Debug, Clone, Copy)]
pub struct LaserSvg {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PlotterSvg {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self { width_mm, height_mm }
    }
}

impl LaserSvg {
    pub fn new(width_mm: f64, height_mm: f64) -> Self {
        Self { width_mm, height_mm }
    }
}

impl OutputAdapter for PlotterSvg {
    fn device(&self) -> Device {
        Device::Plotter
    }

    fn render(&self, model: &LayerModel) -> Result<Vec<u8>> {
        check_device(self.device(), model)?;
        render_document(model, self.width_mm, self.height_mm)
    }
}

impl OutputAdapter for LaserSvg {
    fn device(&self) -> Device {
        Device::Laser
    }

    fn render(&self, model: &LayerModel) -> Result<Vec<u8>> {
        check_device(self.device(), model)?;
        render_document(model, self.width_mm, self.height_mm)
    }
}

fn check_device(expected: Device, model: &LayerModel) -> Result<()> {
    if model.device() != expected {
        return Err(Error::DeviceMismatch { expected, found: model.device() });
    }
    Ok(())
}

fn xml_err(e: impl Display) -> Error {
    Error::Output(e.to_string())
}

/// Page coordinate with the fixed output precision.
#[inline]
fn num(v: f64) -> String {
    let s = format!("{v:.4}");
    // Avoid "-0.0000"
    if s.trim_start_matches('-').trim_matches(|c| c == '0' || c == '.').is_empty() {
        "0.0000".to_string()
    } else {
        s
    }
}

fn render_document(model: &LayerModel, width_mm: f64, height_mm: f64) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;

    let (w, h) = (num(width_mm), num(height_mm));
    let width = format!("{w}mm");
    let height = format!("{h}mm");
    let view_box = format!("0 0 {w} {h}");
    let mut svg = BytesStart::new("svg");
    svg.push_attribute(("xmlns", "http://www.w3.org/2000/svg"));
    svg.push_attribute(("xmlns:inkscape", "http://www.inkscape.org/namespaces/inkscape"));
    svg.push_attribute(("width", width.as_str()));
    svg.push_attribute(("height", height.as_str()));
    svg.push_attribute(("viewBox", view_box.as_str()));
    writer.write_event(Event::Start(svg)).map_err(xml_err)?;

    for layer in model.layers() {
        let label = layer.display_name();
        let id = format!("layer{}", layer.order());
        let mut group = BytesStart::new("g");
        group.push_attribute(("id", id.as_str()));
        group.push_attribute(("inkscape:groupmode", "layer"));
        group.push_attribute(("inkscape:label", label.as_str()));
        writer.write_event(Event::Start(group)).map_err(xml_err)?;

        for path in layer.paths() {
            let d = path_data(&path.geometry);
            if d.is_empty() {
                continue;
            }
            let mut elem = BytesStart::new("path");
            elem.push_attribute(("d", d.as_str()));
            for (key, value) in paint_attributes(path) {
                elem.push_attribute((key, value.as_str()));
            }
            writer.write_event(Event::Empty(elem)).map_err(xml_err)?;
        }

        writer.write_event(Event::End(BytesEnd::new("g"))).map_err(xml_err)?;
    }

    writer.write_event(Event::End(BytesEnd::new("svg"))).map_err(xml_err)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn paint_attributes(path: &StyledPath) -> Vec<(&'static str, String)> {
    match &path.paint {
        Paint::Pen { width_mm } => vec![
            ("fill", "none".to_string()),
            ("stroke", "#000000".to_string()),
            ("stroke-width", num(*width_mm)),
            ("stroke-linecap", "round".to_string()),
            ("stroke-linejoin", "round".to_string()),
        ],
        Paint::Cut { color, hairline_mm } => vec![
            ("fill", "none".to_string()),
            ("stroke", color.clone()),
            ("stroke-width", num(*hairline_mm)),
        ],
        Paint::Engrave { color } => vec![
            ("fill", color.clone()),
            ("fill-rule", "evenodd".to_string()),
            ("stroke", "none".to_string()),
        ],
    }
}

/// SVG path data for every drawable part of a geometry.
///
/// Polygon rings become closed sub-paths, line strings open ones. Points
/// have no outline and are skipped.
pub fn path_data(geometry: &Geometry) -> String {
    let mut d = String::new();
    for polygon in collect_polygons(geometry) {
        for ring in polygon_rings(&polygon) {
            push_subpath(&mut d, &ring, true);
        }
    }
    for ls in collect_line_strings(geometry) {
        push_subpath(&mut d, &ls, false);
    }
    d
}

fn push_subpath(d: &mut String, ls: &LineString, close: bool) {
    let mut coords = ls.0.as_slice();
    if close && coords.len() > 1 && coords.first() == coords.last() {
        coords = &coords[..coords.len() - 1];
    }
    if coords.len() < 2 {
        return;
    }
    for (i, c) in coords.iter().enumerate() {
        if !d.is_empty() {
            d.push(' ');
        }
        let cmd = if i == 0 { 'M' } else { 'L' };
        // Writing into a String cannot fail
        let _ = write!(d, "{cmd}{},{}", num(c.x), num(c.y));
    }
    if close {
        d.push_str(" Z");
    }
}

// ============================================================================
// TESTS
// ============================================================================
