//! Layer model: named, ordered collections of styled geometry per device.
//!
//! Layers are assembled through a [`LayerModelBuilder`] and frozen with
//! [`LayerModelBuilder::finalize`]. The finalized [`LayerModel`] exposes
//! read-only accessors only; it is what output adapters consume.
//!
//! Ordering is an explicit integer per layer. Display names such as
//! `1-borders` are produced by [`Layer::display_name`] for adapters that
//! need them, never stored.

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::geometry::Geometry;
use crate::hatch::HatchSettings;

/// Target output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Plotter,
    Laser,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Device::Plotter => "plotter",
            Device::Laser => "laser",
        })
    }
}

/// How a path is rendered on its device.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Paint {
    /// Plotter pen stroke of a fixed physical width.
    Pen { width_mm: f64 },
    /// Laser cut along the outline.
    Cut { color: String, hairline_mm: f64 },
    /// Laser surface engraving of the filled area.
    Engrave { color: String },
}

/// A geometry with its rendering attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledPath {
    pub geometry: Geometry,
    pub paint: Paint,
    /// Set on strokes that were produced by hatching.
    pub hatch: Option<HatchSettings>,
}

impl StyledPath {
    pub fn new(geometry: Geometry, paint: Paint) -> Self {
        Self { geometry, paint, hatch: None }
    }

    pub fn hatched(geometry: Geometry, paint: Paint, hatch: HatchSettings) -> Self {
        Self { geometry, paint, hatch: Some(hatch) }
    }
}

/// One named layer of one device.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    order: u32,
    device: Device,
    paths: Vec<StyledPath>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn paths(&self) -> &[StyledPath] {
        &self.paths
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// AxiDraw-style numbered name, e.g. `3-trail`.
    pub fn display_name(&self) -> String {
        format!("{}-{}", self.order, self.name)
    }
}

/// Mutable assembly stage of a [`LayerModel`].
///
/// ## Rust Lesson #25: Typestate by ownership
///
/// `finalize(self)` consumes the builder. After the call the builder no
/// longer exists, so nothing can append to a model that was handed out.
#[derive(Debug)]
pub struct LayerModelBuilder {
    device: Device,
    layers: Vec<Layer>,
}

impl LayerModelBuilder {
    pub fn new(device: Device) -> Self {
        Self { device, layers: Vec::new() }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Add a new layer.
    ///
    /// Fails with `DuplicateLayerOrder` when a layer with the same order
    /// already exists, and with `DeviceMismatch` when `device` is not the
    /// builder's device. An empty `paths` is fine.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        order: u32,
        device: Device,
        paths: Vec<StyledPath>,
    ) -> Result<()> {
        if device != self.device {
            return Err(Error::DeviceMismatch { expected: self.device, found: device });
        }
        if self.layers.iter().any(|l| l.order == order) {
            return Err(Error::DuplicateLayerOrder { device, order });
        }
        self.layers.push(Layer { name: name.into(), order, device, paths });
        Ok(())
    }

    /// Freeze the model, layers sorted by order.
    pub fn finalize(mut self) -> LayerModel {
        self.layers.sort_by_key(|l| l.order);
        LayerModel { device: self.device, layers: self.layers }
    }
}

/// Finalized, read-only set of layers for one device.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerModel {
    device: Device,
    layers: Vec<Layer>,
}

impl LayerModel {
    pub fn device(&self) -> Device {
        self.device
    }

    /// Layers in ascending order.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, order: u32) -> Option<&Layer> {
        self.layers.iter().find(|l| l.order == order)
    }

    pub fn layer_named(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn path_count(&self) -> usize {
        self.layers.iter().map(|l| l.paths.len()).sum()
    }

    /// Summary rows for listing.
    pub fn summary(&self) -> Vec<LayerSummary> {
        self.layers
            .iter()
            .map(|l| LayerSummary {
                device: l.device,
                order: l.order,
                name: l.name.clone(),
                paths: l.paths.len(),
            })
            .collect()
    }
}

/// One row of [`LayerModel::summary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerSummary {
    pub device: Device,
    pub order: u32,
    pub name: String,
    pub paths: usize,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LineString, empty_geometry};

    fn pen() -> Paint {
        Paint::Pen { width_mm: 0.1 }
    }

    fn path() -> StyledPath {
        StyledPath::new(Geometry::LineString(LineString::from(vec![(0.0, 0.0), (1.0, 1.0)])), pen())
    }

    #[test]
    fn duplicate_order_is_rejected() {
        let mut builder = LayerModelBuilder::new(Device::Plotter);
        builder.add_layer("borders", 1, Device::Plotter, vec![path()]).unwrap();
        let err = builder.add_layer("water", 1, Device::Plotter, vec![]).unwrap_err();
        assert!(matches!(err, Error::DuplicateLayerOrder { device: Device::Plotter, order: 1 }));
    }

    #[test]
    fn same_order_on_other_device_is_fine() {
        let mut plotter = LayerModelBuilder::new(Device::Plotter);
        let mut laser = LayerModelBuilder::new(Device::Laser);
        plotter.add_layer("borders", 1, Device::Plotter, vec![]).unwrap();
        laser.add_layer("Trail", 1, Device::Laser, vec![]).unwrap();
    }

    #[test]
    fn wrong_device_is_rejected() {
        let mut builder = LayerModelBuilder::new(Device::Laser);
        let err = builder.add_layer("borders", 1, Device::Plotter, vec![]).unwrap_err();
        assert!(matches!(err, Error::DeviceMismatch { expected: Device::Laser, found: Device::Plotter }));
    }

    #[test]
    fn finalize_sorts_by_order() {
        let mut builder = LayerModelBuilder::new(Device::Plotter);
        builder.add_layer("trail", 3, Device::Plotter, vec![]).unwrap();
        builder.add_layer("borders", 1, Device::Plotter, vec![path()]).unwrap();
        builder.add_layer("water", 2, Device::Plotter, vec![]).unwrap();
        let model = builder.finalize();
        let names: Vec<String> = model.layers().iter().map(Layer::display_name).collect();
        assert_eq!(names, vec!["1-borders", "2-water", "3-trail"]);
        assert_eq!(model.path_count(), 1);
    }

    #[test]
    fn empty_layers_are_kept() {
        let mut builder = LayerModelBuilder::new(Device::Laser);
        builder
            .add_layer("Trail", 1, Device::Laser, vec![StyledPath::new(empty_geometry(), pen())])
            .unwrap();
        builder.add_layer("Contour", 2, Device::Laser, vec![]).unwrap();
        let model = builder.finalize();
        assert_eq!(model.layers().len(), 2);
        assert!(model.layer_named("Contour").is_some_and(Layer::is_empty));
    }
}
