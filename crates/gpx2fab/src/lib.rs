//! # gpx2fab
//!
//! Turns a GPS track and open map data into two aligned drawings: a layered
//! pen-plotter SVG and a cut/engrave laser SVG.
//!
//! ## Rust Lesson #7: Modules
//!
//! Rust modules are like ES6 modules but more explicit:
//! - `mod foo;` = load from `foo.rs` or `foo/mod.rs`
//! - `pub mod foo;` = also export it publicly
//! - `pub use foo::Bar;` = re-export Bar at this level
//!
//! Unlike Node.js, you must explicitly declare every module.

pub mod boolean;
pub mod chain;
pub mod clip;
pub mod compose;
pub mod config;
pub mod error;
pub mod geometry;
pub mod hatch;
pub mod layer;
pub mod order;
pub mod pipeline;
pub mod prepare;
pub mod source;
pub mod svg;
pub mod text;
pub mod track;
pub mod transform;

// Re-export common types at crate root for convenience.
pub use boolean::BooleanEngine;
pub use compose::{PreparedGeometry, compose_laser, compose_plotter};
pub use config::GenerationConfig;
pub use error::{Error, Result};
pub use hatch::{HatchSettings, hatch_polygon};
pub use layer::{Device, Layer, LayerModel, LayerModelBuilder, LayerSummary, Paint, StyledPath};
pub use order::OrderingStrategy;
pub use pipeline::{GenerationOutput, generate};
pub use prepare::{clip_to_region, filter_connected, simplify};
pub use source::{Feature, GeoJsonDirSource, GeometrySource, MemorySource};
pub use svg::{LaserSvg, OutputAdapter, PlotterSvg};
pub use text::{SvgTextOutliner, TextOutliner};
pub use track::{load_track, parse_track};
pub use transform::{CoordTransformer, Projection, WebMercator};
