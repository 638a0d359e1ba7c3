//! Error taxonomy for a generation run.
//!
//! Every variant here is fatal to the run: nothing is written when one of
//! them surfaces. An operation that simply produces nothing (a clip that
//! misses, a difference that eats everything) is NOT an error - it returns
//! an empty geometry and the affected layer is empty.

use crate::layer::Device;

/// Errors raised by the geometry pipeline and its collaborators.
///
/// ## Rust Lesson #20: Error Handling
///
/// `thiserror` writes the `Display` and `std::error::Error` impls for us.
/// `#[from]` also generates a `From` impl, so `?` converts automatically.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("degenerate region: bounding box is {width} x {height}")]
    DegenerateRegion { width: f64, height: f64 },

    #[error("duplicate layer order {order} for {device} output")]
    DuplicateLayerOrder { device: Device, order: u32 },

    #[error("layer for {found} output added to a {expected} model")]
    DeviceMismatch { expected: Device, found: Device },

    #[error("track parse error: {0}")]
    TrackParse(String),

    #[error("geometry source failed for dataset '{dataset}': {reason}")]
    Source { dataset: String, reason: String },

    #[error("region '{0}' not found in dataset")]
    RegionNotFound(String),

    #[error("text outline error: {0}")]
    Text(String),

    #[error("output error: {0}")]
    Output(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
