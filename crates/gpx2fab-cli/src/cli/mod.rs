//! CLI command implementations.
//!
//! - `generate` - run the pipeline and write the drawings
//! - `layers` - run the pipeline and print what each layer holds
//! - `config` - print the default configuration

pub mod common;
pub mod config;
pub mod generate;
pub mod layers;
pub mod preview;

pub use config::cmd_config;
pub use generate::{GenerateArgs, cmd_generate};
pub use layers::{LayersArgs, cmd_layers};
