//! Config command implementation.

use gpx2fab::GenerationConfig;

/// Print the default configuration, ready to be edited and passed back
/// with `--config`.
pub fn cmd_config() -> anyhow::Result<()> {
    print!("{}", GenerationConfig::default().to_yaml()?);
    Ok(())
}
