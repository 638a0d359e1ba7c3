//! Input handling shared across CLI commands.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::debug;

use gpx2fab::{
    GenerationConfig, GenerationOutput, GeoJsonDirSource, SvgTextOutliner, generate, load_track,
};

/// Track, data and config options every pipeline command takes.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// GPX file holding the track
    pub track: PathBuf,

    /// Directory of `<dataset>.geojson` files
    #[arg(short, long)]
    pub data: PathBuf,

    /// YAML configuration; defaults apply to anything it leaves out
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Region of interest, overriding the config
    #[arg(long)]
    pub region: Option<String>,

    /// Caption title, overriding the config
    #[arg(long)]
    pub title: Option<String>,

    /// Caption subtitle, overriding the config
    #[arg(long)]
    pub subtitle: Option<String>,

    /// Font file for the caption instead of the system fonts
    #[arg(long)]
    pub font_file: Option<PathBuf>,
}

impl InputArgs {
    /// Config file (or defaults) with the command-line overrides applied.
    pub fn load_config(&self) -> anyhow::Result<GenerationConfig> {
        let mut config = match &self.config {
            Some(path) => GenerationConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => GenerationConfig::default(),
        };
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(title) = &self.title {
            config.caption.title = title.clone();
        }
        if let Some(subtitle) = &self.subtitle {
            config.caption.subtitle = subtitle.clone();
        }
        Ok(config)
    }

    fn outliner(&self, config: &GenerationConfig) -> anyhow::Result<SvgTextOutliner> {
        if let Some(path) = &self.font_file {
            return SvgTextOutliner::with_font_file(path)
                .with_context(|| format!("loading font {}", path.display()));
        }
        // Scanning system fonts is slow; skip it when nothing is outlined
        if config.caption.is_empty() {
            return Ok(SvgTextOutliner::default());
        }
        let outliner = SvgTextOutliner::with_system_fonts();
        debug!(fonts = outliner.font_count(), "loaded system fonts");
        Ok(outliner)
    }

    /// Load every input and run the pipeline.
    pub fn run(&self) -> anyhow::Result<(GenerationConfig, GenerationOutput)> {
        let config = self.load_config()?;
        let track = load_track(&self.track)?;
        let source = GeoJsonDirSource::new(self.data.clone());
        let outliner = self.outliner(&config)?;
        let output = generate(&config, &track, &source, &outliner)
            .with_context(|| format!("generating drawings for {}", self.track.display()))?;
        Ok((config, output))
    }
}
