//! Generate command implementation.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;
use tracing::info;

use gpx2fab::{LaserSvg, OutputAdapter, PlotterSvg};

use super::common::InputArgs;
use super::preview::{PREVIEW_DPI, render_png};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Directory the drawings are written to
    #[arg(short, long, default_value = ".")]
    pub out_dir: PathBuf,

    /// File name stem; defaults to the track's file name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Also write a PNG preview
    #[arg(long)]
    pub preview: bool,
}

impl GenerateArgs {
    fn stem(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            self.input
                .track
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "trail".to_string())
        })
    }
}

/// Execute the generate command.
///
/// Every drawing is rendered in memory first; nothing touches the disk
/// unless all of them succeed.
pub fn cmd_generate(args: &GenerateArgs) -> anyhow::Result<()> {
    let (config, output) = args.input.run()?;
    let (w, h) = (config.page.width_mm, config.page.height_mm);
    let stem = args.stem();

    let mut files: Vec<(PathBuf, Vec<u8>)> = Vec::new();
    if let Some(model) = &output.plotter {
        files.push((args.out_dir.join(format!("{stem}_plotter.svg")), PlotterSvg::new(w, h).render(model)?));
    }
    if let Some(model) = &output.laser {
        files.push((args.out_dir.join(format!("{stem}_laser.svg")), LaserSvg::new(w, h).render(model)?));
    }
    if files.is_empty() {
        bail!("both plotter and laser output are switched off");
    }

    if args.preview {
        // Plotter drawing if there is one, otherwise the laser drawing
        let png = render_png(&files[0].1, w, h, PREVIEW_DPI)?;
        files.push((args.out_dir.join(format!("{stem}_preview.png")), png));
    }

    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;
    for (path, bytes) in &files {
        fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "wrote");
    }
    Ok(())
}
