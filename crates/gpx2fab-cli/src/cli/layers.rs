//! Layers command implementation.

use clap::Args;

use gpx2fab::{LayerModel, LayerSummary};

use super::common::InputArgs;

#[derive(Args, Debug)]
pub struct LayersArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Execute the layers command.
pub fn cmd_layers(args: &LayersArgs) -> anyhow::Result<()> {
    let (_, output) = args.input.run()?;
    let models: Vec<&LayerModel> = output.plotter.iter().chain(output.laser.iter()).collect();
    let rows: Vec<LayerSummary> = models.iter().flat_map(|m| m.summary()).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", format_table(&rows));
    }
    Ok(())
}

fn format_table(rows: &[LayerSummary]) -> String {
    let mut out = format!("{:<8} {:<14} {:>6}\n", "DEVICE", "LAYER", "PATHS");
    for row in rows {
        let label = format!("{}-{}", row.order, row.name);
        out.push_str(&format!("{:<8} {:<14} {:>6}\n", row.device.to_string(), label, row.paths));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpx2fab::Device;

    #[test]
    fn table_has_one_row_per_layer() {
        let rows = vec![
            LayerSummary { device: Device::Plotter, order: 1, name: "borders".to_string(), paths: 3 },
            LayerSummary { device: Device::Laser, order: 2, name: "Contour".to_string(), paths: 1 },
        ];
        let table = format_table(&rows);
        assert_eq!(table.lines().count(), 3);
        assert!(table.contains("plotter  1-borders           3"));
        assert!(table.contains("laser    2-Contour           1"));
    }
}
