//! gpx2fab - plotter and laser drawings from a GPS track
//!
//! Usage:
//!   gpx2fab generate <track.gpx> --data <dir>   Write plotter/laser SVGs
//!   gpx2fab layers <track.gpx> --data <dir>     Print the composed layers
//!   gpx2fab config                              Print the default config

use clap::{Parser, Subcommand};
use tracing::Level;

mod cli;

use cli::{GenerateArgs, LayersArgs};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
/// Plotter and laser drawings from a GPS track and open map data
struct Cli {
    /// Log every stage in detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate the plotter and laser drawings
    Generate(GenerateArgs),
    /// Print the composed layer summary without writing files
    Layers(LayersArgs),
    /// Print the default configuration as YAML
    Config,
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose, args.quiet);

    match args.command {
        Command::Generate(args) => cli::cmd_generate(&args),
        Command::Layers(args) => cli::cmd_layers(&args),
        Command::Config => cli::cmd_config(),
    }
}
