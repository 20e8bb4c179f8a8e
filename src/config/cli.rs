use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "village-enrich")]
#[command(about = "Geocode villages and attach vegetation and forest-loss features")]
pub struct CliArgs {
    /// Path to TOML configuration file; built-in defaults are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the fallback random seed from config
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the output directory from config
    #[arg(long)]
    pub output_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Resolve village names to coordinates and distances
    Geocode {
        /// Text file with one village name per line
        names: PathBuf,
    },
    /// Add NDVI loss to an already geocoded village table
    Vegetation {
        /// CSV with Village, Latitude, Longitude[, Distance_km]
        table: PathBuf,
    },
    /// Annual forest loss over the configured area
    ForestLoss,
    /// Geocode, add NDVI loss and compute forest loss in one pass
    Run {
        /// Text file with one village name per line
        names: PathBuf,
    },
}

impl Command {
    /// Every command except `geocode` talks to the raster backend.
    pub fn needs_raster(&self) -> bool {
        !matches!(self, Command::Geocode { .. })
    }
}
