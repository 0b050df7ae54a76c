//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Occupancy analysis from stop data.
///
/// Bins entry and exit timestamps into arrivals, departures and fractional
/// occupancy per time bin, then summarises them by day of week and time of day.
#[derive(Debug, Parser)]
#[command(name = "occ", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to scenario config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compute occupancy, summarise it and export the tables.
    Run,

    /// Show how stays classify against the analysis window.
    Classify {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}
