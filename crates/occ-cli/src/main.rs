use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use occ_cli::commands::{classify, run};
use occ_cli::{Cli, Commands, Config, Scenario};

/// Load config and validate it into a scenario.
fn load_scenario(config_path: Option<&Path>) -> Result<Scenario> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    config.scenario().context("invalid scenario configuration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();

    match &cli.command {
        Some(Commands::Run) => {
            let scenario = load_scenario(cli.config.as_deref())?;
            run::run(&mut stdout, &scenario)?;
        }
        Some(Commands::Classify { json }) => {
            let scenario = load_scenario(cli.config.as_deref())?;
            classify::run(&mut stdout, &scenario, *json)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
