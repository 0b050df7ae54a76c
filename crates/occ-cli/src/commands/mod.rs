//! CLI subcommand implementations.

pub mod classify;
pub mod run;

use std::time::Instant;

use anyhow::{Context, Result};
use occ_core::{BinnedOccupancy, compute_occupancy};
use occ_io::{Stay, load_stays};

use crate::Scenario;

/// Loads the scenario's stop data and bins it.
fn load_and_bin(scenario: &Scenario) -> Result<(Vec<Stay>, BinnedOccupancy)> {
    let started = Instant::now();
    let window = scenario.options.window;

    let stays = load_stays(
        &scenario.stop_data_csv,
        &scenario.fields,
        scenario.missing_exit,
        window.end(),
    )
    .with_context(|| format!("failed to load {}", scenario.stop_data_csv.display()))?;
    tracing::info!(
        stays = stays.len(),
        elapsed = ?started.elapsed(),
        "stop data loaded"
    );

    let started = Instant::now();
    let occupancy =
        compute_occupancy(&stays, &scenario.options).context("failed to compute occupancy")?;
    tracing::info!(
        bins = window.num_bins(),
        elapsed = ?started.elapsed(),
        "occupancy computed"
    );

    Ok((stays, occupancy))
}
