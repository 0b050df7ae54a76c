//! Run command: bin the stop data, summarise it and export the tables.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use occ_core::{bydatetime_rows, summarize_nonstationary, summarize_stationary};
use occ_io::{write_bydatetime_csv, write_nonstationary_csv, write_stationary_csv};

use crate::Scenario;

pub fn run<W: Write>(writer: &mut W, scenario: &Scenario) -> Result<()> {
    let (stays, occupancy) = super::load_and_bin(scenario)?;
    let window = scenario.options.window;
    let outputs = scenario.outputs;
    let dir = &scenario.output_path;

    let rows = bydatetime_rows(&occupancy, &window);
    let mut written: Vec<PathBuf> = Vec::new();

    if outputs.export_bydatetime_csv {
        written.extend(
            write_bydatetime_csv(dir, &scenario.name, &rows)
                .context("failed to export by-datetime tables")?,
        );
    }

    if outputs.nonstationary_stats {
        let summary = summarize_nonstationary(&rows, &scenario.percentiles);
        tracing::debug!(groups = summary.len(), "nonstationary summary computed");
        if outputs.export_summaries_csv {
            written.extend(
                write_nonstationary_csv(dir, &scenario.name, &summary, &scenario.percentiles)
                    .context("failed to export nonstationary summaries")?,
            );
        }
    }

    if outputs.stationary_stats {
        let summary = summarize_stationary(&rows, &scenario.percentiles);
        tracing::debug!(groups = summary.len(), "stationary summary computed");
        if outputs.export_summaries_csv {
            written.extend(
                write_stationary_csv(dir, &scenario.name, &summary, &scenario.percentiles)
                    .context("failed to export stationary summaries")?,
            );
        }
    }

    writeln!(
        writer,
        "scenario {}: {} stays, {} bins of {} minutes",
        scenario.name,
        stays.len(),
        window.num_bins(),
        window.bin_size_minutes()
    )?;

    #[expect(
        clippy::cast_precision_loss,
        reason = "bin sizes are at most a day of minutes"
    )]
    let hours_per_bin = window.bin_size_minutes() as f64 / 60.0;
    for (key, series) in occupancy.iter() {
        let peak = series.occupancy.iter().copied().fold(0.0, f64::max);
        writeln!(
            writer,
            "{key}: arrivals {:.0}, departures {:.0}, peak occupancy {peak:.2}, occupied hours {:.2}",
            series.total_arrivals(),
            series.total_departures(),
            series.total_occupancy() * hours_per_bin,
        )?;
    }

    if !written.is_empty() {
        writeln!(writer, "wrote {} files to {}", written.len(), dir.display())?;
    }

    Ok(())
}
