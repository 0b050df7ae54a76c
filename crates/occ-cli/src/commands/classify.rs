//! Classify command: how stays relate to the analysis window, per series.

use std::io::Write;

use anyhow::Result;
use occ_core::{ClassTally, RecordClass};
use serde::Serialize;

use crate::Scenario;

/// Class tally of one series, for JSON output.
#[derive(Debug, Serialize)]
struct SeriesTally<'a> {
    series: &'a str,
    #[serde(flatten)]
    classes: ClassTally,
}

pub fn run<W: Write>(writer: &mut W, scenario: &Scenario, json: bool) -> Result<()> {
    let (_stays, occupancy) = super::load_and_bin(scenario)?;

    let tallies: Vec<SeriesTally<'_>> = occupancy
        .iter()
        .map(|(key, series)| SeriesTally {
            series: key.label(),
            classes: series.classes,
        })
        .collect();

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&tallies)?)?;
        return Ok(());
    }

    for tally in &tallies {
        let counts: Vec<String> = RecordClass::ALL
            .iter()
            .map(|&class| format!("{class} {}", tally.classes.get(class)))
            .collect();
        writeln!(writer, "{}: {}", tally.series, counts.join(", "))?;
    }

    Ok(())
}
