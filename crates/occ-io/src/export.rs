//! CSV export of by-datetime tables and summaries.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use occ_core::{
    BinRow, Metric, NonstationaryRow, Percentile, ScenarioName, StationaryRow, SummaryStats,
};

use crate::IoError;

const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STATS_COLUMNS: [&str; 5] = ["count", "mean", "min", "max", "stdev"];

/// Real values in output files.
fn real(value: f64) -> String {
    format!("{value:.6}")
}

/// Makes a series label safe to embed in a file name.
fn file_component(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn create_dir(dir: &Path) -> Result<(), IoError> {
    fs::create_dir_all(dir).map_err(|source| IoError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// A CSV writer that remembers its path for error messages.
struct CsvFile {
    path: PathBuf,
    writer: Writer<File>,
}

impl CsvFile {
    fn create(path: PathBuf) -> Result<Self, IoError> {
        match Writer::from_path(&path) {
            Ok(writer) => Ok(Self { path, writer }),
            Err(source) => Err(IoError::Open { path, source }),
        }
    }

    fn write<I, T>(&mut self, record: I) -> Result<(), IoError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(record)
            .map_err(|source| IoError::Write {
                path: self.path.clone(),
                source,
            })
    }

    fn finish(mut self) -> Result<PathBuf, IoError> {
        match self.writer.flush() {
            Ok(()) => Ok(self.path),
            Err(source) => Err(IoError::Write {
                path: self.path,
                source: source.into(),
            }),
        }
    }
}

/// Pairs each series chunk of `rows` with its by-datetime file name.
///
/// Fails if two series map to the same name.
fn bydatetime_files<'a>(
    scenario: &ScenarioName,
    rows: &'a [BinRow],
) -> Result<Vec<(String, &'a [BinRow])>, IoError> {
    let mut seen: BTreeMap<String, &str> = BTreeMap::new();
    let mut files = Vec::new();

    for chunk in rows.chunk_by(|a, b| a.series == b.series) {
        let series = chunk[0].series.as_str();
        let file = format!("{scenario}_bydatetime_{}.csv", file_component(series));
        if let Some(first) = seen.insert(file.clone(), series) {
            return Err(IoError::FileNameCollision {
                file,
                first: first.to_string(),
                second: series.to_string(),
            });
        }
        files.push((file, chunk));
    }
    Ok(files)
}

/// Writes one `<scenario>_bydatetime_<series>.csv` per series in `rows`.
///
/// Returns the paths written, in series order. Nothing is written when two
/// series labels map to the same file name.
pub fn write_bydatetime_csv(
    dir: &Path,
    scenario: &ScenarioName,
    rows: &[BinRow],
) -> Result<Vec<PathBuf>, IoError> {
    let files = bydatetime_files(scenario, rows)?;
    create_dir(dir)?;
    let mut written = Vec::new();

    for (name, chunk) in files {
        let mut file = CsvFile::create(dir.join(name))?;
        file.write([
            "datetime",
            "arrivals",
            "departures",
            "occupancy",
            "day_of_week",
            "dow_name",
            "bin_of_day",
            "bin_of_week",
        ])?;
        for row in chunk {
            file.write([
                row.datetime.format(DATETIME_FORMAT).to_string(),
                real(row.arrivals),
                real(row.departures),
                real(row.occupancy),
                row.day_of_week.to_string(),
                row.dow_name.to_string(),
                row.bin_of_day.to_string(),
                row.bin_of_week.to_string(),
            ])?;
        }
        written.push(file.finish()?);
    }

    tracing::debug!(files = written.len(), "wrote by-datetime tables");
    Ok(written)
}

fn stats_header(percentiles: &[Percentile]) -> impl Iterator<Item = String> + '_ {
    STATS_COLUMNS
        .into_iter()
        .map(String::from)
        .chain(percentiles.iter().map(|p| p.label()))
}

fn stats_cells(stats: &SummaryStats) -> impl Iterator<Item = String> + '_ {
    [
        stats.count.to_string(),
        real(stats.mean),
        real(stats.min),
        real(stats.max),
        stats.stdev.map(real).unwrap_or_default(),
    ]
    .into_iter()
    .chain(stats.percentiles.iter().map(|(_, v)| real(*v)))
}

/// Writes one `<scenario>_<metric>_nonstationary.csv` per metric.
///
/// `percentiles` must be the list the rows were computed with.
pub fn write_nonstationary_csv(
    dir: &Path,
    scenario: &ScenarioName,
    rows: &[NonstationaryRow],
    percentiles: &[Percentile],
) -> Result<Vec<PathBuf>, IoError> {
    create_dir(dir)?;
    let mut written = Vec::new();

    for metric in Metric::ALL {
        let path = dir.join(format!("{scenario}_{}_nonstationary.csv", metric.as_str()));
        let mut file = CsvFile::create(path)?;

        let header = ["series", "day_of_week", "dow_name", "bin_of_day"]
            .into_iter()
            .map(String::from)
            .chain(stats_header(percentiles));
        file.write(header.collect::<Vec<_>>())?;

        for row in rows.iter().filter(|r| r.metric == metric) {
            let cells = [
                row.series.clone(),
                row.day_of_week.to_string(),
                row.dow_name.to_string(),
                row.bin_of_day.to_string(),
            ]
            .into_iter()
            .chain(stats_cells(&row.stats));
            file.write(cells.collect::<Vec<_>>())?;
        }
        written.push(file.finish()?);
    }

    Ok(written)
}

/// Writes one `<scenario>_<metric>_stationary.csv` per metric.
///
/// `percentiles` must be the list the rows were computed with.
pub fn write_stationary_csv(
    dir: &Path,
    scenario: &ScenarioName,
    rows: &[StationaryRow],
    percentiles: &[Percentile],
) -> Result<Vec<PathBuf>, IoError> {
    create_dir(dir)?;
    let mut written = Vec::new();

    for metric in Metric::ALL {
        let path = dir.join(format!("{scenario}_{}_stationary.csv", metric.as_str()));
        let mut file = CsvFile::create(path)?;

        let header = std::iter::once("series".to_string()).chain(stats_header(percentiles));
        file.write(header.collect::<Vec<_>>())?;

        for row in rows.iter().filter(|r| r.metric == metric) {
            let cells = std::iter::once(row.series.clone()).chain(stats_cells(&row.stats));
            file.write(cells.collect::<Vec<_>>())?;
        }
        written.push(file.finish()?);
    }

    Ok(written)
}
