//! Stop-data CSV loading.

use std::fmt;
use std::path::Path;

use chrono::NaiveDateTime;
use csv::StringRecord;
use occ_core::StayRecord;
use serde::{Deserialize, Serialize};

use crate::IoError;

/// Accepted timestamp layouts, tried in order.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// One stay loaded from stop data.
#[derive(Debug, Clone, PartialEq)]
pub struct Stay {
    pub entry: NaiveDateTime,
    pub exit: NaiveDateTime,
    pub category: Option<String>,
    pub weight: f64,
}

impl StayRecord for Stay {
    fn entry(&self) -> NaiveDateTime {
        self.entry
    }

    fn exit(&self) -> NaiveDateTime {
        self.exit
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn weight(&self) -> f64 {
        self.weight
    }
}

/// Names of the stop-data columns to read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StopFields {
    pub entry: String,
    pub exit: String,
    pub category: Option<String>,
    pub weight: Option<String>,
}

/// What to do with a stay that has no exit timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingExit {
    /// Skip the stay.
    #[default]
    Drop,
    /// Treat the stay as still present at the end of the analysis.
    EndOfAnalysis,
}

impl MissingExit {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::EndOfAnalysis => "end_of_analysis",
        }
    }
}

impl fmt::Display for MissingExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Parses a naive timestamp in any of the accepted layouts.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Resolved column positions.
struct Columns {
    entry: usize,
    exit: usize,
    category: Option<usize>,
    weight: Option<usize>,
}

impl Columns {
    fn resolve(
        headers: &StringRecord,
        fields: &StopFields,
        path: &Path,
    ) -> Result<Self, IoError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| IoError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.to_string(),
                })
        };

        Ok(Self {
            entry: find(&fields.entry)?,
            exit: find(&fields.exit)?,
            category: fields.category.as_deref().map(find).transpose()?,
            weight: fields.weight.as_deref().map(find).transpose()?,
        })
    }
}

/// Loads stays from the stop-data CSV at `path`.
///
/// `end_of_analysis` is used as the exit of stays without one under
/// [`MissingExit::EndOfAnalysis`].
pub fn load_stays(
    path: &Path,
    fields: &StopFields,
    missing_exit: MissingExit,
    end_of_analysis: NaiveDateTime,
) -> Result<Vec<Stay>, IoError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| IoError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    let headers = rdr
        .headers()
        .map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    let columns = Columns::resolve(&headers, fields, path)?;

    let mut stays = Vec::new();
    let mut no_entry = 0usize;
    let mut no_exit = 0usize;

    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(|source| IoError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        // Header is line 1
        let row = idx + 2;
        let cell = |i: usize| record.get(i).unwrap_or("");

        let Some(entry) = timestamp_cell(cell(columns.entry), row, &fields.entry)? else {
            no_entry += 1;
            continue;
        };
        let exit = match timestamp_cell(cell(columns.exit), row, &fields.exit)? {
            Some(exit) => exit,
            None => {
                no_exit += 1;
                match missing_exit {
                    MissingExit::Drop => continue,
                    MissingExit::EndOfAnalysis => end_of_analysis,
                }
            }
        };
        let category = columns
            .category
            .map(cell)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let weight = match columns.weight.map(cell) {
            None | Some("") => 1.0,
            Some(value) => parse_weight(value, row)?,
        };

        stays.push(Stay {
            entry,
            exit,
            category,
            weight,
        });
    }

    if no_entry > 0 {
        tracing::warn!(count = no_entry, "skipped stops without an entry timestamp");
    }
    if no_exit > 0 {
        tracing::warn!(
            count = no_exit,
            policy = %missing_exit,
            "stops without an exit timestamp"
        );
    }
    tracing::debug!(path = %path.display(), stays = stays.len(), "loaded stop data");

    Ok(stays)
}

fn timestamp_cell(
    value: &str,
    row: usize,
    column: &str,
) -> Result<Option<NaiveDateTime>, IoError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_timestamp(value)
        .map(Some)
        .ok_or_else(|| IoError::Timestamp {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

fn parse_weight(value: &str, row: usize) -> Result<f64, IoError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite() && *w >= 0.0)
        .ok_or_else(|| IoError::Weight {
            row,
            value: value.to_string(),
        })
}
