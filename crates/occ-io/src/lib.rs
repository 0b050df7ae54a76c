//! CSV input and output for occupancy analysis.
//!
//! Loads stay records from a stop-data CSV and writes by-datetime tables and
//! summary statistics back out as CSV.
//!
//! # Stop data
//!
//! The input file has a header row. Entry, exit, category and weight columns are
//! looked up by name (see [`StopFields`]); any other columns are ignored.
//!
//! ## Timestamp Format
//!
//! Timestamps are naive local times in one of:
//! - `YYYY-MM-DD HH:MM[:SS[.fff]]`
//! - `YYYY-MM-DDTHH:MM[:SS[.fff]]`
//! - `MM/DD/YYYY HH:MM[:SS]`
//!
//! A row with an empty entry timestamp is skipped. A row with an empty exit
//! timestamp is handled according to [`MissingExit`].
//!
//! # Output files
//!
//! - `<scenario>_bydatetime_<series>.csv`, one per series. Characters other than
//!   ASCII letters, digits, `-`, `_` and `.` become `_`; series whose names
//!   collide after that are an error and nothing is written
//! - `<scenario>_<metric>_nonstationary.csv` and `<scenario>_<metric>_stationary.csv`,
//!   one per metric
//!
//! Real values are written with six decimals.

use std::path::PathBuf;

use thiserror::Error;

mod export;
mod stops;

pub use export::{write_bydatetime_csv, write_nonstationary_csv, write_stationary_csv};
pub use stops::{MissingExit, Stay, StopFields, load_stays, parse_timestamp};

/// CSV input and output errors.
#[derive(Debug, Error)]
pub enum IoError {
    /// The file could not be opened or created.
    #[error("cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// A record could not be read.
    #[error("cannot read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// A record could not be written.
    #[error("cannot write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    /// The output directory could not be created.
    #[error("cannot create directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Two series labels map to the same output file name.
    #[error("series {first:?} and {second:?} would both be written to {file}")]
    FileNameCollision {
        file: String,
        first: String,
        second: String,
    },
    /// A configured column is absent from the header row.
    #[error("column {column:?} not found in {}", path.display())]
    MissingColumn { path: PathBuf, column: String },
    /// A timestamp cell matched none of the accepted formats.
    #[error("row {row}: invalid timestamp {value:?} in column {column:?}")]
    Timestamp {
        row: usize,
        column: String,
        value: String,
    },
    /// A weight cell is not a finite, non-negative number.
    #[error("row {row}: invalid weight {value:?}")]
    Weight { row: usize, value: String },
}
