//! Core domain logic for occupancy analysis.
//!
//! This crate contains the fundamental types and logic for:
//! - Bin construction: classifying stays against an analysis window, clipping
//!   their per-bin increments, and accumulating arrivals, departures and
//!   occupancy per category
//! - By-datetime rows: labelling bin arrays with calendar columns
//! - Summaries: descriptive statistics by day of week and bin of day

mod accumulate;
mod aggregate;
pub mod bins;
mod bydatetime;
pub mod classify;
pub mod edge;
mod engine;
pub mod increments;
pub mod summary;
mod types;
mod window;

pub use accumulate::{AccumulateError, Accumulator, BinSeries, StayRecord};
pub use aggregate::totals;
pub use bydatetime::{BinRow, bydatetime_rows};
pub use classify::{BinSpan, ClassTally, RecordClass, classify};
pub use engine::{
    BinnedOccupancy, BinningOptions, EngineError, Grouping, OVERALL_LABEL, SeriesKey,
    TOTALS_LABEL, compute_occupancy,
};
pub use summary::{
    Metric, NonstationaryRow, StationaryRow, SummaryStats, summarize_nonstationary,
    summarize_stationary,
};
pub use types::{Category, EdgePolicy, Percentile, ScenarioName, ValidationError};
pub use window::AnalysisWindow;
