//! Occupancy accumulation.
//!
//! Folds stays into arrival, departure and occupancy arrays for one series
//! (a category, or the whole population when ungrouped).
//!
//! # Algorithm Summary
//!
//! 1. Compute the stay's unclipped bin span and classify it against the window
//! 2. Work out how many bins of the span fall outside the window
//! 3. Build increments for the kept bins only, from the edge fractions
//! 4. Add the clipped sequence into occupancy, and count the clipped entry
//!    and exit bins as one arrival and one departure
//!
//! Backwards and non-overlapping stays are tallied but contribute nothing,
//! neither occupancy nor arrival/departure counts.

use chrono::NaiveDateTime;
use serde::Serialize;
use thiserror::Error;

use crate::classify::{BinSpan, ClassTally, RecordClass, classify};
use crate::edge::EdgeFractions;
use crate::increments::{ClipError, ClippedIncrements, clip};
use crate::types::EdgePolicy;
use crate::window::AnalysisWindow;

/// A stay suitable for binning.
///
/// This trait allows accumulation to work with different record
/// representations (e.g., rows loaded from CSV, or test fixtures).
pub trait StayRecord {
    /// When the stay began.
    fn entry(&self) -> NaiveDateTime;

    /// When the stay ended.
    fn exit(&self) -> NaiveDateTime;

    /// The stay's category, if it has one.
    fn category(&self) -> Option<&str>;

    /// Multiplier applied to the stay's occupancy increments.
    fn weight(&self) -> f64 {
        1.0
    }
}

/// Accumulation failed because a stay's increments do not fit the window.
///
/// Either variant means the clipping logic is wrong for this input; results
/// are never silently truncated.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AccumulateError {
    /// Clipping rejected the stay's span.
    #[error("record {record}: clipping failed")]
    Clip {
        record: usize,
        #[source]
        source: ClipError,
    },

    /// A clipped sequence would write past the end of the arrays.
    #[error(
        "record {record}: {len} increments starting at bin {entry_bin} exceed {num_bins} bins"
    )]
    OutOfBounds {
        record: usize,
        entry_bin: usize,
        len: usize,
        num_bins: usize,
    },
}

/// Arrival, departure and occupancy arrays for one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSeries {
    /// Stays whose clipped entry bin is each bin.
    pub arrivals: Vec<f64>,

    /// Stays whose clipped exit bin is each bin.
    pub departures: Vec<f64>,

    /// Fractional occupancy per bin.
    pub occupancy: Vec<f64>,

    /// How the series' stays were classified.
    pub classes: ClassTally,
}

impl BinSeries {
    /// An all-zero series of `num_bins` bins.
    #[must_use]
    pub fn zeros(num_bins: usize) -> Self {
        Self {
            arrivals: vec![0.0; num_bins],
            departures: vec![0.0; num_bins],
            occupancy: vec![0.0; num_bins],
            classes: ClassTally::default(),
        }
    }

    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.occupancy.len()
    }

    /// Total occupancy mass across all bins.
    #[must_use]
    pub fn total_occupancy(&self) -> f64 {
        self.occupancy.iter().sum()
    }

    #[must_use]
    pub fn total_arrivals(&self) -> f64 {
        self.arrivals.iter().sum()
    }

    #[must_use]
    pub fn total_departures(&self) -> f64 {
        self.departures.iter().sum()
    }

    /// Adds `other` into this series elementwise.
    ///
    /// Both series must cover the same window.
    pub fn add(&mut self, other: &Self) {
        debug_assert_eq!(self.num_bins(), other.num_bins());
        add_into(&mut self.arrivals, &other.arrivals);
        add_into(&mut self.departures, &other.departures);
        add_into(&mut self.occupancy, &other.occupancy);
        self.classes.merge(&other.classes);
    }
}

fn add_into(target: &mut [f64], source: &[f64]) {
    for (t, s) in target.iter_mut().zip(source) {
        *t += s;
    }
}

/// Accumulates stays into a [`BinSeries`] for a fixed window and edge policy.
#[derive(Debug, Clone)]
pub struct Accumulator {
    window: AnalysisWindow,
    policy: EdgePolicy,
    series: BinSeries,
}

impl Accumulator {
    #[must_use]
    pub fn new(window: AnalysisWindow, policy: EdgePolicy) -> Self {
        Self {
            window,
            policy,
            series: BinSeries::zeros(window.num_bins()),
        }
    }

    /// Adds one stay. `index` identifies the stay in error messages.
    ///
    /// Returns the stay's classification.
    pub fn push<R: StayRecord + ?Sized>(
        &mut self,
        index: usize,
        record: &R,
    ) -> Result<RecordClass, AccumulateError> {
        let (entry, exit) = (record.entry(), record.exit());
        let span = BinSpan::of(entry, exit, &self.window);
        let num_bins = self.window.num_bins();
        let class = classify(span, num_bins);
        self.series.classes.record(class);

        if !class.contributes() {
            tracing::trace!(record = index, %class, ?span, "stay outside window, skipped");
            return Ok(class);
        }

        let fractions = EdgeFractions::of(entry, exit, &self.window, self.policy);
        let Some(clipped) = clip(class, span, fractions, num_bins)
            .map_err(|source| AccumulateError::Clip {
                record: index,
                source,
            })?
        else {
            return Ok(class);
        };

        self.apply(index, &clipped, record.weight())?;
        Ok(class)
    }

    /// Adds every `(index, stay)` pair in `records`.
    pub fn extend<'a, R, I>(&mut self, records: I) -> Result<(), AccumulateError>
    where
        R: StayRecord + 'a,
        I: IntoIterator<Item = (usize, &'a R)>,
    {
        for (index, record) in records {
            self.push(index, record)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn finish(self) -> BinSeries {
        self.series
    }

    fn apply(
        &mut self,
        index: usize,
        clipped: &ClippedIncrements,
        weight: f64,
    ) -> Result<(), AccumulateError> {
        let num_bins = self.series.num_bins();
        let len = clipped.values.len();
        let out_of_bounds = AccumulateError::OutOfBounds {
            record: index,
            entry_bin: clipped.entry_bin,
            len,
            num_bins,
        };

        let end = clipped.entry_bin + len;
        if end > num_bins || clipped.exit_bin >= num_bins {
            return Err(out_of_bounds);
        }
        let Some(target) = self.series.occupancy.get_mut(clipped.entry_bin..end) else {
            return Err(out_of_bounds);
        };

        for (bin, inc) in target.iter_mut().zip(&clipped.values) {
            *bin += inc * weight;
        }
        self.series.arrivals[clipped.entry_bin] += 1.0;
        self.series.departures[clipped.exit_bin] += 1.0;
        Ok(())
    }
}
