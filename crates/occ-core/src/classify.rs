//! Stay classification against the analysis window.
//!
//! Every stay falls into exactly one [`RecordClass`], decided once from its
//! unclipped bin span. The class selects the clipping rule applied to the
//! stay's increments and whether it contributes at all.

use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::window::AnalysisWindow;

/// Unclipped entry and exit bin indices of a stay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinSpan {
    pub entry_bin: i64,
    pub exit_bin: i64,
}

impl BinSpan {
    /// Bin span of a stay relative to the window start.
    #[must_use]
    pub fn of(entry: NaiveDateTime, exit: NaiveDateTime, window: &AnalysisWindow) -> Self {
        Self {
            entry_bin: window.bin_of(entry),
            exit_bin: window.bin_of(exit),
        }
    }

    /// Number of bins spanned, inclusive of both ends. Zero or negative for backwards spans.
    #[must_use]
    pub const fn len(&self) -> i64 {
        self.exit_bin - self.entry_bin + 1
    }
}

/// How a stay's span relates to the analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordClass {
    /// Entry and exit both inside the window.
    Inner,
    /// Entered before the window, exited inside it.
    Left,
    /// Entered inside the window, exited after it.
    Right,
    /// Entered before and exited after the window.
    Outer,
    /// Exit bin precedes entry bin.
    Backwards,
    /// Entirely before or entirely after the window.
    #[serde(rename = "none")]
    NoOverlap,
}

impl RecordClass {
    /// All classes, in reporting order.
    pub const ALL: [Self; 6] = [
        Self::Inner,
        Self::Left,
        Self::Right,
        Self::Outer,
        Self::Backwards,
        Self::NoOverlap,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
            Self::Backwards => "backwards",
            Self::NoOverlap => "none",
        }
    }

    /// Whether stays of this class add to occupancy, arrivals and departures.
    #[must_use]
    pub const fn contributes(&self) -> bool {
        match self {
            Self::Inner | Self::Left | Self::Right | Self::Outer => true,
            Self::Backwards | Self::NoOverlap => false,
        }
    }
}

impl fmt::Display for RecordClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifies a span against a window of `num_bins` bins (`[0, num_bins - 1]`).
#[must_use]
pub fn classify(span: BinSpan, num_bins: usize) -> RecordClass {
    let last = i64::try_from(num_bins).unwrap_or(i64::MAX) - 1;
    let BinSpan {
        entry_bin,
        exit_bin,
    } = span;

    if exit_bin < entry_bin {
        return RecordClass::Backwards;
    }
    if exit_bin < 0 || entry_bin > last {
        return RecordClass::NoOverlap;
    }

    match (entry_bin < 0, exit_bin > last) {
        (false, false) => RecordClass::Inner,
        (true, false) => RecordClass::Left,
        (false, true) => RecordClass::Right,
        (true, true) => RecordClass::Outer,
    }
}

/// Count of stays per [`RecordClass`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassTally {
    pub inner: usize,
    pub left: usize,
    pub right: usize,
    pub outer: usize,
    pub backwards: usize,
    #[serde(rename = "none")]
    pub no_overlap: usize,
}

impl ClassTally {
    /// Records one stay of class `class`.
    pub const fn record(&mut self, class: RecordClass) {
        *self.slot(class) += 1;
    }

    #[must_use]
    pub const fn get(&self, class: RecordClass) -> usize {
        match class {
            RecordClass::Inner => self.inner,
            RecordClass::Left => self.left,
            RecordClass::Right => self.right,
            RecordClass::Outer => self.outer,
            RecordClass::Backwards => self.backwards,
            RecordClass::NoOverlap => self.no_overlap,
        }
    }

    /// Total number of stays tallied.
    #[must_use]
    pub fn total(&self) -> usize {
        RecordClass::ALL.iter().map(|&c| self.get(c)).sum()
    }

    /// Number of stays that contributed to the bins.
    #[must_use]
    pub fn contributing(&self) -> usize {
        RecordClass::ALL
            .iter()
            .filter(|c| c.contributes())
            .map(|&c| self.get(c))
            .sum()
    }

    /// Adds another tally into this one.
    pub fn merge(&mut self, other: &Self) {
        for class in RecordClass::ALL {
            *self.slot(class) += other.get(class);
        }
    }

    const fn slot(&mut self, class: RecordClass) -> &mut usize {
        match class {
            RecordClass::Inner => &mut self.inner,
            RecordClass::Left => &mut self.left,
            RecordClass::Right => &mut self.right,
            RecordClass::Outer => &mut self.outer,
            RecordClass::Backwards => &mut self.backwards,
            RecordClass::NoOverlap => &mut self.no_overlap,
        }
    }
}
