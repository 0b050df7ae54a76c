//! The analysis window.

use chrono::{Duration, NaiveDateTime};

use crate::bins::{MINUTES_PER_DAY, bin_of_span};
use crate::types::ValidationError;

/// A validated, half-open analysis window `[start, end)` cut into bins.
///
/// `num_bins` is the number of bins needed to cover the window, so the last
/// bin may extend past `end` when the span is not a whole number of bins.
/// Equivalently, `num_bins = floor((last_instant - start) / bin_size) + 1`
/// where `last_instant` is the final instant inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    start: NaiveDateTime,
    end: NaiveDateTime,
    bin_size_minutes: i64,
    num_bins: usize,
}

impl AnalysisWindow {
    /// Creates a window after validating the bin size and bounds.
    pub fn new(
        start: NaiveDateTime,
        end: NaiveDateTime,
        bin_size_minutes: i64,
    ) -> Result<Self, ValidationError> {
        if bin_size_minutes <= 0 {
            return Err(ValidationError::NonPositiveBinSize {
                minutes: bin_size_minutes,
            });
        }
        if MINUTES_PER_DAY % bin_size_minutes != 0 {
            return Err(ValidationError::BinSizeNotDividingDay {
                minutes: bin_size_minutes,
            });
        }
        if end <= start {
            return Err(ValidationError::WindowEndNotAfterStart {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        // The last instant inside [start, end) is one millisecond before end.
        let last_bin = bin_of_span(end - Duration::milliseconds(1), start, bin_size_minutes);
        let num_bins = usize::try_from(last_bin + 1)
            .ok()
            .filter(|&n| n > 0)
            .ok_or_else(|| ValidationError::WindowEndNotAfterStart {
                start: start.to_string(),
                end: end.to_string(),
            })?;

        Ok(Self {
            start,
            end,
            bin_size_minutes,
            num_bins,
        })
    }

    /// Window start (inclusive).
    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Window end (exclusive).
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    #[must_use]
    pub const fn bin_size_minutes(&self) -> i64 {
        self.bin_size_minutes
    }

    /// Number of bins covering the window.
    #[must_use]
    pub const fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Bin length in milliseconds.
    #[must_use]
    pub const fn bin_ms(&self) -> i64 {
        self.bin_size_minutes * 60_000
    }

    /// Index of the last bin, as a signed bin index.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn last_bin(&self) -> i64 {
        self.num_bins as i64 - 1
    }

    /// Unclipped bin index of `timestamp` relative to the window start.
    #[must_use]
    pub fn bin_of(&self, timestamp: NaiveDateTime) -> i64 {
        bin_of_span(timestamp, self.start, self.bin_size_minutes)
    }

    /// Timestamp at which bin `index` starts: `start + index * bin_size`.
    #[must_use]
    pub fn bin_start(&self, index: usize) -> NaiveDateTime {
        let index = i64::try_from(index).unwrap_or(i64::MAX);
        self.start + Duration::minutes(self.bin_size_minutes.saturating_mul(index))
    }

    /// Iterates the start timestamp of every bin in order.
    pub fn bin_starts(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        (0..self.num_bins).map(|i| self.bin_start(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid test timestamp")
    }

    #[test]
    fn num_bins_for_aligned_window() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(1, 4, 0), 60).unwrap();
        assert_eq!(window.num_bins(), 4);
        assert_eq!(window.last_bin(), 3);
    }

    #[test]
    fn num_bins_rounds_up_partial_last_bin() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(1, 4, 30), 60).unwrap();
        assert_eq!(window.num_bins(), 5);
    }

    #[test]
    fn full_week_of_quarter_hours() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(8, 0, 0), 15).unwrap();
        assert_eq!(window.num_bins(), 7 * 96);
    }

    #[test]
    fn rejects_non_positive_bin_size() {
        let err = AnalysisWindow::new(at(1, 0, 0), at(2, 0, 0), 0).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveBinSize { minutes: 0 });
        assert!(AnalysisWindow::new(at(1, 0, 0), at(2, 0, 0), -30).is_err());
    }

    #[test]
    fn rejects_bin_size_not_dividing_day() {
        let err = AnalysisWindow::new(at(1, 0, 0), at(2, 0, 0), 7).unwrap_err();
        assert_eq!(err, ValidationError::BinSizeNotDividingDay { minutes: 7 });
    }

    #[test]
    fn rejects_inverted_or_empty_window() {
        assert!(matches!(
            AnalysisWindow::new(at(2, 0, 0), at(1, 0, 0), 60),
            Err(ValidationError::WindowEndNotAfterStart { .. })
        ));
        assert!(AnalysisWindow::new(at(1, 0, 0), at(1, 0, 0), 60).is_err());
    }

    #[test]
    fn bin_start_reconstructs_timestamps() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(1, 4, 0), 60).unwrap();
        assert_eq!(window.bin_start(0), at(1, 0, 0));
        assert_eq!(window.bin_start(3), at(1, 3, 0));
        let starts: Vec<_> = window.bin_starts().collect();
        assert_eq!(starts.len(), 4);
        assert_eq!(starts[2], at(1, 2, 0));
    }

    #[test]
    fn window_end_falls_outside_last_bin() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(1, 4, 0), 60).unwrap();
        assert_eq!(window.bin_of(at(1, 4, 0)), 4);
        assert!(window.bin_of(at(1, 4, 0)) > window.last_bin());
    }
}
