//! Bin indexing.
//!
//! Maps absolute timestamps onto `bin_size_minutes`-wide intervals. The
//! window-relative index drives accumulation; the day/week descriptors are
//! clock-relative and only used by the by-datetime layer.

use chrono::{Datelike, NaiveDateTime, Timelike};

/// Minutes in one day. Bin sizes must divide this evenly.
pub const MINUTES_PER_DAY: i64 = 1440;

const MS_PER_MINUTE: i64 = 60_000;

/// Number of whole bins between `window_start` and `timestamp`.
///
/// Truncates toward negative infinity, so timestamps before the window start
/// yield negative indices and a timestamp exactly on a bin boundary belongs to
/// the bin that starts there.
///
/// `bin_size_minutes` must be positive.
pub fn bin_of_span(
    timestamp: NaiveDateTime,
    window_start: NaiveDateTime,
    bin_size_minutes: i64,
) -> i64 {
    let offset_ms = (timestamp - window_start).num_milliseconds();
    offset_ms.div_euclid(bin_size_minutes * MS_PER_MINUTE)
}

/// Bin of the day containing `timestamp`, counted from midnight.
pub fn bin_of_day(timestamp: NaiveDateTime, bin_size_minutes: i64) -> i64 {
    let minutes = i64::from(timestamp.num_seconds_from_midnight()) / 60;
    minutes / bin_size_minutes
}

/// Bin of the week containing `timestamp`, counted from Monday midnight.
pub fn bin_of_week(timestamp: NaiveDateTime, bin_size_minutes: i64) -> i64 {
    let bins_per_day = MINUTES_PER_DAY / bin_size_minutes;
    let day = i64::from(timestamp.weekday().num_days_from_monday());
    day * bins_per_day + bin_of_day(timestamp, bin_size_minutes)
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
    fn bin_of_span_counts_whole_bins() {
        let start = at(1, 0, 0);
        assert_eq!(bin_of_span(at(1, 0, 0), start, 60), 0);
        assert_eq!(bin_of_span(at(1, 0, 59), start, 60), 0);
        assert_eq!(bin_of_span(at(1, 1, 0), start, 60), 1);
        assert_eq!(bin_of_span(at(1, 3, 45), start, 30), 7);
    }

    #[test]
    fn bin_of_span_floors_before_start() {
        let start = at(1, 0, 0);
        // 2023-12-31 23:45 is one bin before the start, not zero
        let before = start - chrono::Duration::minutes(15);
        assert_eq!(bin_of_span(before, start, 60), -1);
        let long_before = start - chrono::Duration::minutes(61);
        assert_eq!(bin_of_span(long_before, start, 60), -2);
    }

    #[test]
    fn bin_of_span_ignores_subminute_offsets_within_bin() {
        let start = at(1, 0, 0);
        let ts = at(1, 0, 14) + chrono::Duration::seconds(59);
        assert_eq!(bin_of_span(ts, start, 15), 0);
    }

    #[test]
    fn bin_of_day_is_window_independent() {
        assert_eq!(bin_of_day(at(1, 0, 0), 60), 0);
        assert_eq!(bin_of_day(at(1, 23, 59), 60), 23);
        assert_eq!(bin_of_day(at(1, 13, 30), 30), 27);
    }

    #[test]
    fn bin_of_week_starts_monday() {
        // 2024-01-01 is a Monday
        assert_eq!(bin_of_week(at(1, 0, 0), 60), 0);
        assert_eq!(bin_of_week(at(2, 1, 0), 60), 25);
        // Sunday 23:00 is the last hourly bin of the week
        assert_eq!(bin_of_week(at(7, 23, 0), 60), 167);
    }
}
