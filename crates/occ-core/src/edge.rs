//! Edge-bin occupancy fractions.

use chrono::NaiveDateTime;

use crate::types::EdgePolicy;
use crate::window::AnalysisWindow;

/// Fractions credited to a stay's entry and exit bins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFractions {
    pub entry: f64,
    pub exit: f64,
}

impl EdgeFractions {
    /// Computes both edge fractions for a stay under `policy`.
    #[must_use]
    pub fn of(
        entry: NaiveDateTime,
        exit: NaiveDateTime,
        window: &AnalysisWindow,
        policy: EdgePolicy,
    ) -> Self {
        Self {
            entry: entry_fraction(entry, window, policy),
            exit: exit_fraction(exit, window, policy),
        }
    }
}

/// Milliseconds elapsed between the start of the bin containing `timestamp` and `timestamp`.
fn offset_in_bin_ms(timestamp: NaiveDateTime, window: &AnalysisWindow) -> i64 {
    (timestamp - window.start())
        .num_milliseconds()
        .rem_euclid(window.bin_ms())
}

/// Entry-bin fraction: time elapsed within the entry bin over the bin length.
///
/// Always `1.0` under [`EdgePolicy::Whole`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn entry_fraction(
    timestamp: NaiveDateTime,
    window: &AnalysisWindow,
    policy: EdgePolicy,
) -> f64 {
    match policy {
        EdgePolicy::Fractional => {
            offset_in_bin_ms(timestamp, window) as f64 / window.bin_ms() as f64
        }
        EdgePolicy::Whole => 1.0,
    }
}

/// Exit-bin fraction: bin length minus time elapsed within the exit bin, over the bin length.
///
/// Always `1.0` under [`EdgePolicy::Whole`]. An exit exactly on a bin boundary
/// yields `1.0` for the bin starting there.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn exit_fraction(
    timestamp: NaiveDateTime,
    window: &AnalysisWindow,
    policy: EdgePolicy,
) -> f64 {
    match policy {
        EdgePolicy::Fractional => {
            let bin_ms = window.bin_ms();
            (bin_ms - offset_in_bin_ms(timestamp, window)) as f64 / bin_ms as f64
        }
        EdgePolicy::Whole => 1.0,
    }
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "fractions of whole minutes are exact in binary floating point"
)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .expect("valid test timestamp")
    }

    fn hourly() -> AnalysisWindow {
        AnalysisWindow::new(at(1, 0, 0), at(1, 4, 0), 60).unwrap()
    }

    #[test]
    fn fractional_entry_and_exit() {
        let window = hourly();
        assert_eq!(entry_fraction(at(1, 0, 30), &window, EdgePolicy::Fractional), 0.5);
        assert_eq!(exit_fraction(at(1, 1, 15), &window, EdgePolicy::Fractional), 0.75);
    }

    #[test]
    fn fractions_at_bin_boundaries() {
        let window = hourly();
        assert_eq!(entry_fraction(at(1, 2, 0), &window, EdgePolicy::Fractional), 0.0);
        assert_eq!(exit_fraction(at(1, 2, 0), &window, EdgePolicy::Fractional), 1.0);
    }

    #[test]
    fn fractions_before_window_start_use_the_same_grid() {
        let window = hourly();
        let before = at(1, 0, 0) - Duration::minutes(15);
        assert_eq!(entry_fraction(before, &window, EdgePolicy::Fractional), 0.75);
        assert_eq!(exit_fraction(before, &window, EdgePolicy::Fractional), 0.25);
    }

    #[test]
    fn fractions_respect_seconds() {
        let window = hourly();
        let ts = at(1, 0, 0) + Duration::seconds(90);
        assert_eq!(entry_fraction(ts, &window, EdgePolicy::Fractional), 0.025);
    }

    #[test]
    fn whole_bin_policy_is_always_one() {
        let window = hourly();
        let fractions = EdgeFractions::of(at(1, 0, 30), at(1, 1, 15), &window, EdgePolicy::Whole);
        assert_eq!(fractions, EdgeFractions { entry: 1.0, exit: 1.0 });
    }

    #[test]
    fn fractions_scale_with_bin_size() {
        let window = AnalysisWindow::new(at(1, 0, 0), at(2, 0, 0), 120).unwrap();
        assert_eq!(entry_fraction(at(1, 1, 30), &window, EdgePolicy::Fractional), 0.75);
        assert_eq!(exit_fraction(at(1, 3, 0), &window, EdgePolicy::Fractional), 0.5);
    }
}
