//! Summary statistics over by-datetime rows.
//!
//! Nonstationary summaries group bins by day of week and bin of day, so each
//! output row describes e.g. "Tuesdays 14:00-15:00" across the whole window.
//! Stationary summaries describe each series over all of its bins.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::bydatetime::BinRow;
use crate::types::Percentile;

/// A by-datetime column that can be summarised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Occupancy,
    Arrivals,
    Departures,
}

impl Metric {
    pub const ALL: [Self; 3] = [Self::Occupancy, Self::Arrivals, Self::Departures];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Occupancy => "occupancy",
            Self::Arrivals => "arrivals",
            Self::Departures => "departures",
        }
    }

    /// Reads this metric from a row.
    #[must_use]
    pub const fn of(&self, row: &BinRow) -> f64 {
        match self {
            Self::Occupancy => row.occupancy,
            Self::Arrivals => row.arrivals,
            Self::Departures => row.departures,
        }
    }
}

/// Descriptive statistics of a group of bin values.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation; absent for fewer than two values.
    pub stdev: Option<f64>,
    /// Requested percentiles with their values, in request order.
    pub percentiles: Vec<(Percentile, f64)>,
}

/// Statistics for one (series, metric, day of week, bin of day) group.
#[derive(Debug, Clone, PartialEq)]
pub struct NonstationaryRow {
    pub series: String,
    pub metric: Metric,
    pub day_of_week: u32,
    pub dow_name: &'static str,
    pub bin_of_day: i64,
    pub stats: SummaryStats,
}

/// Statistics for one (series, metric) group over all bins.
#[derive(Debug, Clone, PartialEq)]
pub struct StationaryRow {
    pub series: String,
    pub metric: Metric,
    pub stats: SummaryStats,
}

/// Value at quantile `q` of ascending `sorted`, interpolating linearly between closest ranks.
///
/// `sorted` must be non-empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Computes descriptive statistics, or `None` for an empty group.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn describe(values: &[f64], percentiles: &[Percentile]) -> Option<SummaryStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let n = count as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let stdev = (count > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    Some(SummaryStats {
        count,
        mean,
        min: sorted[0],
        max: sorted[count - 1],
        stdev,
        percentiles: percentiles
            .iter()
            .map(|&p| (p, quantile(&sorted, p.value())))
            .collect(),
    })
}

/// Series labels in the order they first appear.
fn series_order(rows: &[BinRow]) -> Vec<&str> {
    let mut order: Vec<&str> = Vec::new();
    for row in rows {
        let series = row.series.as_str();
        // Rows arrive grouped by series, so the last label is the common hit.
        if order.last() == Some(&series) || order.contains(&series) {
            continue;
        }
        order.push(series);
    }
    order
}

/// Summarises each series and metric by day of week and bin of day.
pub fn summarize_nonstationary(
    rows: &[BinRow],
    percentiles: &[Percentile],
) -> Vec<NonstationaryRow> {
    let order = series_order(rows);
    let mut groups: BTreeMap<(usize, Metric, u32, i64), (&'static str, Vec<f64>)> =
        BTreeMap::new();

    for row in rows {
        let series = order.iter().position(|s| *s == row.series).unwrap_or(0);
        for metric in Metric::ALL {
            groups
                .entry((series, metric, row.day_of_week, row.bin_of_day))
                .or_insert_with(|| (row.dow_name, Vec::new()))
                .1
                .push(metric.of(row));
        }
    }

    groups
        .into_iter()
        .filter_map(|((series, metric, day_of_week, bin_of_day), (dow_name, values))| {
            let stats = describe(&values, percentiles)?;
            Some(NonstationaryRow {
                series: order[series].to_string(),
                metric,
                day_of_week,
                dow_name,
                bin_of_day,
                stats,
            })
        })
        .collect()
}

/// Summarises each series and metric over all bins.
pub fn summarize_stationary(rows: &[BinRow], percentiles: &[Percentile]) -> Vec<StationaryRow> {
    let order = series_order(rows);
    let mut groups: BTreeMap<(usize, Metric), Vec<f64>> = BTreeMap::new();

    for row in rows {
        let series = order.iter().position(|s| *s == row.series).unwrap_or(0);
        for metric in Metric::ALL {
            groups
                .entry((series, metric))
                .or_default()
                .push(metric.of(row));
        }
    }

    groups
        .into_iter()
        .filter_map(|((series, metric), values)| {
            let stats = describe(&values, percentiles)?;
            Some(StationaryRow {
                series: order[series].to_string(),
                metric,
                stats,
            })
        })
        .collect()
}
