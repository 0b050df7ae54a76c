//! By-datetime rows: bin arrays labelled with calendar columns.

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::Serialize;

use crate::bins::{bin_of_day, bin_of_week};
use crate::engine::BinnedOccupancy;
use crate::window::AnalysisWindow;

/// One bin of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinRow {
    pub series: String,
    pub datetime: NaiveDateTime,
    pub arrivals: f64,
    pub departures: f64,
    pub occupancy: f64,
    /// Monday = 0.
    pub day_of_week: u32,
    pub dow_name: &'static str,
    pub bin_of_day: i64,
    pub bin_of_week: i64,
}

const fn dow_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Expands every series into rows, sorted by series then datetime.
pub fn bydatetime_rows(occupancy: &BinnedOccupancy, window: &AnalysisWindow) -> Vec<BinRow> {
    let bin_size = window.bin_size_minutes();
    let mut rows = Vec::new();

    for (key, series) in occupancy.iter() {
        let label = key.label();
        for (i, datetime) in window.bin_starts().enumerate() {
            let weekday = datetime.weekday();
            rows.push(BinRow {
                series: label.to_string(),
                datetime,
                arrivals: series.arrivals[i],
                departures: series.departures[i],
                occupancy: series.occupancy[i],
                day_of_week: weekday.num_days_from_monday(),
                dow_name: dow_name(weekday),
                bin_of_day: bin_of_day(datetime, bin_size),
                bin_of_week: bin_of_week(datetime, bin_size),
            });
        }
    }

    rows
}
