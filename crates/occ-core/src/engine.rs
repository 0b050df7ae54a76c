//! Per-category bin construction.
//!
//! Partitions stays by category, accumulates each category independently in
//! parallel, then reduces the category series into totals.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use rayon::prelude::*;
use thiserror::Error;

use crate::accumulate::{AccumulateError, Accumulator, BinSeries, StayRecord};
use crate::aggregate;
use crate::classify::RecordClass;
use crate::types::{Category, EdgePolicy};
use crate::window::AnalysisWindow;

/// Label of the totals series in tabular output.
pub const TOTALS_LABEL: &str = "total";

/// Label of the single series produced when stays are not grouped.
pub const OVERALL_LABEL: &str = "overall";

/// Errors from bin construction.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Accumulation failed inside one category.
    #[error("accumulation failed for category {category}")]
    Category {
        category: Category,
        #[source]
        source: AccumulateError,
    },

    /// A category shares its label with the totals series.
    #[error("category {category} has the same label as the totals series")]
    ReservedCategory { category: Category },

    /// Accumulation failed for ungrouped stays.
    #[error(transparent)]
    Accumulate(#[from] AccumulateError),
}

/// Whether stays are split by category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Grouping {
    /// One series for the whole population; categories are ignored.
    #[default]
    Ungrouped,
    /// One series per category, minus the excluded ones.
    ByCategory { exclude: BTreeSet<Category> },
}

/// Options for a binning run.
#[derive(Debug, Clone)]
pub struct BinningOptions {
    pub window: AnalysisWindow,
    pub edge_policy: EdgePolicy,
    pub grouping: Grouping,
    /// Whether to add a totals series when grouping by category.
    pub totals: bool,
}

impl BinningOptions {
    /// Ungrouped, fractional-edge options for `window`.
    #[must_use]
    pub fn new(window: AnalysisWindow) -> Self {
        Self {
            window,
            edge_policy: EdgePolicy::default(),
            grouping: Grouping::default(),
            totals: true,
        }
    }
}

/// Identifies one series of a [`BinnedOccupancy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKey<'a> {
    Overall,
    Category(&'a Category),
    Totals,
}

impl<'a> SeriesKey<'a> {
    /// Label used for this series in tabular output and file names.
    #[must_use]
    pub fn label(&self) -> &'a str {
        match self {
            Self::Overall => OVERALL_LABEL,
            Self::Category(category) => category.as_str(),
            Self::Totals => TOTALS_LABEL,
        }
    }
}

impl fmt::Display for SeriesKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Result of a binning run.
#[derive(Debug, Clone, PartialEq)]
pub enum BinnedOccupancy {
    /// Stays were not grouped; one series for everything, no totals.
    Overall(BinSeries),
    /// One series per category, plus totals when requested.
    ByCategory {
        categories: BTreeMap<Category, BinSeries>,
        totals: Option<BinSeries>,
    },
}

impl BinnedOccupancy {
    /// Iterates every series with its key: categories in order, then totals.
    pub fn iter(&self) -> impl Iterator<Item = (SeriesKey<'_>, &BinSeries)> {
        let (overall, categories, totals) = match self {
            Self::Overall(series) => (Some(series), None, None),
            Self::ByCategory { categories, totals } => (None, Some(categories), totals.as_ref()),
        };

        overall
            .map(|s| (SeriesKey::Overall, s))
            .into_iter()
            .chain(
                categories
                    .into_iter()
                    .flatten()
                    .map(|(c, s)| (SeriesKey::Category(c), s)),
            )
            .chain(totals.map(|s| (SeriesKey::Totals, s)))
    }

    /// Looks up a category's series.
    #[must_use]
    pub fn category(&self, category: &str) -> Option<&BinSeries> {
        match self {
            Self::Overall(_) => None,
            Self::ByCategory { categories, .. } => categories
                .iter()
                .find(|(c, _)| c.as_str() == category)
                .map(|(_, s)| s),
        }
    }

    /// The totals series, when one was computed.
    #[must_use]
    pub const fn totals(&self) -> Option<&BinSeries> {
        match self {
            Self::Overall(_) => None,
            Self::ByCategory { totals, .. } => totals.as_ref(),
        }
    }
}

/// Computes arrivals, departures and occupancy by bin.
///
/// Records whose category is missing (when grouping) are skipped with a warning.
/// A category labelled like the totals series is an error when totals are on.
/// Records are identified by their index in `records` in error messages.
pub fn compute_occupancy<R>(
    records: &[R],
    options: &BinningOptions,
) -> Result<BinnedOccupancy, EngineError>
where
    R: StayRecord + Sync,
{
    let window = options.window;
    let policy = options.edge_policy;

    let exclude = match &options.grouping {
        Grouping::Ungrouped => {
            let mut acc = Accumulator::new(window, policy);
            acc.extend(records.iter().enumerate())?;
            let series = acc.finish();
            log_series(OVERALL_LABEL, &series);
            return Ok(BinnedOccupancy::Overall(series));
        }
        Grouping::ByCategory { exclude } => exclude,
    };

    let groups = partition_by_category(records, exclude, options.totals)?;

    let results: Vec<(Category, BinSeries)> = groups
        .into_par_iter()
        .map(|(category, indices)| {
            let mut acc = Accumulator::new(window, policy);
            let pairs = indices.into_iter().map(|i| (i, &records[i]));
            match acc.extend(pairs) {
                Ok(()) => {
                    let series = acc.finish();
                    log_series(category.as_str(), &series);
                    Ok((category, series))
                }
                Err(source) => Err(EngineError::Category { category, source }),
            }
        })
        .collect::<Result<Vec<_>, EngineError>>()?;

    let categories: BTreeMap<Category, BinSeries> = results.into_iter().collect();
    let totals = options
        .totals
        .then(|| aggregate::totals(categories.values(), window.num_bins()));

    Ok(BinnedOccupancy::ByCategory { categories, totals })
}

/// Groups record indices by category, dropping excluded and uncategorised records.
///
/// With `totals` set, a kept category named [`TOTALS_LABEL`] is rejected.
fn partition_by_category<R: StayRecord>(
    records: &[R],
    exclude: &BTreeSet<Category>,
    totals: bool,
) -> Result<BTreeMap<Category, Vec<usize>>, EngineError> {
    let mut groups: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
    let mut uncategorised = 0usize;

    for (index, record) in records.iter().enumerate() {
        let Some(category) = record.category().and_then(|c| Category::new(c).ok()) else {
            uncategorised += 1;
            continue;
        };
        if exclude.contains(&category) {
            continue;
        }
        if totals && category.as_str() == TOTALS_LABEL {
            return Err(EngineError::ReservedCategory { category });
        }
        groups.entry(category).or_default().push(index);
    }

    if uncategorised > 0 {
        tracing::warn!(count = uncategorised, "skipping records without a category");
    }
    Ok(groups)
}

fn log_series(label: &str, series: &BinSeries) {
    let classes = &series.classes;
    if classes.backwards > 0 {
        tracing::warn!(
            series = label,
            count = classes.backwards,
            "records with exit before entry ignored"
        );
    }
    tracing::debug!(
        series = label,
        inner = classes.get(RecordClass::Inner),
        left = classes.get(RecordClass::Left),
        right = classes.get(RecordClass::Right),
        outer = classes.get(RecordClass::Outer),
        none = classes.get(RecordClass::NoOverlap),
        "series accumulated"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    struct TestStay {
        entry: NaiveDateTime,
        exit: NaiveDateTime,
        category: Option<String>,
    }

    impl StayRecord for TestStay {
        fn entry(&self) -> NaiveDateTime {
            self.entry
        }

        fn exit(&self) -> NaiveDateTime {
            self.exit
        }

        fn category(&self) -> Option<&str> {
            self.category.as_deref()
        }
    }

    fn ts(minutes: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid test timestamp")
            + Duration::minutes(minutes)
    }

    fn stay(entry: i64, exit: i64, category: Option<&str>) -> TestStay {
        TestStay {
            entry: ts(entry),
            exit: ts(exit),
            category: category.map(String::from),
        }
    }

    fn options(grouping: Grouping) -> BinningOptions {
        BinningOptions {
            grouping,
            ..BinningOptions::new(AnalysisWindow::new(ts(0), ts(240), 60).unwrap())
        }
    }

    fn by_category() -> Grouping {
        Grouping::ByCategory {
            exclude: BTreeSet::new(),
        }
    }

    #[test]
    fn ungrouped_produces_single_series_without_totals() {
        let stays = [stay(30, 75, Some("A")), stay(30, 75, Some("B"))];
        let result = compute_occupancy(&stays, &options(Grouping::Ungrouped)).unwrap();

        let BinnedOccupancy::Overall(series) = &result else {
            panic!("expected overall series");
        };
        assert_eq!(series.occupancy, vec![1.0, 1.5, 0.0, 0.0]);
        assert!(result.totals().is_none());
        assert_eq!(result.iter().count(), 1);
    }

    #[test]
    fn grouped_produces_categories_and_totals() {
        let stays = [stay(30, 75, Some("B")), stay(30, 75, Some("A"))];
        let result = compute_occupancy(&stays, &options(by_category())).unwrap();

        let keys: Vec<_> = result.iter().map(|(k, _)| k.label().to_string()).collect();
        assert_eq!(keys, vec!["A", "B", "total"]);
        assert_eq!(
            result.category("A").unwrap().occupancy,
            vec![0.5, 0.75, 0.0, 0.0]
        );
        assert_eq!(result.totals().unwrap().occupancy, vec![1.0, 1.5, 0.0, 0.0]);
    }

    #[test]
    fn totals_can_be_disabled() {
        let stays = [stay(30, 75, Some("A"))];
        let opts = BinningOptions {
            totals: false,
            ..options(by_category())
        };
        let result = compute_occupancy(&stays, &opts).unwrap();
        assert!(result.totals().is_none());
    }

    #[test]
    fn excluded_categories_vanish_from_output_and_totals() {
        let stays = [stay(30, 75, Some("A")), stay(0, 200, Some("X"))];
        let exclude = BTreeSet::from([Category::new("X").unwrap()]);
        let result = compute_occupancy(&stays, &options(Grouping::ByCategory { exclude })).unwrap();

        assert!(result.category("X").is_none());
        assert_eq!(result.totals().unwrap().occupancy, vec![0.5, 0.75, 0.0, 0.0]);
    }

    #[test]
    fn uncategorised_records_are_skipped_when_grouping() {
        let stays = [stay(30, 75, Some("A")), stay(30, 75, None), stay(30, 75, Some(""))];
        let result = compute_occupancy(&stays, &options(by_category())).unwrap();
        assert_eq!(result.totals().unwrap().classes.total(), 1);
    }

    #[test]
    fn empty_input_grouped_has_zero_totals() {
        let stays: Vec<TestStay> = Vec::new();
        let result = compute_occupancy(&stays, &options(by_category())).unwrap();
        assert_eq!(result.iter().count(), 1);
        assert_eq!(result.totals().unwrap(), &BinSeries::zeros(4));
    }

    #[test]
    fn category_named_like_totals_is_rejected() {
        let stays = [stay(30, 75, Some("A")), stay(30, 75, Some("total"))];
        let err = compute_occupancy(&stays, &options(by_category())).unwrap_err();
        assert_eq!(
            err,
            EngineError::ReservedCategory {
                category: Category::new("total").unwrap()
            }
        );
    }

    #[test]
    fn category_named_like_totals_is_kept_without_totals() {
        let stays = [stay(30, 75, Some("total"))];
        let opts = BinningOptions {
            totals: false,
            ..options(by_category())
        };
        let result = compute_occupancy(&stays, &opts).unwrap();
        assert!(result.category("total").is_some());

        let exclude = BTreeSet::from([Category::new("total").unwrap()]);
        let result = compute_occupancy(&stays, &options(Grouping::ByCategory { exclude })).unwrap();
        assert_eq!(result.iter().count(), 1);
    }

    #[test]
    fn series_key_labels() {
        let cat = Category::new("ART").unwrap();
        assert_eq!(SeriesKey::Category(&cat).label(), "ART");
        assert_eq!(SeriesKey::Totals.to_string(), "total");
        assert_eq!(SeriesKey::Overall.to_string(), "overall");
    }
}
