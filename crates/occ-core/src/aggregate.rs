//! Totals across categories.

use crate::accumulate::BinSeries;

/// Elementwise sum of every series, including their class tallies.
///
/// All series must cover `num_bins` bins. An empty input yields an all-zero series.
pub fn totals<'a, I>(series: I, num_bins: usize) -> BinSeries
where
    I: IntoIterator<Item = &'a BinSeries>,
{
    series
        .into_iter()
        .fold(BinSeries::zeros(num_bins), |mut total, s| {
            total.add(s);
            total
        })
}
