//! Per-stay occupancy increments and their clipping to the window.

use thiserror::Error;

use crate::classify::{BinSpan, RecordClass};
use crate::edge::EdgeFractions;

/// A clipping rule produced a sequence inconsistent with its span.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot clip {class} span [{entry_bin}, {exit_bin}] of {len} bins to {num_bins} bins")]
pub struct ClipError {
    pub class: RecordClass,
    pub entry_bin: i64,
    pub exit_bin: i64,
    /// Unclipped span length.
    pub len: usize,
    pub num_bins: usize,
}

/// Increments of one stay after clipping, with the bins they start and end at.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedIncrements {
    pub entry_bin: usize,
    pub exit_bin: usize,
    pub values: Vec<f64>,
}

impl ClippedIncrements {
    /// Sum of the occupancy credit in this sequence.
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.values.iter().sum()
    }
}

/// Increment at position `i` of an unclipped sequence of `len` values.
fn increment_at(i: usize, len: usize, fractions: EdgeFractions) -> f64 {
    if i == 0 {
        fractions.entry
    } else if i + 1 == len {
        fractions.exit
    } else {
        1.0
    }
}

/// Builds the raw increment sequence for a span, one value per bin from entry to exit.
///
/// Interior bins are fully occupied; the first and last bins carry the edge
/// fractions. A single-bin span carries only the entry fraction. Backwards spans
/// yield an empty sequence. Allocates one value per spanned bin, so spans
/// reaching far outside the window should go through [`clip`] instead.
#[must_use]
pub fn build_increments(span: BinSpan, fractions: EdgeFractions) -> Vec<f64> {
    let len = usize::try_from(span.len()).unwrap_or(0);
    (0..len).map(|i| increment_at(i, len, fractions)).collect()
}

/// Builds the increments of a span already clipped to bins `[0, num_bins - 1]`.
///
/// Only the values inside the window are produced: the entry fraction when the
/// entry bin is kept, full bins in between, and the exit fraction when the exit
/// bin is kept. Returns `Ok(None)` for classes that contribute nothing. The
/// sequence length always equals `exit_bin - entry_bin + 1`.
pub fn clip(
    class: RecordClass,
    span: BinSpan,
    fractions: EdgeFractions,
    num_bins: usize,
) -> Result<Option<ClippedIncrements>, ClipError> {
    let len = usize::try_from(span.len()).unwrap_or(0);
    let error = || ClipError {
        class,
        entry_bin: span.entry_bin,
        exit_bin: span.exit_bin,
        len,
        num_bins,
    };
    let last = num_bins.checked_sub(1).ok_or_else(error)?;

    // Bins to drop from the front and back of the unclipped span.
    let (head, tail) = match class {
        RecordClass::Inner => (0, 0),
        RecordClass::Left => (overhang_before(span), 0),
        RecordClass::Right => (0, overhang_after(span, last)),
        RecordClass::Outer => (overhang_before(span), overhang_after(span, last)),
        RecordClass::Backwards | RecordClass::NoOverlap => return Ok(None),
    };

    let keep = len
        .checked_sub(head)
        .and_then(|n| n.checked_sub(tail))
        .filter(|&n| n > 0)
        .ok_or_else(error)?;

    let entry_bin = usize::try_from(span.entry_bin.max(0)).map_err(|_| error())?;
    let exit_bin = entry_bin + keep - 1;
    if exit_bin > last {
        return Err(error());
    }

    let values = (head..head + keep)
        .map(|i| increment_at(i, len, fractions))
        .collect();
    Ok(Some(ClippedIncrements {
        entry_bin,
        exit_bin,
        values,
    }))
}

/// Bins of the span that fall before bin 0.
fn overhang_before(span: BinSpan) -> usize {
    usize::try_from(-span.entry_bin).unwrap_or(0)
}

/// Bins of the span that fall after bin `last`.
fn overhang_after(span: BinSpan, last: usize) -> usize {
    let last = i64::try_from(last).unwrap_or(i64::MAX);
    usize::try_from(span.exit_bin - last).unwrap_or(0)
}

#[cfg(test)]
#[expect(
    clippy::float_cmp,
    reason = "increments are copied values, not computed ones"
)]
mod tests {
    use super::*;

    fn span(entry_bin: i64, exit_bin: i64) -> BinSpan {
        BinSpan {
            entry_bin,
            exit_bin,
        }
    }

    const FRACS: EdgeFractions = EdgeFractions {
        entry: 0.5,
        exit: 0.75,
    };

    #[test]
    fn single_bin_uses_entry_fraction_only() {
        assert_eq!(build_increments(span(2, 2), FRACS), vec![0.5]);
    }

    #[test]
    fn two_bins_use_both_fractions() {
        assert_eq!(build_increments(span(0, 1), FRACS), vec![0.5, 0.75]);
    }

    #[test]
    fn interior_bins_are_full() {
        assert_eq!(
            build_increments(span(0, 4), FRACS),
            vec![0.5, 1.0, 1.0, 1.0, 0.75]
        );
    }

    #[test]
    fn backwards_span_builds_nothing() {
        assert!(build_increments(span(3, 1), FRACS).is_empty());
    }

    #[test]
    fn inner_is_not_clipped() {
        let clipped = clip(RecordClass::Inner, span(1, 2), FRACS, 4)
            .unwrap()
            .unwrap();
        assert_eq!(clipped.entry_bin, 1);
        assert_eq!(clipped.exit_bin, 2);
        assert_eq!(clipped.values, vec![0.5, 0.75]);
    }

    #[test]
    fn left_drops_leading_bins() {
        let clipped = clip(RecordClass::Left, span(-2, 1), FRACS, 4)
            .unwrap()
            .unwrap();
        assert_eq!(clipped.entry_bin, 0);
        assert_eq!(clipped.exit_bin, 1);
        assert_eq!(clipped.values, vec![1.0, 0.75]);
    }

    #[test]
    fn right_drops_trailing_bins() {
        let clipped = clip(RecordClass::Right, span(2, 6), FRACS, 4)
            .unwrap()
            .unwrap();
        assert_eq!(clipped.entry_bin, 2);
        assert_eq!(clipped.exit_bin, 3);
        assert_eq!(clipped.values, vec![0.5, 1.0]);
    }

    #[test]
    fn outer_drops_both_ends() {
        let clipped = clip(RecordClass::Outer, span(-1, 5), FRACS, 4)
            .unwrap()
            .unwrap();
        assert_eq!(clipped.entry_bin, 0);
        assert_eq!(clipped.exit_bin, 3);
        assert_eq!(clipped.values, vec![1.0; 4]);
    }

    #[test]
    fn clipping_matches_slice_of_full_sequence() {
        let s = span(-3, 8);
        let full = build_increments(s, FRACS);
        let clipped = clip(RecordClass::Outer, s, FRACS, 6).unwrap().unwrap();
        assert_eq!(clipped.values, full[3..9]);
    }

    #[test]
    fn far_overhang_allocates_only_window_bins() {
        // Roughly seven thousand years of minutes past a one-day window
        let s = span(10, 3_700_000_000);
        let clipped = clip(RecordClass::Right, s, FRACS, 1440).unwrap().unwrap();
        assert_eq!(clipped.entry_bin, 10);
        assert_eq!(clipped.exit_bin, 1439);
        assert_eq!(clipped.values.len(), 1430);
        assert_eq!(clipped.values[0], 0.5);
        assert!(clipped.values[1..].iter().all(|&v| v == 1.0));

        let s = span(-3_700_000_000, 3_700_000_000);
        let clipped = clip(RecordClass::Outer, s, FRACS, 1440).unwrap().unwrap();
        assert_eq!(clipped.values, vec![1.0; 1440]);
    }

    #[test]
    fn non_contributing_classes_clip_to_nothing() {
        assert!(
            clip(RecordClass::NoOverlap, span(5, 7), FRACS, 4)
                .unwrap()
                .is_none()
        );
        assert!(
            clip(RecordClass::Backwards, span(2, 1), FRACS, 4)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn inconsistent_class_is_an_error() {
        // A right-overhanging span labelled inner would write past the window
        let err = clip(RecordClass::Inner, span(2, 6), FRACS, 4).unwrap_err();
        assert_eq!(err.len, 5);
        assert_eq!(err.num_bins, 4);
    }

    #[test]
    fn span_entirely_before_window_is_an_error() {
        assert!(clip(RecordClass::Left, span(-5, -2), FRACS, 4).is_err());
    }

    #[test]
    fn clipped_mass_sums_values() {
        let clipped = clip(RecordClass::Left, span(-1, 1), FRACS, 4)
            .unwrap()
            .unwrap();
        assert_eq!(clipped.mass(), 1.75);
    }
}
