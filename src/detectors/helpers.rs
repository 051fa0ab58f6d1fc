//! Common helpers for the window detectors
//!
//! Windowing, extrema and tolerance comparisons shared by the
//! support/resistance, swing and structure modules.

use crate::OHLCV;

/// The trailing `n` bars (all of them if the slice is shorter).
#[inline]
pub fn trailing<T>(bars: &[T], n: usize) -> &[T] {
    &bars[bars.len().saturating_sub(n)..]
}

/// `(max high, min low)` of a window, `None` when empty.
#[inline]
pub fn high_low<T: OHLCV>(bars: &[T]) -> Option<(f64, f64)> {
    if bars.is_empty() {
        return None;
    }
    Some(bars.iter().fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), b| {
        (h.max(b.high()), l.min(b.low()))
    }))
}

/// `|a - b| <= tolerance * reference`
#[inline]
pub fn within_tolerance(a: f64, b: f64, tolerance: f64, reference: f64) -> bool {
    (a - b).abs() <= tolerance * reference.abs()
}

/// Bar `index` is a strict local maximum of `value` over
/// `[index - radius, index + radius]`.
///
/// Requires a full neighbourhood on both sides.
#[inline]
pub fn is_strict_peak<T, F>(bars: &[T], index: usize, radius: usize, value: F) -> bool
where
    F: Fn(&T) -> f64,
{
    if radius == 0 || index < radius || index + radius >= bars.len() {
        return false;
    }
    let v = value(&bars[index]);
    (index - radius..=index + radius)
        .filter(|&j| j != index)
        .all(|j| value(&bars[j]) < v)
}

/// Pivot high with plateau tie-breaking: neighbours to the left must be
/// strictly lower, neighbours to the right lower or equal. On a flat top the
/// earliest bar wins.
#[inline]
pub fn is_pivot_high<T: OHLCV>(bars: &[T], index: usize, radius: usize) -> bool {
    is_pivot(bars, index, radius, |b| b.high())
}

/// Pivot low, mirrored from [`is_pivot_high`].
#[inline]
pub fn is_pivot_low<T: OHLCV>(bars: &[T], index: usize, radius: usize) -> bool {
    is_pivot(bars, index, radius, |b| -b.low())
}

fn is_pivot<T, F>(bars: &[T], index: usize, radius: usize, value: F) -> bool
where
    F: Fn(&T) -> f64,
{
    if radius == 0 || index < radius || index + radius >= bars.len() {
        return false;
    }
    let v = value(&bars[index]);
    let left = (index - radius..index).all(|j| value(&bars[j]) < v);
    let right = (index + 1..=index + radius).all(|j| value(&bars[j]) <= v);
    left && right
}
