//! Volume average, amplitude and percent-change helpers

use crate::OHLCV;

/// Default volume MA lookback
pub const VOLUME_MA_PERIOD: usize = 20;

/// Default amplitude window (24 bars, i.e. 24h on hourly data)
pub const AMPLITUDE_WINDOW: usize = 24;

/// Mean volume over the trailing `period` bars, `0.0` with insufficient history.
pub fn volume_ma<T: OHLCV>(bars: &[T], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return 0.0;
    }
    let recent = &bars[bars.len() - period..];
    recent.iter().map(|b| b.volume()).sum::<f64>() / period as f64
}

/// High/low range of the trailing `window` bars as a percentage of the low.
///
/// `(max(high) - min(low)) / min(low) * 100`. Returns `0.0` with
/// insufficient history or when the window's low is not positive.
pub fn amplitude<T: OHLCV>(bars: &[T], window: usize) -> f64 {
    if window == 0 || bars.len() < window {
        return 0.0;
    }
    let recent = &bars[bars.len() - window..];
    let (high, low) = recent
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), b| {
            (h.max(b.high()), l.min(b.low()))
        });
    if low <= 0.0 {
        return 0.0;
    }
    (high - low) / low * 100.0
}

/// `(current - previous) / previous * 100`.
///
/// Saturates to `0.0` when `previous == 0`. This is a display policy, not a
/// numerically meaningful value: a move away from zero has no defined
/// percentage.
#[inline]
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}
