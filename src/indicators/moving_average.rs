//! Moving averages over closing price
//!
//! EMA is seeded with the SMA of the first `period` closes and uses the
//! multiplier `k = 2 / (period + 1)`. The update is written as
//! `prev + (close - prev) * k`, algebraically `close * k + prev * (1 - k)`,
//! so a constant input reproduces itself exactly. No rounding happens inside
//! either recurrence.

use super::SeriesPoint;
use crate::OHLCV;

/// Simple moving average of `close`.
///
/// Emits one point for every index `i >= period - 1`. Returns an empty vector
/// when `period == 0` or the series is shorter than `period`.
pub fn sma<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(bars.len() - period + 1);
    let mut sum: f64 = bars[..period].iter().map(|b| b.close()).sum();
    out.push(SeriesPoint::new(bars[period - 1].time(), sum / period as f64));

    for i in period..bars.len() {
        sum += bars[i].close() - bars[i - period].close();
        out.push(SeriesPoint::new(bars[i].time(), sum / period as f64));
    }

    out
}

/// Exponential moving average of `close`.
///
/// The first point sits at index `period - 1` and equals the SMA seed.
pub fn ema<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }
    let closes: Vec<SeriesPoint> = bars
        .iter()
        .map(|b| SeriesPoint::new(b.time(), b.close()))
        .collect();
    ema_points(&closes, period)
}

/// The EMA recurrence over any stamped value stream. `ema` feeds it closes;
/// the MACD signal line feeds it the MACD line.
pub(crate) fn ema_points(points: &[SeriesPoint], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || points.len() < period {
        return Vec::new();
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut value = points[..period].iter().map(|p| p.value).sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(points.len() - period + 1);
    out.push(SeriesPoint::new(points[period - 1].time, value));

    for p in &points[period..] {
        value += (p.value - value) * k;
        out.push(SeriesPoint::new(p.time, value));
    }

    out
}

/// SMA over the trailing `period` closes, `0.0` with insufficient history.
pub fn sma_last<T: OHLCV>(bars: &[T], period: usize) -> f64 {
    if period == 0 || bars.len() < period {
        return 0.0;
    }
    let recent = &bars[bars.len() - period..];
    recent.iter().map(|b| b.close()).sum::<f64>() / period as f64
}

/// EMA at the last bar, `0.0` with insufficient history.
pub fn ema_last<T: OHLCV>(bars: &[T], period: usize) -> f64 {
    ema(bars, period).last().map_or(0.0, |p| p.value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn closes(values: &[f64]) -> Vec<Bar> {
        values
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 60, c, c + 1.0, c - 1.0, c, 10.0))
            .collect()
    }

    #[test]
    fn test_sma_shorter_than_period_is_empty() {
        let bars = closes(&[1.0, 2.0, 3.0]);
        assert!(sma(&bars, 4).is_empty());
        assert!(sma(&bars, 0).is_empty());
        assert_eq!(sma_last(&bars, 4), 0.0);
    }

    #[test]
    fn test_sma_exact_period_yields_one_point() {
        let bars = closes(&[1.0, 2.0, 3.0]);
        let points = sma(&bars, 3);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].time, 120);
        assert!((points[0].value - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_sma_rolling() {
        let bars = closes(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let values: Vec<f64> = sma(&bars, 2).iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.5, 2.5, 3.5, 4.5]);
        assert!((sma_last(&bars, 2) - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_ema_seed_and_recurrence() {
        let bars = closes(&[2.0, 4.0, 6.0, 8.0]);
        let points = ema(&bars, 3);
        assert_eq!(points.len(), 2);
        // seed = (2+4+6)/3 = 4, k = 0.5
        assert!((points[0].value - 4.0).abs() < 1e-12);
        assert!((points[1].value - 6.0).abs() < 1e-12);
        assert!((ema_last(&bars, 3) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_ema_exact_period_yields_one_point() {
        let bars = closes(&[5.0; 10]);
        assert_eq!(ema(&bars, 10).len(), 1);
        assert!(ema(&bars, 11).is_empty());
        assert_eq!(ema_last(&bars, 11), 0.0);
    }

    #[test]
    fn test_ema_constant_close_stays_constant() {
        let bars = closes(&[42.0; 80]);
        for p in ema(&bars, 50) {
            assert_eq!(p.value, 42.0);
        }
    }
}
