//! Extended indicators: MACD, Bollinger bands, stochastic, Williams %R, CCI, ATR
//!
//! These share the conventions of the core engines: SMA-seeded EMA, output
//! stamped with bar time, and an empty vector when history is insufficient.

use crate::{OHLCVExt, OHLCV};

use super::SeriesPoint;

// ============================================================
// MACD
// ============================================================

/// MACD line, signal line and histogram at one bar
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MacdPoint {
    pub time: i64,
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD (`fast` EMA − `slow` EMA) with a `signal` EMA of the MACD line.
///
/// Points start at the first bar where the signal line exists, i.e. index
/// `slow - 1 + signal - 1` when `fast < slow`.
pub fn macd<T: OHLCV>(bars: &[T], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    if fast == 0 || signal == 0 || fast >= slow || bars.len() < slow {
        return Vec::new();
    }

    let fast_ema = super::ema(bars, fast);
    let slow_ema = super::ema(bars, slow);
    // fast EMA starts earlier; align both on the slow EMA's first bar
    let offset = slow - fast;
    let line: Vec<SeriesPoint> = slow_ema
        .iter()
        .zip(&fast_ema[offset..])
        .map(|(s, f)| SeriesPoint::new(s.time, f.value - s.value))
        .collect();
    if line.len() < signal {
        return Vec::new();
    }

    super::moving_average::ema_points(&line, signal)
        .into_iter()
        .zip(&line[signal - 1..])
        .map(|(sig, p)| MacdPoint {
            time: p.time,
            macd: p.value,
            signal: sig.value,
            histogram: p.value - sig.value,
        })
        .collect()
}

// ============================================================
// BOLLINGER BANDS
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BollingerPoint {
    pub time: i64,
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger bands: SMA(`period`) ± `k` sample standard deviations.
pub fn bollinger_bands<T: OHLCV>(bars: &[T], period: usize, k: f64) -> Vec<BollingerPoint> {
    if period < 2 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|w| {
            let mean = w.iter().map(|b| b.close()).sum::<f64>() / period as f64;
            let var = w.iter().map(|b| (b.close() - mean).powi(2)).sum::<f64>()
                / (period - 1) as f64;
            let std = var.sqrt();
            BollingerPoint {
                time: w[period - 1].time(),
                upper: mean + k * std,
                middle: mean,
                lower: mean - k * std,
            }
        })
        .collect()
}

// ============================================================
// STOCHASTIC / WILLIAMS %R
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StochasticPoint {
    pub time: i64,
    pub k: f64,
    pub d: f64,
}

fn window_extremes<T: OHLCV>(window: &[T]) -> (f64, f64) {
    window
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(h, l), b| {
            (h.max(b.high()), l.min(b.low()))
        })
}

/// Stochastic oscillator. `%K` over `k_period`, `%D` = SMA(`d_period`) of `%K`.
///
/// A window whose high equals its low has `%K = 50`.
pub fn stochastic<T: OHLCV>(bars: &[T], k_period: usize, d_period: usize) -> Vec<StochasticPoint> {
    if k_period == 0 || d_period == 0 || bars.len() < k_period.saturating_add(d_period) - 1 {
        return Vec::new();
    }

    let k_line: Vec<SeriesPoint> = bars
        .windows(k_period)
        .map(|w| {
            let (high, low) = window_extremes(w);
            let last = &w[k_period - 1];
            let k = if high > low {
                100.0 * (last.close() - low) / (high - low)
            } else {
                50.0
            };
            SeriesPoint::new(last.time(), k)
        })
        .collect();

    k_line
        .windows(d_period)
        .map(|w| {
            let last = w[d_period - 1];
            StochasticPoint {
                time: last.time,
                k: last.value,
                d: w.iter().map(|p| p.value).sum::<f64>() / d_period as f64,
            }
        })
        .collect()
}

/// Williams %R in `[-100, 0]`; a flat window yields `-50`.
pub fn williams_r<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|w| {
            let (high, low) = window_extremes(w);
            let last = &w[period - 1];
            let value = if high > low {
                -100.0 * (high - last.close()) / (high - low)
            } else {
                -50.0
            };
            SeriesPoint::new(last.time(), value)
        })
        .collect()
}

// ============================================================
// CCI / ATR
// ============================================================

/// Commodity Channel Index over the typical price.
///
/// `(tp - sma(tp)) / (0.015 * mean_abs_dev)`; zero deviation yields `0`.
pub fn cci<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|w| {
            let tps: Vec<f64> = w.iter().map(|b| b.typical_price()).collect();
            let mean = tps.iter().sum::<f64>() / period as f64;
            let mad = tps.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            let last = &w[period - 1];
            let value = if mad > 0.0 {
                (tps[period - 1] - mean) / (0.015 * mad)
            } else {
                0.0
            };
            SeriesPoint::new(last.time(), value)
        })
        .collect()
}

/// Average True Range as a rolling mean of true range.
///
/// The first bar has no previous close, so true range starts at index 1 and
/// the first ATR point sits at index `period`.
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() <= period {
        return Vec::new();
    }

    let tr: Vec<SeriesPoint> = bars
        .windows(2)
        .map(|w| SeriesPoint::new(w[1].time(), w[1].true_range(w[0].close())))
        .collect();

    tr.windows(period)
        .map(|w| {
            SeriesPoint::new(
                w[period - 1].time,
                w.iter().map(|p| p.value).sum::<f64>() / period as f64,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    fn ramp(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(i as i64, c - 0.5, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect()
    }

    fn flat(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64, 50.0, 50.0, 50.0, 50.0, 1.0))
            .collect()
    }

    #[test]
    fn test_macd_alignment() {
        let bars = ramp(60);
        let points = macd(&bars, 12, 26, 9);
        assert_eq!(points.len(), 60 - (26 - 1) - (9 - 1));
        assert_eq!(points[0].time, bars[26 - 1 + 9 - 1].time);
        // rising series: fast EMA above slow EMA
        assert!(points.iter().all(|p| p.macd > 0.0));
    }

    #[test]
    fn test_macd_signal_on_linear_ramp() {
        // EMAs of a linear ramp lag by (period - 1) / 2, so the line is flat
        // and the signal EMA reproduces it
        let points = macd(&ramp(40), 3, 6, 4);
        assert_eq!(points.len(), 40 - 5 - 3);
        for p in points {
            assert!((p.macd - 1.5).abs() < 1e-9);
            assert!(p.histogram.abs() < 1e-9);
        }
    }

    #[test]
    fn test_macd_rejects_inverted_periods() {
        assert!(macd(&ramp(60), 26, 12, 9).is_empty());
        assert!(macd(&ramp(20), 12, 26, 9).is_empty());
    }

    #[test]
    fn test_bollinger_flat_collapses() {
        let points = bollinger_bands(&flat(30), 20, 2.0);
        assert_eq!(points.len(), 11);
        for p in points {
            assert_eq!(p.upper, 50.0);
            assert_eq!(p.lower, 50.0);
        }
    }

    #[test]
    fn test_bollinger_ordering() {
        for p in bollinger_bands(&ramp(40), 20, 2.0) {
            assert!(p.upper > p.middle && p.middle > p.lower);
        }
    }

    #[test]
    fn test_stochastic_bounds_and_flat() {
        for p in stochastic(&ramp(40), 14, 3) {
            assert!((0.0..=100.0).contains(&p.k));
            assert!((0.0..=100.0).contains(&p.d));
        }
        let flat_points = stochastic(&flat(20), 14, 3);
        assert_eq!(flat_points.len(), 20 - 14 - 3 + 2);
        assert!(flat_points.iter().all(|p| p.k == 50.0 && p.d == 50.0));
    }

    #[test]
    fn test_williams_r_range() {
        for p in williams_r(&ramp(30), 14) {
            assert!((-100.0..=0.0).contains(&p.value));
        }
        assert!(williams_r(&flat(14), 14).iter().all(|p| p.value == -50.0));
    }

    #[test]
    fn test_cci_flat_is_zero() {
        assert!(cci(&flat(25), 20).iter().all(|p| p.value == 0.0));
        assert!(cci(&ramp(30), 20).iter().all(|p| p.value > 0.0));
    }

    #[test]
    fn test_atr_constant_range() {
        // ramp: range 2.0, gaps of 1.0 never exceed the range
        let points = atr(&ramp(30), 14);
        assert_eq!(points.len(), 30 - 14);
        assert_eq!(points[0].time, 14);
        for p in points {
            assert!((p.value - 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_huge_periods_are_empty() {
        assert!(atr(&ramp(40), usize::MAX).is_empty());
        assert!(stochastic(&ramp(40), usize::MAX, 3).is_empty());
    }
}
