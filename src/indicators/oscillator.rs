//! Relative Strength Index (Wilder smoothing)

use crate::OHLCV;

use super::SeriesPoint;

/// Default RSI lookback
pub const RSI_PERIOD: usize = 14;

/// Neutral RSI returned when there is not enough history
pub const RSI_NEUTRAL: f64 = 50.0;

/// Running Wilder averages of gains and losses.
#[derive(Debug, Clone, Copy)]
struct WilderState {
    avg_gain: f64,
    avg_loss: f64,
    period: f64,
}

impl WilderState {
    /// Seed from the simple mean of the first `period` deltas.
    fn seed(deltas: &[f64]) -> Self {
        let period = deltas.len() as f64;
        let (gains, losses) = deltas.iter().fold((0.0, 0.0), |(g, l), &d| {
            if d > 0.0 {
                (g + d, l)
            } else {
                (g, l - d)
            }
        });
        Self {
            avg_gain: gains / period,
            avg_loss: losses / period,
            period,
        }
    }

    #[inline]
    fn update(&mut self, delta: f64) {
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        self.avg_gain = (self.avg_gain * (self.period - 1.0) + gain) / self.period;
        self.avg_loss = (self.avg_loss * (self.period - 1.0) + loss) / self.period;
    }

    /// `100 - 100 / (1 + RS)`, saturating when the loss average is zero.
    #[inline]
    fn value(&self) -> f64 {
        if self.avg_loss == 0.0 {
            return if self.avg_gain > 0.0 { 100.0 } else { RSI_NEUTRAL };
        }
        let rs = self.avg_gain / self.avg_loss;
        100.0 - 100.0 / (1.0 + rs)
    }
}

fn close_deltas<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.windows(2).map(|w| w[1].close() - w[0].close()).collect()
}

/// RSI at the last bar.
///
/// Returns [`RSI_NEUTRAL`] when `bars.len() <= period` or `period == 0`.
/// The value is not rounded; callers round at the display boundary.
pub fn rsi<T: OHLCV>(bars: &[T], period: usize) -> f64 {
    if period == 0 || bars.len() <= period {
        return RSI_NEUTRAL;
    }

    let deltas = close_deltas(bars);
    let mut state = WilderState::seed(&deltas[..period]);
    for &delta in &deltas[period..] {
        state.update(delta);
    }
    state.value()
}

/// RSI at every bar from index `period` onward.
pub fn rsi_series<T: OHLCV>(bars: &[T], period: usize) -> Vec<SeriesPoint> {
    if period == 0 || bars.len() <= period {
        return Vec::new();
    }

    let deltas = close_deltas(bars);
    let mut state = WilderState::seed(&deltas[..period]);
    let mut out = Vec::with_capacity(bars.len() - period);
    out.push(SeriesPoint::new(bars[period].time(), state.value()));

    for (offset, &delta) in deltas[period..].iter().enumerate() {
        state.update(delta);
        out.push(SeriesPoint::new(bars[period + 1 + offset].time(), state.value()));
    }

    out
}
