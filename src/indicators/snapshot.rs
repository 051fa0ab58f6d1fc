//! Indicator aggregation
//!
//! [`IndicatorSnapshot`] is computed twice per call: once for the full series
//! ("now") and once with the last bar dropped ("previous"). The `*_change`
//! fields are percent deltas between the two, except `rsi_change` which is an
//! absolute difference because RSI is already on a 0..100 scale.

use crate::{Period, OHLCV};

use super::{
    amplitude, ema_last, percent_change, round2, rsi, sma_last, volume_ma, AMPLITUDE_WINDOW,
    RSI_NEUTRAL, RSI_PERIOD, VOLUME_MA_PERIOD,
};

/// Lookbacks used by the aggregator
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub rsi_period: Period,
    pub sma_period: Period,
    pub ema_period: Period,
    pub volume_period: Period,
    pub amplitude_window: Period,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            rsi_period: Period::new_const(RSI_PERIOD),
            sma_period: Period::new_const(20),
            ema_period: Period::new_const(50),
            volume_period: Period::new_const(VOLUME_MA_PERIOD),
            amplitude_window: Period::new_const(AMPLITUDE_WINDOW),
        }
    }
}

impl IndicatorConfig {
    /// Longest lookback among the sub-indicators; below this the snapshot is
    /// all defaults. 50 with the default periods (EMA-50).
    pub fn min_bars(&self) -> usize {
        [
            self.rsi_period.get().saturating_add(1),
            self.sma_period.get(),
            self.ema_period.get(),
            self.volume_period.get(),
            self.amplitude_window.get(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values at the last bar plus their one-bar deltas
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorSnapshot {
    /// RSI rounded to two decimals
    pub rsi: f64,
    #[serde(rename = "volumeMA")]
    pub volume_ma: f64,
    #[serde(rename = "amplitude24h")]
    pub amplitude_24h: f64,
    pub sma20: f64,
    pub ema50: f64,
    pub sma20_change: f64,
    pub ema50_change: f64,
    /// Absolute RSI difference, not a percentage
    pub rsi_change: f64,
    #[serde(rename = "volumeMAChange")]
    pub volume_ma_change: f64,
}

impl Default for IndicatorSnapshot {
    fn default() -> Self {
        Self {
            rsi: RSI_NEUTRAL,
            volume_ma: 0.0,
            amplitude_24h: 0.0,
            sma20: 0.0,
            ema50: 0.0,
            sma20_change: 0.0,
            ema50_change: 0.0,
            rsi_change: 0.0,
            volume_ma_change: 0.0,
        }
    }
}

impl IndicatorSnapshot {
    /// Snapshot with the default lookbacks (RSI 14, SMA 20, EMA 50, volume 20,
    /// amplitude 24).
    pub fn compute<T: OHLCV>(bars: &[T]) -> Self {
        Self::compute_with(bars, &IndicatorConfig::default())
    }

    pub fn compute_with<T: OHLCV>(bars: &[T], config: &IndicatorConfig) -> Self {
        if bars.len() < config.min_bars() {
            return Self::default();
        }

        let rsi_period = config.rsi_period.get();
        let sma_period = config.sma_period.get();
        let ema_period = config.ema_period.get();
        let volume_period = config.volume_period.get();

        let rsi_now = round2(rsi(bars, rsi_period));
        let volume_now = volume_ma(bars, volume_period);
        let sma_now = sma_last(bars, sma_period);
        let ema_now = ema_last(bars, ema_period);

        let previous = &bars[..bars.len() - 1];
        let prev_len = previous.len();
        let rsi_prev = if prev_len >= rsi_period {
            round2(rsi(previous, rsi_period))
        } else {
            RSI_NEUTRAL
        };
        let volume_prev = if prev_len >= volume_period {
            volume_ma(previous, volume_period)
        } else {
            0.0
        };
        let sma_prev = if prev_len >= sma_period {
            sma_last(previous, sma_period)
        } else {
            0.0
        };
        let ema_prev = if prev_len >= ema_period {
            ema_last(previous, ema_period)
        } else {
            0.0
        };

        Self {
            rsi: rsi_now,
            volume_ma: volume_now,
            amplitude_24h: amplitude(bars, config.amplitude_window.get()),
            sma20: sma_now,
            ema50: ema_now,
            sma20_change: percent_change(sma_now, sma_prev),
            ema50_change: percent_change(ema_now, ema_prev),
            rsi_change: rsi_now - rsi_prev,
            volume_ma_change: percent_change(volume_now, volume_prev),
        }
    }

    /// True when the snapshot carries real values rather than the
    /// insufficient-history defaults.
    pub fn is_populated(&self) -> bool {
        *self != Self::default()
    }
}

/// Latest-bar summary for the chart header
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartSummary {
    pub time: i64,
    pub latest_price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Percent change of the last close against the previous close
    pub change_percent: f64,
    pub indicators: IndicatorSnapshot,
}

impl ChartSummary {
    /// `None` for an empty series.
    pub fn compute<T: OHLCV>(bars: &[T]) -> Option<Self> {
        Self::compute_with(bars, &IndicatorConfig::default())
    }

    pub fn compute_with<T: OHLCV>(bars: &[T], config: &IndicatorConfig) -> Option<Self> {
        let last = bars.last()?;
        let change_percent = match bars.len().checked_sub(2).map(|i| &bars[i]) {
            Some(prev) => percent_change(last.close(), prev.close()),
            None => 0.0,
        };

        Some(Self {
            time: last.time(),
            latest_price: last.close(),
            open: last.open(),
            high: last.high(),
            low: last.low(),
            close: last.close(),
            change_percent,
            indicators: IndicatorSnapshot::compute_with(bars, config),
        })
    }
}
