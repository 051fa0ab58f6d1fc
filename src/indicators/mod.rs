//! Technical indicators over OHLCV series
//!
//! Every function here is a pure computation over a bar slice. Series-valued
//! indicators return one [`SeriesPoint`] per bar that has enough history, so a
//! short input yields an empty vector rather than fabricated values.
//! Scalar "latest value" helpers saturate to a neutral default instead.
//!
//! # Modules
//!
//! - **moving_average**: SMA, EMA
//! - **oscillator**: Wilder RSI
//! - **volatility**: volume MA, amplitude, percent change
//! - **extended**: MACD, Bollinger bands, stochastic, Williams %R, CCI, ATR
//! - **snapshot**: the aggregated [`IndicatorSnapshot`] and [`ChartSummary`]

pub mod extended;
pub mod moving_average;
pub mod oscillator;
pub mod snapshot;
pub mod volatility;

pub use extended::*;
pub use moving_average::*;
pub use oscillator::*;
pub use snapshot::*;
pub use volatility::*;

/// One indicator value stamped with the time of the bar it belongs to
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SeriesPoint {
    pub time: i64,
    pub value: f64,
}

impl SeriesPoint {
    #[inline]
    pub fn new(time: i64, value: f64) -> Self {
        Self { time, value }
    }
}

/// Round to two decimal places (display boundary only)
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
