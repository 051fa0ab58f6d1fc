//! Trading signals
//!
//! Two rule sets feed one [`TradingSignals`] value:
//!
//! - indicator rules at the last bar: RSI zones, MACD line against its signal
//!   line, close against the SMA, close at or beyond a Bollinger band
//! - order-block entries: the last close sitting inside a bullish or bearish
//!   order block, with a stop just beyond the block
//!
//! Key levels come from the trailing range and from the liquidity swings. The
//! market bias counts confirmed swing breaks inside the trailing bias window.

use crate::detectors::{
    helpers::{high_low, trailing},
    Bias, BreakKind, LevelKind, LiquidityLevels, OrderBlock, OrderBlockKind, SwingAnalysis,
    SwingBreak, SwingPoint,
};
use crate::indicators::{bollinger_bands, macd, rsi_series, sma};
use crate::{AnalysisError, Period, Result, OHLCV};

/// Stop distance below a bullish block and above a bearish one
pub const STOP_MARGIN: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSide {
    Buy,
    Sell,
}

/// The rule that fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalReason {
    RsiOverbought,
    RsiOversold,
    MacdAboveSignal,
    MacdBelowSignal,
    AboveSma,
    BelowSma,
    UpperBandTouch,
    LowerBandTouch,
    BullishOrderBlock,
    BearishOrderBlock,
}

impl SignalReason {
    pub fn side(self) -> SignalSide {
        use SignalReason::*;
        match self {
            RsiOversold | MacdAboveSignal | AboveSma | LowerBandTouch | BullishOrderBlock => {
                SignalSide::Buy
            }
            RsiOverbought | MacdBelowSignal | BelowSma | UpperBandTouch | BearishOrderBlock => {
                SignalSide::Sell
            }
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SignalReason::RsiOverbought => "RSI overbought, consider selling",
            SignalReason::RsiOversold => "RSI oversold, consider buying",
            SignalReason::MacdAboveSignal => "MACD above signal line, bullish",
            SignalReason::MacdBelowSignal => "MACD below signal line, bearish",
            SignalReason::AboveSma => "Price above SMA, uptrend",
            SignalReason::BelowSma => "Price below SMA, downtrend",
            SignalReason::UpperBandTouch => "Price at upper Bollinger band, pullback likely",
            SignalReason::LowerBandTouch => "Price at lower Bollinger band, bounce likely",
            SignalReason::BullishOrderBlock => "Price inside bullish order block, look for longs",
            SignalReason::BearishOrderBlock => "Price inside bearish order block, look for shorts",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignal {
    pub reason: SignalReason,
    /// Last close
    pub price: f64,
    /// Set for order-block entries only
    pub stop_loss: Option<f64>,
}

impl TradingSignal {
    #[inline]
    pub fn side(&self) -> SignalSide {
        self.reason.side()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyLevelSource {
    /// Highest high of the trailing range
    RecentHigh,
    /// Lowest low of the trailing range
    RecentLow,
    BuySideLiquidity,
    SellSideLiquidity,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct KeyLevel {
    #[serde(rename = "type")]
    pub kind: LevelKind,
    pub price: f64,
    pub source: KeyLevelSource,
}

/// Thresholds and lookbacks for signal generation
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub rsi_period: Period,
    /// RSI strictly above this is overbought
    pub overbought: f64,
    /// RSI strictly below this is oversold
    pub oversold: f64,
    pub macd_fast: Period,
    pub macd_slow: Period,
    pub macd_signal: Period,
    pub sma_period: Period,
    pub bollinger_period: Period,
    /// Band width in standard deviations
    pub bollinger_k: f64,
    /// Trailing bars for the recent high/low key levels
    pub range_window: Period,
    /// Trailing bars whose swing breaks decide the bias
    pub bias_window: Period,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_period: Period::new_const(14),
            overbought: 70.0,
            oversold: 30.0,
            macd_fast: Period::new_const(12),
            macd_slow: Period::new_const(26),
            macd_signal: Period::new_const(9),
            sma_period: Period::new_const(20),
            bollinger_period: Period::new_const(20),
            bollinger_k: 2.0,
            range_window: Period::new_const(20),
            bias_window: Period::new_const(50),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        let zones_ok = self.oversold.is_finite()
            && self.overbought.is_finite()
            && 0.0 <= self.oversold
            && self.oversold < self.overbought
            && self.overbought <= 100.0;
        if !zones_ok {
            return Err(AnalysisError::InvalidConfig(format!(
                "RSI zones need 0 <= oversold < overbought <= 100, got {} / {}",
                self.oversold, self.overbought
            )));
        }
        if self.macd_fast.get() >= self.macd_slow.get() {
            return Err(AnalysisError::InvalidConfig(format!(
                "macd_fast ({}) must be below macd_slow ({})",
                self.macd_fast.get(),
                self.macd_slow.get()
            )));
        }
        if self.bollinger_period.get() < 2 {
            return Err(AnalysisError::InvalidConfig(
                "bollinger_period must be at least 2".to_string(),
            ));
        }
        if !(self.bollinger_k.is_finite() && self.bollinger_k > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "bollinger_k must be positive, got {}",
                self.bollinger_k
            )));
        }
        Ok(())
    }
}

/// Signals, key levels and bias for one series
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingSignals {
    pub buy: Vec<TradingSignal>,
    pub sell: Vec<TradingSignal>,
    pub bias: Bias,
    pub key_levels: Vec<KeyLevel>,
}

impl TradingSignals {
    /// Indicator signals first, then order-block entries. Key levels list the
    /// recent range before the liquidity swings.
    pub fn compute<T: OHLCV>(bars: &[T], swings: &SwingAnalysis, config: &SignalConfig) -> Self {
        let mut signals = Self::default();
        let Some(last) = bars.last() else {
            return signals;
        };

        let entries = order_block_signals(last.close(), &swings.order_blocks);
        for signal in indicator_signals(bars, config).into_iter().chain(entries) {
            match signal.side() {
                SignalSide::Buy => signals.buy.push(signal),
                SignalSide::Sell => signals.sell.push(signal),
            }
        }

        signals.key_levels = recent_range_levels(bars, config.range_window.get());
        signals.key_levels.extend(liquidity_key_levels(&swings.liquidity));
        signals.bias = market_bias(bars, &swings.breaks, config.bias_window.get());
        signals
    }
}

/// Indicator rules evaluated at the last bar.
///
/// A rule whose indicator lacks history stays silent. MACD and SMA always
/// vote one way once defined; RSI and the bands only fire at the extremes.
pub fn indicator_signals<T: OHLCV>(bars: &[T], config: &SignalConfig) -> Vec<TradingSignal> {
    let Some(close) = bars.last().map(|b| b.close()) else {
        return Vec::new();
    };
    let at_close = |reason| TradingSignal {
        reason,
        price: close,
        stop_loss: None,
    };
    let mut out = Vec::new();

    if let Some(p) = rsi_series(bars, config.rsi_period.get()).last() {
        if p.value > config.overbought {
            out.push(at_close(SignalReason::RsiOverbought));
        } else if p.value < config.oversold {
            out.push(at_close(SignalReason::RsiOversold));
        }
    }

    let macd_points = macd(
        bars,
        config.macd_fast.get(),
        config.macd_slow.get(),
        config.macd_signal.get(),
    );
    if let Some(p) = macd_points.last() {
        out.push(at_close(if p.macd > p.signal {
            SignalReason::MacdAboveSignal
        } else {
            SignalReason::MacdBelowSignal
        }));
    }

    if let Some(p) = sma(bars, config.sma_period.get()).last() {
        out.push(at_close(if close > p.value {
            SignalReason::AboveSma
        } else {
            SignalReason::BelowSma
        }));
    }

    let bands = bollinger_bands(bars, config.bollinger_period.get(), config.bollinger_k);
    if let Some(b) = bands.last() {
        if close >= b.upper {
            out.push(at_close(SignalReason::UpperBandTouch));
        } else if close <= b.lower {
            out.push(at_close(SignalReason::LowerBandTouch));
        }
    }

    out
}

/// One entry per order block containing `price`, bullish blocks first.
///
/// Bullish stops sit [`STOP_MARGIN`] below the block low, bearish stops the
/// same margin above the block high.
pub fn order_block_signals(price: f64, blocks: &[OrderBlock]) -> Vec<TradingSignal> {
    let entries = |kind: OrderBlockKind| {
        blocks
            .iter()
            .filter(move |ob| ob.kind == kind && ob.contains(price))
            .map(move |ob| match kind {
                OrderBlockKind::Bullish => TradingSignal {
                    reason: SignalReason::BullishOrderBlock,
                    price,
                    stop_loss: Some(ob.low * (1.0 - STOP_MARGIN)),
                },
                OrderBlockKind::Bearish => TradingSignal {
                    reason: SignalReason::BearishOrderBlock,
                    price,
                    stop_loss: Some(ob.high * (1.0 + STOP_MARGIN)),
                },
            })
    };
    entries(OrderBlockKind::Bullish)
        .chain(entries(OrderBlockKind::Bearish))
        .collect()
}

/// Highest high and lowest low of the trailing `window` bars
pub fn recent_range_levels<T: OHLCV>(bars: &[T], window: usize) -> Vec<KeyLevel> {
    let Some((high, low)) = high_low(trailing(bars, window)) else {
        return Vec::new();
    };
    vec![
        KeyLevel {
            kind: LevelKind::Resistance,
            price: high,
            source: KeyLevelSource::RecentHigh,
        },
        KeyLevel {
            kind: LevelKind::Support,
            price: low,
            source: KeyLevelSource::RecentLow,
        },
    ]
}

/// Buy-side liquidity as resistance, then sell-side liquidity as support
pub fn liquidity_key_levels(liquidity: &LiquidityLevels) -> Vec<KeyLevel> {
    let level = |kind, source| move |s: &SwingPoint| KeyLevel {
        kind,
        price: s.price,
        source,
    };
    liquidity
        .buy_side
        .iter()
        .map(level(LevelKind::Resistance, KeyLevelSource::BuySideLiquidity))
        .chain(
            liquidity
                .sell_side
                .iter()
                .map(level(LevelKind::Support, KeyLevelSource::SellSideLiquidity)),
        )
        .collect()
}

/// Majority of bullish vs bearish swing breaks stamped at or after the first
/// bar of the trailing `window`. A tie, or no break at all, is neutral.
pub fn market_bias<T: OHLCV>(bars: &[T], breaks: &[SwingBreak], window: usize) -> Bias {
    let Some(first) = trailing(bars, window).first() else {
        return Bias::Neutral;
    };
    let since = first.time();
    let (bullish, bearish) = breaks
        .iter()
        .filter(|b| b.time >= since)
        .fold((0usize, 0usize), |(up, down), b| match b.kind {
            BreakKind::Bullish => (up + 1, down),
            BreakKind::Bearish => (up, down + 1),
        });
    match bullish.cmp(&bearish) {
        std::cmp::Ordering::Greater => Bias::Bullish,
        std::cmp::Ordering::Less => Bias::Bearish,
        std::cmp::Ordering::Equal => Bias::Neutral,
    }
}
