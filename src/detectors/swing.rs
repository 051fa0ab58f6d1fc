//! Swing points, order blocks and liquidity levels
//!
//! A swing high is a bar whose high is strictly greater than every other high
//! within `length` bars on either side; swing lows mirror this. Order blocks
//! and liquidity levels are derived from the swings.
//!
//! A swing break is the swing-level structure break: a higher swing high
//! confirmed by a later trade below the swing low that preceded it (bullish),
//! or a lower swing low confirmed by a later trade above the preceding swing
//! high (bearish).

use crate::{OHLCVExt, OHLCV};

use super::helpers::is_strict_peak;

/// Swings kept per side for liquidity levels
pub const LIQUIDITY_RECENT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwingKind {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingPoint {
    pub kind: SwingKind,
    pub index: usize,
    pub time: i64,
    pub price: f64,
}

/// Swing highs and swing lows, each in ascending index order.
///
/// Bars within `length` of either end can never qualify.
pub fn swing_points<T: OHLCV>(bars: &[T], length: usize) -> (Vec<SwingPoint>, Vec<SwingPoint>) {
    let mut highs = Vec::new();
    let mut lows = Vec::new();

    for i in 0..bars.len() {
        if is_strict_peak(bars, i, length, |b| b.high()) {
            highs.push(SwingPoint {
                kind: SwingKind::High,
                index: i,
                time: bars[i].time(),
                price: bars[i].high(),
            });
        }
        if is_strict_peak(bars, i, length, |b| -b.low()) {
            lows.push(SwingPoint {
                kind: SwingKind::Low,
                index: i,
                time: bars[i].time(),
                price: bars[i].low(),
            });
        }
    }

    (highs, lows)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBlockKind {
    /// Last bearish candle before a swing low
    Bullish,
    /// Last bullish candle before a swing high
    Bearish,
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OrderBlock {
    pub kind: OrderBlockKind,
    /// Index of the order-block candle
    pub index: usize,
    pub time: i64,
    pub high: f64,
    pub low: f64,
    /// Index of the swing point it precedes
    pub swing_index: usize,
}

impl OrderBlock {
    #[inline]
    pub fn contains(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }
}

/// Order blocks for every swing that has an opposite-colour candle before it.
///
/// Bullish blocks (from swing lows) come first, then bearish blocks.
pub fn order_blocks<T: OHLCV>(
    bars: &[T],
    highs: &[SwingPoint],
    lows: &[SwingPoint],
) -> Vec<OrderBlock> {
    let mut out = Vec::new();
    for swing in lows {
        if let Some(i) = last_before(bars, swing.index, |b| b.is_bearish()) {
            out.push(block(bars, i, swing.index, OrderBlockKind::Bullish));
        }
    }
    for swing in highs {
        if let Some(i) = last_before(bars, swing.index, |b| b.is_bullish()) {
            out.push(block(bars, i, swing.index, OrderBlockKind::Bearish));
        }
    }
    out
}

fn last_before<T, F: Fn(&T) -> bool>(bars: &[T], index: usize, pick: F) -> Option<usize> {
    bars[..index.min(bars.len())].iter().rposition(pick)
}

fn block<T: OHLCV>(bars: &[T], index: usize, swing_index: usize, kind: OrderBlockKind) -> OrderBlock {
    let bar = &bars[index];
    OrderBlock {
        kind,
        index,
        time: bar.time(),
        high: bar.high(),
        low: bar.low(),
        swing_index,
    }
}

/// Resting liquidity: buy-side above recent swing highs, sell-side below
/// recent swing lows.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityLevels {
    pub buy_side: Vec<SwingPoint>,
    pub sell_side: Vec<SwingPoint>,
}

/// The last `recent` swing highs and lows
pub fn liquidity_levels(highs: &[SwingPoint], lows: &[SwingPoint], recent: usize) -> LiquidityLevels {
    let tail = |v: &[SwingPoint]| v[v.len().saturating_sub(recent)..].to_vec();
    LiquidityLevels {
        buy_side: tail(highs),
        sell_side: tail(lows),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakKind {
    Bullish,
    Bearish,
}

/// A confirmed swing-level structure break, stamped at the swing that made it
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SwingBreak {
    pub kind: BreakKind,
    pub index: usize,
    pub time: i64,
    pub price: f64,
}

/// Confirmed swing breaks in index order, bullish first on a shared index.
///
/// Needs at least two swing highs and two swing lows. The confirming trade
/// must come strictly after the new swing.
pub fn swing_breaks<T: OHLCV>(bars: &[T], highs: &[SwingPoint], lows: &[SwingPoint]) -> Vec<SwingBreak> {
    if highs.len() < 2 || lows.len() < 2 {
        return Vec::new();
    }

    // lowest low / highest high strictly after each index
    let mut low_after = vec![f64::INFINITY; bars.len() + 1];
    let mut high_after = vec![f64::NEG_INFINITY; bars.len() + 1];
    for i in (0..bars.len()).rev() {
        low_after[i] = low_after[i + 1].min(bars[i].low());
        high_after[i] = high_after[i + 1].max(bars[i].high());
    }

    let mut out = Vec::new();
    for w in highs.windows(2) {
        let (prev, swing) = (w[0], w[1]);
        if swing.price <= prev.price {
            continue;
        }
        if let Some(guard) = last_swing_before(lows, swing.index) {
            if low_after[swing.index + 1] < guard.price {
                out.push(swing_break(BreakKind::Bullish, swing));
            }
        }
    }
    for w in lows.windows(2) {
        let (prev, swing) = (w[0], w[1]);
        if swing.price >= prev.price {
            continue;
        }
        if let Some(guard) = last_swing_before(highs, swing.index) {
            if high_after[swing.index + 1] > guard.price {
                out.push(swing_break(BreakKind::Bearish, swing));
            }
        }
    }

    out.sort_by_key(|b| (b.index, b.kind == BreakKind::Bearish));
    out
}

fn last_swing_before(swings: &[SwingPoint], index: usize) -> Option<&SwingPoint> {
    swings.iter().rev().find(|s| s.index < index)
}

fn swing_break(kind: BreakKind, swing: SwingPoint) -> SwingBreak {
    SwingBreak {
        kind,
        index: swing.index,
        time: swing.time,
        price: swing.price,
    }
}

/// Swing-based view of one series
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwingAnalysis {
    pub highs: Vec<SwingPoint>,
    pub lows: Vec<SwingPoint>,
    pub order_blocks: Vec<OrderBlock>,
    pub liquidity: LiquidityLevels,
    pub breaks: Vec<SwingBreak>,
}

impl SwingAnalysis {
    pub fn compute<T: OHLCV>(bars: &[T], length: usize) -> Self {
        let (highs, lows) = swing_points(bars, length);
        let order_blocks = order_blocks(bars, &highs, &lows);
        let liquidity = liquidity_levels(&highs, &lows, LIQUIDITY_RECENT);
        let breaks = swing_breaks(bars, &highs, &lows);
        Self {
            highs,
            lows,
            order_blocks,
            liquidity,
            breaks,
        }
    }

    /// Order blocks whose range contains `price`
    pub fn active_order_blocks(&self, price: f64) -> impl Iterator<Item = &OrderBlock> {
        self.order_blocks.iter().filter(move |ob| ob.contains(price))
    }
}
