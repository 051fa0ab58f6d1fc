//! Support/resistance levels and consolidation zones
//!
//! Two level policies are available:
//!
//! - [`LevelPolicy::Extremes`]: one resistance at the window's highest high and
//!   one support at its lowest low.
//! - [`LevelPolicy::Clustered`]: pivot highs and lows are grouped into price
//!   buckets within a relative tolerance; each bucket's size is its test count.
//!
//! Both need at least 30 bars in the window and report levels relative to the
//! last close.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    params::{get_period, get_ratio, ParamMeta, ParameterizedDetector},
    AnalysisError, DetectorId, Period, Ratio, Result, WindowDetector, OHLCV,
};

use super::helpers::{high_low, is_pivot_high, is_pivot_low, trailing, within_tolerance};

/// Minimum sample for level detection
pub const SR_MIN_BARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

/// Qualitative strength derived from the test count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelStrength {
    Weak,
    Medium,
    Strong,
}

impl LevelStrength {
    pub fn from_test_count(count: usize) -> Self {
        match count {
            0 | 1 => LevelStrength::Weak,
            2 => LevelStrength::Medium,
            _ => LevelStrength::Strong,
        }
    }
}

/// One support or resistance price
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistanceLevel {
    pub price: f64,
    /// Times price action touched this level within tolerance (>= 1)
    pub test_count: usize,
    /// The last close sits on this level
    pub is_current_level: bool,
    #[serde(rename = "type")]
    pub kind: LevelKind,
}

impl SupportResistanceLevel {
    #[inline]
    pub fn strength(&self) -> LevelStrength {
        LevelStrength::from_test_count(self.test_count)
    }
}

/// Levels found in one window, strongest first on each side
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportResistance {
    pub support: Vec<SupportResistanceLevel>,
    pub resistance: Vec<SupportResistanceLevel>,
    pub current_price: f64,
    /// Time span of the examined window
    pub from: i64,
    pub to: i64,
}

impl SupportResistance {
    /// All levels, support first
    pub fn levels(&self) -> impl Iterator<Item = &SupportResistanceLevel> {
        self.support.iter().chain(self.resistance.iter())
    }

    /// The level the last close sits on, if any
    pub fn current_level(&self) -> Option<&SupportResistanceLevel> {
        self.levels().find(|l| l.is_current_level)
    }
}

/// Window whose total range is within a small fraction of its low
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationZone {
    pub from: i64,
    pub to: i64,
    pub upper: f64,
    pub lower: f64,
    /// `(upper - lower) / lower`
    pub range_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelPolicy {
    /// Window max high / min low
    #[default]
    Extremes,
    /// Pivot extrema bucketed by price
    Clustered,
}

/// Support/resistance detector
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SupportResistanceDetector {
    pub policy: LevelPolicy,
    /// Trailing bars examined
    pub window: Period,
    pub min_bars: Period,
    /// Relative price band for touches and bucketing
    pub tolerance: Ratio,
    /// Half-width of the pivot neighbourhood (clustered policy)
    pub pivot_radius: Period,
    /// Levels kept per side (clustered policy)
    pub max_levels: Period,
    /// Trailing bars examined for consolidation
    pub zone_window: Period,
    /// Maximum `(high - low) / low` of a consolidation window
    pub consolidation_ratio: Ratio,
}

impl Default for SupportResistanceDetector {
    fn default() -> Self {
        Self {
            policy: LevelPolicy::Extremes,
            window: Period::new_const(500),
            min_bars: Period::new_const(SR_MIN_BARS),
            tolerance: Ratio::new_const(0.005),
            pivot_radius: Period::new_const(2),
            max_levels: Period::new_const(5),
            zone_window: Period::new_const(1000),
            consolidation_ratio: Ratio::new_const(0.02),
        }
    }
}

impl SupportResistanceDetector {
    pub fn clustered() -> Self {
        Self {
            policy: LevelPolicy::Clustered,
            ..Self::default()
        }
    }

    /// Consolidation zone over the trailing `zone_window` bars.
    ///
    /// `None` below the minimum sample or when the window is trending.
    pub fn consolidation<T: OHLCV>(&self, bars: &[T]) -> Option<ConsolidationZone> {
        let window = trailing(bars, self.zone_window.get());
        if window.len() < self.min_bars.get() {
            return None;
        }
        let (upper, lower) = high_low(window)?;
        if lower <= 0.0 {
            return None;
        }
        let range_ratio = (upper - lower) / lower;
        if range_ratio > self.consolidation_ratio.get() {
            return None;
        }
        Some(ConsolidationZone {
            from: window[0].time(),
            to: window[window.len() - 1].time(),
            upper,
            lower,
            range_ratio,
        })
    }

    fn extreme_levels<T: OHLCV>(&self, window: &[T], current: f64) -> Vec<SupportResistanceLevel> {
        let Some((high, low)) = high_low(window) else {
            return Vec::new();
        };
        let tol = self.tolerance.get();
        let highs = touches(window, high, tol, |b| b.high());
        let lows = touches(window, low, tol, |b| b.low());

        vec![
            self.level(high, highs, LevelKind::Resistance, current),
            self.level(low, lows, LevelKind::Support, current),
        ]
    }

    fn clustered_levels<T: OHLCV>(&self, window: &[T], current: f64) -> Vec<SupportResistanceLevel> {
        let radius = self.pivot_radius.get();
        let tol = self.tolerance.get();

        let mut pivot_highs: Vec<f64> = (0..window.len())
            .filter(|&i| is_pivot_high(window, i, radius))
            .map(|i| window[i].high())
            .collect();
        let mut pivot_lows: Vec<f64> = (0..window.len())
            .filter(|&i| is_pivot_low(window, i, radius))
            .map(|i| window[i].low())
            .collect();

        // trending windows may lack pivots on one side; fall back to the extreme
        if let Some((high, low)) = high_low(window) {
            if pivot_highs.is_empty() {
                pivot_highs.push(high);
            }
            if pivot_lows.is_empty() {
                pivot_lows.push(low);
            }
        }

        let mut out: Vec<SupportResistanceLevel> = cluster_prices(pivot_highs, tol)
            .into_iter()
            .map(|(price, count)| self.level(price, count, LevelKind::Resistance, current))
            .collect();
        out.extend(
            cluster_prices(pivot_lows, tol)
                .into_iter()
                .map(|(price, count)| self.level(price, count, LevelKind::Support, current)),
        );
        out
    }

    fn level(
        &self,
        price: f64,
        test_count: usize,
        kind: LevelKind,
        current: f64,
    ) -> SupportResistanceLevel {
        SupportResistanceLevel {
            price,
            test_count: test_count.max(1),
            is_current_level: within_tolerance(price, current, self.tolerance.get(), current),
            kind,
        }
    }
}

/// Bars whose `value` lies within `tolerance` of `price`
fn touches<T, F>(window: &[T], price: f64, tolerance: f64, value: F) -> usize
where
    F: Fn(&T) -> f64,
{
    window
        .iter()
        .filter(|b| within_tolerance(value(b), price, tolerance, price))
        .count()
}

/// Greedy price bucketing: sorted ascending, a price joins the open bucket
/// while within `tolerance` of the bucket's first price. Returns
/// `(mean price, member count)` per bucket.
fn cluster_prices(mut prices: Vec<f64>, tolerance: f64) -> Vec<(f64, usize)> {
    prices.sort_by(|a, b| a.total_cmp(b));

    let mut buckets: Vec<(f64, f64, usize)> = Vec::new(); // (anchor, sum, count)
    for p in prices {
        match buckets.last_mut() {
            Some((anchor, sum, count)) if p - *anchor <= tolerance * anchor.abs() => {
                *sum += p;
                *count += 1;
            }
            _ => buckets.push((p, p, 1)),
        }
    }

    buckets
        .into_iter()
        .map(|(_, sum, count)| (sum / count as f64, count))
        .collect()
}

/// Most tests first; equal counts prefer the level closer to `current`.
fn rank_levels(levels: &mut [SupportResistanceLevel], current: f64) {
    levels.sort_by(|a, b| {
        b.test_count.cmp(&a.test_count).then_with(|| {
            let da = (a.price - current).abs();
            let db = (b.price - current).abs();
            da.partial_cmp(&db).unwrap_or(Ordering::Equal)
        })
    });
}

impl WindowDetector for SupportResistanceDetector {
    type Output = SupportResistance;

    fn id(&self) -> DetectorId {
        DetectorId("SUPPORT_RESISTANCE")
    }

    fn min_bars(&self) -> usize {
        self.min_bars.get()
    }

    fn window(&self) -> usize {
        self.window.get()
    }

    fn detect_window<T: OHLCV>(&self, window: &[T]) -> SupportResistance {
        let (current, from, to) = match (window.first(), window.last()) {
            (Some(first), Some(last)) => (last.close(), first.time(), last.time()),
            _ => {
                return SupportResistance {
                    support: Vec::new(),
                    resistance: Vec::new(),
                    current_price: 0.0,
                    from: 0,
                    to: 0,
                }
            }
        };

        let levels = match self.policy {
            LevelPolicy::Extremes => self.extreme_levels(window, current),
            LevelPolicy::Clustered => self.clustered_levels(window, current),
        };

        let (mut support, mut resistance): (Vec<_>, Vec<_>) = levels
            .into_iter()
            .partition(|l| l.kind == LevelKind::Support);
        rank_levels(&mut support, current);
        rank_levels(&mut resistance, current);
        support.truncate(self.max_levels.get());
        resistance.truncate(self.max_levels.get());

        SupportResistance {
            support,
            resistance,
            current_price: current,
            from,
            to,
        }
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_bars.get() > self.window.get() {
            return Err(AnalysisError::InvalidConfig(format!(
                "support/resistance min_bars ({}) exceeds window ({})",
                self.min_bars.get(),
                self.window.get()
            )));
        }
        if self.pivot_radius.get().saturating_mul(2).saturating_add(1) > self.window.get() {
            return Err(AnalysisError::InvalidConfig(
                "support/resistance pivot_radius does not fit in window".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================
// PARAMETER METADATA
// ============================================================

const SUPPORT_RESISTANCE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period("window", 500.0, (100.0, 1000.0, 100.0), "Trailing bars examined"),
    ParamMeta::ratio(
        "tolerance",
        0.005,
        (0.001, 0.02, 0.001),
        "Relative price band for touches and bucketing",
    ),
    ParamMeta::period("pivot_radius", 2.0, (1.0, 10.0, 1.0), "Pivot neighbourhood half-width"),
    ParamMeta::period("max_levels", 5.0, (1.0, 10.0, 1.0), "Levels kept per side"),
    ParamMeta::ratio(
        "consolidation_ratio",
        0.02,
        (0.005, 0.1, 0.005),
        "Maximum range/low ratio of a consolidation window",
    ),
];

impl ParameterizedDetector for SupportResistanceDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SUPPORT_RESISTANCE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Self::check_params(params)?;
        let defaults = Self::default();
        let detector = Self {
            window: get_period(params, "window", defaults.window.get())?,
            tolerance: get_ratio(params, "tolerance", defaults.tolerance.get())?,
            pivot_radius: get_period(params, "pivot_radius", defaults.pivot_radius.get())?,
            max_levels: get_period(params, "max_levels", defaults.max_levels.get())?,
            consolidation_ratio: get_ratio(
                params,
                "consolidation_ratio",
                defaults.consolidation_ratio.get(),
            )?,
            ..defaults
        };
        detector.validate_config()?;
        Ok(detector)
    }

    fn detector_id() -> DetectorId {
        DetectorId("SUPPORT_RESISTANCE")
    }
}
