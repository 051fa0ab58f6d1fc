//! AB=CD harmonic pattern detection
//!
//! Slides a 4-bar window `(A, B, C, D)` over the series and measures
//! `AB = |B.high - A.low|`, `BC = |C.low - B.high|` and `CD = |D.high - C.low|`.
//! The window matches when both legs are non-zero, `|AB - CD| / AB` is below
//! `leg_tolerance` and `BC / AB` is below `max_retracement`.

use std::collections::HashMap;

use crate::{
    params::{get_period, get_ratio, ParamMeta, ParameterizedDetector},
    AnalysisError, DetectorId, Period, Ratio, Result, WindowDetector, OHLCV,
};

use super::helpers::trailing;

/// Display name of the pattern
pub const AB_CD: &str = "AB=CD";

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnchorPoint {
    pub index: usize,
    pub time: i64,
    pub price: f64,
}

/// One AB=CD occurrence
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct HarmonicMatch {
    /// A (low), B (high), C (low), D (high)
    pub anchors: [AnchorPoint; 4],
    pub ab: f64,
    pub bc: f64,
    pub cd: f64,
    /// `cd / ab`
    pub completion: f64,
}

impl HarmonicMatch {
    #[inline]
    pub fn a(&self) -> AnchorPoint {
        self.anchors[0]
    }

    #[inline]
    pub fn d(&self) -> AnchorPoint {
        self.anchors[3]
    }

    /// Both legs exist and the anchors are in time order
    pub fn is_complete(&self) -> bool {
        self.ab > 0.0
            && self.cd > 0.0
            && self.completion.is_finite()
            && self.anchors.windows(2).all(|w| w[0].time < w[1].time)
    }

    /// Index range `[A, D]` covered by the pattern
    #[inline]
    pub fn span(&self) -> std::ops::RangeInclusive<usize> {
        self.anchors[0].index..=self.anchors[3].index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarmonicScan {
    /// Stop at the first match
    #[default]
    First,
    /// Every match whose window does not overlap the previously accepted one
    NonOverlapping,
}

/// AB=CD detector
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HarmonicDetector {
    pub window: Period,
    pub min_bars: Period,
    /// Maximum `|AB - CD| / AB`
    pub leg_tolerance: Ratio,
    /// Maximum `BC / AB`
    pub max_retracement: Ratio,
    pub scan: HarmonicScan,
}

impl Default for HarmonicDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(1000),
            min_bars: Period::new_const(30),
            leg_tolerance: Ratio::new_const(0.15),
            max_retracement: Ratio::new_const(0.7),
            scan: HarmonicScan::First,
        }
    }
}

impl HarmonicDetector {
    pub fn non_overlapping() -> Self {
        Self {
            scan: HarmonicScan::NonOverlapping,
            ..Self::default()
        }
    }

    /// Test the 4-bar window starting at `i`
    pub fn match_at<T: OHLCV>(&self, bars: &[T], i: usize) -> Option<HarmonicMatch> {
        let [a, b, c, d] = bars.get(i..i + 4)? else {
            return None;
        };

        let ab = (b.high() - a.low()).abs();
        let cd = (d.high() - c.low()).abs();
        let bc = (c.low() - b.high()).abs();

        if !(ab > 0.0 && cd > 0.0) {
            return None;
        }
        if (ab - cd).abs() / ab >= self.leg_tolerance.get() || bc / ab >= self.max_retracement.get() {
            return None;
        }

        let anchor = |offset: usize, price: f64, time: i64| AnchorPoint {
            index: i + offset,
            time,
            price,
        };
        Some(HarmonicMatch {
            anchors: [
                anchor(0, a.low(), a.time()),
                anchor(1, b.high(), b.time()),
                anchor(2, c.low(), c.time()),
                anchor(3, d.high(), d.time()),
            ],
            ab,
            bc,
            cd,
            completion: cd / ab,
        })
    }

    /// First match whose window starts at or after `from`
    fn next_match<T: OHLCV>(&self, bars: &[T], from: usize) -> Option<HarmonicMatch> {
        (from..bars.len().saturating_sub(3)).find_map(|i| self.match_at(bars, i))
    }

    /// Scan the whole slice with the configured [`HarmonicScan`] mode, no
    /// minimum sample. Indices refer to `bars`.
    pub fn scan<T: OHLCV>(&self, bars: &[T]) -> Vec<HarmonicMatch> {
        let mut out = Vec::new();
        let mut from = 0;
        while let Some(m) = self.next_match(bars, from) {
            from = m.d().index + 1;
            out.push(m);
            if self.scan == HarmonicScan::First {
                break;
            }
        }
        out
    }

    /// First match in scan order, regardless of the scan mode
    pub fn find<T: OHLCV>(&self, bars: &[T]) -> Option<HarmonicMatch> {
        self.next_match(bars, 0)
    }
}

impl WindowDetector for HarmonicDetector {
    type Output = Vec<HarmonicMatch>;

    fn id(&self) -> DetectorId {
        DetectorId("HARMONIC_ABCD")
    }

    fn min_bars(&self) -> usize {
        self.min_bars.get()
    }

    fn window(&self) -> usize {
        self.window.get()
    }

    fn detect_window<T: OHLCV>(&self, window: &[T]) -> Vec<HarmonicMatch> {
        self.scan(window)
    }

    fn validate_config(&self) -> Result<()> {
        if self.min_bars.get() > self.window.get() {
            return Err(AnalysisError::InvalidConfig(format!(
                "harmonic min_bars ({}) exceeds window ({})",
                self.min_bars.get(),
                self.window.get()
            )));
        }
        if self.leg_tolerance.get() == 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "harmonic leg_tolerance must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<HarmonicMatch>> {
        let window = trailing(bars, self.window.get());
        if window.len() < self.min_bars.get() {
            return Err(AnalysisError::InsufficientData {
                need: self.min_bars.get(),
                got: window.len(),
            });
        }
        let offset = bars.len() - window.len();
        let mut matches = self.detect_window(window);
        for m in &mut matches {
            for a in &mut m.anchors {
                a.index += offset;
            }
        }
        Ok(matches)
    }
}

const HARMONIC_PARAMS: &[ParamMeta] = &[
    ParamMeta::ratio("leg_tolerance", 0.15, (0.05, 0.3, 0.05), "Maximum |AB - CD| / AB"),
    ParamMeta::ratio("max_retracement", 0.7, (0.3, 0.9, 0.1), "Maximum BC / AB"),
    ParamMeta::period("window", 1000.0, (100.0, 2000.0, 100.0), "Trailing bars scanned"),
];

impl ParameterizedDetector for HarmonicDetector {
    fn param_meta() -> &'static [ParamMeta] {
        HARMONIC_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Self::check_params(params)?;
        let defaults = Self::default();
        let detector = Self {
            leg_tolerance: get_ratio(params, "leg_tolerance", defaults.leg_tolerance.get())?,
            max_retracement: get_ratio(params, "max_retracement", defaults.max_retracement.get())?,
            window: get_period(params, "window", defaults.window.get())?,
            ..defaults
        };
        detector.validate_config()?;
        Ok(detector)
    }

    fn detector_id() -> DetectorId {
        DetectorId("HARMONIC_ABCD")
    }
}
