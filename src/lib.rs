//! # kline-ta
//!
//! Technical indicators and market-structure detection over candlestick
//! (K-line) series.
//!
//! ## Quick Start
//!
//! ```rust
//! use kline_ta::prelude::*;
//!
//! let bars: Vec<Bar> = (0..120)
//!     .map(|i| {
//!         let c = 100.0 + (i as f64 * 0.3).sin() * 4.0;
//!         Bar::new(i * 86_400, c, c + 1.0, c - 1.0, c, 1_000.0)
//!     })
//!     .collect();
//!
//! let analyzer = AnalyzerBuilder::new().build().unwrap();
//! let report = analyzer.analyze(&bars, Interval::Day1).unwrap();
//!
//! println!("RSI {}", report.indicators.rsi);
//! for event in &report.zones {
//!     println!("{:?} at {}", event.kind, event.time);
//! }
//! ```
//!
//! Every computation is a pure function of an immutable bar slice. Results
//! are full replacements; nothing is carried between calls.

pub mod detectors;
pub mod indicators;
pub mod overlay;
pub mod params;
pub mod signals;

pub mod prelude {
    pub use crate::{
        // Analyzer
        analyze_parallel,
        detectors::{
            ConsolidationZone, HarmonicDetector, HarmonicMatch, HarmonicScan, LevelKind,
            LevelPolicy, StructureDetector, StructureEvent, StructureKind, StructureSummary,
            SupportResistance, SupportResistanceDetector, SupportResistanceLevel, SwingAnalysis,
        },
        indicators::{
            ema, percent_change, rsi, sma, ChartSummary, IndicatorConfig, IndicatorSnapshot,
            SeriesPoint,
        },
        overlay::{CoordinateMapper, Overlay},
        params::{get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        signals::{SignalConfig, SignalReason, SignalSide, TradingSignal, TradingSignals},
        AnalysisConfig,
        // Errors
        AnalysisError,
        AnalysisHint,
        AnalysisReport,
        Analyzer,
        AnalyzerBuilder,
        // Types
        Bar,
        BarSeries,
        DetectorId,
        InstrumentError,
        InstrumentReport,
        Interval,
        IntervalGate,
        OHLCVExt,
        Period,
        Ratio,
        Result,
        ValidationError,
        WindowDetector,
        OHLCV,
    };
}

use std::fmt;
use std::str::FromStr;

use detectors::{
    ConsolidationZone, HarmonicDetector, HarmonicMatch, StructureDetector, StructureEvent,
    StructureSummary, SupportResistance, SupportResistanceDetector, SwingAnalysis,
};
use indicators::{ChartSummary, IndicatorConfig, IndicatorSnapshot};
use signals::{SignalConfig, TradingSignals};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// A bar that breaks the series invariants
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid bar at index {index} (time {time}): {reason}")]
pub struct ValidationError {
    pub index: usize,
    pub time: i64,
    pub reason: &'static str,
}

/// Errors that can occur during analysis
#[derive(Debug, Clone, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Insufficient data: need {need} bars, got {got}")]
    InsufficientData { need: usize, got: usize },

    #[error("Interval {0} is not enabled for this detector")]
    UnsupportedInterval(Interval),

    #[error("Unknown interval: {0}")]
    UnknownInterval(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(AnalysisError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(AnalysisError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(AnalysisError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    /// Bar open time, seconds since epoch
    fn time(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Blanket impl for references
impl<T: OHLCV + ?Sized> OHLCV for &T {
    fn time(&self) -> i64 {
        (**self).time()
    }

    fn open(&self) -> f64 {
        (**self).open()
    }

    fn high(&self) -> f64 {
        (**self).high()
    }

    fn low(&self) -> f64 {
        (**self).low()
    }

    fn close(&self) -> f64 {
        (**self).close()
    }

    fn volume(&self) -> f64 {
        (**self).volume()
    }
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// (high + low + close) / 3
    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    /// Wilder's true range against the previous close
    #[inline]
    fn true_range(&self, prev_close: f64) -> f64 {
        self.range()
            .max((self.high() - prev_close).abs())
            .max((self.low() - prev_close).abs())
    }

    /// Validate a single bar in isolation. `index` is left at 0; series
    /// validation fills in the position.
    fn validate(&self) -> std::result::Result<(), ValidationError> {
        let fail = |reason| {
            Err(ValidationError {
                index: 0,
                time: self.time(),
                reason,
            })
        };

        let prices = [self.open(), self.high(), self.low(), self.close()];
        if prices.iter().any(|p| p.is_nan()) || self.volume().is_nan() {
            return fail("NaN in OHLCV");
        }
        if prices.iter().any(|p| p.is_infinite()) || self.volume().is_infinite() {
            return fail("Infinite value in OHLCV");
        }
        if prices.iter().any(|&p| p <= 0.0) {
            return fail("non-positive price");
        }
        if self.high() < self.low() {
            return fail("high < low");
        }
        if self.open().min(self.close()) < self.low() {
            return fail("open/close below low");
        }
        if self.open().max(self.close()) > self.high() {
            return fail("open/close above high");
        }
        if self.volume() < 0.0 {
            return fail("negative volume");
        }
        Ok(())
    }
}

impl<T: OHLCV + ?Sized> OHLCVExt for T {}

/// Validate every bar and the strictly increasing time invariant.
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> std::result::Result<(), ValidationError> {
    let mut prev_time: Option<i64> = None;
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| ValidationError { index: i, ..e })?;
        if let Some(prev) = prev_time {
            if bar.time() <= prev {
                return Err(ValidationError {
                    index: i,
                    time: bar.time(),
                    reason: "time not strictly increasing",
                });
            }
        }
        prev_time = Some(bar.time());
    }
    Ok(())
}

// ============================================================
// BAR / SERIES
// ============================================================

/// One OHLCV observation
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

impl OHLCV for Bar {
    fn time(&self) -> i64 {
        self.time
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Validated, immutable bar series.
///
/// Construction rejects the first bar that breaks an invariant. The series
/// itself is never mutated; analysis borrows it as a slice.
#[derive(Debug, Clone)]
pub struct BarSeries<T: OHLCV = Bar> {
    bars: Vec<T>,
}

impl<T: OHLCV> BarSeries<T> {
    pub fn new(bars: Vec<T>) -> std::result::Result<Self, ValidationError> {
        validate_bars(&bars)?;
        Ok(Self { bars })
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.bars
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    #[inline]
    pub fn last(&self) -> Option<&T> {
        self.bars.last()
    }

    /// The trailing `n` bars (all of them if the series is shorter)
    #[inline]
    pub fn trailing(&self, n: usize) -> &[T] {
        detectors::helpers::trailing(&self.bars, n)
    }

    pub fn into_inner(self) -> Vec<T> {
        self.bars
    }
}

impl<T: OHLCV> AsRef<[T]> for BarSeries<T> {
    fn as_ref(&self) -> &[T] {
        &self.bars
    }
}

impl<T: OHLCV> TryFrom<Vec<T>> for BarSeries<T> {
    type Error = ValidationError;

    fn try_from(bars: Vec<T>) -> std::result::Result<Self, Self::Error> {
        Self::new(bars)
    }
}

// ============================================================
// INTERVALS
// ============================================================

macro_rules! define_intervals {
    ($($variant:ident => $s:literal, $secs:expr);* $(;)?) => {
        /// Candlestick interval, named as on the exchange kline API
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum Interval {
            $(#[serde(rename = $s)] $variant),*
        }

        impl Interval {
            pub const ALL: &'static [Interval] = &[$(Interval::$variant),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Interval::$variant => $s),*
                }
            }

            /// Nominal bar duration in seconds
            pub fn seconds(self) -> i64 {
                match self {
                    $(Interval::$variant => $secs),*
                }
            }
        }

        impl FromStr for Interval {
            type Err = AnalysisError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($s => Ok(Interval::$variant),)*
                    other => Err(AnalysisError::UnknownInterval(other.to_string())),
                }
            }
        }
    };
}

define_intervals! {
    Min1 => "1m", 60;
    Min3 => "3m", 180;
    Min5 => "5m", 300;
    Min15 => "15m", 900;
    Min30 => "30m", 1_800;
    Hour1 => "1h", 3_600;
    Hour2 => "2h", 7_200;
    Hour4 => "4h", 14_400;
    Hour6 => "6h", 21_600;
    Hour8 => "8h", 28_800;
    Hour12 => "12h", 43_200;
    Day1 => "1d", 86_400;
    Day3 => "3d", 259_200;
    Week1 => "1w", 604_800;
    Month1 => "1M", 2_592_000;
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which intervals the overlay detectors run on.
///
/// Defaults to daily bars only. `All` disables gating.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalGate {
    All,
    Only(Vec<Interval>),
}

impl Default for IntervalGate {
    fn default() -> Self {
        IntervalGate::Only(vec![Interval::Day1])
    }
}

impl IntervalGate {
    #[inline]
    pub fn allows(&self, interval: Interval) -> bool {
        match self {
            IntervalGate::All => true,
            IntervalGate::Only(list) => list.contains(&interval),
        }
    }
}

// ============================================================
// DETECTOR TRAIT
// ============================================================

/// Unique identifier for a detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct DetectorId(pub &'static str);

impl DetectorId {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for DetectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A detector that runs over a trailing window of the series and needs a
/// minimum sample.
pub trait WindowDetector: Send + Sync {
    type Output;

    fn id(&self) -> DetectorId;

    /// Minimum window length; shorter windows produce `InsufficientData`
    fn min_bars(&self) -> usize;

    /// How many trailing bars are examined
    fn window(&self) -> usize;

    /// Run on an already-sized window
    fn detect_window<T: OHLCV>(&self, window: &[T]) -> Self::Output;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    /// Take the trailing window, enforce the minimum sample, then detect.
    fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Self::Output> {
        let window = detectors::helpers::trailing(bars, self.window());
        if window.len() < self.min_bars() {
            return Err(AnalysisError::InsufficientData {
                need: self.min_bars(),
                got: window.len(),
            });
        }
        Ok(self.detect_window(window))
    }
}

// ============================================================
// ANALYZER
// ============================================================

/// Analyzer configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub indicators: IndicatorConfig,
    pub levels: SupportResistanceDetector,
    pub structure: StructureDetector,
    pub harmonic: HarmonicDetector,
    pub signals: SignalConfig,
    /// Neighbourhood half-width for swing points
    pub swing_length: Period,
    pub interval_gate: IntervalGate,
    /// Reject malformed series before analysis
    pub validate_data: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorConfig::default(),
            levels: SupportResistanceDetector::default(),
            structure: StructureDetector::default(),
            harmonic: HarmonicDetector::default(),
            signals: SignalConfig::default(),
            swing_length: Period::new_const(detectors::SWING_LENGTH),
            interval_gate: IntervalGate::default(),
            validate_data: true,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        self.levels.validate_config()?;
        self.structure.validate_config()?;
        self.harmonic.validate_config()?;
        self.signals.validate()?;
        if let IntervalGate::Only(list) = &self.interval_gate {
            if list.is_empty() {
                return Err(AnalysisError::InvalidConfig(
                    "interval_gate lists no intervals; use `all` to disable gating".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Why a detector produced nothing
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisHint {
    /// Detector is gated to other intervals
    UnsupportedInterval {
        detector: DetectorId,
        interval: Interval,
    },
    /// Window shorter than the detector's minimum sample
    InsufficientData {
        detector: DetectorId,
        need: usize,
        got: usize,
    },
}

/// Everything the display layer needs for one series
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub interval: Interval,
    pub bar_count: usize,
    pub indicators: IndicatorSnapshot,
    pub summary: Option<ChartSummary>,
    /// Uncoalesced BOS/CHoCH markers over the recent window
    pub markers: Vec<StructureEvent>,
    /// BOS/CHoCH events with adjacent same-kind events merged into zones
    pub zones: Vec<StructureEvent>,
    pub structure: StructureSummary,
    pub swings: SwingAnalysis,
    pub levels: Option<SupportResistance>,
    pub consolidation: Option<ConsolidationZone>,
    pub harmonics: Vec<HarmonicMatch>,
    pub signals: TradingSignals,
    pub hints: Vec<AnalysisHint>,
}

impl AnalysisReport {
    /// First harmonic match, the one a single-overlay display shows
    pub fn harmonic(&self) -> Option<&HarmonicMatch> {
        self.harmonics.first()
    }
}

/// Runs every indicator and detector over one series
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[inline]
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Indicator snapshot only
    pub fn snapshot<T: OHLCV>(&self, bars: &[T]) -> IndicatorSnapshot {
        IndicatorSnapshot::compute_with(bars, &self.config.indicators)
    }

    /// Full analysis of one series.
    ///
    /// Fails only when validation is enabled and the series is malformed.
    /// Detectors that cannot run contribute an [`AnalysisHint`] and leave
    /// their output empty; the others are unaffected.
    pub fn analyze<T: OHLCV>(&self, bars: &[T], interval: Interval) -> Result<AnalysisReport> {
        if self.config.validate_data {
            if let Err(e) = validate_bars(bars) {
                log::warn!("rejecting series: {e}");
                return Err(e.into());
            }
        }

        log::debug!("analyzing {} bars at {}", bars.len(), interval);

        let mut hints = Vec::new();
        let structure = &self.config.structure;

        let markers = match structure.markers(bars) {
            Ok(events) => events,
            Err(e) => {
                hints.extend(hint_from(structure.id(), &e));
                Vec::new()
            }
        };

        let zones = self
            .gated(structure, bars, interval, &mut hints)
            .unwrap_or_default();
        let levels = self.gated(&self.config.levels, bars, interval, &mut hints);
        let consolidation = if self.config.interval_gate.allows(interval) {
            self.config.levels.consolidation(bars)
        } else {
            None
        };
        let harmonics = self
            .gated(&self.config.harmonic, bars, interval, &mut hints)
            .unwrap_or_default();

        let swings = SwingAnalysis::compute(bars, self.config.swing_length.get());
        let summary = StructureSummary::from_events(bars, &markers, &swings);
        let signals = TradingSignals::compute(bars, &swings, &self.config.signals);

        log::trace!(
            "markers={} zones={} levels={} harmonics={} signals={}/{} hints={}",
            markers.len(),
            zones.len(),
            levels.is_some(),
            harmonics.len(),
            signals.buy.len(),
            signals.sell.len(),
            hints.len()
        );

        Ok(AnalysisReport {
            interval,
            bar_count: bars.len(),
            indicators: self.snapshot(bars),
            summary: ChartSummary::compute_with(bars, &self.config.indicators),
            markers,
            zones,
            structure: summary,
            swings,
            levels,
            consolidation,
            harmonics,
            signals,
            hints,
        })
    }

    fn gated<T: OHLCV, D: WindowDetector>(
        &self,
        detector: &D,
        bars: &[T],
        interval: Interval,
        hints: &mut Vec<AnalysisHint>,
    ) -> Option<D::Output> {
        if !self.config.interval_gate.allows(interval) {
            hints.push(AnalysisHint::UnsupportedInterval {
                detector: detector.id(),
                interval,
            });
            return None;
        }
        match detector.detect(bars) {
            Ok(out) => Some(out),
            Err(e) => {
                hints.extend(hint_from(detector.id(), &e));
                None
            }
        }
    }
}

fn hint_from(detector: DetectorId, error: &AnalysisError) -> Option<AnalysisHint> {
    match *error {
        AnalysisError::InsufficientData { need, got } => {
            Some(AnalysisHint::InsufficientData { detector, need, got })
        }
        AnalysisError::UnsupportedInterval(interval) => {
            Some(AnalysisHint::UnsupportedInterval { detector, interval })
        }
        _ => None,
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating Analyzer instances
#[derive(Debug, Clone, Default)]
pub struct AnalyzerBuilder {
    config: AnalysisConfig,
}

impl AnalyzerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a complete configuration (e.g. deserialized from a file)
    pub fn config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    pub fn indicators(mut self, indicators: IndicatorConfig) -> Self {
        self.config.indicators = indicators;
        self
    }

    pub fn levels(mut self, detector: SupportResistanceDetector) -> Self {
        self.config.levels = detector;
        self
    }

    pub fn structure(mut self, detector: StructureDetector) -> Self {
        self.config.structure = detector;
        self
    }

    pub fn harmonic(mut self, detector: HarmonicDetector) -> Self {
        self.config.harmonic = detector;
        self
    }

    pub fn swing_length(mut self, length: Period) -> Self {
        self.config.swing_length = length;
        self
    }

    pub fn interval_gate(mut self, gate: IntervalGate) -> Self {
        self.config.interval_gate = gate;
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    /// Build the analyzer
    pub fn build(self) -> Result<Analyzer> {
        Analyzer::new(self.config)
    }
}

// ============================================================
// PARALLEL ANALYSIS
// ============================================================

use rayon::prelude::*;

/// Result of analyzing a single instrument
#[derive(Debug)]
pub struct InstrumentReport {
    pub symbol: String,
    pub report: AnalysisReport,
}

/// Error from analyzing a single instrument
#[derive(Debug)]
pub struct InstrumentError {
    pub symbol: String,
    pub error: AnalysisError,
}

/// Parallel analysis of multiple instruments
pub fn analyze_parallel<'a, T, I>(
    analyzer: &Analyzer,
    instruments: I,
) -> (Vec<InstrumentReport>, Vec<InstrumentError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T], Interval)>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars, interval)| {
            analyzer
                .analyze(bars, interval)
                .map(|report| InstrumentReport {
                    symbol: symbol.to_string(),
                    report,
                })
                .map_err(|error| InstrumentError {
                    symbol: symbol.to_string(),
                    error,
                })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn day(i: i64) -> i64 {
        1_700_000_000 + i * 86_400
    }

    fn make_uptrend_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64;
                Bar::new(day(i as i64), c - 0.5, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect()
    }

    fn make_wave_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + (i as f64 * 0.4).sin() * 8.0;
                Bar::new(day(i as i64), c, c + 1.5, c - 1.5, c, 500.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_ratio_validation() {
        assert!(Ratio::new(0.0).is_ok());
        assert!(Ratio::new(1.0).is_ok());
        assert!(Ratio::new(0.5).is_ok());
        assert!(Ratio::new(-0.1).is_err());
        assert!(Ratio::new(1.1).is_err());
        assert!(Ratio::new(f64::NAN).is_err());
        assert!(Ratio::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_period_validation() {
        assert!(Period::new(1).is_ok());
        assert!(Period::new(100).is_ok());
        assert!(Period::new(0).is_err());
    }

    #[test]
    fn test_ohlcv_ext() {
        let bar = Bar::new(0, 100.0, 110.0, 90.0, 105.0, 1.0);
        assert_eq!(bar.body(), 5.0);
        assert_eq!(bar.range(), 20.0);
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
        assert!((bar.typical_price() - 305.0 / 3.0).abs() < 1e-12);
        assert_eq!(bar.true_range(80.0), 30.0);
        assert_eq!(bar.true_range(100.0), 20.0);
    }

    #[test]
    fn test_validate_rejects_bad_bars() {
        let cases = [
            (Bar::new(1, 10.0, 9.0, 11.0, 10.0, 1.0), "high < low"),
            (Bar::new(1, 12.0, 11.0, 9.0, 10.0, 1.0), "open/close above high"),
            (Bar::new(1, 8.0, 11.0, 9.0, 10.0, 1.0), "open/close below low"),
            (Bar::new(1, 10.0, 11.0, 9.0, 10.0, -1.0), "negative volume"),
            (Bar::new(1, 10.0, 11.0, 0.0, 10.0, 1.0), "non-positive price"),
            (Bar::new(1, f64::NAN, 11.0, 9.0, 10.0, 1.0), "NaN in OHLCV"),
        ];
        for (bar, reason) in cases {
            let err = bar.validate().unwrap_err();
            assert_eq!(err.reason, reason);
        }
    }

    #[test]
    fn test_series_rejects_offending_index() {
        let mut bars = make_uptrend_bars(5);
        bars[3].time = bars[2].time;
        let err = BarSeries::new(bars).unwrap_err();
        assert_eq!(err.index, 3);
        assert_eq!(err.reason, "time not strictly increasing");

        let mut bars = make_uptrend_bars(5);
        bars[4].low = bars[4].high + 1.0;
        let err = BarSeries::new(bars).unwrap_err();
        assert_eq!(err.index, 4);
    }

    #[test]
    fn test_series_trailing() {
        let series = BarSeries::new(make_uptrend_bars(10)).unwrap();
        assert_eq!(series.len(), 10);
        assert_eq!(series.trailing(3).len(), 3);
        assert_eq!(series.trailing(30).len(), 10);
        assert_eq!(series.trailing(3)[0].time, day(7));
    }

    #[test]
    fn test_interval_round_trip() {
        for &interval in Interval::ALL {
            assert_eq!(interval.as_str().parse::<Interval>().unwrap(), interval);
        }
        assert!("2d".parse::<Interval>().is_err());
        assert_eq!(Interval::Day1.to_string(), "1d");
        assert_eq!(Interval::Month1.as_str(), "1M");
        assert_eq!(Interval::Min1.as_str(), "1m");
    }

    #[test]
    fn test_interval_gate() {
        let gate = IntervalGate::default();
        assert!(gate.allows(Interval::Day1));
        assert!(!gate.allows(Interval::Hour1));
        assert!(IntervalGate::All.allows(Interval::Hour1));
    }

    #[test]
    fn test_builder_rejects_empty_gate() {
        let result = AnalyzerBuilder::new()
            .interval_gate(IntervalGate::Only(vec![]))
            .build();
        assert!(matches!(result, Err(AnalysisError::InvalidConfig(_))));
    }

    #[test]
    fn test_analyze_daily() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();
        let bars = make_wave_bars(120);
        let report = analyzer.analyze(&bars, Interval::Day1).unwrap();

        assert_eq!(report.bar_count, 120);
        assert!(report.indicators.is_populated());
        assert!(report.levels.is_some());
        assert!(report.hints.is_empty());
        assert!(!report.markers.is_empty());
        assert!(!report.zones.is_empty());
    }

    #[test]
    fn test_analyze_gates_intraday() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();
        let bars = make_wave_bars(120);
        let report = analyzer.analyze(&bars, Interval::Hour1).unwrap();

        assert!(report.levels.is_none());
        assert!(report.zones.is_empty());
        assert!(report.harmonics.is_empty());
        // markers are never interval-gated
        assert!(!report.markers.is_empty());
        assert!(report
            .hints
            .iter()
            .all(|h| matches!(h, AnalysisHint::UnsupportedInterval { .. })));
        assert_eq!(report.hints.len(), 3);
    }

    #[test]
    fn test_analyze_all_intervals() {
        let analyzer = AnalyzerBuilder::new()
            .interval_gate(IntervalGate::All)
            .build()
            .unwrap();
        let report = analyzer
            .analyze(&make_wave_bars(120), Interval::Hour1)
            .unwrap();
        assert!(report.levels.is_some());
    }

    #[test]
    fn test_analyze_short_series_hints() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();
        let report = analyzer
            .analyze(&make_uptrend_bars(10), Interval::Day1)
            .unwrap();

        assert_eq!(report.indicators, IndicatorSnapshot::default());
        assert!(report.levels.is_none());
        assert!(report.markers.is_empty());
        assert!(report
            .hints
            .iter()
            .any(|h| matches!(h, AnalysisHint::InsufficientData { need: 30, got: 10, .. })));
    }

    #[test]
    fn test_analyze_rejects_malformed() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();
        let mut bars = make_uptrend_bars(40);
        bars[7].volume = -5.0;
        let err = analyzer.analyze(&bars, Interval::Day1).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Validation(ValidationError { index: 7, .. })
        ));

        let lenient = AnalyzerBuilder::new().validate_data(false).build().unwrap();
        assert!(lenient.analyze(&bars, Interval::Day1).is_ok());
    }

    #[test]
    fn test_config_from_json() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{ "interval_gate": "all", "harmonic": { "scan": "non_overlapping" } }"#,
        )
        .unwrap();
        assert_eq!(config.interval_gate, IntervalGate::All);
        assert_eq!(config.indicators, IndicatorConfig::default());
        assert!(config.validate_data);

        let bad: std::result::Result<AnalysisConfig, _> =
            serde_json::from_str(r#"{ "indicators": { "rsi_period": 0 } }"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_huge_period_from_config_does_not_panic() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "indicators": { "rsi_period": 18446744073709551615 } }"#)
                .unwrap();
        assert_eq!(config.indicators.rsi_period.get(), usize::MAX);

        let analyzer = Analyzer::new(config).unwrap();
        let report = analyzer
            .analyze(&make_wave_bars(60), Interval::Day1)
            .unwrap();
        assert_eq!(report.indicators, IndicatorSnapshot::default());
    }

    #[test]
    fn test_report_carries_signals() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();
        let bars = make_uptrend_bars(120);
        let report = analyzer.analyze(&bars, Interval::Day1).unwrap();

        assert!(report
            .signals
            .sell
            .iter()
            .any(|s| s.reason == signals::SignalReason::RsiOverbought));
        assert!(report
            .signals
            .buy
            .iter()
            .any(|s| s.reason == signals::SignalReason::AboveSma));
        // recent high and low of the last 20 bars
        assert_eq!(report.signals.key_levels[0].price, 220.0);
        assert_eq!(report.signals.key_levels[1].price, 199.0);
    }

    #[test]
    fn test_bad_signal_config_rejected() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{ "signals": { "overbought": 20.0 } }"#).unwrap();
        assert!(matches!(
            Analyzer::new(config),
            Err(AnalysisError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_parallel_analysis() {
        let analyzer = AnalyzerBuilder::new().build().unwrap();

        let good = make_wave_bars(80);
        let mut bad = make_wave_bars(80);
        bad[10].high = bad[10].low - 1.0;

        let instruments: Vec<(&str, &[Bar], Interval)> = vec![
            ("BTCUSDT", &good, Interval::Day1),
            ("ETHUSDT", &bad, Interval::Day1),
        ];

        let (reports, errors) = analyze_parallel(&analyzer, instruments);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].symbol, "BTCUSDT");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].symbol, "ETHUSDT");
    }
}
