//! Market-structure breaks: BOS (break of structure) and CHoCH (change of
//! character)
//!
//! A BOS fires at bar `i` when the highs of `i-2, i-1, i` are strictly
//! ascending; a CHoCH fires when the lows are strictly descending. Both may
//! fire on the same bar, BOS first.
//!
//! Zones coalesce runs of same-kind events less than [`ZONE_GAP`] bars apart.

use std::collections::HashMap;

use crate::{
  params::{get_period, ParamMeta, ParameterizedDetector},
  AnalysisError, DetectorId, Period, Result, WindowDetector, OHLCV,
};

use super::helpers::trailing;
use super::swing::{SwingAnalysis, SwingPoint};

/// Events closer than this many bars merge into one zone
pub const ZONE_GAP: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StructureKind {
  #[serde(rename = "BOS")]
  Bos,
  #[serde(rename = "CHoCH")]
  Choch,
}

impl StructureKind {
  pub fn as_str(self) -> &'static str {
    match self {
      StructureKind::Bos => "BOS",
      StructureKind::Choch => "CHoCH",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TimeRange {
  pub from: i64,
  pub to: i64,
}

/// A structure break, or a coalesced run of them when `zone` is set
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructureEvent {
  pub kind: StructureKind,
  pub time: i64,
  pub price: f64,
  /// Bar index within the scanned series
  pub index: usize,
  pub zone: Option<TimeRange>,
}

impl StructureEvent {
  /// Display label, e.g. `"BOS\n104.5"`
  pub fn label(&self) -> String {
    format!("{}\n{}", self.kind.as_str(), self.price)
  }
}

/// All BOS/CHoCH events in index order.
pub fn scan_events<T: OHLCV>(bars: &[T]) -> Vec<StructureEvent> {
  let mut events = Vec::new();

  for i in 2..bars.len() {
    let (a, b, c) = (&bars[i - 2], &bars[i - 1], &bars[i]);

    if c.high() > b.high() && b.high() > a.high() {
      events.push(StructureEvent {
        kind: StructureKind::Bos,
        time: c.time(),
        price: c.high(),
        index: i,
        zone: None,
      });
    }
    if c.low() < b.low() && b.low() < a.low() {
      events.push(StructureEvent {
        kind: StructureKind::Choch,
        time: c.time(),
        price: c.low(),
        index: i,
        zone: None,
      });
    }
  }

  events
}

/// Events with same-kind runs merged.
///
/// Walking the combined event stream, an event joins the open run when it has
/// the run's kind and sits less than [`ZONE_GAP`] bars after the run's last
/// event. A run of two or more becomes one entry whose zone spans the first to
/// the last event. Its price anchors to the bar where the run started (the
/// event preceding the run, or bar 0): that bar's low for BOS, its high for
/// CHoCH. Single events pass through unchanged.
pub fn scan_zones<T: OHLCV>(bars: &[T]) -> Vec<StructureEvent> {
  let events = scan_events(bars);
  let mut out = Vec::new();

  let mut start = 0;
  while start < events.len() {
    let first = events[start];
    let mut end = start;
    while end + 1 < events.len()
      && events[end + 1].kind == first.kind
      && events[end + 1].index - events[end].index < ZONE_GAP
    {
      end += 1;
    }

    if end == start {
      out.push(first);
    } else {
      let anchor = if start == 0 { 0 } else { events[start - 1].index };
      let price = match first.kind {
        StructureKind::Bos => bars[anchor].low(),
        StructureKind::Choch => bars[anchor].high(),
      };
      out.push(StructureEvent {
        price,
        zone: Some(TimeRange {
          from: first.time,
          to: events[end].time,
        }),
        ..first
      });
    }

    start = end + 1;
  }

  out
}

fn shift(events: &mut [StructureEvent], offset: usize) {
  for e in events {
    e.index += offset;
  }
}

// ============================================================
// DETECTOR
// ============================================================

/// BOS/CHoCH detector with separate windows for markers and zones
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StructureDetector {
  pub min_bars: Period,
  /// Trailing bars scanned for uncoalesced markers
  pub marker_window: Period,
  /// Trailing bars scanned for zones
  pub zone_window: Period,
}

impl Default for StructureDetector {
  fn default() -> Self {
    Self {
      min_bars: Period::new_const(30),
      marker_window: Period::new_const(30),
      zone_window: Period::new_const(1000),
    }
  }
}

impl StructureDetector {
  /// Uncoalesced events over the trailing `marker_window` bars.
  ///
  /// Indices refer to `bars`, not the window.
  pub fn markers<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<StructureEvent>> {
    if bars.len() < self.min_bars.get() {
      return Err(AnalysisError::InsufficientData {
        need: self.min_bars.get(),
        got: bars.len(),
      });
    }
    let window = trailing(bars, self.marker_window.get());
    let mut events = scan_events(window);
    shift(&mut events, bars.len() - window.len());
    Ok(events)
  }
}

impl WindowDetector for StructureDetector {
  type Output = Vec<StructureEvent>;

  fn id(&self) -> DetectorId {
    DetectorId("SMC_STRUCTURE")
  }

  fn min_bars(&self) -> usize {
    self.min_bars.get()
  }

  fn window(&self) -> usize {
    self.zone_window.get()
  }

  fn detect_window<T: OHLCV>(&self, window: &[T]) -> Vec<StructureEvent> {
    scan_zones(window)
  }

  fn validate_config(&self) -> Result<()> {
    if self.min_bars.get() > self.zone_window.get() {
      return Err(AnalysisError::InvalidConfig(format!(
        "structure min_bars ({}) exceeds zone_window ({})",
        self.min_bars.get(),
        self.zone_window.get()
      )));
    }
    Ok(())
  }

  /// Zones over the trailing window, indices relative to `bars`
  fn detect<T: OHLCV>(&self, bars: &[T]) -> Result<Vec<StructureEvent>> {
    let window = trailing(bars, self.zone_window.get());
    if window.len() < self.min_bars.get() {
      return Err(AnalysisError::InsufficientData {
        need: self.min_bars.get(),
        got: window.len(),
      });
    }
    let mut zones = self.detect_window(window);
    shift(&mut zones, bars.len() - window.len());
    Ok(zones)
  }
}

const STRUCTURE_PARAMS: &[ParamMeta] = &[
  ParamMeta::period("marker_window", 30.0, (10.0, 100.0, 10.0), "Trailing bars scanned for markers"),
  ParamMeta::period("zone_window", 1000.0, (100.0, 2000.0, 100.0), "Trailing bars scanned for zones"),
];

impl ParameterizedDetector for StructureDetector {
  fn param_meta() -> &'static [ParamMeta] {
    STRUCTURE_PARAMS
  }

  fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
    Self::check_params(params)?;
    let defaults = Self::default();
    let detector = Self {
      marker_window: get_period(params, "marker_window", defaults.marker_window.get())?,
      zone_window: get_period(params, "zone_window", defaults.zone_window.get())?,
      ..defaults
    };
    detector.validate_config()?;
    Ok(detector)
  }

  fn detector_id() -> DetectorId {
    DetectorId("SMC_STRUCTURE")
  }
}

// ============================================================
// SUMMARY
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bias {
  Bullish,
  Bearish,
  #[default]
  Neutral,
}

/// Headline numbers for the structure panel
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureSummary {
  pub bos_count: usize,
  pub choch_count: usize,
  pub bias: Bias,
  /// Latest swing high, else the last bar's high
  pub current_high: Option<f64>,
  /// e.g. `"HH → HL"`: the latest swing high and swing low classified
  /// against their predecessors, oldest first
  pub swing_label: Option<String>,
}

impl StructureSummary {
  pub fn from_events<T: OHLCV>(
    bars: &[T],
    events: &[StructureEvent],
    swings: &SwingAnalysis,
  ) -> Self {
    let bos_count = events.iter().filter(|e| e.kind == StructureKind::Bos).count();
    let choch_count = events.len() - bos_count;
    let bias = match bos_count.cmp(&choch_count) {
      std::cmp::Ordering::Greater => Bias::Bullish,
      std::cmp::Ordering::Less => Bias::Bearish,
      std::cmp::Ordering::Equal => Bias::Neutral,
    };

    let current_high = swings
      .highs
      .last()
      .map(|s| s.price)
      .or_else(|| bars.last().map(|b| b.high()));

    Self {
      bos_count,
      choch_count,
      bias,
      current_high,
      swing_label: swing_label(&swings.highs, &swings.lows),
    }
  }
}

fn swing_label(highs: &[SwingPoint], lows: &[SwingPoint]) -> Option<String> {
  let classify = |points: &[SwingPoint], up: &'static str, down: &'static str| match points {
    [.., prev, last] => Some((last.index, if last.price > prev.price { up } else { down })),
    _ => None,
  };

  let mut tags: Vec<(usize, &str)> = [classify(highs, "HH", "LH"), classify(lows, "HL", "LL")]
    .into_iter()
    .flatten()
    .collect();
  if tags.is_empty() {
    return None;
  }
  tags.sort_by_key(|&(index, _)| index);
  Some(tags.iter().map(|&(_, tag)| tag).collect::<Vec<_>>().join(" → "))
}
