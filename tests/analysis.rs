//! End-to-end tests for the kline-ta analysis pipeline.
//!
//! These drive the public API with hand-built series whose expected output
//! can be worked out on paper.

use kline_ta::detectors::{scan_zones, AnchorPoint, Bias};
use kline_ta::indicators::{amplitude, sma_last};
use kline_ta::overlay::{project_harmonic, project_levels, project_structure};
use kline_ta::prelude::*;
use kline_ta::signals::market_bias;

const DAY: i64 = 86_400;

/// Caller-side bar type, to exercise the `OHLCV` trait rather than `Bar`
#[derive(Debug, Clone, Copy)]
struct TestBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
}

impl TestBar {
    fn new(t: i64, o: f64, h: f64, l: f64, c: f64) -> Self {
        Self { t, o, h, l, c }
    }
}

impl OHLCV for TestBar {
    fn time(&self) -> i64 {
        self.t
    }

    fn open(&self) -> f64 {
        self.o
    }

    fn high(&self) -> f64 {
        self.h
    }

    fn low(&self) -> f64 {
        self.l
    }

    fn close(&self) -> f64 {
        self.c
    }

    fn volume(&self) -> f64 {
        1000.0
    }
}

/// Closes 100, 101, ... with a one-point range either side
fn make_uptrend(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64;
            TestBar::new(i as i64 * DAY, c - 0.5, c + 1.0, c - 1.0, c)
        })
        .collect()
}

fn make_flat(n: usize) -> Vec<TestBar> {
    (0..n)
        .map(|i| TestBar::new(i as i64 * DAY, 50.0, 51.0, 49.0, 50.0))
        .collect()
}

fn make_wave(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let c = 200.0 + (i as f64 * 0.35).sin() * 12.0;
            Bar::new(i as i64 * DAY, c, c + 2.0, c - 2.0, c, 10_000.0)
        })
        .collect()
}

/// Bars with explicit (high, low), open/close at the midpoint
fn from_hl(hl: &[(f64, f64)]) -> Vec<TestBar> {
    hl.iter()
        .enumerate()
        .map(|(i, &(h, l))| {
            let mid = (h + l) / 2.0;
            TestBar::new(i as i64 * DAY, mid, h, l, mid)
        })
        .collect()
}

// ============================================================
// SCENARIOS
// ============================================================

#[test]
fn test_rising_series() {
    let bars = make_uptrend(30);

    // closes 110..=129
    assert_eq!(sma_last(&bars, 20), 119.5);
    assert_eq!(rsi(&bars, 14), 100.0);

    let markers = StructureDetector::default().markers(&bars).unwrap();
    let last = markers.last().unwrap();
    assert_eq!(last.kind, StructureKind::Bos);
    assert_eq!(last.index, 29);
    assert_eq!(last.price, 130.0);
    assert!(markers.iter().all(|e| e.kind == StructureKind::Bos));
}

#[test]
fn test_flat_series() {
    let bars = make_flat(60);
    let snap = IndicatorSnapshot::compute(&bars);

    let expected_amplitude = (51.0 - 49.0) / 49.0 * 100.0;
    assert!((snap.amplitude_24h - expected_amplitude).abs() < 1e-9);
    assert!((amplitude(&bars, 24) - 4.0816).abs() < 1e-4);
    assert_eq!(snap.ema50, 50.0);
    assert_eq!(snap.sma20, 50.0);
    assert_eq!(snap.rsi, 50.0);
    assert_eq!(snap.sma20_change, 0.0);
    assert_eq!(snap.ema50_change, 0.0);
    assert_eq!(snap.rsi_change, 0.0);
    assert_eq!(snap.volume_ma_change, 0.0);
}

#[test]
fn test_three_bars_degrade_to_defaults() {
    let bars = make_uptrend(3);

    let snap = IndicatorSnapshot::compute(&bars);
    assert_eq!(snap.rsi, 50.0);
    assert_eq!(snap.sma20, 0.0);
    assert_eq!(snap.ema50, 0.0);
    assert_eq!(snap.volume_ma, 0.0);
    assert_eq!(snap.amplitude_24h, 0.0);

    assert!(matches!(
        SupportResistanceDetector::default().detect(&bars),
        Err(AnalysisError::InsufficientData { need: 30, got: 3 })
    ));

    let analyzer = AnalyzerBuilder::new().build().unwrap();
    let report = analyzer.analyze(&bars, Interval::Day1).unwrap();
    assert!(report.levels.is_none());
    assert!(report.markers.is_empty());
    assert!(report.zones.is_empty());
    assert!(report.harmonic().is_none());
    assert_eq!(report.hints.len(), 4);
}

#[test]
fn test_abcd_geometry() {
    let bars = from_hl(&[(101.0, 100.0), (110.0, 105.0), (108.0, 107.0), (117.0, 112.0)]);
    let matches = HarmonicDetector::default().scan(&bars);
    assert_eq!(matches.len(), 1);

    let m = matches[0];
    let expected: Vec<AnchorPoint> = [(0, 100.0), (1, 110.0), (2, 107.0), (3, 117.0)]
        .into_iter()
        .map(|(i, price)| AnchorPoint {
            index: i,
            time: bars[i].t,
            price,
        })
        .collect();
    assert_eq!(m.anchors.to_vec(), expected);
    assert_eq!(m.ab, 10.0);
    assert_eq!(m.cd, 10.0);
    assert!(m.is_complete());
}

#[test]
fn test_ascending_run_coalesces() {
    let bars = from_hl(&[(10.0, 5.0), (11.0, 6.0), (12.0, 7.0), (13.0, 8.0), (14.0, 9.0)]);
    let zones = scan_zones(&bars);
    assert_eq!(zones.len(), 1);

    let zone = zones[0];
    assert_eq!(zone.kind, StructureKind::Bos);
    let range = zone.zone.unwrap();
    assert_eq!(range.from, bars[2].t);
    assert_eq!(range.to, bars[4].t);
}

// ============================================================
// PIPELINE
// ============================================================

#[test]
fn test_full_report_on_daily_wave() {
    let series = BarSeries::new(make_wave(250)).unwrap();
    let analyzer = AnalyzerBuilder::new()
        .levels(SupportResistanceDetector::clustered())
        .harmonic(HarmonicDetector {
            scan: HarmonicScan::NonOverlapping,
            ..Default::default()
        })
        .build()
        .unwrap();

    let report = analyzer.analyze(series.as_slice(), Interval::Day1).unwrap();
    assert!(report.hints.is_empty());
    assert!(report.indicators.is_populated());
    assert_eq!(report.summary.unwrap().time, series.last().unwrap().time);

    let levels = report.levels.as_ref().unwrap();
    assert!(!levels.support.is_empty());
    assert!(!levels.resistance.is_empty());
    assert!(levels.support.iter().all(|l| l.test_count >= 1));
    assert!(levels
        .resistance
        .windows(2)
        .all(|w| w[0].test_count >= w[1].test_count));

    // a 24-point swing is far outside a 2% consolidation band
    assert!(report.consolidation.is_none());
    assert!(!report.swings.highs.is_empty());
    assert_eq!(
        report.structure.bos_count + report.structure.choch_count,
        report.markers.len()
    );
    for m in &report.harmonics {
        assert!(m.d().index < series.len());
    }

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["interval"], "1d");
    assert!(json["indicators"].get("volumeMA").is_some());
    assert_eq!(json["signals"]["keyLevels"][0]["type"], "resistance");
    assert!(json["signals"].get("bias").is_some());
}

#[test]
fn test_signals_follow_swings() {
    let bars = make_wave(250);
    let analyzer = AnalyzerBuilder::new().build().unwrap();
    let report = analyzer.analyze(&bars, Interval::Day1).unwrap();
    let swings = &report.swings;

    assert!(swings.breaks.windows(2).all(|w| w[0].index <= w[1].index));
    assert_eq!(
        report.signals.bias,
        market_bias(&bars, &swings.breaks, SignalConfig::default().bias_window.get())
    );

    // every order-block entry is backed by a block holding the last close
    let close = bars[249].close;
    let entries = report
        .signals
        .buy
        .iter()
        .chain(&report.signals.sell)
        .filter(|s| s.stop_loss.is_some())
        .count();
    assert_eq!(entries, swings.active_order_blocks(close).count());

    // recent range first, then one level per liquidity swing
    let liquidity = swings.liquidity.buy_side.len() + swings.liquidity.sell_side.len();
    assert_eq!(report.signals.key_levels.len(), 2 + liquidity);
}

#[test]
fn test_short_series_signals() {
    let report = AnalyzerBuilder::new()
        .build()
        .unwrap()
        .analyze(&make_uptrend(3), Interval::Day1)
        .unwrap();
    assert!(report.signals.buy.is_empty());
    assert!(report.signals.sell.is_empty());
    assert_eq!(report.signals.bias, Bias::Neutral);
    // the recent range is defined from the first bar
    assert_eq!(report.signals.key_levels.len(), 2);
    assert_eq!(report.signals.key_levels[0].price, 103.0);
    assert_eq!(report.signals.key_levels[1].price, 99.0);
}

#[test]
fn test_consolidation_detected() {
    let bars: Vec<Bar> = (0..80)
        .map(|i| {
            let c = 100.0 + if i % 2 == 0 { 0.3 } else { -0.3 };
            Bar::new(i * DAY, c, c + 0.2, c - 0.2, c, 500.0)
        })
        .collect();
    let report = AnalyzerBuilder::new()
        .build()
        .unwrap()
        .analyze(&bars, Interval::Day1)
        .unwrap();
    let zone = report.consolidation.unwrap();
    assert_eq!(zone.from, 0);
    assert_eq!(zone.to, 79 * DAY);
    assert!(zone.range_ratio <= 0.02);
}

#[test]
fn test_overlays_from_report() {
    struct Viewport;

    impl CoordinateMapper for Viewport {
        fn price_to_coordinate(&self, price: f64) -> Option<f32> {
            Some((1000.0 - price) as f32)
        }

        fn time_to_coordinate(&self, time: i64) -> Option<f32> {
            (time >= 100 * DAY).then(|| ((time - 100 * DAY) / DAY) as f32 * 8.0)
        }
    }

    let bars = make_wave(250);
    let analyzer = AnalyzerBuilder::new().build().unwrap();
    let report = analyzer.analyze(&bars, Interval::Day1).unwrap();

    let levels = report.levels.as_ref().unwrap();
    // default window spans the whole series, which starts off-screen
    assert!(project_levels(levels, &Viewport).is_empty());

    let markers = project_structure(&report.markers, &Viewport);
    assert_eq!(markers.len(), report.markers.len());

    if let Some(m) = report.harmonic() {
        let overlays = project_harmonic(m, &Viewport);
        assert!(overlays.len() <= 2);
    }
}

#[test]
fn test_parallel_instruments() {
    let analyzer = AnalyzerBuilder::new()
        .interval_gate(IntervalGate::All)
        .build()
        .unwrap();

    let a = make_wave(120);
    let b = make_wave(60);
    let mut broken = make_wave(60);
    broken[5].time = broken[4].time;

    let instruments: Vec<(&str, &[Bar], Interval)> = vec![
        ("BTCUSDT", &a, Interval::Hour4),
        ("ETHUSDT", &b, Interval::Min15),
        ("SOLUSDT", &broken, Interval::Day1),
    ];
    let (reports, errors) = analyze_parallel(&analyzer, instruments);

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.report.levels.is_some()));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].symbol, "SOLUSDT");
    assert!(matches!(
        errors[0].error,
        AnalysisError::Validation(ValidationError { index: 5, .. })
    ));
}
