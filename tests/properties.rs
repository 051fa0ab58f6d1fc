//! Property tests over randomly generated, valid bar series.

use kline_ta::detectors::{scan_events, scan_zones};
use kline_ta::indicators::{ema, percent_change, rsi, rsi_series, sma};
use kline_ta::prelude::*;
use proptest::prelude::*;

/// Random walk from 100 with non-negative wicks; always valid
fn series(steps: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut price: f64 = 100.0;
    steps
        .iter()
        .enumerate()
        .map(|(i, &(delta, upper, lower))| {
            let open = price;
            let close = (price + delta).max(1.0);
            price = close;
            Bar::new(
                i as i64 * 3_600,
                open,
                open.max(close) + upper,
                (open.min(close) - lower).max(0.5),
                close,
                1_000.0 + upper * 100.0,
            )
        })
        .collect()
}

fn steps(max: usize) -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    proptest::collection::vec((-5.0f64..5.0, 0.0f64..2.0, 0.0f64..2.0), 0..max)
}

proptest! {
    #[test]
    fn generated_series_are_valid(s in steps(80)) {
        prop_assert!(BarSeries::new(series(&s)).is_ok());
    }

    #[test]
    fn rsi_stays_in_bounds(s in steps(120), period in 2usize..30) {
        let bars = series(&s);
        let value = rsi(&bars, period);
        prop_assert!((0.0..=100.0).contains(&value));
        for p in rsi_series(&bars, period) {
            prop_assert!((0.0..=100.0).contains(&p.value));
        }
    }

    #[test]
    fn moving_average_lengths(s in steps(120), period in 1usize..40) {
        let bars = series(&s);
        let expected = (bars.len() + 1).saturating_sub(period);
        prop_assert_eq!(sma(&bars, period).len(), expected);
        prop_assert_eq!(ema(&bars, period).len(), expected);
        if let Some(first) = ema(&bars, period).first() {
            prop_assert_eq!(first.time, bars[period - 1].time);
        }
    }

    #[test]
    fn percent_change_identities(x in 0.0f64..1e9) {
        prop_assert_eq!(percent_change(x, x), 0.0);
        prop_assert_eq!(percent_change(x, 0.0), 0.0);
    }

    #[test]
    fn structure_scan_is_deterministic(s in steps(150)) {
        let bars = series(&s);
        prop_assert_eq!(scan_events(&bars), scan_events(&bars));
        prop_assert_eq!(scan_zones(&bars), scan_zones(&bars));

        let events = scan_events(&bars);
        prop_assert!(events.windows(2).all(|w| w[0].index <= w[1].index));
        // coalescing never invents events
        prop_assert!(scan_zones(&bars).len() <= events.len());
    }

    #[test]
    fn structure_zones_span_forward(s in steps(150)) {
        let bars = series(&s);
        for z in scan_zones(&bars) {
            if let Some(range) = z.zone {
                prop_assert!(range.from < range.to);
                prop_assert_eq!(range.from, z.time);
            }
        }
    }

    #[test]
    fn harmonic_anchors_contained_and_ordered(s in steps(150)) {
        let bars = series(&s);
        let detector = HarmonicDetector { scan: HarmonicScan::NonOverlapping, ..Default::default() };
        let matches = detector.scan(&bars);
        for m in &matches {
            prop_assert!(m.d().index < bars.len());
            prop_assert!(m.anchors.windows(2).all(|w| w[0].time < w[1].time));
            prop_assert_eq!(m.anchors[0].price, bars[m.a().index].low);
            prop_assert_eq!(m.anchors[3].price, bars[m.d().index].high);
            prop_assert!(m.is_complete());
        }
        prop_assert!(matches.windows(2).all(|w| w[0].d().index < w[1].a().index));
        prop_assert_eq!(
            HarmonicDetector::default().scan(&bars).first().copied(),
            matches.first().copied()
        );
    }

    #[test]
    fn levels_bracket_the_window(s in steps(120)) {
        let bars = series(&s);
        if let Ok(sr) = SupportResistanceDetector::default().detect(&bars) {
            let top = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
            let bottom = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
            prop_assert_eq!(sr.resistance[0].price, top);
            prop_assert_eq!(sr.support[0].price, bottom);
            prop_assert!(sr.levels().all(|l| l.test_count >= 1));
        } else {
            prop_assert!(bars.len() < 30);
        }
    }

    #[test]
    fn signal_stops_sit_beyond_price(s in steps(150)) {
        let bars = series(&s);
        let swings = SwingAnalysis::compute(&bars, 3);
        let signals = TradingSignals::compute(&bars, &swings, &SignalConfig::default());
        for sig in &signals.buy {
            prop_assert_eq!(sig.side(), SignalSide::Buy);
            if let Some(stop) = sig.stop_loss {
                prop_assert!(stop < sig.price);
            }
        }
        for sig in &signals.sell {
            prop_assert_eq!(sig.side(), SignalSide::Sell);
            if let Some(stop) = sig.stop_loss {
                prop_assert!(stop > sig.price);
            }
        }
        prop_assert!(swings.breaks.windows(2).all(|w| w[0].index <= w[1].index));
    }
}
