//! Property tests for indicator bounds.

use proptest::prelude::*;
use quant_core::traits::Indicator;
use quant_core::types::{Bar, BarSeries, Timeframe};
use quant_indicators::{BollingerBands, Field, IndicatorPipeline, IndicatorSettings, Rsi};

const HOUR: i64 = 3_600_000;

/// Random walk of well-formed bars.
fn arb_bars(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-3.0..3.0f64, 0.0..2.0f64, 0.0..2.0f64, 0.0..5_000.0f64), len).prop_map(
        |steps| {
            let mut close = 100.0;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (step, up, down, volume))| {
                    let open = close;
                    close = (close + step).max(1.0);
                    let high = open.max(close) + up;
                    let low = (open.min(close) - down).max(0.5);
                    Bar::new(i as i64 * HOUR, open, high, low, close, volume)
                })
                .collect()
        },
    )
}

fn compact() -> IndicatorSettings {
    IndicatorSettings {
        ema_fast: 5,
        ema_mid: 10,
        ema_slow: 20,
        ema_long: 30,
        atr_baseline_period: 10,
        ..IndicatorSettings::default()
    }
}

// ── 1. Oscillator bounds ──

proptest! {
    #[test]
    fn rsi_stays_in_range(closes in prop::collection::vec(1.0..500.0f64, 16..200)) {
        for value in Rsi::new(14).calculate(&closes) {
            prop_assert!((0.0..=100.0).contains(&value), "rsi {}", value);
        }
    }

    #[test]
    fn bollinger_position_stays_in_unit_interval(
        closes in prop::collection::vec(1.0..500.0f64, 20..200),
        k in 0.5..3.0f64,
    ) {
        for band in BollingerBands::with_params(20, k).calculate(&closes) {
            prop_assert!((0.0..=1.0).contains(&band.position));
            prop_assert!(band.upper >= band.lower);
        }
    }
}

// ── 2. Pipeline output ──

proptest! {
    #[test]
    fn pipeline_never_emits_nan(bars in arb_bars(40..160)) {
        let series = BarSeries::ingest("P", Timeframe::Hour1, bars).0;
        let pipeline = IndicatorPipeline::new(compact()).unwrap();
        let frame = pipeline.compute(&series);

        for i in 0..frame.len() {
            for field in Field::ALL {
                if let Some(v) = frame.get(field, i) {
                    prop_assert!(v.is_finite());
                }
            }
        }
        for i in frame.ready_range() {
            let rsi = frame.get(Field::Rsi, i).unwrap();
            prop_assert!((0.0..=100.0).contains(&rsi));
            let pos = frame.get(Field::BbPosition, i).unwrap();
            prop_assert!((0.0..=1.0).contains(&pos));
            prop_assert!(frame.get(Field::VolumeRatio, i).unwrap() >= 0.0);
        }
    }

    #[test]
    fn nothing_defined_before_warmup(bars in arb_bars(1..60)) {
        let series = BarSeries::ingest("P", Timeframe::Hour1, bars).0;
        let pipeline = IndicatorPipeline::new(compact()).unwrap();
        let frame = pipeline.compute(&series);

        for i in 0..frame.len().min(pipeline.warmup()) {
            prop_assert!(frame.snapshot(i).is_none());
            for field in Field::ALL {
                prop_assert!(frame.get(field, i).is_none());
            }
        }
    }
}
