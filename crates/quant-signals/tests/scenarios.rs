//! End-to-end signal scenarios on hand-built series.

use quant_core::types::{Bar, BarSeries, Direction, MarketRegime, Reason, Timeframe};
use quant_indicators::IndicatorSettings;
use quant_signals::{PresetRegistry, ScorerConfig, SignalScanner, StrategyParams};

const HOUR: i64 = 3_600_000;

fn compact() -> IndicatorSettings {
    IndicatorSettings {
        ema_fast: 8,
        ema_mid: 13,
        ema_slow: 21,
        ema_long: 30,
        atr_baseline_period: 20,
        swing_lookback: 20,
        ..IndicatorSettings::default()
    }
}

/// 60 hourly bars rising one point per bar, with a capitulation bar at 45
/// (close back at 100 on triple volume) and a gap straight back up at 46.
fn drift_with_dip() -> BarSeries {
    let raw = (0..60).map(|t| {
        let ts = t as i64 * HOUR;
        if t == 45 {
            Bar::new(ts, 98.0, 100.5, 97.5, 100.0, 3000.0)
        } else {
            let c = 100.0 + t as f64;
            Bar::new(ts, c - 0.5, c + 0.5, c - 1.0, c, 1000.0)
        }
    });
    let (series, rejected) = BarSeries::ingest("DRIFT", Timeframe::Hour1, raw);
    assert!(rejected.is_empty());
    series
}

fn params() -> StrategyParams {
    StrategyParams {
        indicators: compact(),
        scorer: ScorerConfig {
            min_score: 5.0,
            counter_trend_forbidden: true,
            ..ScorerConfig::default()
        },
        ..StrategyParams::default()
    }
}

#[test]
fn single_long_on_oversold_capitulation() {
    let scanner = SignalScanner::new(&params(), vec![]).unwrap();
    assert_eq!(scanner.warmup(), 34);

    let report = scanner.scan(&drift_with_dip()).unwrap();
    assert_eq!(report.bars_scanned, 26);
    assert_eq!(report.signals.len(), 1);

    let signal = &report.signals[0];
    assert_eq!(signal.index, 45);
    assert_eq!(signal.direction, Direction::Long);
    assert_eq!(signal.reference_price, 100.0);
    assert_eq!(signal.regime, MarketRegime::Volatile);
    assert_eq!(
        signal.reasons,
        vec![Reason::RsiOversold, Reason::LowerBandTouch, Reason::VolumeSurge]
    );
    assert!((signal.score - 5.0).abs() < 1e-9);
    assert!((signal.confidence - 5.0 / 11.0).abs() < 1e-9);
    assert!(report.signals.iter().all(|s| s.direction != Direction::Short));
}

#[test]
fn strong_uptrend_suppresses_shorts() {
    // Same drift without the dip: RSI pins at 100 but the strong uptrend
    // gate removes every short, and longs never reach the threshold.
    let raw = (0..60).map(|t| {
        let c = 100.0 + t as f64;
        Bar::new(t as i64 * HOUR, c - 0.5, c + 0.5, c - 1.0, c, 1000.0)
    });
    let series = BarSeries::ingest("DRIFT", Timeframe::Hour1, raw).0;
    let scanner = SignalScanner::new(&params(), vec![]).unwrap();
    let report = scanner.scan(&series).unwrap();
    assert!(report.signals.is_empty());
}

#[test]
fn conservative_preset_blocks_volatile_bar() {
    let mut params = PresetRegistry::new().create_default("conservative").unwrap();
    params.indicators = compact();
    let scanner = SignalScanner::new(&params, vec![]).unwrap();
    let report = scanner.scan(&drift_with_dip()).unwrap();
    assert!(report.signals.is_empty());
}
