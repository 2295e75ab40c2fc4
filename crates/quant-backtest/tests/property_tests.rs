//! Property tests for backtest invariants.
//!
//! 1. Exit side: every closed trade exits on the side its reason implies
//! 2. Trailing stops only ever move in the trade's favor
//! 3. Metrics do not depend on trade order
//! 4. Identical inputs give byte-identical results

use proptest::prelude::*;
use quant_backtest::{BacktestConfig, BacktestEngine, Lifecycle, MetricsConfig, PerformanceMetrics};
use quant_core::types::{
    Bar, BarSeries, Direction, ExitReason, MarketRegime, Signal, Timeframe, Trade, TradeLevels,
};
use quant_risk::{RiskConfig, RiskDecision, RiskManager, Structure};

const HOUR: i64 = 3_600_000;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Long), Just(Direction::Short)]
}

/// Bars following an entry at 100: each step is (close move, upper wick, lower wick).
fn arb_path() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
    prop::collection::vec((-3.0..3.0_f64, 0.0..2.0_f64, 0.0..2.0_f64), 1..80)
}

fn path_bars(path: &[(f64, f64, f64)]) -> Vec<Bar> {
    let mut close = 100.0_f64;
    path.iter()
        .enumerate()
        .map(|(i, &(step, up, down))| {
            let open = close;
            close = (close + step).max(1.0);
            let high = open.max(close) + up;
            let low = (open.min(close) - down).max(0.5);
            Bar::new((i as i64 + 1) * HOUR, open, high, low, close, 1000.0)
        })
        .collect()
}

fn entry_signal(direction: Direction) -> Signal {
    Signal {
        symbol: "PROP".into(),
        index: 0,
        timestamp: 0,
        direction,
        confidence: 0.6,
        score: 6.0,
        reasons: vec![],
        reference_price: 100.0,
        regime: MarketRegime::Neutral,
    }
}

fn open_trade(direction: Direction, atr: f64, structure: Structure) -> Option<Trade> {
    let manager = RiskManager::new(RiskConfig::default()).ok()?;
    let signal = entry_signal(direction);
    let RiskDecision::Approved(plan) = manager.plan_entry(&signal, Some(atr), structure) else {
        return None;
    };
    let mut trade = Trade::new(1, &signal, plan.levels, plan.position_size, manager.max_fraction()).ok()?;
    trade.open();
    Some(trade)
}

fn lifecycle(max_holding_bars: usize) -> Lifecycle {
    let manager = RiskManager::new(RiskConfig::default()).unwrap();
    Lifecycle::new(manager.trailing().clone(), max_holding_bars)
}

fn random_walk(steps: &[f64]) -> BarSeries {
    let mut close = 100.0_f64;
    let raw = steps.iter().enumerate().map(|(i, &step)| {
        let open = close;
        close = (close * (1.0 + step)).max(1.0);
        let volume = if i % 23 == 0 { 2500.0 } else { 1000.0 };
        Bar::new(i as i64 * HOUR, open, open.max(close) * 1.004, open.min(close) * 0.996, close, volume)
    });
    BarSeries::ingest("WALK", Timeframe::Hour1, raw).0
}

// ── 1. Exit Side ─────────────────────────────────────────────────────

proptest! {
    #[test]
    fn exit_price_on_correct_side(
        direction in arb_direction(),
        atr in 0.5..5.0_f64,
        support_gap in prop::option::of(0.2..6.0_f64),
        resistance_gap in prop::option::of(0.2..6.0_f64),
        path in arb_path(),
        max_hold in 0usize..40,
    ) {
        let structure = Structure {
            support: support_gap.map(|g| 100.0 - g),
            resistance: resistance_gap.map(|g| 100.0 + g),
        };
        let Some(mut trade) = open_trade(direction, atr, structure) else {
            return Ok(());
        };
        let initial_stop = trade.stop_loss;
        let sign = direction.sign();
        let bars = path_bars(&path);
        let engine = lifecycle(max_hold);

        for (i, bar) in bars.iter().enumerate() {
            if engine.step(&mut trade, bar, i + 1, Some(atr)).unwrap() {
                break;
            }
        }
        let last = bars.len();
        engine.finish(&mut trade, &bars[last - 1], last).unwrap();

        let exit = trade.exit.unwrap();
        let entry = trade.entry_price;
        match exit.reason {
            ExitReason::StopLoss => prop_assert!(sign * (exit.price - entry) <= 0.0),
            ExitReason::TakeProfit => prop_assert!(sign * (exit.price - entry) >= 0.0),
            ExitReason::TrailingStop => prop_assert!(sign * (exit.price - initial_stop) >= 0.0),
            ExitReason::TimeExit | ExitReason::EndOfData => {
                prop_assert_eq!(exit.price, bars[exit.index - 1].close);
            }
        }
        prop_assert!(trade.bars_held <= bars.len());
    }
}

// ── 2. Trailing Monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn trailing_stop_only_tightens(
        direction in arb_direction(),
        atr in 0.5..3.0_f64,
        path in arb_path(),
    ) {
        let Some(mut trade) = open_trade(direction, atr, Structure::default()) else {
            return Ok(());
        };
        let engine = lifecycle(0);
        let sign = direction.sign();
        let mut previous: Option<f64> = None;

        for (i, bar) in path_bars(&path).iter().enumerate() {
            let closed = engine.step(&mut trade, bar, i + 1, Some(atr)).unwrap();
            if let (Some(before), Some(now)) = (previous, trade.trailing_stop) {
                prop_assert!(sign * (now - before) >= 0.0);
            }
            if previous.is_some() {
                prop_assert!(trade.trailing_stop.is_some());
            }
            previous = trade.trailing_stop;
            if closed {
                break;
            }
        }
    }
}

// ── 3. Order Independence ────────────────────────────────────────────

fn closed_trade(id: u64, exit_price: f64, exit_ts: i64, direction: Direction) -> Trade {
    let levels = match direction {
        Direction::Long => TradeLevels { stop_loss: 50.0, take_profit: 200.0, partial: None },
        Direction::Short => TradeLevels { stop_loss: 200.0, take_profit: 50.0, partial: None },
    };
    let mut trade = Trade::new(id, &entry_signal(direction), levels, 0.2, 1.0).unwrap();
    trade.open();
    trade.close(exit_price, exit_ts, 1, ExitReason::TimeExit).unwrap();
    trade
}

fn arb_trades() -> impl Strategy<Value = Vec<Trade>> {
    prop::collection::vec((80.0..120.0_f64, 0i64..50, arb_direction()), 0..30).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (price, ts, direction))| closed_trade(i as u64 + 1, price, ts, direction))
            .collect()
    })
}

proptest! {
    #[test]
    fn metrics_ignore_input_order(
        (trades, shuffled) in arb_trades().prop_flat_map(|t| (Just(t.clone()), Just(t).prop_shuffle())),
    ) {
        let config = MetricsConfig::default();
        let a = PerformanceMetrics::compute(&trades, &config);
        let b = PerformanceMetrics::compute(&shuffled, &config);
        prop_assert_eq!(a, b);
    }
}

// ── 4. Determinism ───────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn identical_runs_serialize_identically(
        steps in prop::collection::vec(-0.02..0.02_f64, 150..400),
    ) {
        let series = random_walk(&steps);
        let engine = BacktestEngine::new(BacktestConfig::default()).unwrap();
        let first = engine.run(&series).unwrap();
        let second = engine.run(&series).unwrap();
        prop_assert_eq!(
            serde_json::to_string(&first.trades).unwrap(),
            serde_json::to_string(&second.trades).unwrap()
        );
        prop_assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }
}
