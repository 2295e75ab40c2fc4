//! Performance metrics over a set of closed trades.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{ExitReason, Trade};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Metric settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Annualization factor for the Sharpe ratio. `None` reports the raw
    /// per-trade ratio.
    pub periods_per_year: Option<f64>,
    /// P&L (percent) at or below which a trade counts as breakeven, and the
    /// gross-loss floor for the profit factor.
    pub breakeven_epsilon: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            periods_per_year: None,
            breakeven_epsilon: 1e-9,
        }
    }
}

impl Params for MetricsConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(periods) = self.periods_per_year {
            ensure(periods > 0.0, "metrics.periods_per_year", periods, "> 0")?;
        }
        ensure(
            self.breakeven_epsilon >= 0.0,
            "metrics.breakeven_epsilon",
            self.breakeven_epsilon,
            ">= 0",
        )
    }
}

/// Closed trades per exit reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitBreakdown {
    pub stop_loss: usize,
    pub take_profit: usize,
    pub trailing_stop: usize,
    pub time_exit: usize,
    pub end_of_data: usize,
}

impl ExitBreakdown {
    fn record(&mut self, reason: ExitReason) {
        let slot = match reason {
            ExitReason::StopLoss => &mut self.stop_loss,
            ExitReason::TakeProfit => &mut self.take_profit,
            ExitReason::TrailingStop => &mut self.trailing_stop,
            ExitReason::TimeExit => &mut self.time_exit,
            ExitReason::EndOfData => &mut self.end_of_data,
        };
        *slot += 1;
    }
}

/// How a closed trade ended relative to the breakeven band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeOutcome {
    Win,
    Loss,
    Breakeven,
}

impl TradeOutcome {
    pub fn classify(pnl_pct: f64, breakeven_epsilon: f64) -> Self {
        if pnl_pct > breakeven_epsilon {
            TradeOutcome::Win
        } else if pnl_pct < -breakeven_epsilon {
            TradeOutcome::Loss
        } else {
            TradeOutcome::Breakeven
        }
    }
}

/// Consecutive wins and losses. A breakeven trade neither extends nor
/// breaks a streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streak {
    pub wins: usize,
    pub losses: usize,
}

impl Streak {
    pub fn push(&mut self, outcome: TradeOutcome) {
        match outcome {
            TradeOutcome::Win => {
                self.wins += 1;
                self.losses = 0;
            }
            TradeOutcome::Loss => {
                self.losses += 1;
                self.wins = 0;
            }
            TradeOutcome::Breakeven => {}
        }
    }
}

/// Aggregate statistics. Amounts are percent of capital at entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub breakeven_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,
    /// Percent of all trades.
    pub win_rate: f64,
    pub gross_profit: f64,
    /// Positive magnitude.
    pub gross_loss: f64,
    #[serde(with = "profit_factor_serde")]
    pub profit_factor: f64,
    pub avg_win: f64,
    /// Positive magnitude.
    pub avg_loss: f64,
    /// Deepest drop of the cumulative P&L curve, in percentage points.
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    /// Sum of trade P&L.
    pub total_return: f64,
    /// Mean trade P&L.
    pub expectancy: f64,
    pub avg_bars_held: f64,
    /// Longest run of winners in exit order.
    pub max_consecutive_wins: usize,
    /// Longest run of losers in exit order.
    pub max_consecutive_losses: usize,
    pub exits: ExitBreakdown,
}

impl PerformanceMetrics {
    /// Compute metrics over the closed trades in `trades`. Input order is
    /// irrelevant; open trades are ignored.
    pub fn compute(trades: &[Trade], config: &MetricsConfig) -> Self {
        let mut closed: Vec<&Trade> = trades.iter().filter(|t| t.is_closed()).collect();
        closed.sort_by(|a, b| {
            let exit_ts = |t: &Trade| t.exit.map_or(i64::MAX, |e| e.timestamp);
            exit_ts(a)
                .cmp(&exit_ts(b))
                .then(a.entry_time.cmp(&b.entry_time))
                .then_with(|| a.symbol.cmp(&b.symbol))
                .then(a.id.cmp(&b.id))
        });

        let mut m = Self::default();
        if closed.is_empty() {
            return m;
        }

        let eps = config.breakeven_epsilon;
        let mut pnls = Vec::with_capacity(closed.len());
        let mut cumulative = 0.0_f64;
        let mut peak = 0.0_f64;
        let mut bars_held = 0usize;
        let mut streak = Streak::default();

        for trade in &closed {
            let pnl = trade.pnl_pct().unwrap_or(0.0);
            pnls.push(pnl);

            let outcome = TradeOutcome::classify(pnl, eps);
            match outcome {
                TradeOutcome::Win => {
                    m.winning_trades += 1;
                    m.gross_profit += pnl;
                }
                TradeOutcome::Loss => {
                    m.losing_trades += 1;
                    m.gross_loss += -pnl;
                }
                TradeOutcome::Breakeven => m.breakeven_trades += 1,
            }
            streak.push(outcome);
            m.max_consecutive_wins = m.max_consecutive_wins.max(streak.wins);
            m.max_consecutive_losses = m.max_consecutive_losses.max(streak.losses);
            if trade.direction.sign() > 0.0 {
                m.long_trades += 1;
            } else {
                m.short_trades += 1;
            }
            if let Some(reason) = trade.exit_reason() {
                m.exits.record(reason);
            }
            bars_held += trade.bars_held;

            cumulative += pnl;
            peak = peak.max(cumulative);
            m.max_drawdown = m.max_drawdown.max(peak - cumulative);
        }

        let n = closed.len();
        m.total_trades = n;
        m.win_rate = m.winning_trades as f64 / n as f64 * 100.0;
        m.profit_factor = profit_factor(m.gross_profit, m.gross_loss, eps);
        if m.winning_trades > 0 {
            m.avg_win = m.gross_profit / m.winning_trades as f64;
        }
        if m.losing_trades > 0 {
            m.avg_loss = m.gross_loss / m.losing_trades as f64;
        }
        m.total_return = cumulative;
        m.expectancy = cumulative / n as f64;
        m.avg_bars_held = bars_held as f64 / n as f64;
        m.sharpe_ratio = sharpe(&pnls, config.periods_per_year);
        m
    }

    pub fn is_profitable(&self) -> bool {
        self.total_return > 0.0
    }
}

fn profit_factor(gross_profit: f64, gross_loss: f64, eps: f64) -> f64 {
    if gross_loss <= eps {
        if gross_profit > eps {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        gross_profit / gross_loss
    }
}

/// Mean over sample standard deviation, scaled by `sqrt(periods_per_year)`.
fn sharpe(returns: &[f64], periods_per_year: Option<f64>) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().copied().mean();
    let std = returns.iter().copied().std_dev();
    if !std.is_finite() || std <= f64::EPSILON {
        return 0.0;
    }
    mean / std * periods_per_year.unwrap_or(1.0).sqrt()
}

/// Profit factor as a number, or `"inf"` when unbounded.
mod profit_factor_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_infinite() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(v),
            Repr::Text(s) if s == "inf" => Ok(f64::INFINITY),
            Repr::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"inf\", got {s:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::types::{Direction, MarketRegime, Signal, TradeLevels};

    /// Closed long trade with full position, entry 100.
    fn trade(id: u64, exit_price: f64, exit_ts: i64, reason: ExitReason) -> Trade {
        let signal = Signal {
            symbol: "BTC".into(),
            index: 0,
            timestamp: exit_ts - 10,
            direction: Direction::Long,
            confidence: 0.6,
            score: 6.0,
            reasons: vec![],
            reference_price: 100.0,
            regime: MarketRegime::Neutral,
        };
        let levels = TradeLevels {
            stop_loss: 50.0,
            take_profit: 400.0,
            partial: None,
        };
        let mut t = Trade::new(id, &signal, levels, 1.0, 1.0).unwrap();
        t.open();
        t.bars_held = 4;
        t.close(exit_price, exit_ts, 0, reason).unwrap();
        t
    }

    #[test]
    fn test_empty() {
        let m = PerformanceMetrics::compute(&[], &MetricsConfig::default());
        assert_eq!(m.total_trades, 0);
        assert_eq!(m.profit_factor, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_infinite_profit_factor() {
        // +100% and +200% of capital.
        let trades = vec![
            trade(1, 200.0, 100, ExitReason::TakeProfit),
            trade(2, 300.0, 200, ExitReason::TakeProfit),
        ];
        let m = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert!((m.gross_profit - 300.0).abs() < 1e-9);
        assert_eq!(m.gross_loss, 0.0);
        assert!(m.profit_factor.is_infinite() && m.profit_factor > 0.0);

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["profit_factor"], "inf");
        let back: PerformanceMetrics = serde_json::from_value(json).unwrap();
        assert!(back.profit_factor.is_infinite());
    }

    #[test]
    fn test_mixed_trades() {
        let trades = vec![
            trade(1, 110.0, 100, ExitReason::TakeProfit),
            trade(2, 95.0, 200, ExitReason::StopLoss),
            trade(3, 100.0, 300, ExitReason::TimeExit),
            trade(4, 105.0, 400, ExitReason::TrailingStop),
        ];
        let m = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert_eq!(m.total_trades, 4);
        assert_eq!(m.winning_trades, 2);
        assert_eq!(m.losing_trades, 1);
        assert_eq!(m.breakeven_trades, 1);
        assert!((m.win_rate - 50.0).abs() < 1e-9);
        assert!((m.profit_factor - 3.0).abs() < 1e-9);
        assert!((m.avg_win - 7.5).abs() < 1e-9);
        assert!((m.avg_loss - 5.0).abs() < 1e-9);
        // Curve: 10, 5, 5, 10.
        assert!((m.max_drawdown - 5.0).abs() < 1e-9);
        assert!((m.total_return - 10.0).abs() < 1e-9);
        assert!((m.expectancy - 2.5).abs() < 1e-9);
        assert!((m.avg_bars_held - 4.0).abs() < 1e-9);
        assert_eq!(m.exits.stop_loss, 1);
        assert_eq!(m.exits.take_profit, 1);
        assert_eq!(m.exits.time_exit, 1);
        assert_eq!(m.exits.trailing_stop, 1);
        assert_eq!(m.long_trades, 4);
        assert!(m.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_drawdown_from_zero_baseline() {
        // First trade loses: the drawdown counts from the flat start.
        let trades = vec![
            trade(1, 96.0, 100, ExitReason::StopLoss),
            trade(2, 98.0, 200, ExitReason::StopLoss),
        ];
        let m = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert!((m.max_drawdown - 6.0).abs() < 1e-9);
        assert_eq!(m.profit_factor, 0.0);
    }

    #[test]
    fn test_sharpe_annualization_is_explicit() {
        let trades = vec![
            trade(1, 110.0, 100, ExitReason::TakeProfit),
            trade(2, 95.0, 200, ExitReason::StopLoss),
            trade(3, 104.0, 300, ExitReason::TakeProfit),
        ];
        let raw = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        let annual = PerformanceMetrics::compute(
            &trades,
            &MetricsConfig {
                periods_per_year: Some(252.0),
                ..MetricsConfig::default()
            },
        );
        // returns 10, -5, 4: mean 3, sample std sqrt(57)
        assert!((raw.sharpe_ratio - 3.0 / 57.0_f64.sqrt()).abs() < 1e-9);
        assert!((annual.sharpe_ratio - raw.sharpe_ratio * 252.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_zero_dispersion_sharpe() {
        let trades = vec![
            trade(1, 105.0, 100, ExitReason::TakeProfit),
            trade(2, 105.0, 200, ExitReason::TakeProfit),
        ];
        let m = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn test_streaks() {
        // W L L L B L W L: the breakeven does not break the losing run.
        let exits = [110.0, 95.0, 96.0, 97.0, 100.0, 98.0, 105.0, 99.0];
        let trades: Vec<Trade> = exits
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                let reason = if price >= 100.0 {
                    ExitReason::TimeExit
                } else {
                    ExitReason::StopLoss
                };
                trade(i as u64 + 1, price, (i as i64 + 1) * 100, reason)
            })
            .collect();
        let m = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert_eq!(m.max_consecutive_losses, 4);
        assert_eq!(m.max_consecutive_wins, 1);
        assert_eq!(m.breakeven_trades, 1);
    }

    #[test]
    fn test_order_independent() {
        let mut trades = vec![
            trade(1, 110.0, 100, ExitReason::TakeProfit),
            trade(2, 95.0, 200, ExitReason::StopLoss),
            trade(3, 92.0, 300, ExitReason::StopLoss),
            trade(4, 120.0, 400, ExitReason::TakeProfit),
        ];
        let a = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        trades.reverse();
        let b = PerformanceMetrics::compute(&trades, &MetricsConfig::default());
        assert_eq!(a, b);
    }
}
