//! Backtest result reporting.

use quant_core::types::{Account, Timeframe, Trade};
use serde::{Deserialize, Serialize};

use crate::engine::RunDiagnostics;
use crate::statistics::{MetricsConfig, PerformanceMetrics};

const RULE: &str = "═══════════════════════════════════════════════════════════\n";
const SECTION: &str = "───────────────────────────────────────────────────────────\n";

/// Outcome of one backtest run on one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub trades: Vec<Trade>,
    pub metrics: PerformanceMetrics,
    pub account: Account,
    pub diagnostics: RunDiagnostics,
}

impl BacktestResult {
    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let m = &self.metrics;
        let mut s = String::new();

        s.push_str(RULE);
        s.push_str(&format!("  BACKTEST REPORT  {} ({})\n", self.symbol, self.timeframe));
        s.push_str(RULE);
        s.push('\n');

        s.push_str("CAPITAL\n");
        s.push_str(SECTION);
        s.push_str(&format!("  Initial Capital:     {:.2}\n", self.account.initial_capital));
        s.push_str(&format!("  Final Equity:        {:.2}\n", self.account.equity));
        s.push_str(&format!("  Compounded Return:   {:.2}%\n", self.account.total_return_pct()));
        s.push_str(&format!("  Equity Drawdown:     {:.2}%\n", self.account.max_drawdown_pct()));
        s.push('\n');

        push_metrics(&mut s, m);

        s.push_str("DATA\n");
        s.push_str(SECTION);
        let d = &self.diagnostics;
        s.push_str(&format!("  Bars:                {}\n", d.bars_total));
        s.push_str(&format!("  Rejected Bars:       {}\n", d.bars_rejected));
        s.push_str(&format!("  Warm-up Bars:        {}\n", d.warmup));
        s.push_str(&format!("  Bars Scanned:        {}\n", d.bars_scanned));
        s.push_str(&format!("  Signals:             {}\n", d.signals));
        s.push_str(&format!("  Risk Rejections:     {}\n", d.risk_rejections));
        s.push_str(&format!("  Loss Pauses:         {}\n", d.loss_pauses));
        if d.insufficient_data {
            s.push_str("  (series shorter than indicator warm-up)\n");
        }
        s.push('\n');
        s.push_str(RULE);
        s
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Equity after each closed trade.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity\n");
        for point in &self.account.equity_curve {
            csv.push_str(&format!("{},{}\n", point.timestamp, point.equity));
        }
        csv
    }
}

fn push_metrics(s: &mut String, m: &PerformanceMetrics) {
    s.push_str("PERFORMANCE (% of capital)\n");
    s.push_str(SECTION);
    s.push_str(&format!("  Total Return:        {:.2}%\n", m.total_return));
    s.push_str(&format!("  Max Drawdown:        {:.2}%\n", m.max_drawdown));
    s.push_str(&format!("  Expectancy:          {:.3}%\n", m.expectancy));
    s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", m.sharpe_ratio));
    if m.profit_factor.is_infinite() {
        s.push_str("  Profit Factor:       inf\n");
    } else {
        s.push_str(&format!("  Profit Factor:       {:.2}\n", m.profit_factor));
    }
    s.push('\n');

    s.push_str("TRADES\n");
    s.push_str(SECTION);
    s.push_str(&format!(
        "  Total Trades:        {} ({} long, {} short)\n",
        m.total_trades, m.long_trades, m.short_trades
    ));
    s.push_str(&format!("  Winning Trades:      {}\n", m.winning_trades));
    s.push_str(&format!("  Losing Trades:       {}\n", m.losing_trades));
    s.push_str(&format!("  Breakeven Trades:    {}\n", m.breakeven_trades));
    s.push_str(&format!("  Win Rate:            {:.2}%\n", m.win_rate));
    s.push_str(&format!("  Avg Win:             {:.3}%\n", m.avg_win));
    s.push_str(&format!("  Avg Loss:            {:.3}%\n", m.avg_loss));
    s.push_str(&format!("  Avg Bars Held:       {:.1}\n", m.avg_bars_held));
    s.push_str(&format!(
        "  Longest Streaks:     {} wins, {} losses\n",
        m.max_consecutive_wins, m.max_consecutive_losses
    ));
    s.push('\n');

    let e = &m.exits;
    s.push_str("EXITS\n");
    s.push_str(SECTION);
    s.push_str(&format!("  Stop Loss:           {}\n", e.stop_loss));
    s.push_str(&format!("  Take Profit:         {}\n", e.take_profit));
    s.push_str(&format!("  Trailing Stop:       {}\n", e.trailing_stop));
    s.push_str(&format!("  Time Exit:           {}\n", e.time_exit));
    s.push_str(&format!("  End of Data:         {}\n", e.end_of_data));
    s.push('\n');
}

/// Per-symbol line in a combined report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub symbol: String,
    pub trades: usize,
    pub total_return: f64,
    pub win_rate: f64,
}

/// Independent per-symbol results merged into one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    pub symbols: Vec<SymbolSummary>,
    /// Metrics over every trade of every symbol.
    pub metrics: PerformanceMetrics,
    pub results: Vec<BacktestResult>,
}

impl CombinedResult {
    /// Merge results. Symbols are listed alphabetically regardless of the
    /// order runs finished in.
    pub fn combine(mut results: Vec<BacktestResult>, config: &MetricsConfig) -> Self {
        results.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let all: Vec<Trade> = results.iter().flat_map(|r| r.trades.iter().cloned()).collect();
        let symbols = results
            .iter()
            .map(|r| SymbolSummary {
                symbol: r.symbol.clone(),
                trades: r.metrics.total_trades,
                total_return: r.metrics.total_return,
                win_rate: r.metrics.win_rate,
            })
            .collect();
        Self {
            symbols,
            metrics: PerformanceMetrics::compute(&all, config),
            results,
        }
    }

    pub fn summary(&self) -> String {
        let mut s = String::new();
        s.push_str(RULE);
        s.push_str(&format!("  COMBINED REPORT  {} symbols\n", self.symbols.len()));
        s.push_str(RULE);
        s.push('\n');
        s.push_str("SYMBOLS\n");
        s.push_str(SECTION);
        for line in &self.symbols {
            s.push_str(&format!(
                "  {:<12} {:>4} trades  {:>8.2}%  win {:>6.2}%\n",
                line.symbol, line.trades, line.total_return, line.win_rate
            ));
        }
        s.push('\n');
        push_metrics(&mut s, &self.metrics);
        s.push_str(RULE);
        s
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
