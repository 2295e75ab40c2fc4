//! Backtesting engine.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{Account, Bar, BarSeries, Timeframe, Trade};
use quant_core::QuantResult;
use quant_indicators::Field;
use quant_risk::{RiskConfig, RiskDecision, RiskManager, Structure};
use quant_signals::{SignalScanner, StrategyParams};
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::lifecycle::Lifecycle;
use crate::report::BacktestResult;
use crate::statistics::{MetricsConfig, PerformanceMetrics, Streak, TradeOutcome};

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_capital: Decimal,
    pub strategy: StrategyParams,
    pub risk: RiskConfig,
    /// Bars after entry before a forced exit at the close. 0 disables.
    pub max_holding_bars: usize,
    /// Bars to stay flat after an exit before the next entry.
    pub cooldown_bars: usize,
    /// Losing trades in a row that trigger a pause. 0 disables.
    pub max_consecutive_losses: usize,
    /// Bars to stay flat once the losing streak is hit.
    pub loss_pause_bars: usize,
    /// Higher timeframes aggregated from the base series for regime
    /// alignment.
    pub context_timeframes: Vec<Timeframe>,
    pub metrics: MetricsConfig,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(10000),
            strategy: StrategyParams::default(),
            risk: RiskConfig::default(),
            max_holding_bars: 48,
            cooldown_bars: 0,
            max_consecutive_losses: 0,
            loss_pause_bars: 0,
            context_timeframes: Vec::new(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Params for BacktestConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.initial_capital > Decimal::ZERO,
            "initial_capital",
            self.initial_capital,
            "> 0",
        )?;
        ensure(
            self.max_consecutive_losses == 0 || self.loss_pause_bars > 0,
            "loss_pause_bars",
            self.loss_pause_bars,
            "> 0 when max_consecutive_losses is set",
        )?;
        self.strategy.validate()?;
        self.risk.validate()?;
        self.metrics.validate()
    }
}

/// Counters describing what a run saw.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub bars_total: usize,
    pub bars_rejected: usize,
    pub warmup: usize,
    pub bars_scanned: usize,
    pub candidates: usize,
    pub signals: usize,
    pub risk_rejections: usize,
    /// Pauses forced by a losing streak.
    pub loss_pauses: usize,
    /// Series too short for any indicator snapshot.
    pub insufficient_data: bool,
}

/// Mutable state threaded through one run: the capital ledger, the
/// trade-id sequence and everything closed so far.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub account: Account,
    pub trades: Vec<Trade>,
    pub diagnostics: RunDiagnostics,
    /// Current run of wins or losses. Breakevens leave it alone.
    pub streak: Streak,
    next_trade_id: u64,
}

impl RunContext {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            account: Account::new(initial_capital),
            trades: Vec::new(),
            diagnostics: RunDiagnostics::default(),
            streak: Streak::default(),
            next_trade_id: 1,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next_trade_id;
        self.next_trade_id += 1;
        id
    }

    /// Book a closed trade and extend the streak.
    pub fn record(&mut self, trade: Trade, breakeven_epsilon: f64) -> QuantResult<()> {
        self.account.apply_trade(&trade)?;
        if let Some(pnl) = trade.pnl_pct() {
            self.streak.push(TradeOutcome::classify(pnl, breakeven_epsilon));
        }
        self.trades.push(trade);
        Ok(())
    }
}

/// Drives signal generation, risk planning and the trade lifecycle over a
/// bar series.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    scanner: SignalScanner,
    risk: RiskManager,
    lifecycle: Lifecycle,
}

impl BacktestEngine {
    /// Validates the whole configuration before anything runs.
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let scanner = SignalScanner::new(&config.strategy, config.context_timeframes.clone())?;
        let risk = RiskManager::new(config.risk.clone())?;
        let lifecycle = Lifecycle::new(risk.trailing().clone(), config.max_holding_bars);
        Ok(Self {
            config,
            scanner,
            risk,
            lifecycle,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Bars consumed before the first signal can appear.
    pub fn warmup(&self) -> usize {
        self.scanner.warmup()
    }

    /// Backtest a whole series.
    pub fn run(&self, series: &BarSeries) -> QuantResult<BacktestResult> {
        self.run_from(series, 0)
    }

    /// Backtest a series whose loader already dropped `bars_rejected`
    /// malformed bars.
    pub fn run_loaded(&self, series: &BarSeries, bars_rejected: usize) -> QuantResult<BacktestResult> {
        let mut ctx = RunContext::new(self.config.initial_capital);
        ctx.diagnostics.bars_rejected = bars_rejected;
        self.simulate(series, 0, &mut ctx)?;
        Ok(self.finish(series, ctx))
    }

    /// Backtest `series`, entering positions only from bar `first_tradable`.
    /// Earlier bars only warm indicators up.
    pub fn run_from(&self, series: &BarSeries, first_tradable: usize) -> QuantResult<BacktestResult> {
        let mut ctx = RunContext::new(self.config.initial_capital);
        self.simulate(series, first_tradable, &mut ctx)?;
        Ok(self.finish(series, ctx))
    }

    /// Ingest raw bars, dropping malformed ones, then backtest.
    pub fn run_raw(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        raw: impl IntoIterator<Item = Bar>,
    ) -> QuantResult<BacktestResult> {
        let (series, rejected) = BarSeries::ingest(symbol, timeframe, raw);
        if !rejected.is_empty() {
            warn!(
                symbol,
                rejected = rejected.len(),
                first = %rejected[0].reason,
                "Rejected malformed bars"
            );
        }
        self.run_loaded(&series, rejected.len())
    }

    /// Independent runs, one per loaded series and its rejected-bar count,
    /// in parallel.
    pub fn run_many(&self, universe: &[(BarSeries, usize)]) -> QuantResult<Vec<BacktestResult>> {
        universe
            .par_iter()
            .map(|(series, rejected)| self.run_loaded(series, *rejected))
            .collect()
    }

    /// Book `trade`, closed at bar `exit`, and return the first bar a new
    /// entry may be taken on.
    pub fn close_out(&self, ctx: &mut RunContext, trade: Trade, exit: usize) -> QuantResult<usize> {
        ctx.record(trade, self.config.metrics.breakeven_epsilon)?;
        let mut resume = exit + self.config.cooldown_bars + 1;
        let limit = self.config.max_consecutive_losses;
        if limit > 0 && ctx.streak.losses >= limit {
            info!(
                losses = ctx.streak.losses,
                exit,
                pause = self.config.loss_pause_bars,
                "Losing streak, pausing entries"
            );
            ctx.diagnostics.loss_pauses += 1;
            ctx.streak = Streak::default();
            resume = resume.max(exit + self.config.loss_pause_bars + 1);
        }
        Ok(resume)
    }

    /// Replay `series` bar by bar into `ctx`. One position at a time.
    pub fn simulate(
        &self,
        series: &BarSeries,
        first_tradable: usize,
        ctx: &mut RunContext,
    ) -> QuantResult<()> {
        let view = self.scanner.view(series)?;
        let frame = view.frame();
        let bars = series.bars();

        ctx.diagnostics.bars_total += bars.len();
        ctx.diagnostics.warmup = frame.warmup();
        ctx.diagnostics.insufficient_data = !frame.has_snapshots();
        if ctx.diagnostics.insufficient_data {
            debug!(
                symbol = %series.symbol,
                bars = bars.len(),
                warmup = frame.warmup(),
                "Series shorter than warm-up"
            );
        }
        let Some(last) = bars.len().checked_sub(1) else {
            return Ok(());
        };

        let mut open: Option<Trade> = None;
        let mut resume_at = 0;

        for (i, bar) in bars.iter().enumerate().skip(first_tradable) {
            if let Some(trade) = open.as_mut() {
                if self.lifecycle.step(trade, bar, i, frame.get(Field::Atr, i))? {
                    if let Some(closed) = open.take() {
                        resume_at = self.close_out(ctx, closed, i)?;
                    }
                }
                continue;
            }

            if i == last || !frame.is_ready(i) {
                continue;
            }
            if i < resume_at {
                continue;
            }

            ctx.diagnostics.bars_scanned += 1;
            let decision = self.scanner.evaluate_at(&series.symbol, &view, i);
            if decision.is_candidate() {
                ctx.diagnostics.candidates += 1;
            }
            let Some(signal) = decision.into_signal() else {
                continue;
            };
            ctx.diagnostics.signals += 1;

            let structure = Structure {
                support: frame.get(Field::Support, i),
                resistance: frame.get(Field::Resistance, i),
            };
            let plan = match self
                .risk
                .plan_entry(&signal, frame.get(Field::Atr, i), structure)
            {
                RiskDecision::Approved(plan) => plan,
                RiskDecision::Rejected { .. } => {
                    ctx.diagnostics.risk_rejections += 1;
                    continue;
                }
            };

            let id = ctx.next_id();
            match Trade::new(id, &signal, plan.levels, plan.position_size, self.risk.max_fraction()) {
                Ok(mut trade) => {
                    trade.open();
                    debug!(
                        id,
                        symbol = %trade.symbol,
                        direction = %trade.direction,
                        entry = trade.entry_price,
                        stop = trade.stop_loss,
                        target = trade.take_profit,
                        size = trade.position_size,
                        "Trade opened"
                    );
                    open = Some(trade);
                }
                Err(e) => {
                    warn!(symbol = %series.symbol, index = i, error = %e, "Trade refused");
                    ctx.diagnostics.risk_rejections += 1;
                }
            }
        }

        if let Some(mut trade) = open.take() {
            self.lifecycle.finish(&mut trade, &bars[last], last)?;
            self.close_out(ctx, trade, last)?;
        }
        Ok(())
    }

    fn finish(&self, series: &BarSeries, ctx: RunContext) -> BacktestResult {
        let metrics = PerformanceMetrics::compute(&ctx.trades, &self.config.metrics);
        info!(
            symbol = %series.symbol,
            bars = ctx.diagnostics.bars_total,
            signals = ctx.diagnostics.signals,
            trades = metrics.total_trades,
            win_rate = metrics.win_rate,
            total_return = metrics.total_return,
            "Backtest complete"
        );
        BacktestResult {
            symbol: series.symbol.clone(),
            timeframe: series.timeframe,
            trades: ctx.trades,
            metrics,
            account: ctx.account,
            diagnostics: ctx.diagnostics,
        }
    }
}
