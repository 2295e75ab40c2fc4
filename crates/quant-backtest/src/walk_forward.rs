//! Walk-forward validation: optimize on a train window, then run the winner
//! unchanged on the following test window.

use chrono::{Days, NaiveDate, NaiveTime};
use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{BarSeries, Trade};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::engine::{BacktestConfig, BacktestEngine};
use crate::grid::{Candidate, GridParam, ParameterGrid};
use crate::report::BacktestResult;
use crate::statistics::{MetricsConfig, PerformanceMetrics};

const DAY_MS: i64 = 86_400_000;

/// One train/test pair. Dates are inclusive, in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub train_start: NaiveDate,
    pub train_end: NaiveDate,
    pub test_start: NaiveDate,
    pub test_end: NaiveDate,
}

fn day_start_ms(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

impl WindowSpec {
    pub fn new(
        train_start: NaiveDate,
        train_end: NaiveDate,
        test_start: NaiveDate,
        test_end: NaiveDate,
    ) -> Self {
        Self {
            name: None,
            train_start,
            train_end,
            test_start,
            test_end,
        }
    }

    /// Consecutive pairs starting at `start`, shifted by `step_days`, until
    /// a test window would end after `end`.
    pub fn rolling(
        start: NaiveDate,
        train_days: u64,
        test_days: u64,
        step_days: u64,
        end: NaiveDate,
    ) -> Result<Vec<Self>, ConfigError> {
        ensure(train_days > 0, "train_days", train_days, "> 0")?;
        ensure(test_days > 0, "test_days", test_days, "> 0")?;
        ensure(step_days > 0, "step_days", step_days, "> 0")?;

        let overflow = || ConfigError::Invalid("window dates out of range".to_string());
        let mut out = Vec::new();
        let mut train_start = start;
        loop {
            let train_end = train_start
                .checked_add_days(Days::new(train_days - 1))
                .ok_or_else(overflow)?;
            let test_start = train_end.checked_add_days(Days::new(1)).ok_or_else(overflow)?;
            let test_end = test_start
                .checked_add_days(Days::new(test_days - 1))
                .ok_or_else(overflow)?;
            if test_end > end {
                break;
            }
            out.push(Self {
                name: Some(format!("WF_{}", out.len() + 1)),
                ..Self::new(train_start, train_end, test_start, test_end)
            });
            train_start = train_start
                .checked_add_days(Days::new(step_days))
                .ok_or_else(overflow)?;
        }
        Ok(out)
    }

    pub fn label(&self, index: usize) -> String {
        self.name.clone().unwrap_or_else(|| format!("window {}", index + 1))
    }

    /// Train range as `[start, end)` milliseconds.
    pub fn train_range(&self) -> (i64, i64) {
        (day_start_ms(self.train_start), day_start_ms(self.train_end) + DAY_MS)
    }

    /// Test range as `[start, end)` milliseconds.
    pub fn test_range(&self) -> (i64, i64) {
        (day_start_ms(self.test_start), day_start_ms(self.test_end) + DAY_MS)
    }
}

impl Params for WindowSpec {
    fn validate(&self) -> Result<(), ConfigError> {
        let ordered = self.train_start <= self.train_end
            && self.train_end < self.test_start
            && self.test_start <= self.test_end;
        if ordered {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "window {} .. {} / {} .. {} must be train_start <= train_end < test_start <= test_end",
                self.train_start, self.train_end, self.test_start, self.test_end
            )))
        }
    }
}

/// Composite score used to rank candidates on a train window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveConfig {
    pub min_trades: usize,
    /// Score for results with fewer than `min_trades`.
    pub insufficient_trades_score: f64,
    pub win_rate_weight: f64,
    pub profit_factor_weight: f64,
    pub profit_factor_cap: f64,
    pub sharpe_weight: f64,
    pub sharpe_cap: f64,
    /// Drawdown (percentage points) beyond which the penalty applies.
    pub drawdown_threshold: f64,
    pub drawdown_penalty: f64,
    pub sweet_spot_min: usize,
    pub sweet_spot_max: usize,
    pub sweet_spot_bonus: f64,
    /// Bonus above the sweet spot.
    pub active_bonus: f64,
    pub max_trades: usize,
    pub overtrading_penalty: f64,
}

impl Default for ObjectiveConfig {
    fn default() -> Self {
        Self {
            min_trades: 5,
            insufficient_trades_score: -1000.0,
            win_rate_weight: 0.3,
            profit_factor_weight: 20.0,
            profit_factor_cap: 40.0,
            sharpe_weight: 10.0,
            sharpe_cap: 20.0,
            drawdown_threshold: 20.0,
            drawdown_penalty: 0.5,
            sweet_spot_min: 10,
            sweet_spot_max: 30,
            sweet_spot_bonus: 10.0,
            active_bonus: 5.0,
            max_trades: 50,
            overtrading_penalty: 10.0,
        }
    }
}

impl ObjectiveConfig {
    pub fn score(&self, m: &PerformanceMetrics) -> f64 {
        if m.total_trades < self.min_trades {
            return self.insufficient_trades_score;
        }
        let mut score = m.win_rate * self.win_rate_weight;
        score += (m.profit_factor * self.profit_factor_weight).min(self.profit_factor_cap);
        score += (m.sharpe_ratio * self.sharpe_weight).min(self.sharpe_cap);
        if m.max_drawdown > self.drawdown_threshold {
            score -= (m.max_drawdown - self.drawdown_threshold) * self.drawdown_penalty;
        }
        if (self.sweet_spot_min..=self.sweet_spot_max).contains(&m.total_trades) {
            score += self.sweet_spot_bonus;
        } else if m.total_trades > self.sweet_spot_max {
            score += self.active_bonus;
        }
        if m.total_trades > self.max_trades {
            score -= self.overtrading_penalty;
        }
        score
    }
}

impl Params for ObjectiveConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.sweet_spot_min <= self.sweet_spot_max,
            "objective.sweet_spot_min",
            self.sweet_spot_min,
            "<= sweet_spot_max",
        )?;
        ensure(
            self.profit_factor_cap.is_finite() && self.sharpe_cap.is_finite(),
            "objective.caps",
            format!("{}/{}", self.profit_factor_cap, self.sharpe_cap),
            "finite",
        )
    }
}

/// Limits on the train-window search, checked between candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchBudget {
    pub max_candidates: Option<usize>,
    pub max_duration_secs: Option<u64>,
}

impl SearchBudget {
    fn exhausted(&self, evaluated: usize, started: Instant) -> bool {
        self.max_candidates.is_some_and(|max| evaluated >= max)
            || self
                .max_duration_secs
                .is_some_and(|secs| started.elapsed() >= Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardConfig {
    pub windows: Vec<WindowSpec>,
    pub grid: ParameterGrid,
    pub objective: ObjectiveConfig,
    /// Bars before the test start fed to the test run for warm-up only.
    pub lookback_bars: usize,
    pub budget: SearchBudget,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            windows: Vec::new(),
            grid: ParameterGrid::default(),
            objective: ObjectiveConfig::default(),
            lookback_bars: 300,
            budget: SearchBudget::default(),
        }
    }
}

impl Params for WalkForwardConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.windows.is_empty() {
            return Err(ConfigError::Invalid("walk-forward needs at least one window".to_string()));
        }
        for window in &self.windows {
            window.validate()?;
        }
        self.grid.validate()?;
        self.objective.validate()?;
        if let Some(max) = self.budget.max_candidates {
            ensure(max > 0, "budget.max_candidates", max, "> 0")?;
        }
        Ok(())
    }
}

/// A window that produced out-of-sample results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowReport {
    pub index: usize,
    pub name: String,
    pub spec: WindowSpec,
    pub best: Candidate,
    pub train_score: f64,
    pub train_metrics: PerformanceMetrics,
    pub candidates_evaluated: usize,
    pub test: BacktestResult,
}

impl WindowReport {
    pub fn is_profitable(&self) -> bool {
        self.test.metrics.is_profitable()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub index: usize,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    Evaluated(Box<WindowReport>),
    Skipped(SkippedWindow),
}

/// How many windows picked a given value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: f64,
    pub count: usize,
}

/// Aggregate over all windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardSummary {
    pub windows: Vec<WindowReport>,
    pub skipped: Vec<SkippedWindow>,
    pub evaluated_windows: usize,
    pub profitable_windows: usize,
    /// Percent of evaluated windows with a positive out-of-sample return.
    pub consistency: f64,
    /// Selection counts per grid value, in grid order.
    pub parameter_stability: BTreeMap<GridParam, Vec<ValueCount>>,
    /// Most frequently selected value per parameter.
    pub robust_parameters: BTreeMap<GridParam, f64>,
    pub mean_oos_return: f64,
    /// Population standard deviation of per-window returns.
    pub oos_return_std: f64,
    /// Metrics over all out-of-sample trades pooled.
    pub pooled: PerformanceMetrics,
    /// Malformed bars dropped from the series before windowing.
    pub bars_rejected: usize,
}

impl WalkForwardSummary {
    /// Fold window outcomes, in any order, into the summary.
    pub fn from_outcomes(
        outcomes: Vec<WindowOutcome>,
        grid: &ParameterGrid,
        metrics: &MetricsConfig,
    ) -> Self {
        let mut windows = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                WindowOutcome::Evaluated(report) => windows.push(*report),
                WindowOutcome::Skipped(skip) => skipped.push(skip),
            }
        }
        windows.sort_by_key(|w| w.index);
        skipped.sort_by_key(|s| s.index);

        let evaluated_windows = windows.len();
        let profitable_windows = windows.iter().filter(|w| w.is_profitable()).count();
        let consistency = if evaluated_windows > 0 {
            profitable_windows as f64 / evaluated_windows as f64 * 100.0
        } else {
            0.0
        };

        let mut parameter_stability = BTreeMap::new();
        let mut robust_parameters = BTreeMap::new();
        for axis in &grid.axes {
            let counts: Vec<ValueCount> = axis
                .values
                .iter()
                .map(|&value| ValueCount {
                    value,
                    count: windows
                        .iter()
                        .filter(|w| w.best.get(axis.param) == Some(value))
                        .count(),
                })
                .collect();
            // Earliest value wins ties.
            let mut top: Option<ValueCount> = None;
            for vc in &counts {
                if vc.count > 0 && top.map_or(true, |t| vc.count > t.count) {
                    top = Some(*vc);
                }
            }
            if let Some(top) = top {
                robust_parameters.insert(axis.param, top.value);
            }
            parameter_stability.insert(axis.param, counts);
        }

        let returns: Vec<f64> = windows.iter().map(|w| w.test.metrics.total_return).collect();
        let (mean_oos_return, oos_return_std) = if returns.is_empty() {
            (0.0, 0.0)
        } else {
            (
                returns.iter().copied().mean(),
                returns.iter().copied().population_std_dev(),
            )
        };

        let pooled_trades: Vec<Trade> = windows
            .iter()
            .flat_map(|w| w.test.trades.iter().cloned())
            .collect();
        let pooled = PerformanceMetrics::compute(&pooled_trades, metrics);

        Self {
            windows,
            skipped,
            evaluated_windows,
            profitable_windows,
            consistency,
            parameter_stability,
            robust_parameters,
            mean_oos_return,
            oos_return_std,
            pooled,
            bars_rejected: 0,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn summary(&self) -> String {
        let rule = "═══════════════════════════════════════════════════════════\n";
        let section = "───────────────────────────────────────────────────────────\n";
        let mut s = String::new();
        s.push_str(rule);
        s.push_str("  WALK-FORWARD REPORT\n");
        s.push_str(rule);
        s.push('\n');

        s.push_str("WINDOWS\n");
        s.push_str(section);
        for w in &self.windows {
            s.push_str(&format!(
                "  {:<10} {} → {}  {:>3} trades  {:>8.2}%  [{}]\n",
                w.name,
                w.spec.test_start,
                w.spec.test_end,
                w.test.metrics.total_trades,
                w.test.metrics.total_return,
                w.best
            ));
        }
        for skip in &self.skipped {
            s.push_str(&format!("  {:<10} skipped: {}\n", skip.name, skip.reason));
        }
        s.push('\n');

        s.push_str("CONSISTENCY\n");
        s.push_str(section);
        s.push_str(&format!(
            "  Profitable Windows:  {}/{} ({:.1}%)\n",
            self.profitable_windows, self.evaluated_windows, self.consistency
        ));
        s.push_str(&format!("  Mean OOS Return:     {:.2}%\n", self.mean_oos_return));
        s.push_str(&format!("  OOS Return Std:      {:.2}%\n", self.oos_return_std));
        s.push_str(&format!("  Pooled Trades:       {}\n", self.pooled.total_trades));
        s.push_str(&format!("  Pooled Win Rate:     {:.2}%\n", self.pooled.win_rate));
        s.push_str(&format!("  Rejected Bars:       {}\n", self.bars_rejected));
        s.push('\n');

        if !self.robust_parameters.is_empty() {
            s.push_str("ROBUST PARAMETERS\n");
            s.push_str(section);
            for (param, value) in &self.robust_parameters {
                s.push_str(&format!("  {:<22} {}\n", param.name(), value));
            }
            s.push('\n');
        }
        s.push_str(rule);
        s
    }
}

/// Runs the train/test protocol over every configured window.
pub struct WalkForwardValidator {
    base: BacktestConfig,
    config: WalkForwardConfig,
    candidates: Vec<(Candidate, BacktestEngine)>,
}

impl WalkForwardValidator {
    /// Validates the base configuration, the windows and every grid
    /// candidate before any window runs.
    pub fn new(base: BacktestConfig, config: WalkForwardConfig) -> Result<Self, ConfigError> {
        base.validate()?;
        config.validate()?;
        let candidates = config
            .grid
            .candidates()
            .into_iter()
            .map(|candidate| {
                let engine = BacktestEngine::new(candidate.apply(&base)?)?;
                Ok((candidate, engine))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            base,
            config,
            candidates,
        })
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Validate a series whose loader already dropped `bars_rejected`
    /// malformed bars.
    pub fn run_loaded(&self, series: &BarSeries, bars_rejected: usize) -> WalkForwardSummary {
        WalkForwardSummary {
            bars_rejected,
            ..self.run(series)
        }
    }

    /// Windows run in parallel; each window's search is sequential.
    pub fn run(&self, series: &BarSeries) -> WalkForwardSummary {
        info!(
            symbol = %series.symbol,
            windows = self.config.windows.len(),
            candidates = self.candidates.len(),
            "Starting walk-forward"
        );
        let outcomes: Vec<WindowOutcome> = self
            .config
            .windows
            .par_iter()
            .enumerate()
            .map(|(index, spec)| {
                let name = spec.label(index);
                match self.run_window(index, &name, spec, series) {
                    Ok(report) => WindowOutcome::Evaluated(Box::new(report)),
                    Err(reason) => {
                        warn!(window = %name, %reason, "Window skipped");
                        WindowOutcome::Skipped(SkippedWindow {
                            index,
                            name,
                            reason,
                        })
                    }
                }
            })
            .collect();

        let summary = WalkForwardSummary::from_outcomes(outcomes, &self.config.grid, &self.base.metrics);
        info!(
            evaluated = summary.evaluated_windows,
            skipped = summary.skipped.len(),
            consistency = summary.consistency,
            mean_oos_return = summary.mean_oos_return,
            "Walk-forward complete"
        );
        summary
    }

    fn run_window(
        &self,
        index: usize,
        name: &str,
        spec: &WindowSpec,
        series: &BarSeries,
    ) -> Result<WindowReport, String> {
        let (train_start, train_end) = spec.train_range();
        let train = series.between(train_start, train_end);
        if train.is_empty() {
            return Err("no bars in train window".to_string());
        }

        let started = Instant::now();
        let mut evaluated = 0;
        let mut best: Option<(usize, f64, PerformanceMetrics)> = None;
        for (position, (candidate, engine)) in self.candidates.iter().enumerate() {
            if self.config.budget.exhausted(evaluated, started) {
                debug!(window = name, evaluated, "Search budget exhausted");
                break;
            }
            evaluated += 1;
            let result = match engine.run(&train) {
                Ok(result) => result,
                Err(e) => {
                    warn!(window = name, candidate = %candidate, error = %e, "Candidate failed");
                    continue;
                }
            };
            if result.metrics.total_trades == 0 {
                continue;
            }
            let score = self.config.objective.score(&result.metrics);
            debug!(window = name, candidate = %candidate, score, "Candidate scored");
            if best.as_ref().map_or(true, |(_, top, _)| score > *top) {
                best = Some((position, score, result.metrics));
            }
        }
        let Some((position, train_score, train_metrics)) = best else {
            return Err("no valid candidate on train window".to_string());
        };
        let (candidate, engine) = &self.candidates[position];

        let (test_start, test_end) = spec.test_range();
        let (test_series, first) =
            series.window_with_lookback(test_start, test_end, self.config.lookback_bars);
        if first >= test_series.len() {
            return Err("no bars in test window".to_string());
        }
        let test = engine
            .run_from(&test_series, first)
            .map_err(|e| format!("test run failed: {e}"))?;
        if test.trades.is_empty() {
            return Err("no trades in test window".to_string());
        }

        info!(
            window = name,
            best = %candidate,
            train_score,
            test_trades = test.metrics.total_trades,
            test_return = test.metrics.total_return,
            "Window evaluated"
        );
        Ok(WindowReport {
            index,
            name: name.to_string(),
            spec: spec.clone(),
            best: candidate.clone(),
            train_score,
            train_metrics,
            candidates_evaluated: evaluated,
            test,
        })
    }
}
