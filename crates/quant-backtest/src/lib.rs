//! Backtesting engine: trade lifecycle simulation, performance metrics and
//! walk-forward validation.

mod engine;
mod grid;
mod lifecycle;
mod report;
mod statistics;
mod walk_forward;

pub use engine::{BacktestConfig, BacktestEngine, RunContext, RunDiagnostics};
pub use grid::{Candidate, GridAxis, GridParam, ParameterGrid};
pub use lifecycle::Lifecycle;
pub use report::{BacktestResult, CombinedResult, SymbolSummary};
pub use statistics::{ExitBreakdown, MetricsConfig, PerformanceMetrics, Streak, TradeOutcome};
pub use walk_forward::{
    ObjectiveConfig, SearchBudget, SkippedWindow, ValueCount, WalkForwardConfig,
    WalkForwardSummary, WalkForwardValidator, WindowOutcome, WindowReport, WindowSpec,
};
