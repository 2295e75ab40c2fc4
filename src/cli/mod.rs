//! CLI definitions.

pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use quant_core::types::Timeframe;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quantlab")]
#[command(author, version, about = "Signal-driven strategy backtesting and walk-forward validation")]
pub struct Cli {
    /// Configuration file path (TOML). Environment overrides use the
    /// QUANT__SECTION__KEY form.
    #[arg(short, long, env = "QUANTLAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level (defaults to logging.level from the config)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Also write daily-rolling log files to this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Backtest one or more symbols
    Backtest(BacktestArgs),
    /// Optimize on train windows and validate on the following test windows
    WalkForward(WalkForwardArgs),
    /// List strategy presets
    Presets(PresetsArgs),
    /// Validate configuration and print the effective settings
    ValidateConfig,
}

/// Data selection shared by every run command. Each flag overrides the
/// matching `[data]` key.
#[derive(clap::Args)]
pub struct DataArgs {
    /// Directory with SYMBOL_TF.csv or SYMBOL.csv files
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Symbols (comma-separated). Defaults to every file in the directory.
    #[arg(short = 'S', long, value_delimiter = ',')]
    pub symbols: Vec<String>,

    /// Bar timeframe, e.g. 1h, 4h, 1d
    #[arg(short, long)]
    pub timeframe: Option<Timeframe>,

    /// First date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last date (YYYY-MM-DD, inclusive)
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Strategy preset (see `quantlab presets`)
    #[arg(short, long)]
    pub preset: Option<String>,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Initial capital
    #[arg(long)]
    pub capital: Option<f64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save JSON results to file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve (single symbol only) as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct WalkForwardArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Generate rolling windows with this many train days instead of the
    /// configured windows (needs --start and --end or data.start/data.end)
    #[arg(long, requires = "test_days")]
    pub train_days: Option<u64>,

    /// Test days per rolling window
    #[arg(long, requires = "train_days")]
    pub test_days: Option<u64>,

    /// Days between rolling windows (defaults to --test-days)
    #[arg(long)]
    pub step_days: Option<u64>,

    /// Stop each window's search after this many candidates
    #[arg(long)]
    pub max_candidates: Option<usize>,

    /// Stop each window's search after this many seconds
    #[arg(long)]
    pub max_seconds: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save JSON results to file
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct PresetsArgs {
    /// Print the full parameter set of one preset as TOML
    #[arg(long)]
    pub show: Option<String>,
}
