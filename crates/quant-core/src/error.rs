//! Error types for the backtesting engine.

use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum QuantError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Invalid bar: {0}")]
    Bar(#[from] BarError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Trade error: {0}")]
    Trade(#[from] TradeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Invalid parameter values. Always fatal, raised before a run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("parameter `{parameter}` = {value} is out of range (expected {expected})")]
    OutOfRange {
        parameter: String,
        value: String,
        expected: String,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),
}

impl ConfigError {
    /// Shorthand for an out-of-range parameter.
    pub fn out_of_range(
        parameter: impl Into<String>,
        value: impl ToString,
        expected: impl Into<String>,
    ) -> Self {
        ConfigError::OutOfRange {
            parameter: parameter.into(),
            value: value.to_string(),
            expected: expected.into(),
        }
    }
}

/// Reasons a bar is rejected on ingestion.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarError {
    #[error("non-finite value in bar at {timestamp}")]
    NonFinite { timestamp: i64 },

    #[error("non-positive price in bar at {timestamp}")]
    NonPositivePrice { timestamp: i64 },

    #[error("high below open/close/low in bar at {timestamp}")]
    HighBelowBody { timestamp: i64 },

    #[error("low above open/close/high in bar at {timestamp}")]
    LowAboveBody { timestamp: i64 },

    #[error("negative volume in bar at {timestamp}")]
    NegativeVolume { timestamp: i64 },

    #[error("timestamp {timestamp} does not follow {previous}")]
    OutOfOrder { previous: i64, timestamp: i64 },
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Violations of trade level invariants.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradeError {
    #[error("levels out of order for {direction}: stop {stop_loss}, entry {entry}, target {take_profit}")]
    InvalidLevels {
        direction: crate::Direction,
        stop_loss: f64,
        entry: f64,
        take_profit: f64,
    },

    #[error("position size {size} outside (0, {max}]")]
    InvalidSize { size: f64, max: f64 },

    #[error("trade {0} is already closed")]
    AlreadyClosed(u64),

    #[error("trade {id} P&L {pnl_pct}% cannot be booked")]
    UnbookablePnl { id: u64, pnl_pct: f64 },
}

/// Result type alias for engine operations.
pub type QuantResult<T> = Result<T, QuantError>;
