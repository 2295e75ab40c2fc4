//! Core types and traits for the backtesting engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries, Timeframe)
//! - Signals, trades and the capital ledger
//! - Traits for indicators, market-data providers and validated parameters

pub mod types;
pub mod traits;
pub mod error;

pub use error::{QuantError, QuantResult};
pub use types::*;
pub use traits::*;
