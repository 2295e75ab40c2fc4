//! Core traits for the backtesting engine.

mod data_source;
mod indicator;
mod params;

pub use data_source::MarketDataProvider;
pub use indicator::{BarIndicator, Indicator};
pub use params::{ensure, Params};
