//! Core data types for the backtesting engine.

mod account;
mod ohlcv;
mod regime;
mod signal;
mod timeframe;
mod trade;

pub use account::{Account, EquityPoint};
pub use ohlcv::{Bar, BarSeries, RejectedBar};
pub use regime::MarketRegime;
pub use signal::{Direction, Reason, RuleCategory, Signal};
pub use timeframe::Timeframe;
pub use trade::{ExitReason, PartialPlan, Trade, TradeExit, TradeLevels, TradeStatus};
