//! Technical indicators with SIMD-assisted rolling kernels.
//!
//! This crate provides the indicators the signal scorer consumes:
//! - Moving averages (SMA, EMA)
//! - Momentum (RSI, MACD)
//! - Volatility (ATR, Bollinger Bands)
//! - Volume ratio and swing support/resistance
//!
//! [`IndicatorPipeline`] runs a configured set over a bar series and yields
//! an [`IndicatorFrame`] with one snapshot per bar after warm-up.

pub mod momentum;
pub mod moving_average;
pub mod pipeline;
pub mod simd;
pub mod structure;
pub mod volatility;
pub mod volume;

pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::{Ema, Sma};
pub use pipeline::{Field, IndicatorFrame, IndicatorPipeline, IndicatorSettings, IndicatorSnapshot};
pub use structure::{SwingLevels, SwingOutput};
pub use volatility::{Atr, AtrSmoothing, BollingerBands, BollingerOutput};
pub use volume::VolumeRatio;
