//! CLI command implementations.

pub mod backtest;
mod common;
pub mod presets;
pub mod validate;
pub mod walk_forward;
