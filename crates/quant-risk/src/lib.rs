//! Risk rules for the trade lifecycle.
//!
//! Provides stop/target placement, trailing stops and position sizing.

mod levels;
mod position_sizer;
mod risk_manager;
mod trailing;

pub use levels::{LevelConfig, LevelPlanner, Structure};
pub use position_sizer::{PositionSizer, SizingConfig, SizingMethod};
pub use risk_manager::{EntryPlan, RiskConfig, RiskDecision, RiskManager};
pub use trailing::{TrailDistance, TrailingConfig, TrailingStop};
