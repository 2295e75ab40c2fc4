//! Unified entry planning.

use quant_core::error::ConfigError;
use quant_core::traits::Params;
use quant_core::types::{Signal, TradeLevels};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::levels::{LevelConfig, LevelPlanner, Structure};
use crate::position_sizer::{PositionSizer, SizingConfig};
use crate::trailing::{TrailingConfig, TrailingStop};

/// Risk management configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub levels: LevelConfig,
    pub trailing: TrailingConfig,
    pub sizing: SizingConfig,
}

impl Params for RiskConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.levels.validate()?;
        self.trailing.validate()?;
        self.sizing.validate()
    }
}

/// Levels and size for an accepted signal.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    pub levels: TradeLevels,
    pub position_size: f64,
}

/// Decision from the risk manager.
#[derive(Debug, Clone, PartialEq)]
pub enum RiskDecision {
    Approved(EntryPlan),
    Rejected { reason: String },
}

impl RiskDecision {
    pub fn is_approved(&self) -> bool {
        matches!(self, RiskDecision::Approved(_))
    }
}

/// Combines level placement, sizing and trailing rules.
#[derive(Debug, Clone)]
pub struct RiskManager {
    config: RiskConfig,
    planner: LevelPlanner,
    sizer: PositionSizer,
    trailing: TrailingStop,
}

impl RiskManager {
    pub fn new(config: RiskConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            planner: LevelPlanner::new(config.levels.clone()),
            sizer: PositionSizer::new(config.sizing.clone()),
            trailing: TrailingStop::new(config.trailing.clone()),
            config,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    pub fn trailing(&self) -> &TrailingStop {
        &self.trailing
    }

    pub fn max_fraction(&self) -> f64 {
        self.sizer.max_fraction()
    }

    /// Plan levels and size for entering on `signal` at its reference price.
    pub fn plan_entry(&self, signal: &Signal, atr: Option<f64>, structure: Structure) -> RiskDecision {
        let Some(atr) = atr else {
            return reject(signal, "ATR unavailable at entry".to_string());
        };
        let Some(levels) = self
            .planner
            .plan(signal.direction, signal.reference_price, atr, structure)
        else {
            return reject(signal, format!("cannot place levels with ATR {atr}"));
        };

        let position_size = self
            .sizer
            .calculate(signal.reference_price, levels.stop_loss, signal.confidence);
        if position_size <= 0.0 {
            return reject(signal, "position size is zero".to_string());
        }

        RiskDecision::Approved(EntryPlan {
            levels,
            position_size,
        })
    }
}

fn reject(signal: &Signal, reason: String) -> RiskDecision {
    debug!(symbol = %signal.symbol, index = signal.index, %reason, "Entry rejected");
    RiskDecision::Rejected { reason }
}
