//! Trailing-stop rules.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::Direction;
use serde::{Deserialize, Serialize};

/// How far behind the close the trailing stop sits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum TrailDistance {
    /// Percent of the close.
    Percent { percent: f64 },
    /// Multiple of the current ATR.
    Atr { multiplier: f64 },
}

impl Default for TrailDistance {
    fn default() -> Self {
        TrailDistance::Atr { multiplier: 1.5 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailingConfig {
    pub enabled: bool,
    /// Unrealized profit, in percent of entry, that switches trailing on.
    pub activation_profit_pct: f64,
    pub distance: TrailDistance,
}

impl Default for TrailingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            activation_profit_pct: 1.0,
            distance: TrailDistance::default(),
        }
    }
}

impl Params for TrailingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.activation_profit_pct >= 0.0,
            "risk.trailing.activation_profit_pct",
            self.activation_profit_pct,
            ">= 0",
        )?;
        match self.distance {
            TrailDistance::Percent { percent } => ensure(
                percent > 0.0 && percent < 100.0,
                "risk.trailing.distance.percent",
                percent,
                "in (0, 100)",
            ),
            TrailDistance::Atr { multiplier } => ensure(
                multiplier > 0.0,
                "risk.trailing.distance.multiplier",
                multiplier,
                "> 0",
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrailingStop {
    config: TrailingConfig,
}

impl TrailingStop {
    pub fn new(config: TrailingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrailingConfig {
        &self.config
    }

    /// Whether unrealized profit at `close` is enough to start trailing.
    pub fn should_activate(&self, direction: Direction, entry: f64, close: f64) -> bool {
        if !self.config.enabled {
            return false;
        }
        let profit_pct = direction.sign() * (close - entry) / entry * 100.0;
        profit_pct >= self.config.activation_profit_pct
    }

    /// Candidate stop level for a position marked at `close`.
    pub fn level(&self, direction: Direction, close: f64, atr: Option<f64>) -> Option<f64> {
        let distance = match self.config.distance {
            TrailDistance::Percent { percent } => close * percent / 100.0,
            TrailDistance::Atr { multiplier } => multiplier * atr.filter(|a| a.is_finite())?,
        };
        Some(close - direction.sign() * distance)
    }

    /// Whether the bar's range reaches the stop.
    pub fn is_breached(direction: Direction, stop: f64, low: f64, high: f64) -> bool {
        match direction {
            Direction::Long => low <= stop,
            Direction::Short => high >= stop,
        }
    }
}
