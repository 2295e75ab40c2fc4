//! Stop-loss, take-profit and partial-target placement.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{Direction, TradeLevels};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub stop_atr_multiplier: f64,
    pub target_atr_multiplier: f64,
    /// Target is widened until reward / risk reaches this.
    pub min_reward_risk: f64,
    /// Consider swing support/resistance for stop and target.
    pub use_structure: bool,
    /// Gap between a swing level and the stop/target placed against it, in ATRs.
    pub structure_buffer_atr: f64,
    /// Partial target distance in ATRs. `None` disables the partial close.
    pub partial_target_atr_multiplier: Option<f64>,
    /// Share of the position closed at the partial target.
    pub partial_fraction: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            stop_atr_multiplier: 1.5,
            target_atr_multiplier: 3.0,
            min_reward_risk: 1.5,
            use_structure: true,
            structure_buffer_atr: 0.2,
            partial_target_atr_multiplier: Some(1.5),
            partial_fraction: 0.4,
        }
    }
}

impl Params for LevelConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.stop_atr_multiplier > 0.0,
            "risk.levels.stop_atr_multiplier",
            self.stop_atr_multiplier,
            "> 0",
        )?;
        ensure(
            self.target_atr_multiplier > 0.0,
            "risk.levels.target_atr_multiplier",
            self.target_atr_multiplier,
            "> 0",
        )?;
        ensure(
            self.min_reward_risk >= 0.0,
            "risk.levels.min_reward_risk",
            self.min_reward_risk,
            ">= 0",
        )?;
        ensure(
            self.structure_buffer_atr >= 0.0,
            "risk.levels.structure_buffer_atr",
            self.structure_buffer_atr,
            ">= 0",
        )?;
        if let Some(multiplier) = self.partial_target_atr_multiplier {
            ensure(
                multiplier > 0.0,
                "risk.levels.partial_target_atr_multiplier",
                multiplier,
                "> 0",
            )?;
            ensure(
                self.partial_fraction > 0.0 && self.partial_fraction < 1.0,
                "risk.levels.partial_fraction",
                self.partial_fraction,
                "in (0, 1)",
            )?;
        }
        Ok(())
    }
}

/// Nearby swing levels at entry time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Structure {
    pub support: Option<f64>,
    pub resistance: Option<f64>,
}

/// Level placement for new positions.
#[derive(Debug, Clone)]
pub struct LevelPlanner {
    config: LevelConfig,
}

impl LevelPlanner {
    pub fn new(config: LevelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LevelConfig {
        &self.config
    }

    /// Levels for an entry at `entry`, or `None` when ATR is unusable.
    ///
    /// The stop is the tighter of the ATR stop and a buffered structure
    /// stop; the target the nearer of the ATR target and a buffered
    /// structure target. A target that pays less than `min_reward_risk`
    /// is pushed out to exactly that multiple of the risk.
    pub fn plan(
        &self,
        direction: Direction,
        entry: f64,
        atr: f64,
        structure: Structure,
    ) -> Option<TradeLevels> {
        if !(atr.is_finite() && atr > 0.0 && entry.is_finite() && entry > 0.0) {
            return None;
        }
        let c = &self.config;
        let sign = direction.sign();
        let buffer = c.structure_buffer_atr * atr;

        // Distances from entry, positive on the losing / winning side.
        let mut risk = c.stop_atr_multiplier * atr;
        let mut reward = c.target_atr_multiplier * atr;

        if c.use_structure {
            let (against, toward) = match direction {
                Direction::Long => (structure.support, structure.resistance),
                Direction::Short => (structure.resistance, structure.support),
            };
            if let Some(level) = against {
                let distance = sign * (entry - level) + buffer;
                if distance > 0.0 {
                    risk = risk.min(distance);
                }
            }
            if let Some(level) = toward {
                let distance = sign * (level - entry) - buffer;
                if distance > 0.0 {
                    reward = reward.min(distance);
                }
            }
        }

        if reward < c.min_reward_risk * risk {
            reward = c.min_reward_risk * risk;
        }

        let partial = c.partial_target_atr_multiplier.and_then(|multiplier| {
            let distance = multiplier * atr;
            (distance < reward).then(|| (entry + sign * distance, c.partial_fraction))
        });

        Some(TradeLevels {
            stop_loss: entry - sign * risk,
            take_profit: entry + sign * reward,
            partial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planner() -> LevelPlanner {
        LevelPlanner::new(LevelConfig::default())
    }

    #[test]
    fn test_atr_levels() {
        let levels = planner()
            .plan(Direction::Long, 100.0, 2.0, Structure::default())
            .unwrap();
        assert_eq!(levels.stop_loss, 97.0);
        assert_eq!(levels.take_profit, 106.0);
        assert_eq!(levels.partial, Some((103.0, 0.4)));

        let levels = planner()
            .plan(Direction::Short, 100.0, 2.0, Structure::default())
            .unwrap();
        assert_eq!(levels.stop_loss, 103.0);
        assert_eq!(levels.take_profit, 94.0);
        assert_eq!(levels.partial, Some((97.0, 0.4)));
    }

    #[test]
    fn test_structure_tightens_stop() {
        // Support at 98.5 with a 0.4 buffer: stop 98.1 beats the ATR stop at 97.
        let structure = Structure {
            support: Some(98.5),
            resistance: None,
        };
        let levels = planner().plan(Direction::Long, 100.0, 2.0, structure).unwrap();
        assert!((levels.stop_loss - 98.1).abs() < 1e-9);
        assert_eq!(levels.take_profit, 106.0);
    }

    #[test]
    fn test_far_structure_is_ignored() {
        let structure = Structure {
            support: Some(90.0),
            resistance: Some(120.0),
        };
        let levels = planner().plan(Direction::Long, 100.0, 2.0, structure).unwrap();
        assert_eq!(levels.stop_loss, 97.0);
        assert_eq!(levels.take_profit, 106.0);
    }

    #[test]
    fn test_target_widened_to_min_reward_risk() {
        // Resistance at 102.4 would cap the target at 102.0: reward 2 on risk 3.
        let structure = Structure {
            support: None,
            resistance: Some(102.4),
        };
        let levels = planner().plan(Direction::Long, 100.0, 2.0, structure).unwrap();
        assert_eq!(levels.stop_loss, 97.0);
        assert!((levels.take_profit - 104.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_dropped_beyond_target() {
        let config = LevelConfig {
            partial_target_atr_multiplier: Some(3.5),
            ..LevelConfig::default()
        };
        let levels = LevelPlanner::new(config)
            .plan(Direction::Long, 100.0, 2.0, Structure::default())
            .unwrap();
        assert_eq!(levels.partial, None);
    }

    #[test]
    fn test_unusable_atr() {
        assert!(planner().plan(Direction::Long, 100.0, 0.0, Structure::default()).is_none());
        assert!(planner().plan(Direction::Long, 100.0, f64::NAN, Structure::default()).is_none());
    }
}
