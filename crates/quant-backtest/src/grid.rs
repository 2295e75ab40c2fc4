//! Explicit parameter grids for the walk-forward search.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_risk::SizingMethod;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::BacktestConfig;

/// A tunable parameter and where it lives in [`BacktestConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridParam {
    MinScore,
    MinConfidence,
    MinCategories,
    StopAtrMultiplier,
    TargetAtrMultiplier,
    VolumeSurge,
    RsiOversold,
    RsiOverbought,
    TrailingActivation,
    /// Switches sizing to risk-based.
    RiskPerTrade,
    PartialFraction,
}

impl GridParam {
    pub fn name(&self) -> &'static str {
        match self {
            GridParam::MinScore => "min_score",
            GridParam::MinConfidence => "min_confidence",
            GridParam::MinCategories => "min_categories",
            GridParam::StopAtrMultiplier => "stop_atr_multiplier",
            GridParam::TargetAtrMultiplier => "target_atr_multiplier",
            GridParam::VolumeSurge => "volume_surge",
            GridParam::RsiOversold => "rsi_oversold",
            GridParam::RsiOverbought => "rsi_overbought",
            GridParam::TrailingActivation => "trailing_activation",
            GridParam::RiskPerTrade => "risk_per_trade",
            GridParam::PartialFraction => "partial_fraction",
        }
    }

    /// Write `value` into `config`. Range checks are left to
    /// [`BacktestConfig::validate`].
    pub fn apply(&self, config: &mut BacktestConfig, value: f64) -> Result<(), ConfigError> {
        let scorer = &mut config.strategy.scorer;
        let levels = &mut config.risk.levels;
        match self {
            GridParam::MinScore => scorer.min_score = value,
            GridParam::MinConfidence => scorer.min_confidence = value,
            GridParam::MinCategories => {
                ensure(
                    value >= 0.0 && value.fract() == 0.0,
                    self.name(),
                    value,
                    "a non-negative integer",
                )?;
                scorer.min_categories = value as usize;
            }
            GridParam::StopAtrMultiplier => levels.stop_atr_multiplier = value,
            GridParam::TargetAtrMultiplier => levels.target_atr_multiplier = value,
            GridParam::VolumeSurge => scorer.thresholds.volume_surge = value,
            GridParam::RsiOversold => scorer.thresholds.rsi_oversold = value,
            GridParam::RsiOverbought => scorer.thresholds.rsi_overbought = value,
            GridParam::TrailingActivation => config.risk.trailing.activation_profit_pct = value,
            GridParam::RiskPerTrade => {
                config.risk.sizing.method = SizingMethod::RiskBased {
                    risk_per_trade: value,
                }
            }
            GridParam::PartialFraction => levels.partial_fraction = value,
        }
        Ok(())
    }
}

impl fmt::Display for GridParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Values to try for one parameter, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    pub param: GridParam,
    pub values: Vec<f64>,
}

/// One point of the grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub values: Vec<(GridParam, f64)>,
}

impl Candidate {
    /// `base` with this candidate's values written in, validated.
    pub fn apply(&self, base: &BacktestConfig) -> Result<BacktestConfig, ConfigError> {
        let mut config = base.clone();
        for (param, value) in &self.values {
            param.apply(&mut config, *value)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn get(&self, param: GridParam) -> Option<f64> {
        self.values
            .iter()
            .find_map(|(p, v)| (*p == param).then_some(*v))
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.values.is_empty() {
            return f.write_str("(base)");
        }
        for (i, (param, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}={value}")?;
        }
        Ok(())
    }
}

/// Cartesian product of axes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterGrid {
    pub axes: Vec<GridAxis>,
}

impl ParameterGrid {
    pub fn new(axes: Vec<GridAxis>) -> Self {
        Self { axes }
    }

    pub fn len(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every combination, first axis varying slowest. A grid without axes
    /// yields the base configuration as its only candidate.
    pub fn candidates(&self) -> Vec<Candidate> {
        let mut out = vec![Candidate::default()];
        for axis in &self.axes {
            out = out
                .iter()
                .flat_map(|prefix| {
                    axis.values.iter().map(move |&value| {
                        let mut values = prefix.values.clone();
                        values.push((axis.param, value));
                        Candidate { values }
                    })
                })
                .collect();
        }
        out
    }
}

impl Params for ParameterGrid {
    fn validate(&self) -> Result<(), ConfigError> {
        for (i, axis) in self.axes.iter().enumerate() {
            if axis.values.is_empty() {
                return Err(ConfigError::Invalid(format!("grid axis `{}` has no values", axis.param)));
            }
            if let Some(bad) = axis.values.iter().find(|v| !v.is_finite()) {
                return Err(ConfigError::out_of_range(axis.param.name(), bad, "a finite number"));
            }
            if self.axes[..i].iter().any(|a| a.param == axis.param) {
                return Err(ConfigError::Invalid(format!("grid axis `{}` appears twice", axis.param)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> ParameterGrid {
        ParameterGrid::new(vec![
            GridAxis {
                param: GridParam::MinScore,
                values: vec![4.0, 5.0],
            },
            GridAxis {
                param: GridParam::StopAtrMultiplier,
                values: vec![1.0, 1.5, 2.0],
            },
        ])
    }

    #[test]
    fn test_cartesian_order() {
        let candidates = grid().candidates();
        assert_eq!(candidates.len(), 6);
        assert_eq!(grid().len(), 6);
        assert_eq!(
            candidates[0].values,
            vec![(GridParam::MinScore, 4.0), (GridParam::StopAtrMultiplier, 1.0)]
        );
        assert_eq!(
            candidates[1].values,
            vec![(GridParam::MinScore, 4.0), (GridParam::StopAtrMultiplier, 1.5)]
        );
        assert_eq!(candidates[5].get(GridParam::MinScore), Some(5.0));
        assert_eq!(candidates[5].to_string(), "min_score=5, stop_atr_multiplier=2");
    }

    #[test]
    fn test_empty_grid_is_base() {
        let candidates = ParameterGrid::default().candidates();
        assert_eq!(candidates.len(), 1);
        let config = candidates[0].apply(&BacktestConfig::default()).unwrap();
        assert_eq!(config, BacktestConfig::default());
    }

    #[test]
    fn test_apply_writes_fields() {
        let candidate = Candidate {
            values: vec![
                (GridParam::MinCategories, 3.0),
                (GridParam::RiskPerTrade, 0.02),
                (GridParam::TrailingActivation, 2.0),
            ],
        };
        let config = candidate.apply(&BacktestConfig::default()).unwrap();
        assert_eq!(config.strategy.scorer.min_categories, 3);
        assert_eq!(
            config.risk.sizing.method,
            SizingMethod::RiskBased { risk_per_trade: 0.02 }
        );
        assert_eq!(config.risk.trailing.activation_profit_pct, 2.0);
    }

    #[test]
    fn test_apply_rejects_bad_values() {
        let fractional = Candidate {
            values: vec![(GridParam::MinCategories, 1.5)],
        };
        assert!(fractional.apply(&BacktestConfig::default()).is_err());

        let out_of_range = Candidate {
            values: vec![(GridParam::MinConfidence, 1.5)],
        };
        assert!(matches!(
            out_of_range.apply(&BacktestConfig::default()),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_grid_validation() {
        assert!(grid().validate().is_ok());
        let mut dup = grid();
        dup.axes.push(GridAxis {
            param: GridParam::MinScore,
            values: vec![6.0],
        });
        assert!(dup.validate().is_err());
        let empty_axis = ParameterGrid::new(vec![GridAxis {
            param: GridParam::VolumeSurge,
            values: vec![],
        }]);
        assert!(empty_axis.validate().is_err());
    }

    #[test]
    fn test_deserialize_snake_case() {
        let grid: ParameterGrid = serde_json::from_str(
            r#"{"axes": [{"param": "rsi_oversold", "values": [25, 30]}]}"#,
        )
        .unwrap();
        assert_eq!(grid.axes[0].param, GridParam::RsiOversold);
        assert_eq!(grid.candidates().len(), 2);
    }
}
