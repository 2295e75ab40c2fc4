//! Position sizing as a fraction of capital.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SizingMethod {
    /// Same fraction of capital on every trade.
    FixedFraction { fraction: f64 },
    /// Lose `risk_per_trade` of capital if the stop is hit.
    RiskBased { risk_per_trade: f64 },
    /// `base_fraction` scaled by signal confidence.
    ConfidenceScaled { base_fraction: f64 },
}

impl Default for SizingMethod {
    fn default() -> Self {
        SizingMethod::RiskBased {
            risk_per_trade: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub method: SizingMethod,
    /// Largest fraction of capital committed to one position.
    pub max_fraction: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            method: SizingMethod::default(),
            max_fraction: 0.95,
        }
    }
}

impl Params for SizingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.max_fraction > 0.0 && self.max_fraction <= 1.0,
            "risk.sizing.max_fraction",
            self.max_fraction,
            "in (0, 1]",
        )?;
        let (name, value) = match self.method {
            SizingMethod::FixedFraction { fraction } => ("fraction", fraction),
            SizingMethod::RiskBased { risk_per_trade } => ("risk_per_trade", risk_per_trade),
            SizingMethod::ConfidenceScaled { base_fraction } => ("base_fraction", base_fraction),
        };
        ensure(
            value > 0.0 && value <= 1.0,
            &format!("risk.sizing.method.{name}"),
            value,
            "in (0, 1]",
        )
    }
}

/// Position sizer.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    config: SizingConfig,
}

impl PositionSizer {
    pub fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    pub fn max_fraction(&self) -> f64 {
        self.config.max_fraction
    }

    /// Fraction of capital for a position, capped at `max_fraction`.
    /// Zero when the inputs cannot produce a size.
    pub fn calculate(&self, entry: f64, stop_loss: f64, confidence: f64) -> f64 {
        if !(entry > 0.0) {
            return 0.0;
        }
        let size = match self.config.method {
            SizingMethod::FixedFraction { fraction } => fraction,
            SizingMethod::RiskBased { risk_per_trade } => {
                let stop_distance = (entry - stop_loss).abs() / entry;
                if stop_distance > 0.0 {
                    risk_per_trade / stop_distance
                } else {
                    0.0
                }
            }
            SizingMethod::ConfidenceScaled { base_fraction } => base_fraction * confidence.clamp(0.0, 1.0),
        };
        if size.is_finite() {
            size.min(self.config.max_fraction).max(0.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer(method: SizingMethod) -> PositionSizer {
        PositionSizer::new(SizingConfig {
            method,
            max_fraction: 0.5,
        })
    }

    #[test]
    fn test_fixed_fraction() {
        let s = sizer(SizingMethod::FixedFraction { fraction: 0.1 });
        assert_eq!(s.calculate(100.0, 97.0, 0.3), 0.1);
    }

    #[test]
    fn test_risk_based() {
        // 1% risk with a 4% stop distance commits a quarter of capital.
        let s = sizer(SizingMethod::RiskBased { risk_per_trade: 0.01 });
        assert!((s.calculate(100.0, 96.0, 1.0) - 0.25).abs() < 1e-12);
        // Short side measures distance the same way.
        assert!((s.calculate(100.0, 104.0, 1.0) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_cap_applies() {
        let s = sizer(SizingMethod::RiskBased { risk_per_trade: 0.02 });
        assert_eq!(s.calculate(100.0, 99.0, 1.0), 0.5);
    }

    #[test]
    fn test_confidence_scaled() {
        let s = sizer(SizingMethod::ConfidenceScaled { base_fraction: 0.2 });
        assert!((s.calculate(100.0, 97.0, 0.6) - 0.12).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs() {
        let s = sizer(SizingMethod::RiskBased { risk_per_trade: 0.01 });
        assert_eq!(s.calculate(100.0, 100.0, 1.0), 0.0);
        assert_eq!(s.calculate(0.0, 97.0, 1.0), 0.0);
    }

    #[test]
    fn test_validation() {
        let bad = SizingConfig {
            max_fraction: 1.5,
            ..SizingConfig::default()
        };
        assert!(bad.validate().is_err());
        let bad = SizingConfig {
            method: SizingMethod::FixedFraction { fraction: 0.0 },
            ..SizingConfig::default()
        };
        assert!(bad.validate().is_err());
    }
}
