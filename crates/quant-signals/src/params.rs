//! Everything the signal side of a strategy is parameterized by.

use quant_core::error::ConfigError;
use quant_core::traits::Params;
use quant_indicators::IndicatorSettings;
use serde::{Deserialize, Serialize};

use crate::regime::RegimeConfig;
use crate::scorer::ScorerConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub indicators: IndicatorSettings,
    pub regime: RegimeConfig,
    pub scorer: ScorerConfig,
}

impl Params for StrategyParams {
    fn validate(&self) -> Result<(), ConfigError> {
        self.indicators.validate()?;
        self.regime.validate()?;
        self.scorer.validate()
    }
}
