//! Configuration structures.

use chrono::NaiveDate;
use quant_backtest::{BacktestConfig, WalkForwardConfig};
use quant_core::error::ConfigError;
use quant_core::traits::Params;
use quant_core::types::Timeframe;
use quant_signals::PresetRegistry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error(transparent)]
    Invalid(#[from] ConfigError),

    #[error("failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSettings,
    pub logging: LoggingConfig,
    pub data: DataSettings,
    /// Named strategy preset. When set it replaces `backtest.strategy`,
    /// with `preset_overrides` merged on top.
    pub preset: Option<String>,
    pub preset_overrides: Option<serde_json::Value>,
    pub backtest: BacktestConfig,
    pub walk_forward: WalkForwardConfig,
}

impl AppConfig {
    /// Apply the preset, if any, and validate the backtest parameters.
    pub fn resolve(&mut self) -> Result<(), ConfigError> {
        if let Some(name) = &self.preset {
            self.backtest.strategy = PresetRegistry::new().create(name, self.preset_overrides.clone())?;
        } else if self.preset_overrides.is_some() {
            return Err(ConfigError::Invalid(
                "preset_overrides given without a preset".to_string(),
            ));
        }
        self.validate()
    }

    /// The effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl Params for AppConfig {
    /// Walk-forward windows are checked when a walk-forward run starts.
    fn validate(&self) -> Result<(), ConfigError> {
        self.data.validate()?;
        self.backtest.validate()
    }
}

/// General app settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "quantlab".to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`.
    pub format: String,
    /// Directory for daily-rolling log files.
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

/// Where bars come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of `SYMBOL_TF.csv` or `SYMBOL.csv` files.
    pub directory: String,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    /// Inclusive.
    pub start: Option<NaiveDate>,
    /// Inclusive.
    pub end: Option<NaiveDate>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            directory: "data".to_string(),
            symbols: Vec::new(),
            timeframe: Timeframe::Hour1,
            start: None,
            end: None,
        }
    }
}

impl Params for DataSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if let (Some(start), Some(end)) = (self.start, self.end) {
            if end < start {
                return Err(ConfigError::Invalid(format!(
                    "data.end {end} is before data.start {start}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::from_toml_str;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults_are_valid() {
        let mut config = AppConfig::default();
        assert!(config.resolve().is_ok());
        assert_eq!(config.backtest.initial_capital, dec!(10000));
    }

    #[test]
    fn test_partial_toml() {
        let config = from_toml_str(
            r#"
            [data]
            symbols = ["BTC", "ETH"]
            timeframe = "4h"
            start = "2024-01-01"

            [backtest]
            initial_capital = 25000
            cooldown_bars = 3

            [backtest.strategy.scorer]
            min_score = 6.0
            "#,
        )
        .unwrap();
        assert_eq!(config.data.timeframe, Timeframe::Hour4);
        assert_eq!(config.data.symbols.len(), 2);
        assert_eq!(config.backtest.initial_capital, dec!(25000));
        assert_eq!(config.backtest.cooldown_bars, 3);
        assert_eq!(config.backtest.strategy.scorer.min_score, 6.0);
        // Untouched keys keep their defaults.
        assert_eq!(config.backtest.strategy.scorer.min_confidence, 0.4);
    }

    #[test]
    fn test_preset_with_overrides() {
        let config = from_toml_str(
            r#"
            preset = "aggressive"

            [preset_overrides.scorer]
            min_score = 4.5
            "#,
        )
        .unwrap();
        assert_eq!(config.backtest.strategy.scorer.min_score, 4.5);
        assert_eq!(config.backtest.strategy.scorer.thresholds.rsi_oversold, 35.0);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = from_toml_str(
            r#"
            [backtest.risk.levels]
            stop_atr_multiplier = -1.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(ConfigError::OutOfRange { .. })));

        let err = from_toml_str("preset = \"yolo\"").unwrap_err();
        assert!(matches!(err, SettingsError::Invalid(ConfigError::UnknownPreset(_))));
    }

    #[test]
    fn test_shipped_defaults_match_built_in() {
        let config = from_toml_str(include_str!("../../../config/default.toml")).unwrap();
        assert_eq!(config.backtest, BacktestConfig::default());
        assert_eq!(config.data, DataSettings::default());
        assert_eq!(config.walk_forward.grid.len(), 9);
        assert_eq!(config.walk_forward.lookback_bars, 300);
    }

    #[test]
    fn test_round_trip_render() {
        let config = AppConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[backtest.risk.levels]"));
        let parsed = from_toml_str(&rendered).unwrap();
        assert_eq!(parsed.backtest, config.backtest);
    }
}
