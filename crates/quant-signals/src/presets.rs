//! Named parameter presets.

use quant_core::error::ConfigError;
use quant_core::traits::Params;
use quant_core::types::MarketRegime;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::params::StrategyParams;
use crate::regime::RegimeConfig;
use crate::rules::RuleThresholds;
use crate::scorer::ScorerConfig;

/// A registered preset.
#[derive(Debug, Clone, Serialize)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub params: StrategyParams,
}

/// Registry of built-in presets, keyed by name.
pub struct PresetRegistry {
    presets: BTreeMap<String, PresetInfo>,
}

fn conservative() -> StrategyParams {
    StrategyParams {
        regime: RegimeConfig {
            volatile_ratio: 1.8,
            ..RegimeConfig::default()
        },
        scorer: ScorerConfig {
            min_score: 6.0,
            min_confidence: 0.55,
            min_categories: 3,
            blocked_regimes: vec![MarketRegime::Volatile, MarketRegime::Ranging],
            ..ScorerConfig::default()
        },
        ..StrategyParams::default()
    }
}

fn aggressive() -> StrategyParams {
    StrategyParams {
        scorer: ScorerConfig {
            thresholds: RuleThresholds {
                rsi_oversold: 35.0,
                rsi_overbought: 65.0,
                volume_surge: 1.3,
                ..RuleThresholds::default()
            },
            min_score: 4.0,
            min_confidence: 0.3,
            ..ScorerConfig::default()
        },
        ..StrategyParams::default()
    }
}

/// Recursively overlay `patch` onto `base`. Objects merge key by key,
/// anything else replaces.
fn merge(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

impl PresetRegistry {
    pub fn new() -> Self {
        let mut presets = BTreeMap::new();
        for (name, description, params) in [
            (
                "balanced",
                "Default weights: score 5 of 11 across two categories, counter-trend suppressed",
                StrategyParams::default(),
            ),
            (
                "conservative",
                "Three categories and score 6, no trading in volatile or ranging regimes",
                conservative(),
            ),
            (
                "aggressive",
                "Looser RSI and volume thresholds, score 4 is enough",
                aggressive(),
            ),
        ] {
            presets.insert(
                name.to_string(),
                PresetInfo {
                    name: name.to_string(),
                    description: description.to_string(),
                    params,
                },
            );
        }
        Self { presets }
    }

    /// Presets in name order.
    pub fn list(&self) -> Vec<&PresetInfo> {
        self.presets.values().collect()
    }

    pub fn get(&self, name: &str) -> Option<&PresetInfo> {
        self.presets.get(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// Preset parameters with JSON overrides applied, validated.
    pub fn create(
        &self,
        name: &str,
        overrides: Option<serde_json::Value>,
    ) -> Result<StrategyParams, ConfigError> {
        let info = self
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))?;
        let params = match overrides {
            None => info.params.clone(),
            Some(patch) => {
                let mut value = serde_json::to_value(&info.params)
                    .map_err(|e| ConfigError::Invalid(e.to_string()))?;
                merge(&mut value, patch);
                serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?
            }
        };
        params.validate()?;
        Ok(params)
    }

    pub fn create_default(&self, name: &str) -> Result<StrategyParams, ConfigError> {
        self.create(name, None)
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = PresetRegistry::new();
        assert_eq!(registry.list().len(), 3);
        assert_eq!(registry.names(), vec!["aggressive", "balanced", "conservative"]);
    }

    #[test]
    fn test_registry_get() {
        let registry = PresetRegistry::new();
        assert!(registry.get("balanced").is_some());
        assert!(registry.get("unknown").is_none());
        assert!(registry.exists("conservative"));
    }

    #[test]
    fn test_every_preset_validates() {
        let registry = PresetRegistry::new();
        for name in registry.names() {
            assert!(registry.create_default(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn test_create_with_overrides() {
        let registry = PresetRegistry::new();
        let overrides = serde_json::json!({
            "scorer": { "min_score": 7.5, "thresholds": { "rsi_oversold": 25.0 } },
            "indicators": { "rsi_period": 10 }
        });
        let params = registry.create("conservative", Some(overrides)).unwrap();
        assert_eq!(params.scorer.min_score, 7.5);
        assert_eq!(params.scorer.thresholds.rsi_oversold, 25.0);
        // Untouched preset values survive the merge.
        assert_eq!(params.scorer.min_categories, 3);
        assert_eq!(params.scorer.thresholds.rsi_overbought, 70.0);
        assert_eq!(params.indicators.rsi_period, 10);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let registry = PresetRegistry::new();
        let overrides = serde_json::json!({ "scorer": { "min_confidence": 2.0 } });
        assert!(matches!(
            registry.create("balanced", Some(overrides)),
            Err(ConfigError::OutOfRange { .. })
        ));
        let overrides = serde_json::json!({ "scorer": { "min_score": "high" } });
        assert!(matches!(
            registry.create("balanced", Some(overrides)),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_create_unknown_preset() {
        let registry = PresetRegistry::new();
        assert!(matches!(
            registry.create_default("nonexistent"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }
}
