//! Market regime classification.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::MarketRegime;
use quant_indicators::{Field, IndicatorFrame};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeConfig {
    /// Vote weight of the fast/mid/slow EMA ordering.
    pub ema_order_weight: f64,
    /// Vote weight of close versus the long EMA.
    pub price_position_weight: f64,
    /// |trend vote| at or above this is a strong trend.
    pub strong_threshold: f64,
    /// |trend vote| at or above this is a trend.
    pub trend_threshold: f64,
    /// ATR / long-run ATR at or above this is volatile.
    pub volatile_ratio: f64,
    /// ATR / long-run ATR at or below this, without a trend, is ranging.
    pub ranging_ratio: f64,
    /// Timeframes (base included) that must agree before a non-neutral label.
    pub min_aligned_timeframes: usize,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            ema_order_weight: 0.6,
            price_position_weight: 0.4,
            strong_threshold: 0.9,
            trend_threshold: 0.5,
            volatile_ratio: 2.0,
            ranging_ratio: 0.8,
            min_aligned_timeframes: 1,
        }
    }
}

impl Params for RegimeConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.ema_order_weight >= 0.0,
            "regime.ema_order_weight",
            self.ema_order_weight,
            ">= 0",
        )?;
        ensure(
            self.price_position_weight >= 0.0,
            "regime.price_position_weight",
            self.price_position_weight,
            ">= 0",
        )?;
        ensure(
            self.ema_order_weight + self.price_position_weight > 0.0,
            "regime.ema_order_weight + regime.price_position_weight",
            self.ema_order_weight + self.price_position_weight,
            "> 0",
        )?;
        ensure(
            self.trend_threshold > 0.0 && self.trend_threshold <= self.strong_threshold,
            "regime.trend_threshold",
            self.trend_threshold,
            "in (0, strong_threshold]",
        )?;
        ensure(
            self.strong_threshold <= 1.0,
            "regime.strong_threshold",
            self.strong_threshold,
            "<= 1",
        )?;
        ensure(
            self.ranging_ratio > 0.0 && self.ranging_ratio < self.volatile_ratio,
            "regime.ranging_ratio",
            self.ranging_ratio,
            "in (0, volatile_ratio)",
        )?;
        ensure(
            self.min_aligned_timeframes >= 1,
            "regime.min_aligned_timeframes",
            self.min_aligned_timeframes,
            ">= 1",
        )
    }
}

/// What the classifier reads from one timeframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeInputs {
    pub close: f64,
    pub ema_fast: f64,
    pub ema_mid: f64,
    pub ema_slow: f64,
    pub ema_long: f64,
    pub atr: Option<f64>,
    pub atr_baseline: Option<f64>,
}

impl RegimeInputs {
    /// `None` while any EMA is unavailable.
    pub fn from_frame(frame: &IndicatorFrame, index: usize) -> Option<Self> {
        Some(Self {
            close: frame.bar(index)?.close,
            ema_fast: frame.get(Field::EmaFast, index)?,
            ema_mid: frame.get(Field::EmaMid, index)?,
            ema_slow: frame.get(Field::EmaSlow, index)?,
            ema_long: frame.get(Field::EmaLong, index)?,
            atr: frame.get(Field::Atr, index),
            atr_baseline: frame.get(Field::AtrBaseline, index),
        })
    }

    fn volatility_ratio(&self) -> Option<f64> {
        match (self.atr, self.atr_baseline) {
            (Some(atr), Some(base)) if base > 0.0 => Some(atr / base),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeReading {
    pub regime: MarketRegime,
    pub confidence: f64,
}

impl RegimeReading {
    pub fn neutral() -> Self {
        Self {
            regime: MarketRegime::Neutral,
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    config: RegimeConfig,
}

fn sign_of(ordering: bool, reverse: bool) -> f64 {
    if ordering {
        1.0
    } else if reverse {
        -1.0
    } else {
        0.0
    }
}

impl RegimeClassifier {
    pub fn new(config: RegimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RegimeConfig {
        &self.config
    }

    /// Weighted trend vote in [-1, 1].
    pub fn trend_vote(&self, x: &RegimeInputs) -> f64 {
        let order = sign_of(
            x.ema_fast > x.ema_mid && x.ema_mid > x.ema_slow,
            x.ema_fast < x.ema_mid && x.ema_mid < x.ema_slow,
        );
        let position = sign_of(x.close > x.ema_long, x.close < x.ema_long);
        let c = &self.config;
        (c.ema_order_weight * order + c.price_position_weight * position)
            / (c.ema_order_weight + c.price_position_weight)
    }

    /// Label for a single timeframe.
    pub fn classify_one(&self, x: &RegimeInputs) -> RegimeReading {
        let c = &self.config;
        let vote = self.trend_vote(x);
        let strength = vote.abs();
        let ratio = x.volatility_ratio();

        let (regime, confidence) = match ratio {
            Some(r) if r >= c.volatile_ratio => (
                MarketRegime::Volatile,
                0.5 + 0.5 * (r / c.volatile_ratio - 1.0).clamp(0.0, 1.0),
            ),
            _ if strength >= c.strong_threshold => (
                if vote > 0.0 {
                    MarketRegime::StrongUptrend
                } else {
                    MarketRegime::StrongDowntrend
                },
                strength,
            ),
            _ if strength >= c.trend_threshold => (
                if vote > 0.0 {
                    MarketRegime::Uptrend
                } else {
                    MarketRegime::Downtrend
                },
                strength,
            ),
            Some(r) if r <= c.ranging_ratio => (
                MarketRegime::Ranging,
                0.5 + 0.5 * (1.0 - r / c.ranging_ratio).clamp(0.0, 1.0),
            ),
            _ => (MarketRegime::Neutral, 1.0 - strength),
        };

        RegimeReading {
            regime,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    /// Combine the base timeframe (first) with any higher timeframes.
    ///
    /// A non-neutral base label survives only when at least
    /// `min_aligned_timeframes` readings agree with it: same bias for
    /// directional labels, same label otherwise. Confidence is the mean of
    /// the agreeing readings.
    pub fn classify(&self, timeframes: &[RegimeInputs]) -> RegimeReading {
        let readings: Vec<RegimeReading> = timeframes.iter().map(|x| self.classify_one(x)).collect();
        self.combine(&readings)
    }

    pub fn combine(&self, readings: &[RegimeReading]) -> RegimeReading {
        let Some(base) = readings.first() else {
            return RegimeReading::neutral();
        };
        if base.regime == MarketRegime::Neutral {
            return *base;
        }

        let agreeing: Vec<&RegimeReading> = readings
            .iter()
            .filter(|r| match base.regime.bias() {
                Some(direction) => r.regime.bias() == Some(direction),
                None => r.regime == base.regime,
            })
            .collect();

        if agreeing.len() < self.config.min_aligned_timeframes {
            return RegimeReading::neutral();
        }

        RegimeReading {
            regime: base.regime,
            confidence: agreeing.iter().map(|r| r.confidence).sum::<f64>() / agreeing.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(close: f64, emas: [f64; 4], atr: f64, baseline: f64) -> RegimeInputs {
        RegimeInputs {
            close,
            ema_fast: emas[0],
            ema_mid: emas[1],
            ema_slow: emas[2],
            ema_long: emas[3],
            atr: Some(atr),
            atr_baseline: Some(baseline),
        }
    }

    fn classifier() -> RegimeClassifier {
        RegimeClassifier::new(RegimeConfig::default()).unwrap()
    }

    #[test]
    fn test_strong_trends() {
        let c = classifier();
        let up = c.classify_one(&inputs(110.0, [108.0, 105.0, 100.0, 95.0], 1.0, 1.0));
        assert_eq!(up.regime, MarketRegime::StrongUptrend);
        assert!((up.confidence - 1.0).abs() < 1e-12);

        let down = c.classify_one(&inputs(90.0, [92.0, 95.0, 100.0, 105.0], 1.0, 1.0));
        assert_eq!(down.regime, MarketRegime::StrongDowntrend);
    }

    #[test]
    fn test_ordering_alone_is_plain_trend() {
        // Ordering bullish (0.6) but price under the long EMA (-0.4): vote 0.2.
        let c = classifier();
        let r = c.classify_one(&inputs(94.0, [108.0, 105.0, 100.0, 95.0], 1.0, 1.0));
        assert_eq!(r.regime, MarketRegime::Neutral);

        // Ordering bullish, price exactly on the long EMA: vote 0.6.
        let r = c.classify_one(&inputs(95.0, [108.0, 105.0, 100.0, 95.0], 1.0, 1.0));
        assert_eq!(r.regime, MarketRegime::Uptrend);
        assert!((r.confidence - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_volatility_overrides_trend() {
        let c = classifier();
        let r = c.classify_one(&inputs(110.0, [108.0, 105.0, 100.0, 95.0], 3.0, 1.0));
        assert_eq!(r.regime, MarketRegime::Volatile);
        assert!((r.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_quiet_trendless_market_is_ranging() {
        let c = classifier();
        let r = c.classify_one(&inputs(100.0, [100.0, 101.0, 99.0, 100.0], 0.4, 1.0));
        assert_eq!(r.regime, MarketRegime::Ranging);
        assert!((r.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_missing_baseline_skips_volatility_checks() {
        let c = classifier();
        let mut x = inputs(100.0, [100.0, 101.0, 99.0, 100.0], 0.4, 1.0);
        x.atr_baseline = None;
        assert_eq!(c.classify_one(&x).regime, MarketRegime::Neutral);
    }

    #[test]
    fn test_alignment_requirement() {
        let config = RegimeConfig {
            min_aligned_timeframes: 2,
            ..RegimeConfig::default()
        };
        let c = RegimeClassifier::new(config).unwrap();
        let bull = inputs(110.0, [108.0, 105.0, 100.0, 95.0], 1.0, 1.0);
        let weak_bull = inputs(95.0, [108.0, 105.0, 100.0, 95.0], 1.0, 1.0);
        let bear = inputs(90.0, [92.0, 95.0, 100.0, 105.0], 1.0, 1.0);

        let aligned = c.classify(&[bull, weak_bull]);
        assert_eq!(aligned.regime, MarketRegime::StrongUptrend);
        assert!((aligned.confidence - 0.8).abs() < 1e-12);

        let conflicted = c.classify(&[bull, bear]);
        assert_eq!(conflicted, RegimeReading::neutral());

        // Not enough timeframes available at all.
        assert_eq!(c.classify(&[bull]), RegimeReading::neutral());
        assert_eq!(c.classify(&[]), RegimeReading::neutral());
    }

    #[test]
    fn test_invalid_config() {
        let bad = RegimeConfig {
            ranging_ratio: 3.0,
            ..RegimeConfig::default()
        };
        assert!(RegimeClassifier::new(bad).is_err());
        let bad = RegimeConfig {
            min_aligned_timeframes: 0,
            ..RegimeConfig::default()
        };
        assert!(RegimeClassifier::new(bad).is_err());
    }
}
