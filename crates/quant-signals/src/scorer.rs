//! Composite signal scoring and the gates in front of it.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{Direction, MarketRegime, Reason, RuleCategory, Signal};
use quant_indicators::{Field, IndicatorFrame};
use serde::{Deserialize, Serialize};

use crate::regime::RegimeReading;
use crate::rules::{self, RuleThresholds, RuleWeights};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScorerConfig {
    pub weights: RuleWeights,
    pub thresholds: RuleThresholds,
    pub min_score: f64,
    pub min_confidence: f64,
    /// Distinct categories required. 0 disables the check.
    pub min_categories: usize,
    /// Suppress signals against a confidently classified trend.
    pub counter_trend_forbidden: bool,
    pub gate_confidence: f64,
    /// Regimes in which nothing is emitted.
    pub blocked_regimes: Vec<MarketRegime>,
    /// ATR as a percent of close, lower admission bound.
    pub min_atr_pct: Option<f64>,
    pub max_atr_pct: Option<f64>,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            weights: RuleWeights::default(),
            thresholds: RuleThresholds::default(),
            min_score: 5.0,
            min_confidence: 0.4,
            min_categories: 2,
            counter_trend_forbidden: true,
            gate_confidence: 0.5,
            blocked_regimes: Vec::new(),
            min_atr_pct: None,
            max_atr_pct: None,
        }
    }
}

impl Params for ScorerConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        ensure(
            self.min_score.is_finite() && self.min_score >= 0.0,
            "scorer.min_score",
            self.min_score,
            ">= 0",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.min_confidence),
            "scorer.min_confidence",
            self.min_confidence,
            "in [0, 1]",
        )?;
        ensure(
            self.min_categories <= RuleCategory::all().len(),
            "scorer.min_categories",
            self.min_categories,
            "<= 5",
        )?;
        ensure(
            (0.0..=1.0).contains(&self.gate_confidence),
            "scorer.gate_confidence",
            self.gate_confidence,
            "in [0, 1]",
        )?;
        if let Some(min) = self.min_atr_pct {
            ensure(min >= 0.0, "scorer.min_atr_pct", min, ">= 0")?;
        }
        if let (Some(min), Some(max)) = (self.min_atr_pct, self.max_atr_pct) {
            ensure(max > min, "scorer.max_atr_pct", max, "> min_atr_pct")?;
        }
        Ok(())
    }
}

/// Points collected by one direction on one bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SideScore {
    pub score: f64,
    pub categories: Vec<RuleCategory>,
    pub reasons: Vec<Reason>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreCard {
    pub long: SideScore,
    pub short: SideScore,
    /// Direction zeroed by the counter-trend gate.
    pub suppressed: Option<Direction>,
}

impl ScoreCard {
    pub fn side(&self, direction: Direction) -> &SideScore {
        match direction {
            Direction::Long => &self.long,
            Direction::Short => &self.short,
        }
    }
}

/// Outcome of evaluating one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Emit(Signal),
    /// Bar is inside warm-up.
    NotReady,
    Blocked(MarketRegime),
    OutsideVolatilityBand,
    NoCandidate,
    Tie,
    BelowThreshold {
        direction: Direction,
        score: f64,
        categories: usize,
        confidence: f64,
    },
}

impl Decision {
    /// A direction won the comparison, whether or not it was emitted.
    pub fn is_candidate(&self) -> bool {
        matches!(self, Decision::Emit(_) | Decision::BelowThreshold { .. })
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            Decision::Emit(signal) => Some(signal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SignalScorer {
    config: ScorerConfig,
    max_score: f64,
}

impl SignalScorer {
    pub fn new(config: ScorerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let max_score = config.weights.max_score();
        Ok(Self { config, max_score })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    pub fn max_score(&self) -> f64 {
        self.max_score
    }

    /// Score both directions and apply the counter-trend gate.
    pub fn score(&self, frame: &IndicatorFrame, i: usize, regime: &RegimeReading) -> ScoreCard {
        let mut card = ScoreCard::default();
        let hits = rules::evaluate(
            frame,
            i,
            regime,
            &self.config.weights,
            &self.config.thresholds,
        );
        for hit in hits {
            let side = match hit.direction {
                Direction::Long => &mut card.long,
                Direction::Short => &mut card.short,
            };
            side.score += hit.points;
            side.categories.push(hit.category);
            side.reasons.extend(hit.reasons);
        }

        if self.config.counter_trend_forbidden && regime.confidence >= self.config.gate_confidence {
            if let Some(bias) = regime.regime.bias() {
                let against = bias.opposite();
                match against {
                    Direction::Long => card.long = SideScore::default(),
                    Direction::Short => card.short = SideScore::default(),
                }
                card.suppressed = Some(against);
            }
        }
        card
    }

    pub fn evaluate(
        &self,
        symbol: &str,
        frame: &IndicatorFrame,
        i: usize,
        regime: &RegimeReading,
    ) -> Decision {
        let Some(bar) = frame.bar(i).filter(|_| frame.is_ready(i)) else {
            return Decision::NotReady;
        };
        if self.config.blocked_regimes.contains(&regime.regime) {
            return Decision::Blocked(regime.regime);
        }
        if !self.volatility_admits(frame, i, bar.close) {
            return Decision::OutsideVolatilityBand;
        }

        let card = self.score(frame, i, regime);
        let direction = if card.long.score > card.short.score {
            Direction::Long
        } else if card.short.score > card.long.score {
            Direction::Short
        } else if card.long.score > 0.0 {
            return Decision::Tie;
        } else {
            return Decision::NoCandidate;
        };

        let side = card.side(direction);
        let confidence = (side.score / self.max_score).clamp(0.0, 1.0);
        let categories = side.categories.len();
        let passes = side.score >= self.config.min_score
            && (self.config.min_categories == 0 || categories >= self.config.min_categories)
            && confidence >= self.config.min_confidence;
        if !passes {
            return Decision::BelowThreshold {
                direction,
                score: side.score,
                categories,
                confidence,
            };
        }

        Decision::Emit(Signal {
            symbol: symbol.to_string(),
            index: i,
            timestamp: bar.timestamp,
            direction,
            confidence,
            score: side.score,
            reasons: side.reasons.clone(),
            reference_price: bar.close,
            regime: regime.regime,
        })
    }

    fn volatility_admits(&self, frame: &IndicatorFrame, i: usize, close: f64) -> bool {
        if self.config.min_atr_pct.is_none() && self.config.max_atr_pct.is_none() {
            return true;
        }
        let Some(atr) = frame.get(Field::Atr, i) else {
            return false;
        };
        let pct = atr / close * 100.0;
        self.config.min_atr_pct.map_or(true, |min| pct >= min)
            && self.config.max_atr_pct.map_or(true, |max| pct <= max)
    }
}
