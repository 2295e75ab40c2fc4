//! Directional signals emitted by the scorer.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::MarketRegime;

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

/// Independent families of scoring rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Extremity,
    Momentum,
    Trend,
    Volume,
    Structure,
}

impl RuleCategory {
    pub fn all() -> &'static [RuleCategory] {
        &[
            RuleCategory::Extremity,
            RuleCategory::Momentum,
            RuleCategory::Trend,
            RuleCategory::Volume,
            RuleCategory::Structure,
        ]
    }
}

/// Why a rule contributed points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    RsiOversold,
    RsiOverbought,
    LowerBandTouch,
    UpperBandTouch,
    MacdBullishCross,
    MacdBearishCross,
    HistogramPositive,
    HistogramNegative,
    BullishDivergence,
    BearishDivergence,
    TrendAligned,
    StrongTrendAligned,
    VolumeSurge,
    NearSupport,
    NearResistance,
}

impl Reason {
    pub fn category(&self) -> RuleCategory {
        match self {
            Reason::RsiOversold
            | Reason::RsiOverbought
            | Reason::LowerBandTouch
            | Reason::UpperBandTouch => RuleCategory::Extremity,
            Reason::MacdBullishCross
            | Reason::MacdBearishCross
            | Reason::HistogramPositive
            | Reason::HistogramNegative
            | Reason::BullishDivergence
            | Reason::BearishDivergence => RuleCategory::Momentum,
            Reason::TrendAligned | Reason::StrongTrendAligned => RuleCategory::Trend,
            Reason::VolumeSurge => RuleCategory::Volume,
            Reason::NearSupport | Reason::NearResistance => RuleCategory::Structure,
        }
    }
}

/// A scored directional call on one bar. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    /// Index of the bar the signal was computed on.
    pub index: usize,
    pub timestamp: i64,
    pub direction: Direction,
    /// score / theoretical maximum, in [0, 1].
    pub confidence: f64,
    pub score: f64,
    pub reasons: Vec<Reason>,
    /// Bar close at signal time.
    pub reference_price: f64,
    pub regime: MarketRegime,
}

impl Signal {
    pub fn is_long(&self) -> bool {
        self.direction == Direction::Long
    }

    /// Number of distinct rule categories among the reasons.
    pub fn category_count(&self) -> usize {
        let mut categories: Vec<RuleCategory> = self.reasons.iter().map(|r| r.category()).collect();
        categories.sort();
        categories.dedup();
        categories.len()
    }
}
