//! Market regime labels.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Direction;

/// Prevailing market state for one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MarketRegime {
    StrongUptrend,
    Uptrend,
    #[default]
    Neutral,
    Downtrend,
    StrongDowntrend,
    Ranging,
    Volatile,
}

impl MarketRegime {
    /// Directional bias, if the regime has one.
    pub fn bias(&self) -> Option<Direction> {
        match self {
            MarketRegime::StrongUptrend | MarketRegime::Uptrend => Some(Direction::Long),
            MarketRegime::StrongDowntrend | MarketRegime::Downtrend => Some(Direction::Short),
            _ => None,
        }
    }

    pub fn is_strong(&self) -> bool {
        matches!(self, MarketRegime::StrongUptrend | MarketRegime::StrongDowntrend)
    }
}

impl fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MarketRegime::StrongUptrend => "STRONG_UPTREND",
            MarketRegime::Uptrend => "UPTREND",
            MarketRegime::Neutral => "NEUTRAL",
            MarketRegime::Downtrend => "DOWNTREND",
            MarketRegime::StrongDowntrend => "STRONG_DOWNTREND",
            MarketRegime::Ranging => "RANGING",
            MarketRegime::Volatile => "VOLATILE",
        };
        f.write_str(s)
    }
}
