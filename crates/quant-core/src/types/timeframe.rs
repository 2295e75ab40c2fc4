//! Bar timeframes and bucket arithmetic.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nominal duration of one bar.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    #[default]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
    /// Calendar month. Approximated as 30 days and never used as an
    /// aggregation target.
    #[serde(rename = "1M")]
    Monthly,
}

const MINUTE_MS: i64 = 60_000;

impl Timeframe {
    /// Duration in milliseconds.
    pub fn as_millis(&self) -> i64 {
        match self {
            Timeframe::Minute1 => MINUTE_MS,
            Timeframe::Minute5 => 5 * MINUTE_MS,
            Timeframe::Minute15 => 15 * MINUTE_MS,
            Timeframe::Minute30 => 30 * MINUTE_MS,
            Timeframe::Hour1 => 60 * MINUTE_MS,
            Timeframe::Hour4 => 240 * MINUTE_MS,
            Timeframe::Daily => 1_440 * MINUTE_MS,
            Timeframe::Weekly => 7 * 1_440 * MINUTE_MS,
            Timeframe::Monthly => 30 * 1_440 * MINUTE_MS,
        }
    }

    pub fn is_intraday(&self) -> bool {
        self.as_millis() < Timeframe::Daily.as_millis()
    }

    /// Start of the bucket of this timeframe containing `timestamp` (ms, UTC aligned).
    pub fn bucket_start(&self, timestamp: i64) -> i64 {
        timestamp - timestamp.rem_euclid(self.as_millis())
    }

    /// Whether bars of `self` can be bucketed into bars of `target`.
    pub fn can_aggregate_to(&self, target: Timeframe) -> bool {
        target != Timeframe::Monthly
            && target.as_millis() > self.as_millis()
            && target.as_millis() % self.as_millis() == 0
    }

    /// Number of bars of this timeframe in a 365-day year.
    pub fn bars_per_year(&self) -> f64 {
        (365 * 1_440 * MINUTE_MS) as f64 / self.as_millis() as f64
    }

    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Minute1,
            Timeframe::Minute5,
            Timeframe::Minute15,
            Timeframe::Minute30,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Daily,
            Timeframe::Weekly,
            Timeframe::Monthly,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
            Timeframe::Monthly => "1M",
        };
        f.write_str(s)
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" is month, "1m" is minute; only then fold case.
        if s == "1M" {
            return Ok(Timeframe::Monthly);
        }
        match s.to_lowercase().as_str() {
            "1m" | "1min" | "minute" => Ok(Timeframe::Minute1),
            "5m" | "5min" => Ok(Timeframe::Minute5),
            "15m" | "15min" => Ok(Timeframe::Minute15),
            "30m" | "30min" => Ok(Timeframe::Minute30),
            "1h" | "60m" | "hour" | "hourly" => Ok(Timeframe::Hour1),
            "4h" | "240m" => Ok(Timeframe::Hour4),
            "1d" | "day" | "daily" => Ok(Timeframe::Daily),
            "1w" | "week" | "weekly" => Ok(Timeframe::Weekly),
            "month" | "monthly" => Ok(Timeframe::Monthly),
            _ => Err(format!("Invalid timeframe: {}", s)),
        }
    }
}
