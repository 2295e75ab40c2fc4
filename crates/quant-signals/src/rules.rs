//! Scoring rules, one per category.
//!
//! Each rule looks at a single bar and either fires for one direction with a
//! bounded number of points or stays silent. A category whose sub-rules
//! disagree on direction is silent for that bar.

use quant_core::error::ConfigError;
use quant_core::traits::{ensure, Params};
use quant_core::types::{Direction, Reason, RuleCategory};
use quant_indicators::{Field, IndicatorFrame};
use serde::{Deserialize, Serialize};

use crate::regime::RegimeReading;

/// Points awarded per rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleWeights {
    pub rsi_extreme: f64,
    pub band_edge: f64,
    pub macd_cross: f64,
    pub histogram: f64,
    /// Price swing against the RSI swing.
    pub rsi_divergence: f64,
    pub strong_trend: f64,
    /// Share of `strong_trend` paid for a plain trend.
    pub weak_trend_factor: f64,
    pub volume_surge: f64,
    pub structure: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            rsi_extreme: 3.0,
            band_edge: 1.0,
            macd_cross: 1.5,
            histogram: 0.5,
            rsi_divergence: 1.0,
            strong_trend: 2.0,
            weak_trend_factor: 0.5,
            volume_surge: 1.0,
            structure: 1.0,
        }
    }
}

impl RuleWeights {
    /// Best score one direction can reach on a single bar.
    pub fn max_score(&self) -> f64 {
        self.rsi_extreme
            + self.band_edge
            + self.macd_cross
            + self.histogram
            + self.rsi_divergence
            + self.strong_trend
            + self.volume_surge
            + self.structure
    }
}

impl Params for RuleWeights {
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("rsi_extreme", self.rsi_extreme),
            ("band_edge", self.band_edge),
            ("macd_cross", self.macd_cross),
            ("histogram", self.histogram),
            ("rsi_divergence", self.rsi_divergence),
            ("strong_trend", self.strong_trend),
            ("volume_surge", self.volume_surge),
            ("structure", self.structure),
        ] {
            ensure(
                value.is_finite() && value >= 0.0,
                &format!("scorer.weights.{name}"),
                value,
                "finite and >= 0",
            )?;
        }
        ensure(
            (0.0..=1.0).contains(&self.weak_trend_factor),
            "scorer.weights.weak_trend_factor",
            self.weak_trend_factor,
            "in [0, 1]",
        )?;
        ensure(
            self.max_score() > 0.0,
            "scorer.weights",
            self.max_score(),
            "total > 0",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Band position at or below this (or at or above `1 - band_edge`) is a touch.
    pub band_edge: f64,
    pub volume_surge: f64,
    /// Max distance from a swing level, in ATRs.
    pub structure_atr_distance: f64,
    /// Bars searched for the two swings of a divergence, current bar included.
    pub divergence_lookback: usize,
    /// Bars on each side that confirm a divergence swing.
    pub divergence_strength: usize,
    /// Smallest price move between the swings, as a fraction of the first.
    pub divergence_min_price_move: f64,
    /// Smallest RSI move between the swings, in RSI points.
    pub divergence_min_rsi_move: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            band_edge: 0.05,
            volume_surge: 1.5,
            structure_atr_distance: 0.5,
            divergence_lookback: 20,
            divergence_strength: 3,
            divergence_min_price_move: 0.01,
            divergence_min_rsi_move: 3.0,
        }
    }
}

impl Params for RuleThresholds {
    fn validate(&self) -> Result<(), ConfigError> {
        ensure(
            self.rsi_oversold >= 0.0 && self.rsi_oversold < self.rsi_overbought,
            "scorer.thresholds.rsi_oversold",
            self.rsi_oversold,
            "in [0, rsi_overbought)",
        )?;
        ensure(
            self.rsi_overbought <= 100.0,
            "scorer.thresholds.rsi_overbought",
            self.rsi_overbought,
            "<= 100",
        )?;
        ensure(
            (0.0..0.5).contains(&self.band_edge),
            "scorer.thresholds.band_edge",
            self.band_edge,
            "in [0, 0.5)",
        )?;
        ensure(
            self.volume_surge > 0.0,
            "scorer.thresholds.volume_surge",
            self.volume_surge,
            "> 0",
        )?;
        ensure(
            self.structure_atr_distance >= 0.0,
            "scorer.thresholds.structure_atr_distance",
            self.structure_atr_distance,
            ">= 0",
        )?;
        ensure(
            self.divergence_strength >= 1,
            "scorer.thresholds.divergence_strength",
            self.divergence_strength,
            ">= 1",
        )?;
        ensure(
            self.divergence_lookback > 2 * self.divergence_strength + 1,
            "scorer.thresholds.divergence_lookback",
            self.divergence_lookback,
            "> 2 * divergence_strength + 1",
        )?;
        ensure(
            self.divergence_min_price_move >= 0.0,
            "scorer.thresholds.divergence_min_price_move",
            self.divergence_min_price_move,
            ">= 0",
        )?;
        ensure(
            self.divergence_min_rsi_move >= 0.0,
            "scorer.thresholds.divergence_min_rsi_move",
            self.divergence_min_rsi_move,
            ">= 0",
        )
    }
}

/// One category firing for one direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleHit {
    pub category: RuleCategory,
    pub direction: Direction,
    pub points: f64,
    pub reasons: Vec<Reason>,
}

/// Per-direction accumulator for a category with several sub-rules.
#[derive(Default)]
struct Votes {
    long: (f64, Vec<Reason>),
    short: (f64, Vec<Reason>),
}

impl Votes {
    fn add(&mut self, direction: Direction, points: f64, reason: Reason) {
        let side = match direction {
            Direction::Long => &mut self.long,
            Direction::Short => &mut self.short,
        };
        side.0 += points;
        side.1.push(reason);
    }

    fn resolve(self, category: RuleCategory) -> Option<RuleHit> {
        let (direction, (points, reasons)) = match (self.long.1.is_empty(), self.short.1.is_empty()) {
            (false, true) => (Direction::Long, self.long),
            (true, false) => (Direction::Short, self.short),
            // Silent, or sub-rules disagree.
            _ => return None,
        };
        Some(RuleHit {
            category,
            direction,
            points,
            reasons,
        })
    }
}

pub fn extremity(
    frame: &IndicatorFrame,
    i: usize,
    weights: &RuleWeights,
    thresholds: &RuleThresholds,
) -> Option<RuleHit> {
    let mut votes = Votes::default();
    if let Some(rsi) = frame.get(Field::Rsi, i) {
        if rsi <= thresholds.rsi_oversold {
            votes.add(Direction::Long, weights.rsi_extreme, Reason::RsiOversold);
        } else if rsi >= thresholds.rsi_overbought {
            votes.add(Direction::Short, weights.rsi_extreme, Reason::RsiOverbought);
        }
    }
    if let Some(position) = frame.get(Field::BbPosition, i) {
        if position <= thresholds.band_edge {
            votes.add(Direction::Long, weights.band_edge, Reason::LowerBandTouch);
        } else if position >= 1.0 - thresholds.band_edge {
            votes.add(Direction::Short, weights.band_edge, Reason::UpperBandTouch);
        }
    }
    votes.resolve(RuleCategory::Extremity)
}

/// Low, high and RSI of one bar in the divergence window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwingPoint {
    pub low: f64,
    pub high: f64,
    pub rsi: f64,
}

/// Indices of confirmed pivots: strictly beyond every neighbour within
/// `strength` bars on both sides.
fn pivots(points: &[SwingPoint], strength: usize, value: impl Fn(&SwingPoint) -> f64, below: bool) -> Vec<usize> {
    (strength..points.len().saturating_sub(strength))
        .filter(|&j| {
            let v = value(&points[j]);
            (j - strength..=j + strength)
                .filter(|&k| k != j)
                .all(|k| if below { v < value(&points[k]) } else { v > value(&points[k]) })
        })
        .collect()
}

/// Compare the last two confirmed swings of `points`, oldest first.
///
/// A lower low with a higher RSI is bullish; a higher high with a lower RSI
/// is bearish. Both moves must clear the configured minimums. Conflicting
/// divergences cancel.
pub fn divergence(points: &[SwingPoint], thresholds: &RuleThresholds) -> Option<Direction> {
    let strength = thresholds.divergence_strength;
    let last_two = |idx: Vec<usize>| -> Option<(SwingPoint, SwingPoint)> {
        match idx.as_slice() {
            [.., a, b] => Some((points[*a], points[*b])),
            _ => None,
        }
    };

    let bullish = last_two(pivots(points, strength, |p| p.low, true)).is_some_and(|(prev, now)| {
        now.low < prev.low
            && now.rsi > prev.rsi
            && (prev.low - now.low) / prev.low >= thresholds.divergence_min_price_move
            && now.rsi - prev.rsi >= thresholds.divergence_min_rsi_move
    });
    let bearish = last_two(pivots(points, strength, |p| p.high, false)).is_some_and(|(prev, now)| {
        now.high > prev.high
            && now.rsi < prev.rsi
            && (now.high - prev.high) / prev.high >= thresholds.divergence_min_price_move
            && prev.rsi - now.rsi >= thresholds.divergence_min_rsi_move
    });

    match (bullish, bearish) {
        (true, false) => Some(Direction::Long),
        (false, true) => Some(Direction::Short),
        _ => None,
    }
}

/// Swing points for the bars ending at `i`. Bars without an RSI break the
/// window, so only the defined tail is returned.
fn swing_window(frame: &IndicatorFrame, i: usize, lookback: usize) -> Vec<SwingPoint> {
    let start = (i + 1).saturating_sub(lookback);
    let mut points = Vec::with_capacity(lookback);
    for j in start..=i {
        match (frame.bar(j), frame.get(Field::Rsi, j)) {
            (Some(bar), Some(rsi)) => points.push(SwingPoint {
                low: bar.low,
                high: bar.high,
                rsi,
            }),
            _ => points.clear(),
        }
    }
    points
}

pub fn momentum(
    frame: &IndicatorFrame,
    i: usize,
    weights: &RuleWeights,
    thresholds: &RuleThresholds,
) -> Option<RuleHit> {
    let spread = |idx: usize| -> Option<f64> {
        Some(frame.get(Field::Macd, idx)? - frame.get(Field::MacdSignal, idx)?)
    };

    let cross = match (i.checked_sub(1).and_then(spread), spread(i)) {
        (Some(prev), Some(now)) if prev <= 0.0 && now > 0.0 => Some(Direction::Long),
        (Some(prev), Some(now)) if prev >= 0.0 && now < 0.0 => Some(Direction::Short),
        _ => None,
    };
    let histogram = frame.get(Field::MacdHist, i).and_then(|h| {
        if h > 0.0 {
            Some(Direction::Long)
        } else if h < 0.0 {
            Some(Direction::Short)
        } else {
            None
        }
    });

    let mut votes = Votes::default();
    if let Some(direction) = cross {
        let reason = match direction {
            Direction::Long => Reason::MacdBullishCross,
            Direction::Short => Reason::MacdBearishCross,
        };
        votes.add(direction, weights.macd_cross, reason);
    }
    if let Some(direction) = histogram {
        let reason = match direction {
            Direction::Long => Reason::HistogramPositive,
            Direction::Short => Reason::HistogramNegative,
        };
        votes.add(direction, weights.histogram, reason);
    }
    if frame.get(Field::Rsi, i).is_some() {
        let window = swing_window(frame, i, thresholds.divergence_lookback);
        if let Some(direction) = divergence(&window, thresholds) {
            let reason = match direction {
                Direction::Long => Reason::BullishDivergence,
                Direction::Short => Reason::BearishDivergence,
            };
            votes.add(direction, weights.rsi_divergence, reason);
        }
    }
    votes.resolve(RuleCategory::Momentum)
}

pub fn trend(regime: &RegimeReading, weights: &RuleWeights) -> Option<RuleHit> {
    let direction = regime.regime.bias()?;
    let (points, reason) = if regime.regime.is_strong() {
        (weights.strong_trend, Reason::StrongTrendAligned)
    } else {
        (weights.strong_trend * weights.weak_trend_factor, Reason::TrendAligned)
    };
    Some(RuleHit {
        category: RuleCategory::Trend,
        direction,
        points,
        reasons: vec![reason],
    })
}

pub fn volume(
    frame: &IndicatorFrame,
    i: usize,
    weights: &RuleWeights,
    thresholds: &RuleThresholds,
) -> Option<RuleHit> {
    let ratio = frame.get(Field::VolumeRatio, i)?;
    if ratio < thresholds.volume_surge {
        return None;
    }
    let bar = frame.bar(i)?;
    let direction = if bar.is_bullish() {
        Direction::Long
    } else if bar.is_bearish() {
        Direction::Short
    } else {
        return None;
    };
    Some(RuleHit {
        category: RuleCategory::Volume,
        direction,
        points: weights.volume_surge,
        reasons: vec![Reason::VolumeSurge],
    })
}

pub fn structure(
    frame: &IndicatorFrame,
    i: usize,
    weights: &RuleWeights,
    thresholds: &RuleThresholds,
) -> Option<RuleHit> {
    let atr = frame.get(Field::Atr, i).filter(|a| *a > 0.0)?;
    let close = frame.bar(i)?.close;
    let near = |distance: f64| distance / atr <= thresholds.structure_atr_distance;

    let support = frame
        .get(Field::Support, i)
        .map(|s| close - s)
        .filter(|d| near(*d));
    let resistance = frame
        .get(Field::Resistance, i)
        .map(|r| r - close)
        .filter(|d| near(*d));

    let (direction, reason) = match (support, resistance) {
        (Some(_), None) => (Direction::Long, Reason::NearSupport),
        (None, Some(_)) => (Direction::Short, Reason::NearResistance),
        (Some(s), Some(r)) if s < r => (Direction::Long, Reason::NearSupport),
        (Some(s), Some(r)) if r < s => (Direction::Short, Reason::NearResistance),
        _ => return None,
    };
    Some(RuleHit {
        category: RuleCategory::Structure,
        direction,
        points: weights.structure,
        reasons: vec![reason],
    })
}

/// All categories in a fixed order.
pub fn evaluate(
    frame: &IndicatorFrame,
    i: usize,
    regime: &RegimeReading,
    weights: &RuleWeights,
    thresholds: &RuleThresholds,
) -> Vec<RuleHit> {
    [
        extremity(frame, i, weights, thresholds),
        momentum(frame, i, weights, thresholds),
        trend(regime, weights),
        volume(frame, i, weights, thresholds),
        structure(frame, i, weights, thresholds),
    ]
    .into_iter()
    .flatten()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::types::{Bar, BarSeries, MarketRegime, Timeframe};
    use quant_indicators::{IndicatorPipeline, IndicatorSettings};

    const HOUR: i64 = 3_600_000;

    fn frame(closes: &[f64]) -> IndicatorFrame {
        let raw = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * HOUR, c - 0.2, c + 0.5, c - 0.5, c, 1000.0));
        let series = BarSeries::ingest("TEST", Timeframe::Hour1, raw).0;
        IndicatorPipeline::new(IndicatorSettings::default())
            .unwrap()
            .compute(&series)
    }

    #[test]
    fn test_max_score_default() {
        assert!((RuleWeights::default().max_score() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_trend_points() {
        let w = RuleWeights::default();
        let strong = RegimeReading {
            regime: MarketRegime::StrongDowntrend,
            confidence: 1.0,
        };
        let hit = trend(&strong, &w).unwrap();
        assert_eq!(hit.direction, Direction::Short);
        assert_eq!(hit.points, 2.0);
        assert_eq!(hit.reasons, vec![Reason::StrongTrendAligned]);

        let plain = RegimeReading {
            regime: MarketRegime::Uptrend,
            confidence: 0.6,
        };
        assert_eq!(trend(&plain, &w).unwrap().points, 1.0);

        let ranging = RegimeReading {
            regime: MarketRegime::Ranging,
            confidence: 0.9,
        };
        assert!(trend(&ranging, &w).is_none());
    }

    #[test]
    fn test_conflicting_subrules_cancel() {
        let mut votes = Votes::default();
        votes.add(Direction::Long, 3.0, Reason::RsiOversold);
        votes.add(Direction::Short, 1.0, Reason::UpperBandTouch);
        assert!(votes.resolve(RuleCategory::Extremity).is_none());

        let mut votes = Votes::default();
        votes.add(Direction::Long, 3.0, Reason::RsiOversold);
        votes.add(Direction::Long, 1.0, Reason::LowerBandTouch);
        let hit = votes.resolve(RuleCategory::Extremity).unwrap();
        assert_eq!(hit.points, 4.0);
        assert_eq!(hit.reasons, vec![Reason::RsiOversold, Reason::LowerBandTouch]);
    }

    #[test]
    fn test_rules_silent_during_warmup() {
        let closes: Vec<f64> = (0..150).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let f = frame(&closes);
        let w = RuleWeights::default();
        let t = RuleThresholds::default();
        for i in 0..f.warmup() {
            assert!(extremity(&f, i, &w, &t).is_none());
            assert!(momentum(&f, i, &w, &t).is_none());
            assert!(volume(&f, i, &w, &t).is_none());
            assert!(structure(&f, i, &w, &t).is_none());
        }
    }

    #[test]
    fn test_steady_rally_is_overbought() {
        let closes: Vec<f64> = (0..120).map(|i| 100.0 + i as f64).collect();
        let f = frame(&closes);
        let hit = extremity(&f, 119, &RuleWeights::default(), &RuleThresholds::default()).unwrap();
        assert_eq!(hit.direction, Direction::Short);
        assert!(hit.reasons.contains(&Reason::RsiOverbought));
    }

    #[test]
    fn test_each_category_fires_at_most_once() {
        let closes: Vec<f64> = (0..200).map(|i| 100.0 + (i as f64 * 0.2).sin() * 8.0).collect();
        let f = frame(&closes);
        let regime = RegimeReading {
            regime: MarketRegime::Uptrend,
            confidence: 0.7,
        };
        for i in f.ready_range() {
            let hits = evaluate(&f, i, &regime, &RuleWeights::default(), &RuleThresholds::default());
            for &category in RuleCategory::all() {
                assert!(hits.iter().filter(|h| h.category == category).count() <= 1);
            }
        }
    }

    fn swings(lows_rsi: &[(f64, f64)]) -> Vec<SwingPoint> {
        lows_rsi
            .iter()
            .map(|&(low, rsi)| SwingPoint {
                low,
                high: low + 1.0,
                rsi,
            })
            .collect()
    }

    #[test]
    fn test_bullish_divergence() {
        let t = RuleThresholds::default();
        // Sharp sell-off to 90 with RSI 20, bounce, then a slow grind to a
        // lower low at 88 with RSI back at 31, confirmed by three higher bars.
        let points = swings(&[
            (96.0, 40.0),
            (94.0, 32.0),
            (92.0, 25.0),
            (90.0, 20.0),
            (92.5, 33.0),
            (94.0, 40.0),
            (95.0, 45.0),
            (93.0, 40.0),
            (91.0, 35.0),
            (89.5, 32.0),
            (88.0, 31.0),
            (89.0, 36.0),
            (90.0, 40.0),
            (91.0, 44.0),
        ]);
        assert_eq!(divergence(&points, &t), Some(Direction::Long));

        // Same lows with RSI falling alongside price: no divergence.
        let mut confirming = points.clone();
        confirming[10].rsi = 15.0;
        assert_eq!(divergence(&confirming, &t), None);

        // An RSI lift below the minimum move does not count.
        let mut faint = points.clone();
        faint[10].rsi = 21.0;
        assert_eq!(divergence(&faint, &t), None);

        // The second low is not confirmed until three bars have printed.
        assert_eq!(divergence(&points[..13], &t), None);
    }

    #[test]
    fn test_bearish_divergence() {
        let t = RuleThresholds::default();
        let points: Vec<SwingPoint> = [
            (104.0, 60.0),
            (106.0, 68.0),
            (108.0, 75.0),
            (110.0, 80.0),
            (107.5, 67.0),
            (106.0, 60.0),
            (105.0, 55.0),
            (107.0, 60.0),
            (109.0, 65.0),
            (110.5, 68.0),
            (112.0, 69.0),
            (111.0, 64.0),
            (110.0, 60.0),
            (109.0, 56.0),
        ]
        .iter()
        .map(|&(high, rsi)| SwingPoint {
            low: high - 1.0,
            high,
            rsi,
        })
        .collect();
        assert_eq!(divergence(&points, &t), Some(Direction::Short));
    }

    #[test]
    fn test_threshold_validation() {
        let bad = RuleThresholds {
            rsi_oversold: 80.0,
            ..RuleThresholds::default()
        };
        assert!(bad.validate().is_err());
        let bad = RuleThresholds {
            divergence_lookback: 6,
            ..RuleThresholds::default()
        };
        assert!(bad.validate().is_err());
        let bad = RuleWeights {
            volume_surge: -1.0,
            ..RuleWeights::default()
        };
        assert!(bad.validate().is_err());
    }
}
