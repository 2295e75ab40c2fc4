//! Swing-point support and resistance.

use quant_core::traits::BarIndicator;
use quant_core::types::Bar;
use serde::{Deserialize, Serialize};

use crate::simd;

/// Nearest confirmed swing levels around the current close.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SwingOutput {
    /// Highest confirmed swing low below the close.
    pub support: Option<f64>,
    /// Lowest confirmed swing high above the close.
    pub resistance: Option<f64>,
}

/// Swing detector.
///
/// A bar is a swing low when its low is the minimum of the `strength` bars on
/// either side, and a swing high likewise for highs. A pivot at `j` is only
/// known once bar `j + strength` has closed, so bar `i` sees pivots in
/// `[i - lookback, i - strength]`.
#[derive(Debug, Clone)]
pub struct SwingLevels {
    lookback: usize,
    strength: usize,
}

impl SwingLevels {
    pub fn new(lookback: usize, strength: usize) -> Self {
        assert!(strength > 0, "Strength must be greater than 0");
        assert!(lookback > 2 * strength, "Lookback must exceed twice the strength");
        Self { lookback, strength }
    }

    fn pivots(values: &[f64], strength: usize, pick_min: bool) -> Vec<bool> {
        let mut out = vec![false; values.len()];
        if values.len() <= 2 * strength {
            return out;
        }
        for j in strength..values.len() - strength {
            let Some((lo, hi)) = simd::minmax_simd(&values[j - strength..=j + strength]) else {
                continue;
            };
            out[j] = if pick_min { values[j] == lo } else { values[j] == hi };
        }
        out
    }
}

impl BarIndicator for SwingLevels {
    type Output = SwingOutput;

    fn calculate(&self, bars: &[Bar]) -> Vec<SwingOutput> {
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let swing_lows = Self::pivots(&lows, self.strength, true);
        let swing_highs = Self::pivots(&highs, self.strength, false);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                if i < self.strength {
                    return SwingOutput::default();
                }
                let newest = i - self.strength;
                let oldest = i.saturating_sub(self.lookback);
                let mut out = SwingOutput::default();
                for j in oldest..=newest {
                    if swing_lows[j] && lows[j] < bar.close {
                        out.support = Some(out.support.map_or(lows[j], |s: f64| s.max(lows[j])));
                    }
                    if swing_highs[j] && highs[j] > bar.close {
                        out.resistance =
                            Some(out.resistance.map_or(highs[j], |r: f64| r.min(highs[j])));
                    }
                }
                out
            })
            .collect()
    }

    /// Every bar gets an output; missing levels are `None` inside it.
    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "swing"
    }
}
