//! Volatility indicators.

use quant_core::traits::{BarIndicator, Indicator};
use quant_core::types::Bar;
use serde::{Deserialize, Serialize};

use crate::momentum::Rsi;
use crate::simd;

/// How true range is averaged into ATR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AtrSmoothing {
    /// Rolling arithmetic mean.
    #[default]
    Simple,
    /// Wilder's recursive smoothing.
    Wilder,
}

/// Average True Range.
///
/// The first bar has no previous close, so its true range is its own range.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    smoothing: AtrSmoothing,
    key: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self::with_smoothing(period, AtrSmoothing::Simple)
    }

    pub fn with_smoothing(period: usize, smoothing: AtrSmoothing) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            smoothing,
            key: format!("atr_{period}"),
        }
    }

    pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
        let mut prev_close = None;
        bars.iter()
            .map(|bar| {
                let tr = bar.true_range(prev_close);
                prev_close = Some(bar.close);
                tr
            })
            .collect()
    }
}

impl BarIndicator for Atr {
    type Output = f64;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        let tr = Self::true_ranges(bars);
        match self.smoothing {
            AtrSmoothing::Simple => simd::rolling_mean_simd(&tr, self.period),
            AtrSmoothing::Wilder => Rsi::wilder_smooth(&tr, self.period),
        }
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerOutput {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle.
    pub bandwidth: f64,
    /// Close within the band, clamped to [0, 1]. 0.5 when the band has
    /// collapsed to a line.
    pub position: f64,
}

/// Bollinger Bands: rolling mean plus/minus k population deviations.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new() -> Self {
        Self::with_params(20, 2.0)
    }

    pub fn with_params(period: usize, std_dev_multiplier: f64) -> Self {
        assert!(period > 1, "Period must be greater than 1");
        assert!(std_dev_multiplier > 0.0, "Multiplier must be positive");
        Self {
            period,
            std_dev_multiplier,
        }
    }
}

impl Default for BollingerBands {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for BollingerBands {
    type Output = BollingerOutput;

    fn calculate(&self, data: &[f64]) -> Vec<BollingerOutput> {
        simd::rolling_mean_std_simd(data, self.period)
            .into_iter()
            .zip(&data[self.period.saturating_sub(1).min(data.len())..])
            .map(|((mean, std_dev), &price)| {
                let upper = mean + self.std_dev_multiplier * std_dev;
                let lower = mean - self.std_dev_multiplier * std_dev;
                let width = upper - lower;
                let position = if width > 0.0 {
                    ((price - lower) / width).clamp(0.0, 1.0)
                } else {
                    0.5
                };
                BollingerOutput {
                    upper,
                    middle: mean,
                    lower,
                    bandwidth: if mean != 0.0 { width / mean } else { 0.0 },
                    position,
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "bb"
    }
}
