//! Moving averages.

use quant_core::traits::Indicator;

use crate::simd;

/// Simple moving average.
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    key: String,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            key: format!("sma_{period}"),
        }
    }
}

impl Indicator for Sma {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        simd::rolling_mean_simd(data, self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        &self.key
    }
}

/// Exponential moving average seeded with the SMA of the first window.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    key: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            key: format!("ema_{period}"),
        }
    }
}

/// EMA values starting at index `period - 1` of `data`.
pub(crate) fn ema_values(data: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || data.len() < period {
        return vec![];
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = simd::sum_simd(&data[..period]) / period as f64;

    let mut out = Vec::with_capacity(data.len() - period + 1);
    out.push(seed);
    let mut ema = seed;
    for &price in &data[period..] {
        ema += alpha * (price - ema);
        out.push(ema);
    }
    out
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        ema_values(data, self.period)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        &self.key
    }
}
