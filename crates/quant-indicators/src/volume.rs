//! Volume indicators.

use quant_core::traits::BarIndicator;
use quant_core::types::Bar;

use crate::simd;

/// Current volume over its rolling mean (window includes the current bar).
///
/// The mean is floored at 1 so zero-volume stretches never divide by zero.
#[derive(Debug, Clone)]
pub struct VolumeRatio {
    period: usize,
}

const MIN_MEAN_VOLUME: f64 = 1.0;

impl VolumeRatio {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }
}

impl BarIndicator for VolumeRatio {
    type Output = f64;

    fn calculate(&self, bars: &[Bar]) -> Vec<f64> {
        if bars.len() < self.period {
            return vec![];
        }
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        simd::rolling_mean_simd(&volumes, self.period)
            .into_iter()
            .zip(&volumes[self.period - 1..])
            .map(|(mean, &volume)| volume / mean.max(MIN_MEAN_VOLUME))
            .collect()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "volume_ratio"
    }
}
