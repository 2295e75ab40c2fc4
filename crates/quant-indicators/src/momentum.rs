//! Momentum indicators.

use quant_core::traits::Indicator;
use serde::{Deserialize, Serialize};

use crate::moving_average::ema_values;

/// Relative Strength Index with Wilder smoothing.
///
/// An average loss of zero yields 100.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    key: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            key: format!("rsi_{period}"),
        }
    }

    /// Seeded with the plain mean of the first `period` values, then
    /// `avg = (avg * (period - 1) + value) / period`.
    pub(crate) fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if period == 0 || values.len() < period {
            return vec![];
        }
        let n = period as f64;
        let mut avg = values[..period].iter().sum::<f64>() / n;
        let mut out = Vec::with_capacity(values.len() - period + 1);
        out.push(avg);
        for &value in &values[period..] {
            avg = (avg * (n - 1.0) + value) / n;
            out.push(avg);
        }
        out
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let avg_gains = Self::wilder_smooth(&gains, self.period);
        let avg_losses = Self::wilder_smooth(&losses, self.period);

        avg_gains
            .iter()
            .zip(avg_losses.iter())
            .map(|(&gain, &loss)| {
                if loss == 0.0 {
                    100.0
                } else {
                    (100.0 - 100.0 / (1.0 + gain / loss)).clamp(0.0, 100.0)
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        &self.key
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    /// Fast EMA minus slow EMA.
    pub macd: f64,
    /// EMA of the MACD line.
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast > 0 && slow > 0 && signal > 0);
        assert!(fast < slow, "Fast period must be less than slow period");
        Self {
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        }
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Macd {
    type Output = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        if data.len() < self.period() {
            return vec![];
        }

        let fast = ema_values(data, self.fast_period);
        let slow = ema_values(data, self.slow_period);
        let offset = self.slow_period - self.fast_period;

        let line: Vec<f64> = fast[offset..]
            .iter()
            .zip(slow.iter())
            .map(|(f, s)| f - s)
            .collect();
        let signal = ema_values(&line, self.signal_period);

        line[self.signal_period - 1..]
            .iter()
            .zip(signal.iter())
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn name(&self) -> &str {
        "macd"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_all_gains_is_100() {
        let data: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rsi = Rsi::new(14).calculate(&data);
        assert_eq!(rsi.len(), 6);
        assert!(rsi.iter().all(|v| *v == 100.0));
    }

    #[test]
    fn test_rsi_all_losses_is_0() {
        let data: Vec<f64> = (0..20).map(|i| 100.0 - i as f64).collect();
        let rsi = Rsi::new(14).calculate(&data);
        assert!(rsi.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_rsi_single_dip() {
        // Fourteen +1 steps, then a -44 drop: avg gain 13/14, avg loss 44/14.
        let mut data: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        data.push(data[14] - 44.0);
        let rsi = Rsi::new(14).calculate(&data);
        let expected = 100.0 - 100.0 / (1.0 + 13.0 / 44.0);
        assert!((rsi[1] - expected).abs() < 1e-9);
        assert!(rsi[1] < 25.0);
    }

    #[test]
    fn test_rsi_alignment() {
        let rsi = Rsi::new(14);
        assert_eq!(rsi.first_defined(), 14);
        let aligned = rsi.aligned(&vec![1.0; 20]);
        assert!(aligned[13].is_none());
        assert!(aligned[14].is_some());
    }

    #[test]
    fn test_macd_shape() {
        let data: Vec<f64> = (0..100).map(|i| 100.0 + (i as f64 * 0.2).sin() * 5.0).collect();
        let macd = Macd::new();
        let out = macd.calculate(&data);

        assert_eq!(macd.first_defined(), 33);
        assert_eq!(out.len(), 100 - 33);
        for o in &out {
            assert!((o.histogram - (o.macd - o.signal)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_macd_constant_ramp_is_flat() {
        // Both EMAs lag a ramp by a constant, so MACD equals its signal.
        let data: Vec<f64> = (0..80).map(f64::from).collect();
        let out = Macd::with_periods(12, 26, 9).calculate(&data);
        for o in &out {
            assert!((o.macd - 7.0).abs() < 1e-9);
            assert!(o.histogram.abs() < 1e-9);
        }
    }
}
