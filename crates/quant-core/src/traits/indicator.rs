//! Indicator trait definitions.

use crate::error::IndicatorError;
use crate::types::Bar;

/// Batch indicator over a single price column.
///
/// `calculate` returns values for the tail of the input only: the first
/// output belongs to the first input index with enough history. Use
/// [`aligned`](Indicator::aligned) to get one slot per input bar.
pub trait Indicator: Send + Sync {
    type Output: Clone;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Minimum input length that yields one output.
    fn period(&self) -> usize;

    /// Snapshot key, e.g. `rsi_14`.
    fn name(&self) -> &str;

    /// Index of the first input bar with a defined value.
    fn first_defined(&self) -> usize {
        self.period().saturating_sub(1)
    }

    fn validate_data(&self, data: &[f64]) -> Result<(), IndicatorError> {
        if data.len() < self.period() {
            return Err(IndicatorError::InsufficientData {
                required: self.period(),
                available: data.len(),
            });
        }
        Ok(())
    }

    /// Output padded with `None` so index `i` corresponds to input `i`.
    fn aligned(&self, data: &[f64]) -> Vec<Option<Self::Output>> {
        pad_front(data.len(), self.calculate(data))
    }
}

/// Indicator that needs whole bars (ranges, gaps, volume).
pub trait BarIndicator: Send + Sync {
    type Output: Clone;

    fn calculate(&self, bars: &[Bar]) -> Vec<Self::Output>;

    fn period(&self) -> usize;

    fn name(&self) -> &str;

    fn first_defined(&self) -> usize {
        self.period().saturating_sub(1)
    }

    fn aligned(&self, bars: &[Bar]) -> Vec<Option<Self::Output>> {
        pad_front(bars.len(), self.calculate(bars))
    }
}

fn pad_front<T>(len: usize, values: Vec<T>) -> Vec<Option<T>> {
    let missing = len.saturating_sub(values.len());
    std::iter::repeat_with(|| None)
        .take(missing)
        .chain(values.into_iter().map(Some))
        .take(len)
        .collect()
}
