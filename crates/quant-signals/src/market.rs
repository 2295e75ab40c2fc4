//! Base-timeframe indicators plus time-aligned higher-timeframe context.

use quant_core::error::DataError;
use quant_core::types::{BarSeries, Timeframe};
use quant_indicators::{IndicatorFrame, IndicatorPipeline};
use tracing::debug;

use crate::regime::RegimeInputs;

#[derive(Debug, Clone)]
struct ContextFrame {
    frame: IndicatorFrame,
    /// For each base bar, the last completed bar of this timeframe.
    alignment: Vec<Option<usize>>,
}

#[derive(Debug, Clone)]
pub struct MarketView {
    base: IndicatorFrame,
    context: Vec<ContextFrame>,
}

impl MarketView {
    /// Compute the base frame and one frame per context timeframe, each
    /// aggregated from the base series.
    pub fn build(
        pipeline: &IndicatorPipeline,
        series: &BarSeries,
        context_timeframes: &[Timeframe],
    ) -> Result<Self, DataError> {
        let base = pipeline.compute(series);
        let mut context = Vec::with_capacity(context_timeframes.len());
        for &timeframe in context_timeframes {
            let derived = series.aggregate(timeframe)?;
            let alignment = derived.align_to(series);
            let frame = pipeline.compute(&derived);
            if !frame.has_snapshots() {
                debug!(
                    symbol = %series.symbol,
                    timeframe = %timeframe,
                    bars = derived.len(),
                    "Context timeframe too short, skipped for regime alignment"
                );
            }
            context.push(ContextFrame { frame, alignment });
        }
        Ok(Self { base, context })
    }

    pub fn frame(&self) -> &IndicatorFrame {
        &self.base
    }

    pub fn context_count(&self) -> usize {
        self.context.len()
    }

    /// Regime inputs at base bar `i`: base first, then every context
    /// timeframe that has a completed, warmed-up bar at that point.
    pub fn regime_inputs(&self, i: usize) -> Vec<RegimeInputs> {
        let Some(base) = RegimeInputs::from_frame(&self.base, i) else {
            return Vec::new();
        };
        let mut inputs = vec![base];
        inputs.extend(self.context.iter().filter_map(|ctx| {
            let j = ctx.alignment.get(i).copied().flatten()?;
            RegimeInputs::from_frame(&ctx.frame, j)
        }));
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quant_core::types::Bar;
    use quant_indicators::IndicatorSettings;

    fn hourly(n: usize) -> BarSeries {
        let raw = (0..n).map(|i| {
            let c = 100.0 + i as f64 * 0.1;
            Bar::new(i as i64 * 3_600_000, c - 0.05, c + 0.2, c - 0.2, c, 500.0)
        });
        BarSeries::ingest("CTX", Timeframe::Hour1, raw).0
    }

    #[test]
    fn test_short_context_is_skipped() {
        let pipeline = IndicatorPipeline::new(IndicatorSettings::default()).unwrap();
        // 150 hours is fewer than 40 four-hour bars: the 4h frame never warms up.
        let view = MarketView::build(&pipeline, &hourly(150), &[Timeframe::Hour4]).unwrap();
        assert_eq!(view.context_count(), 1);
        assert_eq!(view.regime_inputs(120).len(), 1);
        assert!(view.regime_inputs(10).is_empty());
    }

    #[test]
    fn test_long_context_joins_after_warmup() {
        let pipeline = IndicatorPipeline::new(IndicatorSettings::default()).unwrap();
        let view = MarketView::build(&pipeline, &hourly(800), &[Timeframe::Hour4]).unwrap();
        // The 4h frame warms up after 100 four-hour bars, i.e. 400 hours.
        assert_eq!(view.regime_inputs(300).len(), 1);
        assert_eq!(view.regime_inputs(799).len(), 2);
    }

    #[test]
    fn test_unaggregatable_context_is_an_error() {
        let pipeline = IndicatorPipeline::new(IndicatorSettings::default()).unwrap();
        let result = MarketView::build(&pipeline, &hourly(10), &[Timeframe::Minute5]);
        assert!(matches!(result, Err(DataError::InvalidTimeframe(_))));
    }
}
