//! Bar-by-bar signal generation over a whole series.

use quant_core::error::{ConfigError, DataError};
use quant_core::traits::ensure;
use quant_core::types::{BarSeries, Signal, Timeframe};
use quant_indicators::IndicatorPipeline;
use serde::Serialize;
use tracing::debug;

use crate::market::MarketView;
use crate::params::StrategyParams;
use crate::regime::{RegimeClassifier, RegimeReading};
use crate::scorer::{Decision, SignalScorer};

/// Signals plus counters from one scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    pub signals: Vec<Signal>,
    pub warmup: usize,
    pub bars_scanned: usize,
    pub candidates: usize,
    pub insufficient_data: bool,
}

/// Pipeline, regime classifier and scorer wired together.
#[derive(Debug, Clone)]
pub struct SignalScanner {
    pipeline: IndicatorPipeline,
    classifier: RegimeClassifier,
    scorer: SignalScorer,
    context_timeframes: Vec<Timeframe>,
}

impl SignalScanner {
    pub fn new(params: &StrategyParams, context_timeframes: Vec<Timeframe>) -> Result<Self, ConfigError> {
        let pipeline = IndicatorPipeline::new(params.indicators.clone())?;
        let classifier = RegimeClassifier::new(params.regime.clone())?;
        let scorer = SignalScorer::new(params.scorer.clone())?;
        let available = context_timeframes.len() + 1;
        ensure(
            params.regime.min_aligned_timeframes <= available,
            "regime.min_aligned_timeframes",
            params.regime.min_aligned_timeframes,
            &format!("<= {available} (base plus context timeframes)"),
        )?;
        Ok(Self {
            pipeline,
            classifier,
            scorer,
            context_timeframes,
        })
    }

    pub fn warmup(&self) -> usize {
        self.pipeline.warmup()
    }

    pub fn scorer(&self) -> &SignalScorer {
        &self.scorer
    }

    pub fn view(&self, series: &BarSeries) -> Result<MarketView, DataError> {
        MarketView::build(&self.pipeline, series, &self.context_timeframes)
    }

    pub fn regime_at(&self, view: &MarketView, i: usize) -> RegimeReading {
        self.classifier.classify(&view.regime_inputs(i))
    }

    pub fn evaluate_at(&self, symbol: &str, view: &MarketView, i: usize) -> Decision {
        if !view.frame().is_ready(i) {
            return Decision::NotReady;
        }
        let regime = self.regime_at(view, i);
        self.scorer.evaluate(symbol, view.frame(), i, &regime)
    }

    /// Every signal the series produces, ignoring positions.
    pub fn scan(&self, series: &BarSeries) -> Result<ScanReport, DataError> {
        let view = self.view(series)?;
        let frame = view.frame();
        let mut report = ScanReport {
            warmup: frame.warmup(),
            insufficient_data: !frame.has_snapshots(),
            ..ScanReport::default()
        };

        for i in frame.ready_range() {
            report.bars_scanned += 1;
            let decision = self.evaluate_at(&series.symbol, &view, i);
            if decision.is_candidate() {
                report.candidates += 1;
            }
            if let Some(signal) = decision.into_signal() {
                debug!(
                    symbol = %signal.symbol,
                    index = signal.index,
                    direction = %signal.direction,
                    score = signal.score,
                    "Signal"
                );
                report.signals.push(signal);
            }
        }
        Ok(report)
    }
}
