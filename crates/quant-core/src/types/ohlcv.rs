//! OHLCV bars and append-only bar series.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Timeframe;
use crate::error::{BarError, DataError};

/// One price bar. The timestamp is the bar open in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Check OHLC ordering, positivity and finiteness.
    pub fn validate(&self) -> Result<(), BarError> {
        let timestamp = self.timestamp;
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().chain(std::iter::once(&self.volume)).any(|v| !v.is_finite()) {
            return Err(BarError::NonFinite { timestamp });
        }
        if prices.iter().any(|p| *p <= 0.0) {
            return Err(BarError::NonPositivePrice { timestamp });
        }
        if self.high < self.open.max(self.close).max(self.low) {
            return Err(BarError::HighBelowBody { timestamp });
        }
        if self.low > self.open.min(self.close).min(self.high) {
            return Err(BarError::LowAboveBody { timestamp });
        }
        if self.volume < 0.0 {
            return Err(BarError::NegativeVolume { timestamp });
        }
        Ok(())
    }

    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    #[inline]
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// True range against the previous close.
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.range(),
        }
    }
}

/// A bar dropped during ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedBar {
    /// Position in the raw input.
    pub position: usize,
    pub reason: BarError,
}

/// Ordered, append-only bars for one symbol and timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            bars: Vec::new(),
        }
    }

    /// Build a series from raw bars, skipping every bar that fails validation.
    pub fn ingest(
        symbol: impl Into<String>,
        timeframe: Timeframe,
        raw: impl IntoIterator<Item = Bar>,
    ) -> (Self, Vec<RejectedBar>) {
        let mut series = Self::new(symbol, timeframe);
        let mut rejected = Vec::new();
        for (position, bar) in raw.into_iter().enumerate() {
            if let Err(reason) = series.push(bar) {
                rejected.push(RejectedBar { position, reason });
            }
        }
        (series, rejected)
    }

    /// Append a bar. Malformed or non-increasing bars are refused.
    pub fn push(&mut self, bar: Bar) -> Result<(), BarError> {
        bar.validate()?;
        if let Some(last) = self.bars.last() {
            if bar.timestamp <= last.timestamp {
                return Err(BarError::OutOfOrder {
                    previous: last.timestamp,
                    timestamp: bar.timestamp,
                });
            }
        }
        self.bars.push(bar);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.open).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    fn with_bars(&self, bars: Vec<Bar>) -> Self {
        Self {
            symbol: self.symbol.clone(),
            timeframe: self.timeframe,
            bars,
        }
    }

    /// Bars with `start <= timestamp < end`.
    pub fn between(&self, start: i64, end: i64) -> Self {
        let from = self.bars.partition_point(|b| b.timestamp < start);
        let to = self.bars.partition_point(|b| b.timestamp < end);
        self.with_bars(self.bars[from..to.max(from)].to_vec())
    }

    /// Like [`between`](Self::between) but keeps up to `lookback` earlier bars
    /// for warm-up. Returns the window and the index of the first bar at or
    /// after `start` within it.
    pub fn window_with_lookback(&self, start: i64, end: i64, lookback: usize) -> (Self, usize) {
        let first = self.bars.partition_point(|b| b.timestamp < start);
        let to = self.bars.partition_point(|b| b.timestamp < end).max(first);
        let from = first.saturating_sub(lookback);
        (self.with_bars(self.bars[from..to].to_vec()), first - from)
    }

    /// Bucket bars into a coarser timeframe.
    pub fn aggregate(&self, target: Timeframe) -> Result<Self, DataError> {
        if !self.timeframe.can_aggregate_to(target) {
            return Err(DataError::InvalidTimeframe(format!(
                "cannot aggregate {} into {}",
                self.timeframe, target
            )));
        }

        let mut out: Vec<Bar> = Vec::new();
        for bar in &self.bars {
            let bucket = target.bucket_start(bar.timestamp);
            match out.last_mut() {
                Some(current) if current.timestamp == bucket => {
                    current.high = current.high.max(bar.high);
                    current.low = current.low.min(bar.low);
                    current.close = bar.close;
                    current.volume += bar.volume;
                }
                _ => out.push(Bar { timestamp: bucket, ..*bar }),
            }
        }

        Ok(Self {
            symbol: self.symbol.clone(),
            timeframe: target,
            bars: out,
        })
    }

    /// For each bar of `base`, the index of the latest bar of `self` that had
    /// fully closed by the time that base bar closed.
    pub fn align_to(&self, base: &BarSeries) -> Vec<Option<usize>> {
        let own = self.timeframe.as_millis();
        let step = base.timeframe.as_millis();
        let mut next = 0;
        base.bars
            .iter()
            .map(|b| {
                let closed_at = b.timestamp + step;
                while next < self.bars.len() && self.bars[next].timestamp + own <= closed_at {
                    next += 1;
                }
                next.checked_sub(1)
            })
            .collect()
    }
}
