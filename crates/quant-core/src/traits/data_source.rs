//! Market data provider trait.

use crate::error::DataError;
use crate::types::{Bar, Timeframe};
use chrono::{DateTime, Utc};

/// Source of historical bars.
///
/// Implementations return bars ordered from oldest to newest. Validation
/// happens on ingestion into a [`BarSeries`](crate::BarSeries), so a
/// provider may hand back raw rows as-is.
pub trait MarketDataProvider: Send + Sync {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError>;

    /// Symbols this provider can serve.
    fn symbols(&self) -> Result<Vec<String>, DataError>;

    fn name(&self) -> &str;
}
