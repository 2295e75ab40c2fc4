//! Historical bar providers.

mod csv_source;

pub use csv_source::CsvDataSource;

use chrono::{DateTime, Utc};
use quant_core::error::DataError;
use quant_core::traits::MarketDataProvider;
use quant_core::types::{BarSeries, Timeframe};
use tracing::{info, warn};

/// Fetch bars and ingest them into a validated series. Malformed bars are
/// dropped and logged; their count is returned alongside the series.
pub fn load_series(
    provider: &dyn MarketDataProvider,
    symbol: &str,
    timeframe: Timeframe,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(BarSeries, usize), DataError> {
    let raw = provider.fetch_bars(symbol, timeframe, start, end)?;
    let fetched = raw.len();
    let (series, rejected) = BarSeries::ingest(symbol, timeframe, raw);
    for bar in &rejected {
        warn!(symbol, position = bar.position, reason = %bar.reason, "Bar rejected");
    }
    info!(
        symbol,
        %timeframe,
        source = provider.name(),
        fetched,
        rejected = rejected.len(),
        "Loaded bars"
    );
    Ok((series, rejected.len()))
}
