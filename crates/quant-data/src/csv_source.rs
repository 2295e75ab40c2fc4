//! CSV data source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use quant_core::error::DataError;
use quant_core::traits::MarketDataProvider;
use quant_core::types::{Bar, Timeframe};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp", alias = "Datetime")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: f64,
    #[serde(alias = "High", alias = "high")]
    high: f64,
    #[serde(alias = "Low", alias = "low")]
    low: f64,
    #[serde(alias = "Close", alias = "close", alias = "Adj Close")]
    close: f64,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: f64,
}

/// Bars from CSV files in a directory.
///
/// `fetch_bars("BTC", 1h, ..)` reads `BTC_1h.csv`, falling back to
/// `BTC.csv`.
pub struct CsvDataSource {
    root: PathBuf,
}

impl CsvDataSource {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, DataError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(DataError::Internal(format!(
                "data directory {} does not exist",
                root.display()
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn file_for(&self, symbol: &str, timeframe: Timeframe) -> Option<PathBuf> {
        [format!("{symbol}_{timeframe}.csv"), format!("{symbol}.csv")]
            .into_iter()
            .map(|name| self.root.join(name))
            .find(|path| path.is_file())
    }

    /// Every row of one file, oldest first. Rows are not validated here.
    pub fn load_file(path: &Path) -> Result<Vec<Bar>, DataError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| DataError::ParseError(format!("{}: {e}", path.display())))?;

        let mut bars = Vec::new();
        for (line, result) in reader.deserialize().enumerate() {
            let record: CsvRecord = result
                .map_err(|e| DataError::ParseError(format!("{} row {}: {e}", path.display(), line + 1)))?;
            let timestamp = parse_timestamp(&record.date)?;
            bars.push(Bar::new(
                timestamp,
                record.open,
                record.high,
                record.low,
                record.close,
                record.volume,
            ));
        }
        bars.sort_by_key(|b| b.timestamp);
        debug!(path = %path.display(), rows = bars.len(), "Read CSV");
        Ok(bars)
    }
}

impl MarketDataProvider for CsvDataSource {
    fn fetch_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Bar>, DataError> {
        let path = self
            .file_for(symbol, timeframe)
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;
        let (from, to) = (start.timestamp_millis(), end.timestamp_millis());
        let mut bars = Self::load_file(&path)?;
        bars.retain(|b| b.timestamp >= from && b.timestamp < to);
        Ok(bars)
    }

    fn symbols(&self) -> Result<Vec<String>, DataError> {
        let mut out: Vec<String> = std::fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                // Strip a trailing timeframe suffix such as `_1h`.
                let symbol = match stem.rsplit_once('_') {
                    Some((symbol, tf)) if tf.parse::<Timeframe>().is_ok() => symbol,
                    _ => stem,
                };
                Some(symbol.to_string())
            })
            .collect();
        out.sort();
        out.dedup();
        Ok(out)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Dates, date-times, RFC 3339 or Unix seconds/milliseconds.
fn parse_timestamp(raw: &str) -> Result<i64, DataError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Some(dt) = NaiveDate::parse_from_str(raw, format)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Ok(dt.and_utc().timestamp_millis());
        }
    }
    if let Ok(ts) = raw.parse::<i64>() {
        // More than 10 digits means milliseconds.
        return Ok(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }
    Err(DataError::ParseError(format!("could not parse timestamp: {raw}")))
}
