//! Data loading and config overrides shared by the run commands.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use quant_config::AppConfig;
use quant_core::traits::MarketDataProvider;
use quant_core::types::BarSeries;
use quant_data::{load_series, CsvDataSource};
use tracing::warn;

use crate::cli::DataArgs;

/// Fold command-line flags into `config` and re-validate.
pub fn apply_data_args(config: &mut AppConfig, args: &DataArgs) -> Result<()> {
    if let Some(dir) = &args.data {
        config.data.directory = dir.display().to_string();
    }
    if !args.symbols.is_empty() {
        config.data.symbols = args.symbols.clone();
    }
    if let Some(tf) = args.timeframe {
        config.data.timeframe = tf;
    }
    if args.start.is_some() {
        config.data.start = args.start;
    }
    if args.end.is_some() {
        config.data.end = args.end;
    }
    if args.preset.is_some() {
        config.preset = args.preset.clone();
    }
    config.resolve().context("Invalid configuration")?;
    Ok(())
}

fn range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = start
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let to = end
        .and_then(|d| d.checked_add_days(Days::new(1)))
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (from, to)
}

/// One validated series per configured symbol, with the number of malformed
/// bars dropped while loading it. Symbols without data are skipped with a
/// warning.
pub fn load_universe(config: &AppConfig) -> Result<Vec<(BarSeries, usize)>> {
    let data = &config.data;
    let source = CsvDataSource::new(&data.directory)
        .with_context(|| format!("Cannot open data directory '{}'", data.directory))?;
    let symbols = if data.symbols.is_empty() {
        source.symbols().context("Failed to list symbols")?
    } else {
        data.symbols.clone()
    };
    if symbols.is_empty() {
        bail!("No symbols given and no CSV files found in '{}'", data.directory);
    }

    let (start, end) = range(data.start, data.end);
    let mut universe = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        match load_series(&source, symbol, data.timeframe, start, end) {
            Ok((series, _)) if series.is_empty() => {
                warn!(%symbol, "No bars in range, skipping");
            }
            Ok(loaded) => universe.push(loaded),
            Err(e) => warn!(%symbol, error = %e, "Failed to load data, skipping"),
        }
    }
    if universe.is_empty() {
        bail!("No data loaded for {}", symbols.join(", "));
    }
    Ok(universe)
}
