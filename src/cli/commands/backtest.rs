//! Backtest command implementation.

use anyhow::{Context, Result};
use quant_backtest::{BacktestEngine, CombinedResult};
use quant_config::AppConfig;
use rust_decimal::Decimal;
use tracing::info;

use super::common::{apply_data_args, load_universe};
use crate::cli::{BacktestArgs, OutputFormat};

pub fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    if let Some(capital) = args.capital {
        config.backtest.initial_capital =
            Decimal::try_from(capital).context("Capital is not a representable amount")?;
    }
    apply_data_args(&mut config, &args.data)?;

    let universe = load_universe(&config)?;
    info!(
        symbols = universe.len(),
        timeframe = %config.data.timeframe,
        preset = config.preset.as_deref().unwrap_or("custom"),
        "Starting backtest"
    );

    let engine = BacktestEngine::new(config.backtest.clone()).context("Invalid backtest configuration")?;
    let mut results = engine.run_many(&universe).context("Backtest failed")?;

    let (text, json) = if results.len() == 1 {
        let result = results.remove(0);
        if let Some(path) = &args.equity_csv {
            std::fs::write(path, result.equity_to_csv())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Equity curve saved");
        }
        (result.summary(), result.to_json()?)
    } else {
        let combined = CombinedResult::combine(results, &config.backtest.metrics);
        (combined.summary(), combined.to_json()?)
    };

    match args.output {
        OutputFormat::Json => println!("{json}"),
        OutputFormat::Text => println!("{text}"),
    }

    if let Some(path) = &args.save {
        std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Results saved");
    }
    Ok(())
}
