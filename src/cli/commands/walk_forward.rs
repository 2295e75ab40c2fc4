//! Walk-forward command implementation.

use anyhow::{bail, Context, Result};
use quant_backtest::{WalkForwardValidator, WindowSpec};
use quant_config::AppConfig;
use tracing::info;

use super::common::{apply_data_args, load_universe};
use crate::cli::{OutputFormat, WalkForwardArgs};

pub fn run(args: WalkForwardArgs, mut config: AppConfig) -> Result<()> {
    apply_data_args(&mut config, &args.data)?;

    let wf = &mut config.walk_forward;
    if let (Some(train), Some(test)) = (args.train_days, args.test_days) {
        let (Some(start), Some(end)) = (config.data.start, config.data.end) else {
            bail!("Rolling windows need a start and end date (--start/--end or data.start/data.end)");
        };
        let step = args.step_days.unwrap_or(test);
        wf.windows = WindowSpec::rolling(start, train, test, step, end).context("Invalid rolling windows")?;
    }
    if args.max_candidates.is_some() {
        wf.budget.max_candidates = args.max_candidates;
    }
    if args.max_seconds.is_some() {
        wf.budget.max_duration_secs = args.max_seconds;
    }

    let validator = WalkForwardValidator::new(config.backtest.clone(), config.walk_forward.clone())
        .context("Invalid walk-forward configuration")?;
    let universe = load_universe(&config)?;
    info!(
        symbols = universe.len(),
        windows = config.walk_forward.windows.len(),
        candidates = validator.candidate_count(),
        "Starting walk-forward"
    );

    let mut reports = Vec::with_capacity(universe.len());
    for (series, rejected) in &universe {
        let summary = validator.run_loaded(series, *rejected);
        if args.output == OutputFormat::Text {
            println!("{}\n{}", series.symbol, summary.summary());
        }
        reports.push((series.symbol.clone(), summary));
    }

    let json = serde_json::to_string_pretty(&reports)?;
    if args.output == OutputFormat::Json {
        println!("{json}");
    }
    if let Some(path) = &args.save {
        std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Results saved");
    }
    Ok(())
}
