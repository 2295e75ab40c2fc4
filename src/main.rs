//! quantlab command-line application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use quant_config::load_config;
use quant_monitor::setup_logging;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;

    let level = cli
        .log_level
        .map(|l| l.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.json();
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.logging.directory.as_ref().map(Into::into));
    let _guard = setup_logging(&level, json, log_dir.as_deref()).context("Failed to set up logging")?;

    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, config),
        Commands::WalkForward(args) => cli::commands::walk_forward::run(args, config),
        Commands::Presets(args) => cli::commands::presets::run(args.show),
        Commands::ValidateConfig => cli::commands::validate::run(&config, cli.config.as_deref()),
    }
}
