//! Validate configuration command.

use anyhow::Result;
use quant_config::AppConfig;
use std::path::Path;

/// `config` has already been loaded and validated.
pub fn run(config: &AppConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => println!("Configuration is valid: {}", path.display()),
        None => println!("Configuration is valid (defaults and environment)"),
    }
    println!();
    println!("App: {} ({})", config.app.name, config.app.environment);
    println!("Log level: {}", config.logging.level);
    println!("Preset: {}", config.preset.as_deref().unwrap_or("none"));
    println!("Walk-forward windows: {}", config.walk_forward.windows.len());
    println!();
    println!("# effective configuration");
    println!("{}", config.to_toml()?);
    Ok(())
}
