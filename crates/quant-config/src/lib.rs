//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, DataSettings, LoggingConfig, SettingsError};

use config::{Config, Environment, File, FileFormat};
use std::path::Path;
use tracing::debug;

/// Prefix for environment overrides, e.g. `QUANT__BACKTEST__COOLDOWN_BARS=3`.
pub const ENV_PREFIX: &str = "QUANT";

/// Load configuration from an optional TOML file and the environment, then
/// resolve the preset and validate every parameter.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, SettingsError> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }
    let config = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut app: AppConfig = config.try_deserialize()?;
    app.resolve()?;
    debug!(preset = ?app.preset, "Configuration loaded");
    Ok(app)
}

/// Parse a TOML document without touching the environment.
pub fn from_toml_str(source: &str) -> Result<AppConfig, SettingsError> {
    let config = Config::builder()
        .add_source(File::from_str(source, FileFormat::Toml))
        .build()?;
    let mut app: AppConfig = config.try_deserialize()?;
    app.resolve()?;
    Ok(app)
}
