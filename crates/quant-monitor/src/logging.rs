//! Logging setup.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// File name prefix for rolling log files.
pub const LOG_FILE_PREFIX: &str = "quantlab.log";

/// Install the global subscriber. `RUST_LOG` overrides `level`.
///
/// With a `directory`, events are also written to a daily-rolling file
/// through a non-blocking writer. Keep the returned guard alive until exit
/// or buffered lines are lost.
pub fn setup_logging(
    level: &str,
    json: bool,
    directory: Option<&Path>,
) -> Result<Option<WorkerGuard>, TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_target(true).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer().pretty()).try_init()?;
    }
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_fails() {
        let dir = std::env::temp_dir().join(format!("quant-monitor-{}", std::process::id()));
        let guard = setup_logging("debug", false, Some(&dir)).unwrap();
        assert!(guard.is_some());
        tracing::info!(test = true, "logging installed");
        assert!(setup_logging("info", true, None).is_err());
    }
}
