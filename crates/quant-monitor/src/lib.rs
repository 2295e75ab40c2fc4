//! Structured logging for the engine and CLI.

mod logging;

pub use logging::{setup_logging, LOG_FILE_PREFIX};
