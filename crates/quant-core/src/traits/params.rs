//! Validated parameter sets.

use crate::error::ConfigError;

/// A parameter struct that can check its own ranges.
///
/// Every configuration block implements this and is validated before any
/// simulation work starts.
pub trait Params: Clone + Send + Sync + 'static {
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Fail with an out-of-range error unless `ok` holds.
pub fn ensure(
    ok: bool,
    parameter: &str,
    value: impl ToString,
    expected: &str,
) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::out_of_range(parameter, value, expected))
    }
}
