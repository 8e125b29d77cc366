//! Global `tracing` subscriber setup.
//!
//! `RUST_LOG` takes precedence over the filter passed in.

use crate::errors::ConfigurationError;
use tracing_subscriber::EnvFilter;

fn env_filter(default_filter: &str) -> Result<EnvFilter, ConfigurationError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| ConfigurationError::parse(format!("invalid log filter '{default_filter}': {e}")))
}

/// Installs a human-readable subscriber.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns `ConfigurationError` if the filter directive cannot be parsed.
pub fn init_tracing(default_filter: &str) -> Result<bool, ConfigurationError> {
    let filter = env_filter(default_filter)?;
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok())
}

/// Installs a subscriber writing one JSON object per line.
///
/// Returns `Ok(false)` if a global subscriber was already installed.
///
/// # Errors
///
/// Returns `ConfigurationError` if the filter directive cannot be parsed.
pub fn init_json_tracing(default_filter: &str) -> Result<bool, ConfigurationError> {
    let filter = env_filter(default_filter)?;
    Ok(tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .is_ok())
}
