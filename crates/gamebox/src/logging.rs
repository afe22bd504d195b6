//! Tracing subscriber setup shared by both binaries.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber.
///
/// `level` is the default filter directive (`"info"`, `"gamebox=debug"`,
/// ...). `RUST_LOG`, when set and valid, replaces it. With `json` every
/// event is one JSON object per line.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(level: &str, json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_target(false))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(false)).try_init()
    }
}
