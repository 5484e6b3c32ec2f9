use std::io;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `level` (e.g. `"info"` or
/// `"n44_algo=debug,info"`). Fails if a subscriber is already installed.
pub fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|err| anyhow!("invalid log level '{}': {}", level, err))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow!("installing tracing subscriber: {}", err))
}
