//! Logging setup.
//!
//! No rotating file appender here (no persistence at all in this server, per the
//! account/exchange state being fully volatile), so this is a stderr-only
//! `tracing_subscriber` registry with an `EnvFilter`. The initialization shape
//! (filter-from-env, fall back to a default, build a registry) follows the
//! teacher's own `init_logging`.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Default filter directive used when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "bourse=info";

/// Install the global `tracing` subscriber. Call once, at process start.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_ansi(true))
        .init();
}
