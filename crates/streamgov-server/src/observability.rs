//! Tracing setup for the control-plane binary.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initializes the global subscriber. `RUST_LOG` wins over the configured
/// level so operators can raise verbosity without touching the config file.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .init();
}
