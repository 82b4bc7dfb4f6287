//! Logging setup.
//!
//! Diagnostics go to stderr so the console's status lines on stdout stay
//! clean. `RUST_LOG` takes precedence over the default level.

use std::io;

use tracing_subscriber::EnvFilter;

/// The filter used when `RUST_LOG` is unset.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose { "debug" } else { "info" }
}

/// Installs the global subscriber. Call once, at startup.
pub fn init(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
