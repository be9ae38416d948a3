//! Diagnostic logging.
//!
//! Report lines a user asked for (plans, per-file actions, timings) are
//! printed by the [`Reporter`](crate::report::Reporter). This module only sets
//! up `tracing` for diagnostics, which go to stderr.

use tracing_subscriber::EnvFilter;

use crate::constants::PKG_NAME;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{PKG_NAME}={level}")));

    // a subscriber may already be installed, e.g. by an embedding program
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
