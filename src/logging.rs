//! Tracing subscriber setup for the CLI.

use tracing_subscriber::EnvFilter;

/// Initialize structured logging to stderr. `RUST_LOG` wins over the
/// verbosity flag when set. Call once, at startup.
pub fn init(verbose: bool) {
    let fallback = if verbose { "simcheck=debug,info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
