//! Log subscriber setup.
//!
//! Logs go to stderr so stdout carries only command output (`serve` writes
//! one JSON response per line there). `RUST_LOG` overrides the default level.

use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVE: &str = "credit_default=info";

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
