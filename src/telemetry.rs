//! Tracing bootstrap for binaries, tests and demos.
//!
//! The engine itself only emits `tracing` events; installing a subscriber is
//! the host's choice. This helper wires the common case: a fmt subscriber
//! filtered by `FORMFLOW_LOG` (falling back to `RUST_LOG`).

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber.
///
/// Safe to call repeatedly; only the first call installs anything.
pub fn init() {
    let filter = std::env::var("FORMFLOW_LOG")
        .ok()
        .map(EnvFilter::new)
        .unwrap_or_else(EnvFilter::from_default_env);
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
