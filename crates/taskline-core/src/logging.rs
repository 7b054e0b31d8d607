//! Logging initialization.
//!
//! Thin wrapper over `tracing-subscriber` with env-filter support. Library
//! crates only emit `tracing` events; binaries embedding the SDK call
//! [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Reads `RUST_LOG` for filter directives, defaulting to `info` for the
/// taskline crates. Safe to call more than once; subsequent calls are
/// no-ops.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,taskline=debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
