//! Diagnostic tracing for module lifecycles.
//!
//! The runtime emits `tracing` events when modules lock, bind submodules and
//! hit or miss their caches, and opens one span per run. Nothing is printed
//! unless a subscriber is installed; [`init`] installs one.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a stderr subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Does nothing if a global subscriber is already set, so it is safe to call
/// more than once.
///
/// ```bash
/// RUST_LOG=pluginplay_core=debug cargo test
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}
