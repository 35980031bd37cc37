//! Process-wide tracing setup.
//!
//! Unit context (kind, adversary, seed) is carried by the `unit` span that
//! [`crate::unit::run_unit`] enters, so every event emitted while a unit runs
//! is tagged with it.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber. Call once at process start.
///
/// Reads `RUST_LOG`. Defaults to `info` if unset.
/// Output: stderr, compact format, with thread names to tell workers apart.
///
/// # Example
/// ```bash
/// RUST_LOG=experiments=debug experiments -e specific -a AHTN -i 2
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_thread_names(true)
                .compact(),
        )
        .init();
}
