//! Telemetry and tracing configuration.

mod tracing;

use anyhow::Context;

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if a subscriber is already installed or `RUST_LOG` does
/// not parse.
pub(crate) fn init_tracing() -> anyhow::Result<()> {
    tracing::init_tracing().context("failed to initialize tracing")
}
