//! Thin facade over `tracing` so downstream modules import one path.

pub use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Reads `RUST_LOG`, defaulting to `info`
/// for this workspace's crates. Calling twice is a no-op.
pub fn setup() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gateway_core=debug,mollie_api=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
