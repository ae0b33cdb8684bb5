//! Tracing initialization helpers.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initializes tracing with an env-filter and a fmt layer.
///
/// Reads `RUST_LOG` from the environment, falling back to the provided
/// default directive. Safe to call from binaries and test harnesses; a
/// second call returns an error from the global registry, which is ignored.
pub fn init(default_directive: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive.into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
