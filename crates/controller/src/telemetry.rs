//! Logging configuration.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Configure stdout logging from `RUST_LOG`, defaulting to info level with
/// debug output for the agent's own crates. Safe to call more than once;
/// later calls are no-ops.
pub fn configure_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,scholar_agent=debug".into()),
    );
    let fmt_layer = tracing_subscriber::fmt::layer();
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init();
}
