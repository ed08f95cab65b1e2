//! Telemetry initialization: tracing subscriber writing to stdout.
//!
//! The filter comes from `RUST_LOG` when set, otherwise the crate logs at
//! debug and its dependencies stay quiet.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "evidence_binder_backend=debug,tower_http=info,sqlx::query=warn";

/// Initialize the global tracing subscriber.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
