//! Process-wide logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogFormat;

pub const DEFAULT_FILTER: &str = "meuat_api=info,tower_http=info";

/// Pick the filter directive: explicit level, then `RUST_LOG`, then the default.
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) if !level.trim().is_empty() => EnvFilter::new(level),
        _ => EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()),
    }
}

/// Install the global subscriber. Called once from `main`; the subscriber is
/// never reconfigured afterwards.
pub fn init(level: Option<&str>, format: LogFormat) {
    let fmt_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
    };

    // try_init: a subscriber may already be installed in tests
    let _ = tracing_subscriber::registry()
        .with(env_filter(level))
        .with(fmt_layer)
        .try_init();
}
