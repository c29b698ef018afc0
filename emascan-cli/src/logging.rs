//! Logging initialization with environment-based formatters.
//!
//! - `EMASCAN_ENV=production` (or `prod`): structured JSON for log aggregation
//! - anything else: human-readable, colored output
//!
//! Logs go to stderr so that tables and exports on stdout stay pipeable.
//! `RUST_LOG` overrides the default `info` filter.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub fn init_logging() {
    let env = std::env::var("EMASCAN_ENV").unwrap_or_default();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if matches!(env.to_lowercase().as_str(), "production" | "prod") {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
