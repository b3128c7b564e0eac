// In app/src/telemetry.rs

use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Installs the global subscriber: a `fmt` layer filtered at `log_level`,
/// with `sqlx` query logging held at WARN.
pub fn init(log_level: &str) {
    let level = Level::from_str(log_level).unwrap_or(Level::INFO);
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true).with_filter(
        Targets::new()
            .with_target("sqlx::query", Level::WARN) // Disable sqlx query debug logs
            .with_default(level),
    );
    tracing_subscriber::registry().with(fmt_layer).init();
    if !log_level.eq_ignore_ascii_case(level.as_str()) {
        tracing::warn!(%log_level, "Unknown log level. Falling back to INFO.");
    }
}
