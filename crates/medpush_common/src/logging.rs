//! Logging utilities for the medpush services.
//!
//! This module provides one way of initializing the tracing subscriber for
//! every binary and test in the workspace.

use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate targets that log at the requested level when `RUST_LOG` is unset.
const MEDPUSH_TARGETS: &[&str] = &[
    "medpush_common",
    "medpush_config",
    "medpush_db",
    "medpush_fcm",
    "medpush_notify",
    "medpush_backend",
    "tower_http",
];

/// Initialize the tracing subscriber at INFO.
///
/// # Examples
///
/// ```
/// use medpush_common::logging;
///
/// // Initialize with default log level (INFO)
/// logging::init();
///
/// // Initialize with a specific log level
/// logging::init_with_level(tracing::Level::DEBUG);
/// ```
pub fn init() {
    init_with_level(Level::INFO);
}

/// Initialize the tracing subscriber with a specific log level.
///
/// `RUST_LOG` takes precedence when set. Otherwise the medpush crates log at
/// `level` and everything else at WARN. Calling this more than once is
/// harmless; only the first call installs a subscriber.
///
/// # Arguments
///
/// * `level` - The minimum log level for the medpush crates.
pub fn init_with_level(level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level));

    // Use try_init to handle the case where a global default subscriber has already been set
    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_thread_ids(true)
                .with_thread_names(true),
        )
        .with(filter)
        .try_init();

    if result.is_ok() {
        info!("Logging initialized at level: {}", level);
    }
}

fn default_filter(level: Level) -> EnvFilter {
    MEDPUSH_TARGETS
        .iter()
        .fold(EnvFilter::new("warn"), |filter, target| {
            match format!("{}={}", target, level).parse() {
                Ok(directive) => filter.add_directive(directive),
                Err(_) => filter,
            }
        })
}

/// Parses a configured level name, falling back to INFO for unknown names.
pub fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}
