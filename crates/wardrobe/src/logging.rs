//! Logging initialization.
//!
//! Structured logging via the `tracing` ecosystem. Output goes to stderr so
//! stdout stays clean for tag output and JSON records; `RUST_LOG` overrides
//! the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wardrobe_core::config::LoggingConfig;

/// Initialize the logging subsystem from config plus CLI overrides.
///
/// `--verbose` forces DEBUG level; `--json-logs` forces the JSON format.
pub fn init(config: &LoggingConfig, verbose_override: bool, json_override: bool) {
    let level = if verbose_override {
        "debug"
    } else {
        config.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);
    if json_override || config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}
