// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `RUST_LOG` takes precedence over `--log-level`.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::LogFormat;

// =============================================================================
// Logging Initialization
// =============================================================================

/// Installs the global subscriber for `format`, filtered by [`build_filter`].
///
/// A second call leaves the first subscriber in place.
///
/// ```ignore
/// ualink_bin::init_logging("debug", ualink_bin::cli::LogFormat::Compact);
/// ```
pub fn init_logging(level: &str, format: LogFormat) {
    let ansi = std::io::stderr().is_terminal();
    let registry = tracing_subscriber::registry().with(build_filter(level));

    let installed = match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_ansi(ansi))
            .try_init(),
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(true)
                    .flatten_event(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(ansi),
            )
            .try_init(),
    };

    if let Err(e) = installed {
        eprintln!("logging already initialised: {}", e);
    }
}

/// `RUST_LOG` if set, else `level` with the `opcua` stack held at `warn`.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},opcua=warn", parse_level(level))))
}

// =============================================================================
// Log Level Parsing
// =============================================================================

/// Parses a log level string into a `Level`.
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("Info"), Level::INFO);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("invalid"), Level::INFO);
    }
}
