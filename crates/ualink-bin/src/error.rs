// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command failures and their process exit codes.

use thiserror::Error;
use ualink_config::ConfigError;
use ualink_core::AccessError;

/// Result type alias for ualink-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Why a `ualink` invocation failed.
///
/// | Variant            | Exit code |
/// |--------------------|-----------|
/// | `Configuration`    | 1         |
/// | `Config`           | 1         |
/// | `Access`           | 2         |
/// | `PartialFailure`   | 3         |
/// | `Io`               | 4         |
/// | `Runtime`          | 5         |
/// | `Interrupted`      | 130       |
#[derive(Debug, Error)]
pub enum BinError {
    /// The configuration loaded but is not usable for this command.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The whole command failed before any key was served.
    #[error("access layer: {0}")]
    Access(#[from] AccessError),

    /// Some keys of a batch failed; their errors were already printed.
    #[error("{failed} of {total} request(s) failed")]
    PartialFailure {
        /// Number of failed requests.
        failed: usize,
        /// Number of requests in the batch.
        total: usize,
    },

    /// Unexpected failure outside the access layer.
    #[error("{0}")]
    Runtime(String),

    /// Local I/O, such as writing to stdout.
    #[error("I/O: {0}")]
    Io(String),

    /// Ctrl-C arrived before the command finished.
    #[error("Interrupted")]
    Interrupted,

    /// Another error with a note on what was being done.
    #[error("{context}: {source}")]
    WithContext {
        /// What was being done.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Wraps `self` with a note on what was being done.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Process exit code; context wrappers report their source's code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Access(_) => 2,
            Self::PartialFailure { .. } => 3,
            Self::Io(_) => 4,
            Self::Runtime(_) => 5,
            Self::Interrupted => 130,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }
}

impl From<std::io::Error> for BinError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BinError {
    fn from(err: serde_json::Error) -> Self {
        Self::Runtime(format!("failed to render output: {}", err))
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Reports an error with appropriate formatting.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }
}

/// Reports an error and exits with the appropriate code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
