// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while locating, parsing and validating a ualink document.

use std::path::PathBuf;
use thiserror::Error;
use ualink_core::AccessError;

/// A Result type with ConfigError.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why a configuration document could not be turned into a [`UalinkConfig`].
///
/// [`UalinkConfig`]: crate::UalinkConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document at `path` is not valid YAML, TOML or JSON for the schema.
    #[error("cannot parse '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    /// A value is present but unacceptable, e.g. a zero timeout.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{field} is required")]
    MissingField { field: String },

    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Neither the given path nor any default location exists.
    #[error("no configuration at '{path}'")]
    FileNotFound { path: PathBuf },

    /// The file extension maps to no known format.
    #[error("unsupported config format '{format}' (expected yaml, yml, toml or json)")]
    UnsupportedFormat { format: String },

    /// A `UALINK_*` override could not be applied.
    #[error("environment override {name}: {message}")]
    EnvVar { name: String, message: String },

    /// Document text failed to deserialize before a path was attached.
    #[error("malformed document: {message}")]
    Serialization { message: String },
}

impl ConfigError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// True when the file itself could not be reached.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound { .. })
    }

    /// Short tag for the `error_type` log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "parse",
            Self::Validation { .. } => "validation",
            Self::MissingField { .. } => "missing_field",
            Self::Io { .. } => "io",
            Self::FileNotFound { .. } => "file_not_found",
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::EnvVar { .. } => "env_var",
            Self::Serialization { .. } => "serialization",
        }
    }
}

/// Registry construction failures (duplicate names and the like) surface
/// as validation errors on `servers`.
impl From<AccessError> for ConfigError {
    fn from(err: AccessError) -> Self {
        Self::validation("servers", err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_creation() {
        let error = ConfigError::validation("session.connect_timeout", "must be positive");
        assert!(matches!(error, ConfigError::Validation { .. }));
        assert_eq!(error.error_type(), "validation");

        let error = ConfigError::missing_field("servers[0].name");
        assert_eq!(error.error_type(), "missing_field");
        assert!(error.to_string().contains("servers[0].name"));
    }

    #[test]
    fn test_config_error_is_io_error() {
        let error = ConfigError::io(
            "ualink.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.is_io_error());
        assert!(ConfigError::file_not_found("ualink.yaml").is_io_error());
        assert!(!ConfigError::missing_field("name").is_io_error());
    }

    #[test]
    fn test_from_access_error() {
        let error: ConfigError = AccessError::configuration("duplicate server name 'a'").into();
        match error {
            ConfigError::Validation { field, message } => {
                assert_eq!(field, "servers");
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
