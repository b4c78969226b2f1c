// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types shared by every ualink crate.
//!
//! [`AccessError`] is the failure carried in a request's result slot. It is
//! `Clone` because a failure that hits a whole server group (an unreachable
//! endpoint, a missing namespace) is delivered to every request of that
//! group.
//!
//! # Error Scopes
//!
//! ```text
//! AccessError
//! ├── per request   - InvalidKey, InvalidAddress, UnsupportedValueType,
//! │                   UnsupportedLiteral, RemoteOperationFailure, UnknownServer
//! └── per server    - ConnectionFailure, NamespaceNotFound, Timeout
//! ```
//!
//! # Examples
//!
//! ```
//! use ualink_core::error::AccessError;
//!
//! let error = AccessError::connection_failure("Plant1", "connection refused");
//! assert!(error.is_retryable());
//! assert!(error.affects_server());
//! assert_eq!(error.error_code().to_string(), "UL-0101");
//! ```

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

// =============================================================================
// AccessError
// =============================================================================

/// Failure of a single attribute request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    /// The key names a server that is not in the registry.
    #[error("Unknown server '{server}'")]
    UnknownServer {
        /// The requested server name.
        server: String,
    },

    /// A session could not be established or re-established.
    #[error("Connection to '{server}' failed: {message}")]
    ConnectionFailure {
        /// Server name.
        server: String,
        /// Underlying cause.
        message: String,
    },

    /// The configured namespace URI is absent from the server's namespace table.
    #[error("Namespace '{namespace_uri}' not found on server '{server}'")]
    NamespaceNotFound {
        /// Server name.
        server: String,
        /// The configured namespace URI.
        namespace_uri: String,
    },

    /// The value shape cannot be mapped to a wire type.
    #[error("Unsupported value type: {message}")]
    UnsupportedValueType {
        /// Description of the rejected value.
        message: String,
    },

    /// A literal could not be converted to the requested type.
    #[error("Unsupported literal '{literal}' for type '{type_tag}'")]
    UnsupportedLiteral {
        /// The literal text.
        literal: String,
        /// The requested type tag.
        type_tag: String,
    },

    /// The remote server reported a bad status for one item.
    #[error("Remote operation on '{node}' failed with {status} (0x{code:08X})")]
    RemoteOperationFailure {
        /// The node the item targeted.
        node: String,
        /// Symbolic status name.
        status: String,
        /// Raw status code.
        code: u32,
    },

    /// A connection attempt or bulk call exceeded its deadline.
    #[error("Operation on '{server}' timed out after {duration:?}")]
    Timeout {
        /// Server name.
        server: String,
        /// The deadline that was exceeded.
        duration: Duration,
    },

    /// An attribute key did not match the wire format.
    #[error("Invalid attribute key '{key}': {message}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// A node address could not be parsed.
    #[error("Invalid node address '{address}': {message}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// What was wrong with it.
        message: String,
    },

    /// Registry or settings are inconsistent.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// The batch was dropped before this request was resolved.
    #[error("Request was cancelled before completion")]
    Cancelled,
}

impl AccessError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates an unknown server error.
    pub fn unknown_server(server: impl Into<String>) -> Self {
        Self::UnknownServer { server: server.into() }
    }

    /// Creates a connection failure.
    pub fn connection_failure(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailure {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Creates a namespace not found error.
    pub fn namespace_not_found(server: impl Into<String>, namespace_uri: impl Into<String>) -> Self {
        Self::NamespaceNotFound {
            server: server.into(),
            namespace_uri: namespace_uri.into(),
        }
    }

    /// Creates an unsupported value type error.
    pub fn unsupported_value_type(message: impl Into<String>) -> Self {
        Self::UnsupportedValueType { message: message.into() }
    }

    /// Creates an unsupported literal error.
    pub fn unsupported_literal(literal: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self::UnsupportedLiteral {
            literal: literal.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Creates a remote operation failure.
    pub fn remote_failure(node: impl Into<String>, status: impl Into<String>, code: u32) -> Self {
        Self::RemoteOperationFailure {
            node: node.into(),
            status: status.into(),
            code,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(server: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            server: server.into(),
            duration,
        }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid address error.
    pub fn invalid_address(address: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidAddress {
            address: address.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration { message: message.into() }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns `true` if a later attempt may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailure { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this failure applies to a whole server group rather
    /// than a single request.
    pub fn affects_server(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailure { .. } | Self::NamespaceNotFound { .. } | Self::Timeout { .. }
        )
    }

    /// Returns the server name carried by the error, if any.
    pub fn server(&self) -> Option<&str> {
        match self {
            Self::UnknownServer { server }
            | Self::ConnectionFailure { server, .. }
            | Self::NamespaceNotFound { server, .. }
            | Self::Timeout { server, .. } => Some(server),
            _ => None,
        }
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NamespaceNotFound { .. } | Self::Configuration { .. } => ErrorSeverity::Critical,
            Self::ConnectionFailure { .. } | Self::Timeout { .. } => ErrorSeverity::Error,
            Self::RemoteOperationFailure { .. }
            | Self::UnknownServer { .. }
            | Self::UnsupportedValueType { .. }
            | Self::UnsupportedLiteral { .. }
            | Self::InvalidKey { .. }
            | Self::InvalidAddress { .. } => ErrorSeverity::Warning,
            Self::Cancelled => ErrorSeverity::Info,
        }
    }

    /// Returns the structured error code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::ConnectionFailure { .. } => ErrorCode::new(1, 1),
            Self::Timeout { .. } => ErrorCode::new(1, 2),
            Self::NamespaceNotFound { .. } => ErrorCode::new(2, 1),
            Self::UnknownServer { .. } => ErrorCode::new(2, 2),
            Self::Configuration { .. } => ErrorCode::new(2, 3),
            Self::InvalidKey { .. } => ErrorCode::new(3, 1),
            Self::InvalidAddress { .. } => ErrorCode::new(3, 2),
            Self::UnsupportedValueType { .. } => ErrorCode::new(4, 1),
            Self::UnsupportedLiteral { .. } => ErrorCode::new(4, 2),
            Self::RemoteOperationFailure { .. } => ErrorCode::new(5, 1),
            Self::Cancelled => ErrorCode::new(6, 1),
        }
    }

    /// Returns the error type for log fields.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownServer { .. } => "unknown_server",
            Self::ConnectionFailure { .. } => "connection_failure",
            Self::NamespaceNotFound { .. } => "namespace_not_found",
            Self::UnsupportedValueType { .. } => "unsupported_value_type",
            Self::UnsupportedLiteral { .. } => "unsupported_literal",
            Self::RemoteOperationFailure { .. } => "remote_operation_failure",
            Self::Timeout { .. } => "timeout",
            Self::InvalidKey { .. } => "invalid_key",
            Self::InvalidAddress { .. } => "invalid_address",
            Self::Configuration { .. } => "configuration",
            Self::Cancelled => "cancelled",
        }
    }

    /// Logs the error at a level derived from its severity.
    pub fn log(&self, context: &str) {
        let code = self.error_code();
        match self.severity().to_tracing_level() {
            Level::ERROR => tracing::error!(
                error_code = %code,
                error_type = self.error_type(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            Level::WARN => tracing::warn!(
                error_code = %code,
                error_type = self.error_type(),
                context = context,
                retryable = self.is_retryable(),
                "{self}"
            ),
            _ => tracing::debug!(
                error_code = %code,
                error_type = self.error_type(),
                context = context,
                "{self}"
            ),
        }
    }
}

/// Result alias for attribute access.
pub type AccessResult<T> = Result<T, AccessError>;

// =============================================================================
// ErrorSeverity
// =============================================================================

/// Error severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, no action required.
    Info,
    /// A single request failed.
    Warning,
    /// A server is unavailable.
    Error,
    /// Operator action required.
    Critical,
}

impl ErrorSeverity {
    /// Converts to tracing level.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Info => Level::INFO,
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// ErrorCode
// =============================================================================

/// Structured error code.
///
/// Format: `UL-XXYY` where XX is the category and YY the specific error.
///
/// Categories:
/// - 1: Connection
/// - 2: Registry
/// - 3: Addressing
/// - 4: Codec
/// - 5: Remote
/// - 6: Lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl ErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UL-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================
