// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport and session errors.
//!
//! # Error Categories
//!
//! ```text
//! UaError
//! ├── Connection    - endpoint refused, session lost, not connected
//! ├── Endpoint      - unsupported scheme or unknown simulated server
//! ├── Service       - the server rejected a whole service call
//! ├── Timeout       - an operation exceeded its deadline
//! ├── InvalidNodeId - unparseable node identifier text
//! └── Protocol      - anything else the client library reports
//! ```
//!
//! Transport errors carry no server name. [`UaError::into_access_error`]
//! attaches it when a failure crosses into the attribute layer.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use ualink_core::{AccessError, ErrorSeverity};

use crate::types::StatusCode;

// =============================================================================
// UaError
// =============================================================================

/// Error raised by a transport or session operation.
#[derive(Debug, Clone, Error)]
pub enum UaError {
    /// The endpoint refused or failed the connection.
    #[error("Connection to '{endpoint}' refused: {message}")]
    ConnectionRefused {
        /// Endpoint URL.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// An established session stopped responding.
    #[error("Session with '{endpoint}' was lost")]
    ConnectionLost {
        /// Endpoint URL.
        endpoint: String,
    },

    /// An operation was attempted without a session.
    #[error("Not connected")]
    NotConnected,

    /// The endpoint URL cannot be served by any transport.
    #[error("Unsupported endpoint '{endpoint}': {message}")]
    UnsupportedEndpoint {
        /// Endpoint URL.
        endpoint: String,
        /// Error message.
        message: String,
    },

    /// The server answered a whole service call with a bad status.
    #[error("{service} service failed: {status}")]
    Service {
        /// Service name.
        service: &'static str,
        /// Returned status.
        status: StatusCode,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// The deadline.
        duration: Duration,
    },

    /// Node identifier text could not be parsed.
    #[error("Invalid node id '{node_id}': {message}")]
    InvalidNodeId {
        /// The offending text.
        node_id: String,
        /// Error message.
        message: String,
    },

    /// Other protocol-level failure.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message.
        message: String,
    },
}

impl UaError {
    // =========================================================================
    // Factory Methods
    // =========================================================================

    /// Creates a connection refused error.
    pub fn refused(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionRefused {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a connection lost error.
    pub fn lost(endpoint: impl Into<String>) -> Self {
        Self::ConnectionLost {
            endpoint: endpoint.into(),
        }
    }

    /// Creates an unsupported endpoint error.
    pub fn unsupported_endpoint(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UnsupportedEndpoint {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a service failure.
    pub fn service(service: &'static str, status: StatusCode) -> Self {
        Self::Service { service, status }
    }

    /// Creates a timeout error.
    pub fn timeout(operation: &'static str, duration: Duration) -> Self {
        Self::Timeout {
            operation,
            duration,
        }
    }

    /// Creates an invalid node id error.
    pub fn invalid_node_id(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidNodeId {
            node_id: node_id.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    // =========================================================================
    // Classification
    // =========================================================================

    /// Returns `true` if a new session may clear the error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused { .. }
                | Self::ConnectionLost { .. }
                | Self::NotConnected
                | Self::Timeout { .. }
        )
    }

    /// Returns `true` if the session should be considered dead.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConnectionLost { .. } | Self::NotConnected | Self::Timeout { .. }
        ) || matches!(self, Self::Service { status, .. } if *status == StatusCode::BAD_COMMUNICATION_ERROR)
    }

    /// Returns the severity of this error.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::UnsupportedEndpoint { .. } => ErrorSeverity::Critical,
            Self::InvalidNodeId { .. } => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }

    /// Returns the structured error code.
    pub fn error_code(&self) -> UaErrorCode {
        match self {
            Self::ConnectionRefused { .. } => UaErrorCode::new(1, 1),
            Self::ConnectionLost { .. } => UaErrorCode::new(1, 2),
            Self::NotConnected => UaErrorCode::new(1, 3),
            Self::UnsupportedEndpoint { .. } => UaErrorCode::new(2, 1),
            Self::Service { .. } => UaErrorCode::new(3, 1),
            Self::Timeout { .. } => UaErrorCode::new(4, 1),
            Self::InvalidNodeId { .. } => UaErrorCode::new(5, 1),
            Self::Protocol { .. } => UaErrorCode::new(6, 1),
        }
    }

    /// Converts into the attribute-layer error for `server`.
    pub fn into_access_error(self, server: &str) -> AccessError {
        match self {
            Self::Timeout { duration, .. } => AccessError::timeout(server, duration),
            Self::InvalidNodeId { node_id, message } => {
                AccessError::invalid_address(node_id, message)
            }
            other => AccessError::connection_failure(server, other.to_string()),
        }
    }
}

/// Result alias for transport operations.
pub type UaResult<T> = Result<T, UaError>;

// =============================================================================
// UaErrorCode
// =============================================================================

/// Structured error code, formatted `UA-XXYY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UaErrorCode {
    /// Category.
    pub category: u8,
    /// Specific error within category.
    pub code: u8,
}

impl UaErrorCode {
    /// Creates a new error code.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for UaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UA-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_access_error() {
        let err = UaError::refused("opc.tcp://x:4840", "refused").into_access_error("Plant1");
        assert!(matches!(err, AccessError::ConnectionFailure { ref server, .. } if server == "Plant1"));

        let err = UaError::timeout("read", Duration::from_secs(2)).into_access_error("Plant1");
        assert!(matches!(err, AccessError::Timeout { .. }));

        let err = UaError::invalid_node_id("q=1", "bad").into_access_error("Plant1");
        assert!(matches!(err, AccessError::InvalidAddress { .. }));
    }

    #[test]
    fn test_session_fatal() {
        assert!(UaError::lost("sim://a").is_session_fatal());
        assert!(UaError::service("Read", StatusCode::BAD_COMMUNICATION_ERROR).is_session_fatal());
        assert!(!UaError::service("Read", StatusCode::BAD_TIMEOUT).is_session_fatal());
        assert!(!UaError::protocol("x").is_session_fatal());
    }

    #[test]
    fn test_error_code_format() {
        assert_eq!(UaError::NotConnected.error_code().to_string(), "UA-0103");
    }
}
