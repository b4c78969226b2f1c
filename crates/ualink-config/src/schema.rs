// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for ualink.
//!
//! # Schema Structure
//!
//! ```text
//! UalinkConfig
//! ├── servers: Vec<ServerConfig>
//! ├── session: SessionConfig
//! └── scan: ScanConfig
//! ```
//!
//! A legacy registry file holding only `{"servers": [...]}` is a complete
//! document; every other section has defaults.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use ualink_core::{Registry, ServerConfig};

// =============================================================================
// Constants
// =============================================================================

/// Default session establishment timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default bulk call timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default idle session lifetime requested from servers.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default client application name.
pub const DEFAULT_APPLICATION_NAME: &str = "ualink";

/// Default client application URI.
pub const DEFAULT_APPLICATION_URI: &str = "urn:ualink:client";

/// Default scan depth.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for ualink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UalinkConfig {
    /// Registered servers, in declaration order.
    #[serde(default)]
    pub servers: Vec<ServerConfig>,

    /// Session settings shared by every server.
    #[serde(default)]
    pub session: SessionConfig,

    /// Subtree scan settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

impl UalinkConfig {
    /// Validates the entire configuration.
    ///
    /// Half-configured namespaces are not errors; they are logged and
    /// reported by [`warnings`](Self::warnings).
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for (i, server) in self.servers.iter().enumerate() {
            let field = format!("servers[{}]", i);
            if server.name.trim().is_empty() {
                return Err(ConfigError::missing_field(format!("{}.name", field)));
            }
            if server.name.contains('/') {
                return Err(ConfigError::validation(
                    format!("{}.name", field),
                    format!("'{}' must not contain '/'", server.name),
                ));
            }
            if server.endpoint_address.trim().is_empty() {
                return Err(ConfigError::missing_field(format!("{}.endPointAddress", field)));
            }
            if !seen.insert(server.name.as_str()) {
                return Err(ConfigError::validation(
                    format!("{}.name", field),
                    format!("duplicate server name '{}'", server.name),
                ));
            }
        }

        self.session.validate()?;

        for warning in self.warnings() {
            warn!("{}", warning);
        }
        Ok(())
    }

    /// Returns non-fatal findings.
    pub fn warnings(&self) -> Vec<String> {
        self.servers
            .iter()
            .filter_map(|s| match (&s.namespace_uri, &s.browse_root_identifier) {
                (Some(_), None) => Some(format!(
                    "server '{}' sets nameSpaceUri without browseRootNodeIdentifier; namespace is ignored",
                    s.name
                )),
                (None, Some(_)) => Some(format!(
                    "server '{}' sets browseRootNodeIdentifier without nameSpaceUri; root is ignored",
                    s.name
                )),
                _ => None,
            })
            .collect()
    }

    /// Builds the registry snapshot.
    pub fn registry(&self) -> ConfigResult<Registry> {
        Ok(Registry::new(self.servers.clone())?)
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Session settings applied to every server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Session establishment timeout.
    #[serde(default = "default_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,

    /// Timeout of each bulk call.
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,

    /// How long a server keeps an idle session alive.
    #[serde(default = "default_session_timeout", with = "duration")]
    pub session_timeout: Duration,

    /// Client application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Client application URI.
    #[serde(default = "default_application_uri")]
    pub application_uri: String,
}

impl SessionConfig {
    /// Validates the session settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::validation(
                "session.connect_timeout",
                "must be greater than zero",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::validation(
                "session.request_timeout",
                "must be greater than zero",
            ));
        }
        if self.session_timeout.is_zero() {
            return Err(ConfigError::validation(
                "session.session_timeout",
                "must be greater than zero",
            ));
        }
        if self.application_name.trim().is_empty() {
            return Err(ConfigError::missing_field("session.application_name"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            application_name: default_application_name(),
            application_uri: default_application_uri(),
        }
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

/// Subtree scan settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    /// Depth used when a scan gives none.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_session_timeout() -> Duration {
    DEFAULT_SESSION_TIMEOUT
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

fn default_application_uri() -> String {
    DEFAULT_APPLICATION_URI.to_string()
}

fn default_max_depth() -> u32 {
    DEFAULT_MAX_DEPTH
}

mod duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*value)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn config(servers: Vec<ServerConfig>) -> UalinkConfig {
        UalinkConfig {
            servers,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = UalinkConfig::default();
        assert!(config.servers.is_empty());
        assert_eq!(config.session.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.session.request_timeout, Duration::from_secs(10));
        assert_eq!(config.session.session_timeout, Duration::from_secs(60));
        assert_eq!(config.session.application_name, "ualink");
        assert_eq!(config.scan.max_depth, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = config(vec![
            ServerConfig::new("Plant1", "opc.tcp://a:4840"),
            ServerConfig::new("Plant1", "opc.tcp://b:4840"),
        ]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate server name"));
    }

    #[test]
    fn test_slash_in_name_rejected() {
        let config = config(vec![ServerConfig::new("Plant/1", "opc.tcp://a:4840")]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn test_empty_endpoint_rejected() {
        let config = config(vec![ServerConfig::new("Plant1", " ")]);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = UalinkConfig::default();
        config.session.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_session_timeout_rejected() {
        let mut config = UalinkConfig::default();
        config.session.session_timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session.session_timeout"));
    }

    #[test]
    fn test_half_namespace_warns_but_validates() {
        let mut server = ServerConfig::new("Plant1", "opc.tcp://a:4840");
        server.browse_root_identifier = Some("s=Plant1".into());
        let config = config(vec![server]);

        assert!(config.validate().is_ok());
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("without nameSpaceUri"));
    }

    #[test]
    fn test_registry_keeps_order() {
        let config = config(vec![
            ServerConfig::new("b", "sim://b"),
            ServerConfig::new("a", "sim://a"),
        ]);
        let registry = config.registry().unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
    }

    #[test]
    fn test_session_durations_serialize_as_humantime() {
        let json = serde_json::to_value(SessionConfig::default()).unwrap();
        assert_eq!(json["connect_timeout"], "5s");
        assert_eq!(json["request_timeout"], "10s");
        assert_eq!(json["session_timeout"], "1m");
    }
}
