// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server registrations and the immutable registry snapshot.
//!
//! A [`Registry`] is built once from an ordered list of [`ServerConfig`]
//! records and never mutated afterwards. Reloading produces a new snapshot
//! that the connection supervisor swaps in as a whole.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{AccessError, AccessResult};

// =============================================================================
// ServerConfig
// =============================================================================

/// One registered server.
///
/// Field names follow the registry file layout (`endPointAddress`,
/// `nameSpaceUri`, `browseRootNodeIdentifier`); snake_case spellings are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Unique server name used as the first segment of attribute keys.
    pub name: String,

    /// Endpoint URL, e.g. `opc.tcp://plant1:4840`.
    #[serde(
        rename = "endPointAddress",
        alias = "endpoint_address",
        alias = "endpointAddress",
        alias = "endpointaddress",
        alias = "endpoint"
    )]
    pub endpoint_address: String,

    /// Namespace URI whose per-session index qualifies relative node ids.
    #[serde(
        default,
        rename = "nameSpaceUri",
        alias = "namespace_uri",
        alias = "namespaceUri",
        alias = "namespaceuri",
        skip_serializing_if = "Option::is_none"
    )]
    pub namespace_uri: Option<String>,

    /// Identifier of the browse root inside that namespace, e.g. `s=Plant1.Line`.
    #[serde(
        default,
        rename = "browseRootNodeIdentifier",
        alias = "browse_root_identifier",
        alias = "browseRootIdentifier",
        alias = "browserootnodeidentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub browse_root_identifier: Option<String>,
}

impl ServerConfig {
    /// Creates a registration without namespace configuration.
    pub fn new(name: impl Into<String>, endpoint_address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint_address: endpoint_address.into(),
            namespace_uri: None,
            browse_root_identifier: None,
        }
    }

    /// Sets the namespace URI and browse root.
    pub fn with_namespace(
        mut self,
        namespace_uri: impl Into<String>,
        browse_root_identifier: impl Into<String>,
    ) -> Self {
        self.namespace_uri = Some(namespace_uri.into());
        self.browse_root_identifier = Some(browse_root_identifier.into());
        self
    }

    /// Returns the namespace URI and root identifier when both are set.
    ///
    /// Namespace resolution only happens when the pair is complete.
    pub fn namespace_root(&self) -> Option<(&str, &str)> {
        match (&self.namespace_uri, &self.browse_root_identifier) {
            (Some(uri), Some(root)) if !uri.is_empty() && !root.is_empty() => {
                Some((uri.as_str(), root.as_str()))
            }
            _ => None,
        }
    }

    /// Validates a single registration.
    pub fn validate(&self) -> AccessResult<()> {
        if self.name.trim().is_empty() {
            return Err(AccessError::configuration("server name must not be empty"));
        }
        if self.name.contains('/') {
            return Err(AccessError::configuration(format!(
                "server name '{}' must not contain '/'",
                self.name
            )));
        }
        if self.endpoint_address.trim().is_empty() {
            return Err(AccessError::configuration(format!(
                "server '{}' has an empty endpoint address",
                self.name
            )));
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Immutable, ordered snapshot of server registrations with unique names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    servers: Vec<ServerConfig>,
}

impl Registry {
    /// Builds a snapshot, rejecting invalid entries and duplicate names.
    pub fn new(servers: Vec<ServerConfig>) -> AccessResult<Self> {
        let mut seen = HashSet::with_capacity(servers.len());
        for server in &servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(AccessError::configuration(format!(
                    "duplicate server name '{}'",
                    server.name
                )));
            }
        }
        Ok(Self { servers })
    }

    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Looks up a registration by name.
    pub fn get(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|s| s.name == name)
    }

    /// Returns `true` if a server with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates registrations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ServerConfig> {
        self.servers.iter()
    }

    /// Returns server names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.name.as_str()).collect()
    }

    /// Returns the number of registered servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

impl<'a> IntoIterator for &'a Registry {
    type Item = &'a ServerConfig;
    type IntoIter = std::slice::Iter<'a, ServerConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_preserves_order() {
        let registry = Registry::new(vec![
            ServerConfig::new("b", "sim://b"),
            ServerConfig::new("a", "sim://a"),
        ])
        .unwrap();
        assert_eq!(registry.names(), vec!["b", "a"]);
        assert_eq!(registry.get("a").unwrap().endpoint_address, "sim://a");
    }

    #[test]
    fn test_registry_rejects_duplicates() {
        let err = Registry::new(vec![
            ServerConfig::new("a", "sim://a"),
            ServerConfig::new("a", "sim://other"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("duplicate server name 'a'"));
    }

    #[test]
    fn test_registry_rejects_slash_in_name() {
        assert!(Registry::new(vec![ServerConfig::new("a/b", "sim://a")]).is_err());
    }

    #[test]
    fn test_namespace_root_requires_both() {
        let mut config = ServerConfig::new("a", "sim://a");
        config.namespace_uri = Some("urn:a".into());
        assert!(config.namespace_root().is_none());

        let config = config.with_namespace("urn:a", "s=Plant.Line");
        assert_eq!(config.namespace_root(), Some(("urn:a", "s=Plant.Line")));
    }

    #[test]
    fn test_server_config_legacy_field_names() {
        let json = r#"{
            "name": "TestServer",
            "endPointAddress": "opc.tcp://localhost:4840",
            "nameSpaceUri": "urn:test",
            "browseRootNodeIdentifier": "s=Root.Folder"
        }"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint_address, "opc.tcp://localhost:4840");
        assert_eq!(config.namespace_uri.as_deref(), Some("urn:test"));
        assert_eq!(config.browse_root_identifier.as_deref(), Some("s=Root.Folder"));
    }

    #[test]
    fn test_server_config_snake_case_aliases() {
        let json = r#"{"name": "x", "endpoint_address": "sim://x"}"#;
        let config: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.endpoint_address, "sim://x");
        assert!(config.namespace_uri.is_none());
    }
}
