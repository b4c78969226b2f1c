// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing for ualink.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw text
//! 3. Parse YAML, TOML or JSON into [`UalinkConfig`]
//! 4. Apply `UALINK_*` environment overrides
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! UALINK_CONNECT_TIMEOUT=2s
//! UALINK_REQUEST_TIMEOUT=30s
//! UALINK_SESSION_TIMEOUT=10m
//! UALINK_APPLICATION_NAME=line-monitor
//! UALINK_SCAN_MAX_DEPTH=4
//! ```

use crate::error::{ConfigError, ConfigResult};
use crate::schema::UalinkConfig;
use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File looked up when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "ualink.yaml";

/// Registry file of earlier deployments, tried after the default file.
pub const LEGACY_REGISTRY_FILE: &str = "servers.json";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for ualink.
///
/// # Examples
///
/// ```no_run
/// use ualink_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new().load("ualink.yaml").unwrap();
/// println!("{} servers", config.servers.len());
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables.
    resolve_env_vars: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            env_prefix: "UALINK".to_string(),
            resolve_env_vars: true,
        }
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables placeholder resolution and overrides.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<UalinkConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        let content = self.read_file(path)?;
        let config = self
            .process(&content, format)
            .map_err(|e| match e {
                ConfigError::Serialization { message } => ConfigError::parse(path, message),
                other => other,
            })?;

        info!("Configuration loaded successfully");
        debug!(servers = config.servers.len(), "Loaded server registry");
        Ok(config)
    }

    /// Loads configuration from a string.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<UalinkConfig> {
        self.process(content, format)
    }

    /// Loads the given file, or the first default file present in `dir`.
    pub fn discover(&self, path: Option<&Path>, dir: &Path) -> ConfigResult<UalinkConfig> {
        if let Some(path) = path {
            return self.load(path);
        }
        for name in [DEFAULT_CONFIG_FILE, LEGACY_REGISTRY_FILE] {
            let candidate = dir.join(name);
            if candidate.exists() {
                return self.load(candidate);
            }
        }
        Err(ConfigError::file_not_found(dir.join(DEFAULT_CONFIG_FILE)))
    }

    fn process(&self, content: &str, format: ConfigFormat) -> ConfigResult<UalinkConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        let mut config: UalinkConfig = parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads file content.
    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    /// Resolves environment variable placeholders in content.
    ///
    /// Supports `${VAR_NAME}` and `${VAR_NAME:default}`. An unset variable
    /// without a default is left in place.
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                result.push_str(&rest[start..]);
                return result;
            };

            let body = &after[..end];
            let (name, default) = match body.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (body, None),
            };

            match (env::var(name), default) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", name);
                    result.push_str(&rest[start..start + 3 + end]);
                }
            }
            rest = &after[end + 1..];
        }

        result.push_str(rest);
        result
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut UalinkConfig) -> ConfigResult<()> {
        if let Some(value) = self.env("CONNECT_TIMEOUT") {
            config.session.connect_timeout = self.parse_duration("CONNECT_TIMEOUT", &value)?;
        }
        if let Some(value) = self.env("REQUEST_TIMEOUT") {
            config.session.request_timeout = self.parse_duration("REQUEST_TIMEOUT", &value)?;
        }
        if let Some(value) = self.env("SESSION_TIMEOUT") {
            config.session.session_timeout = self.parse_duration("SESSION_TIMEOUT", &value)?;
        }
        if let Some(value) = self.env("APPLICATION_NAME") {
            config.session.application_name = value;
        }
        if let Some(value) = self.env("SCAN_MAX_DEPTH") {
            config.scan.max_depth = value.trim().parse().map_err(|_| {
                ConfigError::env_var(self.var_name("SCAN_MAX_DEPTH"), "expected a non-negative integer")
            })?;
        }
        Ok(())
    }

    fn var_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn env(&self, suffix: &str) -> Option<String> {
        env::var(self.var_name(suffix)).ok()
    }

    fn parse_duration(&self, suffix: &str, value: &str) -> ConfigResult<std::time::Duration> {
        humantime::parse_duration(value.trim())
            .map_err(|e| ConfigError::env_var(self.var_name(suffix), e.to_string()))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_str<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> ConfigResult<T> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::serialization(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<UalinkConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<UalinkConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

/// Resolves the path [`ConfigLoader::discover`] would load from `dir`.
pub fn default_path(dir: &Path) -> PathBuf {
    let legacy = dir.join(LEGACY_REGISTRY_FILE);
    let primary = dir.join(DEFAULT_CONFIG_FILE);
    if !primary.exists() && legacy.exists() {
        legacy
    } else {
        primary
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const YAML: &str = r#"
servers:
  - name: Plant1
    endPointAddress: opc.tcp://plant1:4840
    nameSpaceUri: urn:plant1
    browseRootNodeIdentifier: s=Plant1.Line
  - name: Plant2
    endpoint_address: sim://plant2
session:
  connect_timeout: 2s
  request_timeout: 1m
scan:
  max_depth: 4
"#;

    fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(suffix).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn isolated() -> ConfigLoader {
        ConfigLoader::new().with_env_prefix("UALINK_LOADER_TEST_UNUSED")
    }

    #[test]
    fn test_load_yaml() {
        let file = write_temp(".yaml", YAML);
        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[0].name, "Plant1");
        assert_eq!(config.servers[0].endpoint_address, "opc.tcp://plant1:4840");
        assert_eq!(config.servers[0].namespace_root(), Some(("urn:plant1", "s=Plant1.Line")));
        assert_eq!(config.servers[1].endpoint_address, "sim://plant2");
        assert_eq!(config.session.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.session.request_timeout, Duration::from_secs(60));
        assert_eq!(config.session.application_name, "ualink");
        assert_eq!(config.scan.max_depth, 4);
    }

    #[test]
    fn test_load_legacy_servers_json() {
        let json = r#"{"servers": [
            {"name": "Plant1", "endPointAddress": "opc.tcp://plant1:4840",
             "nameSpaceUri": "urn:plant1", "browseRootNodeIdentifier": "s=Plant1"}
        ]}"#;
        let file = write_temp(".json", json);
        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.servers.len(), 1);
        assert_eq!(config.session.request_timeout, Duration::from_secs(10));
        assert_eq!(config.scan.max_depth, 10);
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
[[servers]]
name = "Plant1"
endPointAddress = "sim://plant"

[session]
request_timeout = "500ms"
"#;
        let file = write_temp(".toml", toml);
        let config = isolated().load(file.path()).unwrap();

        assert_eq!(config.servers[0].name, "Plant1");
        assert_eq!(config.session.request_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_duplicate_server_rejected() {
        let json = r#"{"servers": [
            {"name": "A", "endPointAddress": "sim://a"},
            {"name": "A", "endPointAddress": "sim://b"}
        ]}"#;
        let result = isolated().load_from_str(json, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let file = write_temp(".json", "{ not json");
        match isolated().load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_section_rejected() {
        let json = r#"{"servers": [], "gateway": {}}"#;
        assert!(isolated().load_from_str(json, ConfigFormat::Json).is_err());
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("ualink.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("ualink.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("servers.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("ualink.ini")).is_err());
        assert!(ConfigFormat::from_path(Path::new("ualink")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let result = isolated().resolve_env_placeholders("endpoint: ${UALINK_NONEXISTENT_VAR:sim://x}");
        assert_eq!(result, "endpoint: sim://x");
    }

    #[test]
    fn test_env_placeholder_unset_kept() {
        let loader = isolated();
        let result = loader.resolve_env_placeholders("a: ${UALINK_NONEXISTENT_VAR} b: ${open");
        assert_eq!(result, "a: ${UALINK_NONEXISTENT_VAR} b: ${open");
    }

    #[test]
    fn test_env_placeholder_resolved() {
        env::set_var("UALINK_LOADER_TEST_ENDPOINT", "sim://from-env");
        let result = isolated().resolve_env_placeholders("x: ${UALINK_LOADER_TEST_ENDPOINT:unused}!");
        assert_eq!(result, "x: sim://from-env!");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("UALINK_OVR_TEST_REQUEST_TIMEOUT", "3s");
        env::set_var("UALINK_OVR_TEST_SCAN_MAX_DEPTH", "2");
        env::set_var("UALINK_OVR_TEST_APPLICATION_NAME", "overridden");
        env::set_var("UALINK_OVR_TEST_SESSION_TIMEOUT", "10m");

        let loader = ConfigLoader::new().with_env_prefix("UALINK_OVR_TEST");
        let config = loader.load_from_str(r#"{"servers": []}"#, ConfigFormat::Json).unwrap();

        assert_eq!(config.session.request_timeout, Duration::from_secs(3));
        assert_eq!(config.scan.max_depth, 2);
        assert_eq!(config.session.application_name, "overridden");
        assert_eq!(config.session.session_timeout, Duration::from_secs(600));
    }

    #[test]
    fn test_invalid_env_override() {
        env::set_var("UALINK_BAD_TEST_SCAN_MAX_DEPTH", "deep");
        let loader = ConfigLoader::new().with_env_prefix("UALINK_BAD_TEST");
        let result = loader.load_from_str(r#"{"servers": []}"#, ConfigFormat::Json);
        assert!(matches!(result, Err(ConfigError::EnvVar { .. })));
    }

    #[test]
    fn test_file_not_found() {
        let result = isolated().load("/nonexistent/path/ualink.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_discover_falls_back_to_legacy() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(LEGACY_REGISTRY_FILE),
            r#"{"servers": [{"name": "Old", "endPointAddress": "sim://old"}]}"#,
        )
        .unwrap();

        let config = isolated().discover(None, dir.path()).unwrap();
        assert_eq!(config.servers[0].name, "Old");
        assert_eq!(default_path(dir.path()), dir.path().join(LEGACY_REGISTRY_FILE));
    }

    #[test]
    fn test_discover_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            isolated().discover(None, dir.path()),
            Err(ConfigError::FileNotFound { .. })
        ));
    }
}
