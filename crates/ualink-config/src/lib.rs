// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ualink-config
//!
//! Configuration management for the ualink access layer.
//!
//! ## Features
//!
//! - **Schema Definition**: server registry plus session and scan settings
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Legacy Registry**: a bare `servers.json` is a complete document
//! - **Environment Overrides**: `UALINK_*` variables and `${VAR:default}` placeholders
//!
//! ## Quick Start
//!
//! ```no_run
//! use ualink_config::loader::load_config;
//!
//! let config = load_config("ualink.yaml").unwrap();
//! let registry = config.registry().unwrap();
//! println!("Servers: {:?}", registry.names());
//! ```
//!
//! ## Configuration Schema
//!
//! ```yaml
//! servers:
//!   - name: Plant1
//!     endPointAddress: "${PLANT1_ENDPOINT:opc.tcp://plant1:4840}"
//!     nameSpaceUri: urn:plant1
//!     browseRootNodeIdentifier: s=Plant1.Line
//! session:
//!   connect_timeout: 5s
//!   request_timeout: 10s
//! scan:
//!   max_depth: 10
//! ```

#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    default_path, load_config, load_config_str, ConfigFormat, ConfigLoader, DEFAULT_CONFIG_FILE,
    LEGACY_REGISTRY_FILE,
};
pub use schema::{
    ScanConfig, SessionConfig, UalinkConfig,
    DEFAULT_APPLICATION_NAME, DEFAULT_APPLICATION_URI, DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_DEPTH,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SESSION_TIMEOUT,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name() {
        assert_eq!(NAME, "ualink-config");
        assert!(!VERSION.is_empty());
    }
}
