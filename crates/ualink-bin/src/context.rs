// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Builds the access layer from a loaded configuration.
//!
//! `sim://<name>` endpoints are served by an in-process demo address space,
//! one per distinct name, so the CLI can be tried without a server.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use ualink_config::{ConfigLoader, SessionConfig, UalinkConfig};
use ualink_opcua::client::SIM_SCHEME;
use ualink_opcua::{AccessLayer, DefaultTransportFactory, SessionSettings, SimulatedServer};

use crate::cli::Cli;
use crate::error::BinResult;

/// Loads the configuration named on the command line, or the default file.
pub fn load(cli: &Cli) -> BinResult<(PathBuf, UalinkConfig)> {
    let dir = std::env::current_dir().context("cannot determine the working directory")?;
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| ualink_config::default_path(&dir));
    let config = ConfigLoader::new().discover(cli.config.as_deref(), &dir)?;
    Ok((path, config))
}

/// Maps the session section onto client settings.
pub fn session_settings(config: &SessionConfig) -> SessionSettings {
    let mut settings = SessionSettings::default()
        .with_connect_timeout(config.connect_timeout)
        .with_request_timeout(config.request_timeout)
        .with_session_timeout(config.session_timeout)
        .with_application_name(&config.application_name);
    settings.application_uri = config.application_uri.clone();
    settings
}

/// Builds a transport factory with a demo server behind every `sim://` name.
pub fn transport_factory(config: &UalinkConfig) -> DefaultTransportFactory {
    let mut factory = DefaultTransportFactory::new();
    for server in &config.servers {
        let Some(name) = server.endpoint_address.trim().strip_prefix(SIM_SCHEME) else {
            continue;
        };
        let name = name.trim_end_matches('/');
        if factory.simulated(name).is_none() {
            debug!(server = %server.name, sim = name, "Serving endpoint from simulated address space");
            factory = factory.with_simulated(name, SimulatedServer::demo());
        }
    }
    factory
}

/// Builds the access layer for `config`.
pub fn build_layer(config: &UalinkConfig) -> BinResult<AccessLayer> {
    let registry = config.registry()?;
    info!(servers = registry.len(), "Building access layer");

    Ok(AccessLayer::builder()
        .registry(registry)
        .factory(Arc::new(transport_factory(config)))
        .settings(session_settings(&config.session))
        .scan_depth(config.scan.max_depth)
        .build())
}

/// Loads the configuration and builds the layer in one step.
pub fn open(cli: &Cli) -> BinResult<AccessLayer> {
    let (path, config) = load(cli)?;
    build_layer(&config).map_err(|e| e.with_context(display(&path)))
}

fn display(path: &Path) -> String {
    format!("using {}", path.display())
}

// =============================================================================
// Tests
// =============================================================================
