// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Endpoint scheme dispatch.
//!
//! | Scheme        | Transport                                   |
//! |---------------|---------------------------------------------|
//! | `opc.tcp://`  | network client (`real-transport` feature)   |
//! | `sim://name`  | [`SimulatedServer`] registered under `name` |

use std::collections::HashMap;

use ualink_core::ServerConfig;

use crate::client::session::SessionSettings;
use crate::client::simulated::SimulatedServer;
use crate::client::transport::UaTransport;
use crate::error::{UaError, UaResult};

/// Scheme prefix of simulated endpoints.
pub const SIM_SCHEME: &str = "sim://";

/// Scheme prefix of OPC UA binary endpoints.
pub const TCP_SCHEME: &str = "opc.tcp://";

/// Builds an unconnected transport for a server record.
pub trait TransportFactory: Send + Sync {
    /// Creates a transport for `config`.
    fn create(
        &self,
        config: &ServerConfig,
        settings: &SessionSettings,
    ) -> UaResult<Box<dyn UaTransport>>;
}

/// Factory selecting the transport from the endpoint scheme.
#[derive(Debug, Default, Clone)]
pub struct DefaultTransportFactory {
    simulated: HashMap<String, SimulatedServer>,
}

impl DefaultTransportFactory {
    /// Creates a factory with no simulated servers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a simulated server reachable at `sim://<name>`.
    pub fn with_simulated(mut self, name: impl Into<String>, server: SimulatedServer) -> Self {
        self.simulated.insert(name.into(), server);
        self
    }

    /// Returns the simulated server registered under `name`.
    pub fn simulated(&self, name: &str) -> Option<&SimulatedServer> {
        self.simulated.get(name)
    }
}

impl TransportFactory for DefaultTransportFactory {
    fn create(
        &self,
        config: &ServerConfig,
        settings: &SessionSettings,
    ) -> UaResult<Box<dyn UaTransport>> {
        let endpoint = config.endpoint_address.trim();

        if let Some(name) = endpoint.strip_prefix(SIM_SCHEME) {
            let name = name.trim_end_matches('/');
            return match self.simulated.get(name) {
                Some(server) => Ok(Box::new(server.transport(endpoint))),
                None => Err(UaError::unsupported_endpoint(
                    endpoint,
                    format!("no simulated server named '{}'", name),
                )),
            };
        }

        if endpoint.starts_with(TCP_SCHEME) {
            return tcp_transport(endpoint, settings);
        }

        Err(UaError::unsupported_endpoint(endpoint, "unknown scheme"))
    }
}

#[cfg(feature = "real-transport")]
fn tcp_transport(endpoint: &str, settings: &SessionSettings) -> UaResult<Box<dyn UaTransport>> {
    Ok(Box::new(crate::client::real_transport::RealTransport::new(
        endpoint, settings,
    )))
}

#[cfg(not(feature = "real-transport"))]
fn tcp_transport(endpoint: &str, _settings: &SessionSettings) -> UaResult<Box<dyn UaTransport>> {
    Err(UaError::unsupported_endpoint(
        endpoint,
        "built without the real-transport feature",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_dispatch() {
        let factory = DefaultTransportFactory::new().with_simulated("plant", SimulatedServer::new());
        let settings = SessionSettings::default();

        let ok = factory.create(&ServerConfig::new("P", "sim://plant"), &settings);
        assert_eq!(ok.unwrap().endpoint(), "sim://plant");

        let missing = factory.create(&ServerConfig::new("P", "sim://other"), &settings);
        assert!(matches!(missing, Err(UaError::UnsupportedEndpoint { .. })));

        let unknown = factory.create(&ServerConfig::new("P", "http://x"), &settings);
        assert!(matches!(unknown, Err(UaError::UnsupportedEndpoint { .. })));
    }
}
