// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA attribute access for ualink.
//!
//! This crate plugs OPC UA servers into the protocol-agnostic request
//! coalescer of `ualink-core`.
//!
//! # Components
//!
//! ```text
//! AccessLayer
//! ├── RequestCoalescer<OpcUaBackend>   batching, one bulk call per server
//! │   └── OpcUaBackend                 keys → resolved items → service call
//! ├── ConnectionSupervisor             lazy sessions, probe and repair
//! │   └── UaTransport                  sim:// or opc.tcp://
//! ├── AddressResolver                  namespace qualification, paths
//! ├── ValueCodec                       literal parsing, type inference
//! └── SubtreeScanner                   depth-bounded discovery
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ualink_core::{Registry, ServerConfig};
//! use ualink_opcua::{AccessLayer, DefaultTransportFactory, SimulatedServer};
//!
//! let factory = DefaultTransportFactory::new().with_simulated("plant", SimulatedServer::demo());
//! let layer = AccessLayer::builder()
//!     .registry(Registry::new(vec![ServerConfig::new("Plant1", "sim://plant")])?)
//!     .factory(Arc::new(factory))
//!     .build();
//!
//! let write = layer.write_str("Plant1/ns=2;i=5/Value/42/Int32");
//! let read = layer.read_str("Plant1/ns=2;i=5/Value");
//! layer.dispatch().await;
//!
//! assert!(write.await.is_ok());
//! println!("{:?}", read.await.into_result()?.value);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod address;
pub mod backend;
pub mod client;
pub mod codec;
pub mod error;
pub mod layer;
pub mod scanner;
pub mod supervisor;
pub mod types;

pub use address::{AddressResolver, NamespaceContext};
pub use backend::OpcUaBackend;
pub use client::{
    ConnectionState, DataValue, DefaultTransportFactory, ReadValueId, ReferenceDescription,
    SessionSettings, SimulatedServer, SimulatedStats, TransportFactory, UaTransport, Variant,
    WriteValue,
};
pub use codec::{parse_literal, AppValue, DeclaredTypeSource, Prepared, ValueCodec};
pub use error::{UaError, UaErrorCode, UaResult};
pub use layer::{AccessLayer, AccessLayerBuilder};
pub use scanner::{ScannedNode, SubtreeScanner, VariableDescriptor, DEFAULT_MAX_DEPTH};
pub use supervisor::{ConnectionSupervisor, LiveSession, ReloadSummary, ServerStatus};
pub use types::{AttributeId, NodeClass, NodeId, NodeIdentifier, StatusCode, VariantType};

#[cfg(feature = "real-transport")]
pub use client::RealTransport;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
