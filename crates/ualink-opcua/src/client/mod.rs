// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA client plumbing.
//!
//! - **Transport**: the [`UaTransport`] contract and its value records
//! - **Session**: connection state, settings and lifecycle counters
//! - **Connector**: endpoint scheme to transport dispatch
//! - **Simulated**: an in-process server behind `sim://` endpoints
//!
//! ```text
//! ┌──────────────────────────┐
//! │   ConnectionSupervisor   │
//! └────────────┬─────────────┘
//!              │ TransportFactory::create
//!              ▼
//! ┌──────────────────────────┐
//! │   Box<dyn UaTransport>   │
//! ├────────────┬─────────────┤
//! │ Simulated  │    Real     │
//! │ (sim://)   │ (opc.tcp://)│
//! └────────────┴─────────────┘
//! ```

mod connector;
#[cfg_attr(not(feature = "real-transport"), allow(dead_code))]
mod handoff;
mod session;
mod simulated;
mod transport;

#[cfg(feature = "real-transport")]
mod real_transport;

pub use connector::{DefaultTransportFactory, TransportFactory, SIM_SCHEME, TCP_SCHEME};
pub use session::{
    ConnectionState, SessionSettings, SessionStats, SessionStatsSnapshot, StateCell,
};
pub use simulated::{SimulatedServer, SimulatedStats, SimulatedTransport};
pub use transport::{
    DataValue, ReadValueId, ReferenceDescription, UaTransport, Variant, WriteValue,
};

#[cfg(feature = "real-transport")]
pub use real_transport::RealTransport;
