// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session settings, connection state and session statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// ConnectionState
// =============================================================================

/// Lifecycle state of one server connection.
///
/// ```text
/// Disconnected ──acquire──▶ Connecting ──ok──▶ Connected
///      ▲                        │                  │
///      └──────── failure ───────┘◀── probe/transport failure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected = 0,

    /// Establishment in progress.
    Connecting = 1,

    /// Session open and namespace resolved.
    Connected = 2,
}

impl ConnectionState {
    /// Returns `true` if connected.
    #[inline]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

/// Lock-free holder of a [`ConnectionState`].
///
/// Readable without taking the connection lock, so status listings never
/// wait behind an in-flight establishment.
#[derive(Debug, Default)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Returns the current state.
    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Stores a new state and returns the previous one.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}

// =============================================================================
// SessionSettings
// =============================================================================

/// Settings shared by every session the layer opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// Deadline for one establishment attempt, including namespace lookup.
    pub connect_timeout: Duration,

    /// Deadline for one bulk read, write or browse call.
    pub request_timeout: Duration,

    /// How long the server keeps an idle session before closing it.
    pub session_timeout: Duration,

    /// Client application name announced to servers.
    pub application_name: String,

    /// Client application URI announced to servers.
    pub application_uri: String,

    /// Reconnect attempts the client library may make on its own.
    pub session_retry_limit: i32,
}

impl SessionSettings {
    /// Sets the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the idle session lifetime requested from servers.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Sets the application name.
    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            session_timeout: Duration::from_secs(60),
            application_name: "ualink".to_string(),
            application_uri: "urn:ualink:client".to_string(),
            session_retry_limit: 0,
        }
    }
}

// =============================================================================
// SessionStats
// =============================================================================

/// Connection lifecycle counters.
#[derive(Debug, Default)]
pub struct SessionStats {
    connects: AtomicU64,
    connect_failures: AtomicU64,
    probes: AtomicU64,
    probe_failures: AtomicU64,
    demotions: AtomicU64,
}

impl SessionStats {
    /// Creates zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful establishment.
    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a failed establishment.
    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a liveness probe.
    pub fn record_probe(&self, ok: bool) {
        self.probes.fetch_add(1, Ordering::Relaxed);
        if !ok {
            self.probe_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records a demotion caused by a transport failure.
    pub fn record_demotion(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy.
    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            probes: self.probes.load(Ordering::Relaxed),
            probe_failures: self.probe_failures.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`SessionStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatsSnapshot {
    /// Successful establishments.
    pub connects: u64,
    /// Failed establishments.
    pub connect_failures: u64,
    /// Liveness probes sent.
    pub probes: u64,
    /// Probes that failed.
    pub probe_failures: u64,
    /// Demotions after transport failures.
    pub demotions: u64,
}

// =============================================================================
// Tests
// =============================================================================
