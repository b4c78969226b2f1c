// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-server session supervision.
//!
//! The [`ConnectionSupervisor`] owns one connection slot per registered
//! server. [`ConnectionSupervisor::acquire`] hands out a [`LiveSession`]
//! after a check-then-repair sequence:
//!
//! ```text
//!  acquire(name)
//!     │
//!     ├─ unknown name ───────────────────────────▶ UnknownServer
//!     │
//!     ├─ Connected? ── probe ServerStatus.State ── ok ──▶ LiveSession
//!     │                        │
//!     │                      fails ─▶ tear down
//!     ▼                        │
//!  establish ◀─────────────────┘   (one attempt per acquire)
//!     │
//!     ├─ ok ─▶ resolve namespace + root ─▶ Connected ─▶ LiveSession
//!     └─ error/timeout ─▶ tear down ─▶ Disconnected ─▶ ConnectionFailure
//! ```
//!
//! A [`LiveSession`] holds the server's connection lock, so at most one bulk
//! call per server is in flight and nobody can rebuild the session under
//! it. Sessions must not be kept past the call they were acquired for.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use ualink_core::{AccessError, AccessResult, Registry, ServerConfig};

use crate::address::{AddressResolver, NamespaceContext};
use crate::client::{
    ConnectionState, DataValue, ReadValueId, ReferenceDescription, SessionSettings, SessionStats,
    SessionStatsSnapshot, StateCell, TransportFactory, UaTransport, Variant, WriteValue,
};
use crate::codec::DeclaredTypeSource;
use crate::error::{UaError, UaResult};
use crate::types::{
    AttributeId, NodeId, StatusCode, VariantType, SERVER_NAMESPACE_ARRAY, SERVER_STATUS_STATE,
};

// =============================================================================
// Connection table
// =============================================================================

/// Mutable per-server state, guarded by the entry's lock.
struct ServerConnection {
    transport: Option<Box<dyn UaTransport>>,
    context: Option<NamespaceContext>,
}

struct ConnectionEntry {
    config: ServerConfig,
    state: StateCell,
    stats: SessionStats,
    connection: Arc<Mutex<ServerConnection>>,
}

impl ConnectionEntry {
    fn new(config: ServerConfig) -> Self {
        Self {
            config,
            state: StateCell::default(),
            stats: SessionStats::new(),
            connection: Arc::new(Mutex::new(ServerConnection {
                transport: None,
                context: None,
            })),
        }
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn set_state(&self, new: ConnectionState) {
        let old = self.state.set(new);
        if old != new {
            tracing::trace!(
                server = %self.config.name,
                old_state = %old,
                new_state = %new,
                "Connection state changed"
            );
        }
    }

    fn demote(&self, cause: &UaError) {
        if self.state.get().is_connected() {
            warn!(server = %self.config.name, error = %cause, "Session failed, marking disconnected");
            self.stats.record_demotion();
        }
        self.set_state(ConnectionState::Disconnected);
    }
}

#[derive(Default)]
struct ConnectionTable {
    order: Vec<Arc<ConnectionEntry>>,
    by_name: HashMap<String, Arc<ConnectionEntry>>,
}

impl ConnectionTable {
    fn from_entries(entries: Vec<Arc<ConnectionEntry>>) -> Self {
        let by_name = entries
            .iter()
            .map(|e| (e.config.name.clone(), Arc::clone(e)))
            .collect();
        Self {
            order: entries,
            by_name,
        }
    }
}

// =============================================================================
// Status records
// =============================================================================

/// Observable status of one server.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatus {
    /// Server name.
    pub name: String,
    /// Endpoint URL.
    pub endpoint_address: String,
    /// Configured namespace URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace_uri: Option<String>,
    /// Connection state.
    pub state: ConnectionState,
    /// Lifecycle counters.
    pub stats: SessionStatsSnapshot,
}

/// Outcome of [`ConnectionSupervisor::reload`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReloadSummary {
    /// Servers whose configuration and connection were kept.
    pub kept: Vec<String>,
    /// Newly registered servers.
    pub added: Vec<String>,
    /// Servers whose configuration changed; their sessions were closed.
    pub changed: Vec<String>,
    /// Servers no longer registered; their sessions were closed.
    pub removed: Vec<String>,
}

// =============================================================================
// ConnectionSupervisor
// =============================================================================

/// Owner of every server connection.
pub struct ConnectionSupervisor {
    factory: Arc<dyn TransportFactory>,
    settings: SessionSettings,
    table: RwLock<Arc<ConnectionTable>>,
}

impl ConnectionSupervisor {
    /// Creates a supervisor for `registry`. No session is opened yet.
    pub fn new(
        registry: &Registry,
        factory: Arc<dyn TransportFactory>,
        settings: SessionSettings,
    ) -> Self {
        let entries = registry
            .iter()
            .cloned()
            .map(|c| Arc::new(ConnectionEntry::new(c)))
            .collect();
        Self {
            factory,
            settings,
            table: RwLock::new(Arc::new(ConnectionTable::from_entries(entries))),
        }
    }

    /// Returns the session settings.
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Returns the registered server names in registry order.
    pub fn names(&self) -> Vec<String> {
        self.table
            .read()
            .order
            .iter()
            .map(|e| e.config.name.clone())
            .collect()
    }

    /// Returns the registration of `name`.
    pub fn config(&self, name: &str) -> Option<ServerConfig> {
        self.table.read().by_name.get(name).map(|e| e.config.clone())
    }

    fn entry(&self, name: &str) -> AccessResult<Arc<ConnectionEntry>> {
        self.table
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| AccessError::unknown_server(name))
    }

    /// Returns a connected session for `name`, repairing it at most once.
    pub async fn acquire(&self, name: &str) -> AccessResult<LiveSession> {
        let entry = self.entry(name)?;
        let mut conn = Arc::clone(&entry.connection).lock_owned().await;

        if entry.state.get().is_connected() {
            match self.probe(&conn).await {
                Ok(()) => {
                    entry.stats.record_probe(true);
                    return self.session(entry, conn);
                }
                Err(e) => {
                    entry.stats.record_probe(false);
                    warn!(server = %name, error = %e, "Liveness probe failed, re-establishing session");
                    entry.demote(&e);
                }
            }
        }

        self.establish(&entry, &mut conn).await?;
        self.session(entry, conn)
    }

    fn session(
        &self,
        entry: Arc<ConnectionEntry>,
        conn: OwnedMutexGuard<ServerConnection>,
    ) -> AccessResult<LiveSession> {
        let context = conn
            .context
            .clone()
            .ok_or_else(|| AccessError::connection_failure(entry.name(), "session has no namespace context"))?;
        Ok(LiveSession {
            entry,
            conn,
            context,
            request_timeout: self.settings.request_timeout,
        })
    }

    async fn probe(&self, conn: &ServerConnection) -> UaResult<()> {
        let transport = conn.transport.as_deref().ok_or(UaError::NotConnected)?;
        let probe = [ReadValueId::new(
            NodeId::standard(SERVER_STATUS_STATE),
            AttributeId::Value,
        )];
        let limit = self.settings.request_timeout;
        let values = tokio::time::timeout(limit, transport.read(&probe))
            .await
            .map_err(|_| UaError::timeout("probe", limit))??;

        match values.first() {
            Some(dv) if dv.is_good() => Ok(()),
            Some(dv) => Err(UaError::service("Read", dv.status)),
            None => Err(UaError::protocol("empty probe response")),
        }
    }

    async fn establish(
        &self,
        entry: &ConnectionEntry,
        conn: &mut ServerConnection,
    ) -> AccessResult<()> {
        Self::teardown(entry, conn).await;
        entry.set_state(ConnectionState::Connecting);
        debug!(server = %entry.name(), endpoint = %entry.config.endpoint_address, "Establishing session");

        let limit = self.settings.connect_timeout;
        let outcome = match tokio::time::timeout(limit, self.open(entry, conn)).await {
            Ok(result) => result,
            Err(_) => Err(AccessError::connection_failure(
                entry.name(),
                format!("connection timed out after {:?}", limit),
            )),
        };

        match outcome {
            Ok(context) => {
                conn.context = Some(context);
                entry.set_state(ConnectionState::Connected);
                entry.stats.record_connect();
                info!(
                    server = %entry.name(),
                    endpoint = %entry.config.endpoint_address,
                    namespace_index = ?conn.context.as_ref().and_then(|c| c.namespace_index),
                    "Session established"
                );
                Ok(())
            }
            Err(e) => {
                Self::teardown(entry, conn).await;
                entry.stats.record_connect_failure();
                e.log("establish session");
                Err(e)
            }
        }
    }

    async fn open(
        &self,
        entry: &ConnectionEntry,
        conn: &mut ServerConnection,
    ) -> AccessResult<NamespaceContext> {
        let name = entry.name();
        let failure = |e: UaError| AccessError::connection_failure(name, e.to_string());

        let transport = conn.transport.insert(
            self.factory
                .create(&entry.config, &self.settings)
                .map_err(failure)?,
        );
        transport.connect().await.map_err(failure)?;

        let Some((uri, root)) = entry.config.namespace_root() else {
            return Ok(NamespaceContext::unqualified());
        };

        let read = [ReadValueId::new(
            NodeId::standard(SERVER_NAMESPACE_ARRAY),
            AttributeId::Value,
        )];
        let values = transport.read(&read).await.map_err(failure)?;
        let namespaces: Vec<&str> = match values.first().and_then(|dv| dv.value.as_ref()) {
            Some(Variant::Array(items)) => items.iter().filter_map(Variant::as_text).collect(),
            _ => Vec::new(),
        };

        let index = namespaces
            .iter()
            .position(|ns| *ns == uri)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| AccessError::namespace_not_found(name, uri))?;
        let root = AddressResolver::qualify(Some(index), root)?;
        Ok(NamespaceContext::new(Some(index), root))
    }

    async fn teardown(entry: &ConnectionEntry, conn: &mut ServerConnection) {
        if let Some(mut transport) = conn.transport.take() {
            if let Err(e) = transport.disconnect().await {
                debug!(server = %entry.name(), error = %e, "Disconnect failed during teardown");
            }
        }
        conn.context = None;
        entry.set_state(ConnectionState::Disconnected);
    }

    // =========================================================================
    // Registry management
    // =========================================================================

    /// Swaps in a new registry snapshot.
    ///
    /// Servers with an unchanged configuration keep their session. Removed
    /// and changed servers are disconnected. New sessions open lazily.
    pub async fn reload(&self, registry: &Registry) -> ReloadSummary {
        let old = Arc::clone(&self.table.read());
        let mut summary = ReloadSummary::default();

        let entries: Vec<Arc<ConnectionEntry>> = registry
            .iter()
            .map(|config| match old.by_name.get(&config.name) {
                Some(existing) if existing.config == *config => {
                    summary.kept.push(config.name.clone());
                    Arc::clone(existing)
                }
                Some(_) => {
                    summary.changed.push(config.name.clone());
                    Arc::new(ConnectionEntry::new(config.clone()))
                }
                None => {
                    summary.added.push(config.name.clone());
                    Arc::new(ConnectionEntry::new(config.clone()))
                }
            })
            .collect();

        let new_table = ConnectionTable::from_entries(entries);
        let retired: Vec<Arc<ConnectionEntry>> = old
            .order
            .iter()
            .filter(|e| {
                !new_table
                    .by_name
                    .get(e.name())
                    .is_some_and(|n| Arc::ptr_eq(n, *e))
            })
            .cloned()
            .collect();
        summary.removed = retired
            .iter()
            .filter(|e| !new_table.by_name.contains_key(e.name()))
            .map(|e| e.config.name.clone())
            .collect();

        *self.table.write() = Arc::new(new_table);
        info!(
            kept = summary.kept.len(),
            added = summary.added.len(),
            changed = summary.changed.len(),
            removed = summary.removed.len(),
            "Registry reloaded"
        );

        for entry in retired {
            let mut conn = entry.connection.lock().await;
            Self::teardown(&entry, &mut conn).await;
        }
        summary
    }

    /// Acquires every server once, concurrently, and reports the outcome.
    pub async fn connect_all(&self) -> Vec<(String, AccessResult<()>)> {
        let names = self.names();
        let results = join_all(names.iter().map(|n| self.acquire(n))).await;
        names
            .into_iter()
            .zip(results)
            .map(|(name, r)| (name, r.map(drop)))
            .collect()
    }

    /// Returns the status of every server in registry order.
    pub fn servers(&self) -> Vec<ServerStatus> {
        self.table
            .read()
            .order
            .iter()
            .map(|e| ServerStatus {
                name: e.config.name.clone(),
                endpoint_address: e.config.endpoint_address.clone(),
                namespace_uri: e.config.namespace_uri.clone(),
                state: e.state.get(),
                stats: e.stats.snapshot(),
            })
            .collect()
    }

    /// Returns the state of `name` without waiting for its lock.
    pub fn state(&self, name: &str) -> Option<ConnectionState> {
        self.table.read().by_name.get(name).map(|e| e.state.get())
    }

    /// Closes every session.
    pub async fn shutdown(&self) {
        let table = Arc::clone(&self.table.read());
        for entry in &table.order {
            let mut conn = entry.connection.lock().await;
            Self::teardown(entry, &mut conn).await;
        }
        info!(servers = table.order.len(), "All sessions closed");
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("servers", &self.names())
            .field("settings", &self.settings)
            .finish()
    }
}

// =============================================================================
// LiveSession
// =============================================================================

/// A connected session borrowed for one bulk call.
///
/// Transport failures that indicate a dead session mark the server
/// `Disconnected`; the next [`ConnectionSupervisor::acquire`] rebuilds it.
pub struct LiveSession {
    entry: Arc<ConnectionEntry>,
    conn: OwnedMutexGuard<ServerConnection>,
    context: NamespaceContext,
    request_timeout: Duration,
}

impl LiveSession {
    /// Returns the server name.
    pub fn server_name(&self) -> &str {
        self.entry.name()
    }

    /// Returns the namespace context of this session.
    pub fn namespace(&self) -> &NamespaceContext {
        &self.context
    }

    /// Resolves a caller identifier against this session.
    pub fn resolve(&self, identifier: &str) -> AccessResult<NodeId> {
        AddressResolver::resolve(&self.context, identifier)
    }

    /// Derives the best-effort display path of `node`.
    pub fn derive_path(&self, node: &NodeId) -> String {
        AddressResolver::derive_path(&self.context, node)
    }

    fn transport(&self) -> AccessResult<&dyn UaTransport> {
        self.conn
            .transport
            .as_deref()
            .ok_or_else(|| UaError::NotConnected.into_access_error(self.server_name()))
    }

    async fn call<T, F>(&self, operation: &'static str, call: F) -> AccessResult<T>
    where
        F: Future<Output = UaResult<T>>,
    {
        let outcome = match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(UaError::timeout(operation, self.request_timeout)),
        };
        outcome.map_err(|e| {
            if e.is_session_fatal() {
                self.entry.demote(&e);
            }
            e.into_access_error(self.server_name())
        })
    }

    /// Reads many attributes in one call.
    pub async fn read(&self, items: &[ReadValueId]) -> AccessResult<Vec<DataValue>> {
        let transport = self.transport()?;
        self.call("read", transport.read(items)).await
    }

    /// Writes many attributes in one call.
    pub async fn write(&self, items: &[WriteValue]) -> AccessResult<Vec<StatusCode>> {
        let transport = self.transport()?;
        self.call("write", transport.write(items)).await
    }

    /// Browses the hierarchical children of many nodes in one call.
    pub async fn browse(&self, nodes: &[NodeId]) -> AccessResult<Vec<Vec<ReferenceDescription>>> {
        let transport = self.transport()?;
        self.call("browse", transport.browse(nodes)).await
    }
}

impl std::fmt::Debug for LiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveSession")
            .field("server", &self.server_name())
            .field("context", &self.context)
            .finish()
    }
}

#[async_trait]
impl DeclaredTypeSource for LiveSession {
    async fn declared_types(&self, nodes: &[NodeId]) -> AccessResult<Vec<AccessResult<VariantType>>> {
        let items: Vec<ReadValueId> = nodes
            .iter()
            .map(|n| ReadValueId::new(n.clone(), AttributeId::DataType))
            .collect();
        let values = self.read(&items).await?;

        Ok(nodes
            .iter()
            .enumerate()
            .map(|(i, node)| {
                let dv = values.get(i).ok_or_else(|| {
                    AccessError::remote_failure(
                        node.to_string(),
                        StatusCode::BAD_UNEXPECTED_ERROR.name(),
                        StatusCode::BAD_UNEXPECTED_ERROR.bits(),
                    )
                })?;
                if !dv.is_good() {
                    return Err(AccessError::remote_failure(
                        node.to_string(),
                        dv.status.name(),
                        dv.status.bits(),
                    ));
                }
                dv.value
                    .as_ref()
                    .and_then(Variant::as_node_id)
                    .and_then(VariantType::from_data_type)
                    .ok_or_else(|| {
                        AccessError::unsupported_value_type(format!(
                            "declared data type of {} has no scalar wire type",
                            node
                        ))
                    })
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
