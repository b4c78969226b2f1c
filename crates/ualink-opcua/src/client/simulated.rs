// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! In-process OPC UA server simulation.
//!
//! [`SimulatedServer`] owns a small address space with the standard nodes a
//! real server exposes (root, Objects, Server, NamespaceArray and the
//! ServerStatus state variable). [`SimulatedTransport`] speaks to it through
//! the same [`UaTransport`] contract as the network transport, so the whole
//! layer can run against it. Endpoints of the form `sim://<name>` select it.
//!
//! The server counts every service call, which lets callers observe how many
//! round trips a batch really cost.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::client::transport::{
    DataValue, ReadValueId, ReferenceDescription, UaTransport, Variant, WriteValue,
};
use crate::error::{UaError, UaResult};
use crate::types::{
    AttributeId, NodeClass, NodeId, StatusCode, VariantType, OBJECTS_FOLDER, ROOT_FOLDER, SERVER,
    SERVER_NAMESPACE_ARRAY, SERVER_STATUS, SERVER_STATUS_STATE,
};

const STANDARD_NAMESPACE: &str = "http://opcfoundation.org/UA/";

// =============================================================================
// SimNode
// =============================================================================

#[derive(Debug, Clone)]
struct SimNode {
    class: NodeClass,
    browse_name: String,
    display_name: String,
    description: String,
    value: Option<Variant>,
    data_type: Option<NodeId>,
    writable: bool,
    source_timestamp: Option<DateTime<Utc>>,
    children: Vec<NodeId>,
}

impl SimNode {
    fn object(name: &str) -> Self {
        Self {
            class: NodeClass::Object,
            browse_name: name.to_string(),
            display_name: name.to_string(),
            description: String::new(),
            value: None,
            data_type: None,
            writable: false,
            source_timestamp: None,
            children: Vec::new(),
        }
    }

    fn variable(name: &str, value: Variant) -> Self {
        let data_type = value
            .variant_type()
            .map(|t| t.data_type_node())
            .unwrap_or_else(|| NodeId::standard(24));
        Self {
            class: NodeClass::Variable,
            data_type: Some(data_type),
            value: Some(value),
            writable: true,
            source_timestamp: Some(Utc::now()),
            ..Self::object(name)
        }
    }

    fn read(&self, node_id: &NodeId, attribute: AttributeId) -> DataValue {
        let now = Utc::now();
        let value = match attribute {
            AttributeId::NodeId => Variant::NodeId(node_id.clone()),
            AttributeId::NodeClass => Variant::Int32(self.class.value() as i32),
            AttributeId::BrowseName => Variant::QualifiedName {
                namespace_index: node_id.namespace_index,
                name: self.browse_name.clone(),
            },
            AttributeId::DisplayName => Variant::text(self.display_name.clone()),
            AttributeId::Description => Variant::text(self.description.clone()),
            AttributeId::Value if self.class == NodeClass::Variable => {
                let mut dv = DataValue::good(self.value.clone().unwrap_or(Variant::Empty))
                    .with_server_timestamp(now);
                dv.source_timestamp = self.source_timestamp;
                return dv;
            }
            AttributeId::DataType => match &self.data_type {
                Some(dt) => Variant::NodeId(dt.clone()),
                None => return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
            },
            _ => return DataValue::bad(StatusCode::BAD_ATTRIBUTE_ID_INVALID),
        };
        DataValue::good(value).with_server_timestamp(now)
    }

    fn write(&mut self, attribute: AttributeId, value: &Variant) -> StatusCode {
        match attribute {
            AttributeId::Value if self.class == NodeClass::Variable => {
                if !self.writable {
                    return StatusCode::BAD_NOT_WRITABLE;
                }
                let declared = self.data_type.as_ref().and_then(VariantType::from_data_type);
                if let Some(declared) = declared {
                    if value.variant_type() != Some(declared) {
                        return StatusCode::BAD_TYPE_MISMATCH;
                    }
                }
                self.value = Some(value.clone());
                self.source_timestamp = Some(Utc::now());
                StatusCode::GOOD
            }
            AttributeId::DisplayName | AttributeId::Description => {
                let Some(text) = value.as_text() else {
                    return StatusCode::BAD_TYPE_MISMATCH;
                };
                if attribute == AttributeId::DisplayName {
                    self.display_name = text.to_string();
                } else {
                    self.description = text.to_string();
                }
                StatusCode::GOOD
            }
            _ => StatusCode::BAD_NOT_WRITABLE,
        }
    }
}

// =============================================================================
// SimulatedServer
// =============================================================================

struct Inner {
    nodes: RwLock<HashMap<NodeId, SimNode>>,
    namespaces: RwLock<Vec<String>>,
    online: AtomicBool,
    epoch: AtomicU64,
    connect_delay: RwLock<Duration>,
    call_delay: RwLock<Duration>,
    counters: SimCounters,
}

#[derive(Default)]
struct SimCounters {
    connects: AtomicU64,
    read_calls: AtomicU64,
    read_items: AtomicU64,
    write_calls: AtomicU64,
    write_items: AtomicU64,
    browse_calls: AtomicU64,
}

/// Service call counters of a [`SimulatedServer`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulatedStats {
    /// Sessions opened.
    pub connects: u64,
    /// Read service calls.
    pub read_calls: u64,
    /// Items across all read calls.
    pub read_items: u64,
    /// Write service calls.
    pub write_calls: u64,
    /// Items across all write calls.
    pub write_items: u64,
    /// Browse service calls.
    pub browse_calls: u64,
}

/// A shareable in-memory OPC UA server.
///
/// Cloning yields another handle to the same address space.
#[derive(Clone)]
pub struct SimulatedServer {
    inner: Arc<Inner>,
}

impl SimulatedServer {
    /// Creates a server holding only the standard nodes.
    pub fn new() -> Self {
        let server = Self {
            inner: Arc::new(Inner {
                nodes: RwLock::new(HashMap::new()),
                namespaces: RwLock::new(vec![STANDARD_NAMESPACE.to_string()]),
                online: AtomicBool::new(true),
                epoch: AtomicU64::new(0),
                connect_delay: RwLock::new(Duration::ZERO),
                call_delay: RwLock::new(Duration::ZERO),
                counters: SimCounters::default(),
            }),
        };

        let root = NodeId::standard(ROOT_FOLDER);
        server
            .inner
            .nodes
            .write()
            .insert(root.clone(), SimNode::object("Root"));
        let objects = server.add_folder(&root, NodeId::standard(OBJECTS_FOLDER), "Objects");
        let srv = server.add_folder(&objects, NodeId::standard(SERVER), "Server");
        server.add_variable(
            &srv,
            NodeId::standard(SERVER_NAMESPACE_ARRAY),
            "NamespaceArray",
            Variant::Array(vec![Variant::String(STANDARD_NAMESPACE.to_string())]),
        );
        let status = server.add_folder(&srv, NodeId::standard(SERVER_STATUS), "ServerStatus");
        server.add_variable(
            &status,
            NodeId::standard(SERVER_STATUS_STATE),
            "State",
            Variant::Int32(0),
        );
        server.set_writable(&NodeId::standard(SERVER_NAMESPACE_ARRAY), false);
        server.set_writable(&NodeId::standard(SERVER_STATUS_STATE), false);
        server
    }

    /// Creates a small plant model used by the CLI and tests.
    ///
    /// ```text
    /// ns=1  urn:ualink:server
    /// ns=2  urn:ualink:demo
    ///
    /// Objects
    /// ├── ns=2;i=5                Setpoint (Int32)
    /// └── ns=2;s=Plant
    ///     ├── ns=2;s=Plant.Line1
    ///     │   ├── ns=2;s=Plant.Line1.Speed    (Double)
    ///     │   ├── ns=2;s=Plant.Line1.Running  (Boolean)
    ///     │   └── ns=2;s=Plant.Line1.Label    (String)
    ///     └── ns=2;s=Plant.Line2
    ///         └── ns=2;s=Plant.Line2.Counter  (UInt32)
    /// ```
    pub fn demo() -> Self {
        let server = Self::new();
        server.add_namespace("urn:ualink:server");
        let ns = server.add_namespace("urn:ualink:demo");

        let objects = NodeId::standard(OBJECTS_FOLDER);
        server.add_variable(&objects, NodeId::numeric(ns, 5), "Setpoint", Variant::Int32(0));

        let plant = server.add_folder(&objects, NodeId::string(ns, "Plant"), "Plant");
        let line1 = server.add_folder(&plant, NodeId::string(ns, "Plant.Line1"), "Line1");
        server.add_variable(
            &line1,
            NodeId::string(ns, "Plant.Line1.Speed"),
            "Speed",
            Variant::Double(12.5),
        );
        server.add_variable(
            &line1,
            NodeId::string(ns, "Plant.Line1.Running"),
            "Running",
            Variant::Boolean(true),
        );
        server.add_variable(
            &line1,
            NodeId::string(ns, "Plant.Line1.Label"),
            "Label",
            Variant::String("Line one".to_string()),
        );
        let line2 = server.add_folder(&plant, NodeId::string(ns, "Plant.Line2"), "Line2");
        server.add_variable(
            &line2,
            NodeId::string(ns, "Plant.Line2.Counter"),
            "Counter",
            Variant::UInt32(0),
        );
        server
    }

    // =========================================================================
    // Address space
    // =========================================================================

    /// Registers a namespace URI and returns its index.
    pub fn add_namespace(&self, uri: &str) -> u16 {
        let mut namespaces = self.inner.namespaces.write();
        if let Some(idx) = namespaces.iter().position(|u| u == uri) {
            return idx as u16;
        }
        namespaces.push(uri.to_string());
        let array = Variant::Array(namespaces.iter().cloned().map(Variant::String).collect());
        if let Some(node) = self
            .inner
            .nodes
            .write()
            .get_mut(&NodeId::standard(SERVER_NAMESPACE_ARRAY))
        {
            node.value = Some(array);
        }
        (namespaces.len() - 1) as u16
    }

    /// Adds an object node under `parent`.
    pub fn add_folder(&self, parent: &NodeId, id: NodeId, name: &str) -> NodeId {
        self.insert(parent, id, SimNode::object(name))
    }

    /// Adds a writable variable under `parent`, typed after its initial value.
    pub fn add_variable(&self, parent: &NodeId, id: NodeId, name: &str, value: Variant) -> NodeId {
        self.insert(parent, id, SimNode::variable(name, value))
    }

    fn insert(&self, parent: &NodeId, id: NodeId, node: SimNode) -> NodeId {
        let mut nodes = self.inner.nodes.write();
        if let Some(p) = nodes.get_mut(parent) {
            p.children.push(id.clone());
        }
        nodes.insert(id.clone(), node);
        id
    }

    /// Overrides the DataType attribute of a variable.
    pub fn set_data_type(&self, node: &NodeId, data_type: NodeId) {
        if let Some(n) = self.inner.nodes.write().get_mut(node) {
            n.data_type = Some(data_type);
        }
    }

    /// Sets whether the Value attribute accepts writes.
    pub fn set_writable(&self, node: &NodeId, writable: bool) {
        if let Some(n) = self.inner.nodes.write().get_mut(node) {
            n.writable = writable;
        }
    }

    /// Sets the Description attribute.
    pub fn set_description(&self, node: &NodeId, text: &str) {
        if let Some(n) = self.inner.nodes.write().get_mut(node) {
            n.description = text.to_string();
        }
    }

    /// Replaces a variable's value without type checks.
    pub fn set_value(&self, node: &NodeId, value: Variant) {
        if let Some(n) = self.inner.nodes.write().get_mut(node) {
            n.value = Some(value);
            n.source_timestamp = Some(Utc::now());
        }
    }

    /// Returns a variable's current value.
    pub fn value(&self, node: &NodeId) -> Option<Variant> {
        self.inner.nodes.read().get(node).and_then(|n| n.value.clone())
    }

    // =========================================================================
    // Fault injection
    // =========================================================================

    /// Takes the server offline or brings it back.
    ///
    /// While offline, connects are refused and open sessions fail.
    pub fn set_online(&self, online: bool) {
        self.inner.online.store(online, Ordering::Release);
    }

    /// Returns `true` while the server accepts sessions.
    pub fn is_online(&self) -> bool {
        self.inner.online.load(Ordering::Acquire)
    }

    /// Invalidates every open session, as a server restart would.
    pub fn drop_sessions(&self) {
        self.inner.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Makes every session establishment stall for `delay` before answering.
    pub fn set_connect_delay(&self, delay: Duration) {
        *self.inner.connect_delay.write() = delay;
    }

    /// Makes every read, write and browse call stall for `delay`.
    pub fn set_call_delay(&self, delay: Duration) {
        *self.inner.call_delay.write() = delay;
    }

    /// Returns the service call counters.
    pub fn stats(&self) -> SimulatedStats {
        let c = &self.inner.counters;
        SimulatedStats {
            connects: c.connects.load(Ordering::Relaxed),
            read_calls: c.read_calls.load(Ordering::Relaxed),
            read_items: c.read_items.load(Ordering::Relaxed),
            write_calls: c.write_calls.load(Ordering::Relaxed),
            write_items: c.write_items.load(Ordering::Relaxed),
            browse_calls: c.browse_calls.load(Ordering::Relaxed),
        }
    }

    /// Creates a transport bound to this server.
    pub fn transport(&self, endpoint: impl Into<String>) -> SimulatedTransport {
        SimulatedTransport {
            server: self.clone(),
            endpoint: endpoint.into(),
            session: None,
        }
    }
}

impl Default for SimulatedServer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SimulatedServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedServer")
            .field("nodes", &self.inner.nodes.read().len())
            .field("namespaces", &*self.inner.namespaces.read())
            .field("online", &self.is_online())
            .finish()
    }
}

// =============================================================================
// SimulatedTransport
// =============================================================================

/// [`UaTransport`] over a [`SimulatedServer`].
#[derive(Debug)]
pub struct SimulatedTransport {
    server: SimulatedServer,
    endpoint: String,
    session: Option<u64>,
}

impl SimulatedTransport {
    async fn stall(delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn service_call(&self) -> UaResult<()> {
        let delay = *self.server.inner.call_delay.read();
        Self::stall(delay).await;
        self.check_session()
    }

    fn check_session(&self) -> UaResult<()> {
        let epoch = self.session.ok_or(UaError::NotConnected)?;
        let inner = &self.server.inner;
        if !inner.online.load(Ordering::Acquire) || inner.epoch.load(Ordering::Acquire) != epoch {
            return Err(UaError::lost(&self.endpoint));
        }
        Ok(())
    }
}

#[async_trait]
impl UaTransport for SimulatedTransport {
    async fn connect(&mut self) -> UaResult<()> {
        let delay = *self.server.inner.connect_delay.read();
        Self::stall(delay).await;

        let inner = &self.server.inner;
        if !inner.online.load(Ordering::Acquire) {
            return Err(UaError::refused(&self.endpoint, "server offline"));
        }
        self.session = Some(inner.epoch.load(Ordering::Acquire));
        inner.counters.connects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn disconnect(&mut self) -> UaResult<()> {
        self.session = None;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read(&self, items: &[ReadValueId]) -> UaResult<Vec<DataValue>> {
        self.service_call().await?;
        let counters = &self.server.inner.counters;
        counters.read_calls.fetch_add(1, Ordering::Relaxed);
        counters
            .read_items
            .fetch_add(items.len() as u64, Ordering::Relaxed);

        let nodes = self.server.inner.nodes.read();
        Ok(items
            .iter()
            .map(|item| match nodes.get(&item.node_id) {
                Some(node) => node.read(&item.node_id, item.attribute),
                None => DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN),
            })
            .collect())
    }

    async fn write(&self, items: &[WriteValue]) -> UaResult<Vec<StatusCode>> {
        self.service_call().await?;
        let counters = &self.server.inner.counters;
        counters.write_calls.fetch_add(1, Ordering::Relaxed);
        counters
            .write_items
            .fetch_add(items.len() as u64, Ordering::Relaxed);

        let mut nodes = self.server.inner.nodes.write();
        Ok(items
            .iter()
            .map(|item| match nodes.get_mut(&item.node_id) {
                Some(node) => node.write(item.attribute, &item.value),
                None => StatusCode::BAD_NODE_ID_UNKNOWN,
            })
            .collect())
    }

    async fn browse(&self, parents: &[NodeId]) -> UaResult<Vec<Vec<ReferenceDescription>>> {
        self.service_call().await?;
        self.server
            .inner
            .counters
            .browse_calls
            .fetch_add(1, Ordering::Relaxed);

        let nodes = self.server.inner.nodes.read();
        Ok(parents
            .iter()
            .map(|parent| {
                nodes
                    .get(parent)
                    .map(|p| {
                        p.children
                            .iter()
                            .filter_map(|id| {
                                nodes.get(id).map(|child| ReferenceDescription {
                                    node_id: id.clone(),
                                    browse_name: child.browse_name.clone(),
                                    display_name: child.display_name.clone(),
                                    node_class: Some(child.class),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn connected(server: &SimulatedServer) -> SimulatedTransport {
        let mut transport = server.transport("sim://test");
        transport.connect().await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_standard_nodes() {
        let server = SimulatedServer::new();
        let transport = connected(&server).await;

        let values = transport
            .read(&[
                ReadValueId::new(NodeId::root_folder(), AttributeId::NodeClass),
                ReadValueId::new(NodeId::standard(SERVER_STATUS_STATE), AttributeId::Value),
                ReadValueId::new(NodeId::standard(9999), AttributeId::Value),
            ])
            .await
            .unwrap();

        assert_eq!(values[0].value, Some(Variant::Int32(1)));
        assert_eq!(values[1].value, Some(Variant::Int32(0)));
        assert_eq!(values[2].status, StatusCode::BAD_NODE_ID_UNKNOWN);
    }

    #[tokio::test]
    async fn test_namespace_array_tracks_registration() {
        let server = SimulatedServer::new();
        assert_eq!(server.add_namespace("urn:a"), 1);
        assert_eq!(server.add_namespace("urn:b"), 2);
        assert_eq!(server.add_namespace("urn:a"), 1);

        let array = server.value(&NodeId::standard(SERVER_NAMESPACE_ARRAY));
        match array {
            Some(Variant::Array(items)) => assert_eq!(items.len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_write_type_checked() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;
        let setpoint = NodeId::numeric(2, 5);

        let statuses = transport
            .write(&[
                WriteValue::new(setpoint.clone(), AttributeId::Value, Variant::Int32(42)),
                WriteValue::new(setpoint.clone(), AttributeId::Value, Variant::Double(1.0)),
                WriteValue::new(
                    NodeId::standard(SERVER_STATUS_STATE),
                    AttributeId::Value,
                    Variant::Int32(1),
                ),
            ])
            .await
            .unwrap();

        assert_eq!(
            statuses,
            vec![
                StatusCode::GOOD,
                StatusCode::BAD_TYPE_MISMATCH,
                StatusCode::BAD_NOT_WRITABLE
            ]
        );
        assert_eq!(server.value(&setpoint), Some(Variant::Int32(42)));
    }

    #[tokio::test]
    async fn test_browse_many_parents() {
        let server = SimulatedServer::demo();
        let transport = connected(&server).await;

        let refs = transport
            .browse(&[NodeId::string(2, "Plant"), NodeId::string(2, "Plant.Line2")])
            .await
            .unwrap();

        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].len(), 2);
        assert_eq!(refs[1][0].browse_name, "Counter");
        assert_eq!(server.stats().browse_calls, 1);
    }

    #[tokio::test]
    async fn test_dropped_session() {
        let server = SimulatedServer::new();
        let transport = connected(&server).await;

        server.drop_sessions();
        let err = transport.read(&[]).await.unwrap_err();
        assert!(matches!(err, UaError::ConnectionLost { .. }));

        server.set_online(false);
        let mut fresh = server.transport("sim://test");
        assert!(fresh.connect().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delays_stall_calls() {
        let server = SimulatedServer::new();
        server.set_connect_delay(Duration::from_secs(3));
        server.set_call_delay(Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        let transport = connected(&server).await;
        assert_eq!(start.elapsed(), Duration::from_secs(3));

        transport.read(&[]).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        server.set_call_delay(Duration::ZERO);
        transport.browse(&[]).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }
}
