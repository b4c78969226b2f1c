// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Composition root of the attribute access layer.

use std::sync::Arc;

use ualink_core::{
    AccessResult, AttributeResult, CoalescerConfig, DispatchSummary, PendingResult, ReadKey,
    Registry, RequestCoalescer, WriteKey,
};

use crate::backend::OpcUaBackend;
use crate::client::{DataValue, DefaultTransportFactory, SessionSettings, TransportFactory};
use crate::scanner::{ScannedNode, SubtreeScanner, VariableDescriptor, DEFAULT_MAX_DEPTH};
use crate::supervisor::{ConnectionSupervisor, ReloadSummary, ServerStatus};
use crate::types::{NodeClass, StatusCode};

/// Builder for [`AccessLayer`].
#[derive(Default)]
pub struct AccessLayerBuilder {
    registry: Registry,
    factory: Option<Arc<dyn TransportFactory>>,
    settings: SessionSettings,
    coalescer: CoalescerConfig,
    scan_depth: Option<u32>,
}

impl AccessLayerBuilder {
    /// Sets the server registry.
    pub fn registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets the transport factory.
    pub fn factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the session settings.
    pub fn settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the coalescer configuration.
    pub fn coalescer(mut self, config: CoalescerConfig) -> Self {
        self.coalescer = config;
        self
    }

    /// Sets the default scan depth.
    pub fn scan_depth(mut self, depth: u32) -> Self {
        self.scan_depth = Some(depth);
        self
    }

    /// Builds the layer.
    pub fn build(self) -> AccessLayer {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(DefaultTransportFactory::new()));
        let supervisor = Arc::new(ConnectionSupervisor::new(
            &self.registry,
            factory,
            self.settings,
        ));
        let backend = Arc::new(OpcUaBackend::new(Arc::clone(&supervisor)));

        AccessLayer {
            coalescer: RequestCoalescer::with_config(backend, self.coalescer),
            scanner: SubtreeScanner::new(Arc::clone(&supervisor)),
            supervisor,
            scan_depth: self.scan_depth.unwrap_or(DEFAULT_MAX_DEPTH),
        }
    }
}

/// Batched attribute access over a set of OPC UA servers.
///
/// Submit reads and writes, then call [`dispatch`](Self::dispatch) once the
/// unit of work has issued everything it needs. Each server gets one bulk
/// call per dispatch.
#[derive(Debug)]
pub struct AccessLayer {
    supervisor: Arc<ConnectionSupervisor>,
    coalescer: RequestCoalescer<OpcUaBackend>,
    scanner: SubtreeScanner,
    scan_depth: u32,
}

impl AccessLayer {
    /// Returns a builder.
    pub fn builder() -> AccessLayerBuilder {
        AccessLayerBuilder::default()
    }

    /// Returns the supervisor.
    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    /// Returns the coalescer.
    pub fn coalescer(&self) -> &RequestCoalescer<OpcUaBackend> {
        &self.coalescer
    }

    /// Returns the default scan depth.
    pub fn scan_depth(&self) -> u32 {
        self.scan_depth
    }

    // =========================================================================
    // Attribute access
    // =========================================================================

    /// Queues a read.
    pub fn read(&self, key: ReadKey) -> PendingResult<DataValue> {
        self.coalescer.read(key)
    }

    /// Queues a write.
    pub fn write(&self, key: WriteKey) -> PendingResult<StatusCode> {
        self.coalescer.write(key)
    }

    /// Queues a read given in wire format.
    pub fn read_str(&self, key: &str) -> PendingResult<DataValue> {
        self.coalescer.read_str(key)
    }

    /// Queues a write given in wire format.
    pub fn write_str(&self, key: &str) -> PendingResult<StatusCode> {
        self.coalescer.write_str(key)
    }

    /// Issues the queued requests.
    pub async fn dispatch(&self) -> DispatchSummary {
        self.coalescer.dispatch().await
    }

    /// Reads every key in one dispatch.
    pub async fn read_all(&self, keys: Vec<ReadKey>) -> Vec<AttributeResult<DataValue>> {
        self.coalescer.read_all(keys).await
    }

    /// Writes every key in one dispatch.
    pub async fn write_all(&self, keys: Vec<WriteKey>) -> Vec<AttributeResult<StatusCode>> {
        self.coalescer.write_all(keys).await
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Finds nodes of `kind` below `start`. `None` uses the default depth.
    pub async fn find_by_kind(
        &self,
        server: &str,
        start: &str,
        kind: NodeClass,
        max_depth: Option<u32>,
    ) -> AccessResult<Vec<ScannedNode>> {
        self.scanner
            .find_by_kind(server, start, kind, max_depth.unwrap_or(self.scan_depth))
            .await
    }

    /// Lists the immediate children of `node`.
    pub async fn children(&self, server: &str, node: &str) -> AccessResult<Vec<ScannedNode>> {
        self.scanner.children(server, node).await
    }

    /// Finds variables below `start` and reads their value and description.
    pub async fn describe_variables(
        &self,
        server: &str,
        start: &str,
        max_depth: Option<u32>,
    ) -> AccessResult<Vec<AccessResult<VariableDescriptor>>> {
        self.scanner
            .describe_variables(
                &self.coalescer,
                server,
                start,
                max_depth.unwrap_or(self.scan_depth),
            )
            .await
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Swaps in a new registry.
    pub async fn reload(&self, registry: &Registry) -> ReloadSummary {
        self.supervisor.reload(registry).await
    }

    /// Connects every server eagerly.
    pub async fn connect_all(&self) -> Vec<(String, AccessResult<()>)> {
        self.supervisor.connect_all().await
    }

    /// Returns the status of every server.
    pub fn servers(&self) -> Vec<ServerStatus> {
        self.supervisor.servers()
    }

    /// Closes every session.
    pub async fn shutdown(&self) {
        self.supervisor.shutdown().await
    }
}
