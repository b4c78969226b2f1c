// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Depth-bounded subtree discovery.
//!
//! The scan walks the tree one level at a time. Each level costs one browse
//! call for the whole frontier and one bulk NodeClass read for every child
//! found, so the number of round trips grows with depth, not with node
//! count. Every child is expanded regardless of its class, until the level
//! reaches `max_depth`:
//!
//! ```text
//! start            depth 0   expanded when max_depth >= 1
//! ├── child        depth 1   expanded when max_depth >= 2
//! │   └── leaf     depth 2
//! └── child        depth 1
//! ```
//!
//! `max_depth = 0` yields nothing; `max_depth = 1` yields immediate children
//! only. Results come back in depth-first pre-order following the order in
//! which the server enumerated each node's children. Nodes reachable along
//! several paths appear once per path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::debug;
use ualink_core::{AccessResult, ReadKey, RequestCoalescer};

use crate::backend::OpcUaBackend;
use crate::client::{ReadValueId, ReferenceDescription, Variant};
use crate::supervisor::{ConnectionSupervisor, LiveSession};
use crate::types::{AttributeId, NodeClass, NodeId, StatusCode, VariantType};

/// Depth used when callers give none.
pub const DEFAULT_MAX_DEPTH: u32 = 10;

// =============================================================================
// Records
// =============================================================================

/// A node found by a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScannedNode {
    /// Owning server.
    pub server_name: String,
    /// Node address.
    pub node_id: NodeId,
    /// Browse name.
    pub browse_name: String,
    /// Display name.
    pub display_name: String,
    /// Node class from the classification read.
    pub node_class: Option<NodeClass>,
    /// Levels below the start node, starting at 1.
    pub depth: u32,
    /// Best-effort display path.
    pub path: String,
}

/// A variable with its current value and metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableDescriptor {
    /// Owning server.
    pub server_name: String,
    /// Node address in text form.
    pub node_id: String,
    /// Display name.
    pub display_name: String,
    /// Description, when the server has one.
    pub description: Option<String>,
    /// Best-effort display path.
    pub path: String,
    /// Current value.
    pub value: Option<Variant>,
    /// Wire type of the value.
    pub type_tag: Option<VariantType>,
    /// Status of the value read.
    pub status: StatusCode,
    /// Source timestamp.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Server timestamp.
    pub server_timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// SubtreeScanner
// =============================================================================

struct ArenaNode {
    reference: ReferenceDescription,
    node_class: Option<NodeClass>,
    depth: u32,
    children: Vec<usize>,
}

/// Recursive discovery over supervised sessions.
#[derive(Debug, Clone)]
pub struct SubtreeScanner {
    supervisor: Arc<ConnectionSupervisor>,
}

impl SubtreeScanner {
    /// Creates a scanner.
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Finds descendants of `start` whose class is `kind`.
    pub async fn find_by_kind(
        &self,
        server: &str,
        start: &str,
        kind: NodeClass,
        max_depth: u32,
    ) -> AccessResult<Vec<ScannedNode>> {
        let session = self.supervisor.acquire(server).await?;
        let start = session.resolve(start)?;
        Self::scan(&session, &start, Some(kind), max_depth).await
    }

    /// Lists the immediate children of `node`, of any class.
    pub async fn children(&self, server: &str, node: &str) -> AccessResult<Vec<ScannedNode>> {
        let session = self.supervisor.acquire(server).await?;
        let start = session.resolve(node)?;
        Self::scan(&session, &start, None, 1).await
    }

    /// Scans below `start` on an already acquired session.
    pub async fn scan(
        session: &LiveSession,
        start: &NodeId,
        kind: Option<NodeClass>,
        max_depth: u32,
    ) -> AccessResult<Vec<ScannedNode>> {
        let mut arena: Vec<ArenaNode> = Vec::new();
        let mut top: Vec<usize> = Vec::new();
        let mut frontier: Vec<(Option<usize>, NodeId)> = vec![(None, start.clone())];
        let mut depth = 0;

        while !frontier.is_empty() && depth < max_depth {
            let parents: Vec<NodeId> = frontier.iter().map(|(_, id)| id.clone()).collect();
            let listing = session.browse(&parents).await?;
            depth += 1;

            let mut found = Vec::new();
            for ((parent, _), refs) in frontier.iter().zip(listing) {
                for reference in refs {
                    let index = arena.len();
                    arena.push(ArenaNode {
                        reference,
                        node_class: None,
                        depth,
                        children: Vec::new(),
                    });
                    match parent {
                        Some(p) => arena[*p].children.push(index),
                        None => top.push(index),
                    }
                    found.push(index);
                }
            }
            if found.is_empty() {
                break;
            }

            let classify: Vec<ReadValueId> = found
                .iter()
                .map(|&i| ReadValueId::new(arena[i].reference.node_id.clone(), AttributeId::NodeClass))
                .collect();
            let classes = session.read(&classify).await?;
            for (&i, dv) in found.iter().zip(&classes) {
                arena[i].node_class = dv
                    .value
                    .as_ref()
                    .filter(|_| dv.is_good())
                    .and_then(Variant::as_i64)
                    .and_then(|v| u32::try_from(v).ok())
                    .and_then(NodeClass::from_value)
                    .or(arena[i].reference.node_class);
            }

            debug!(
                server = %session.server_name(),
                depth,
                nodes = found.len(),
                "Scanned level"
            );
            frontier = found
                .into_iter()
                .map(|i| (Some(i), arena[i].reference.node_id.clone()))
                .collect();
        }

        let mut out = Vec::new();
        let mut stack: Vec<usize> = top.into_iter().rev().collect();
        while let Some(i) = stack.pop() {
            let node = &arena[i];
            if kind.map_or(true, |k| node.node_class == Some(k)) {
                out.push(ScannedNode {
                    server_name: session.server_name().to_string(),
                    node_id: node.reference.node_id.clone(),
                    browse_name: node.reference.browse_name.clone(),
                    display_name: node.reference.display_name.clone(),
                    node_class: node.node_class,
                    depth: node.depth,
                    path: session.derive_path(&node.reference.node_id),
                });
            }
            stack.extend(node.children.iter().rev().copied());
        }
        Ok(out)
    }

    /// Reads Value and Description of every node through `coalescer`.
    ///
    /// All reads travel in one dispatch. Node ids came from the server's
    /// own browse results, so they are read exactly as found.
    pub async fn describe(
        coalescer: &RequestCoalescer<OpcUaBackend>,
        nodes: &[ScannedNode],
    ) -> Vec<AccessResult<VariableDescriptor>> {
        let pending: Vec<_> = nodes
            .iter()
            .map(|n| {
                let id = n.node_id.to_opc_string();
                (
                    coalescer.read(ReadKey::absolute(&n.server_name, id.clone(), "Value")),
                    coalescer.read(ReadKey::absolute(&n.server_name, id, "Description")),
                )
            })
            .collect();
        coalescer.dispatch().await;

        let mut out = Vec::with_capacity(nodes.len());
        for (node, (value, description)) in nodes.iter().zip(pending) {
            let (value, description) = futures::join!(value, description);
            out.push(value.into_result().map(|dv| VariableDescriptor {
                server_name: node.server_name.clone(),
                node_id: node.node_id.to_opc_string(),
                display_name: node.display_name.clone(),
                description: description
                    .value()
                    .and_then(|d| d.value.as_ref())
                    .and_then(Variant::as_text)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string),
                path: node.path.clone(),
                type_tag: dv.variant_type(),
                value: dv.value,
                status: dv.status,
                source_timestamp: dv.source_timestamp,
                server_timestamp: dv.server_timestamp,
            }));
        }
        out
    }

    /// Finds variables below `start` and describes them.
    pub async fn describe_variables(
        &self,
        coalescer: &RequestCoalescer<OpcUaBackend>,
        server: &str,
        start: &str,
        max_depth: u32,
    ) -> AccessResult<Vec<AccessResult<VariableDescriptor>>> {
        let nodes = self
            .find_by_kind(server, start, NodeClass::Variable, max_depth)
            .await?;
        Ok(Self::describe(coalescer, &nodes).await)
    }

    /// Scans several servers concurrently.
    pub async fn find_by_kind_many(
        &self,
        servers: &[String],
        start: &str,
        kind: NodeClass,
        max_depth: u32,
    ) -> Vec<(String, AccessResult<Vec<ScannedNode>>)> {
        let results = join_all(
            servers
                .iter()
                .map(|s| self.find_by_kind(s, start, kind, max_depth)),
        )
        .await;
        servers.iter().cloned().zip(results).collect()
    }
}
