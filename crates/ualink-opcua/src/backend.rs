// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA implementation of the coalescer backend.
//!
//! For one server group the backend acquires a session, resolves every key
//! and issues a single read or write service call carrying all items that
//! resolved. Items that fail locally (unknown attribute, bad address,
//! unencodable literal) keep their error and are left out of the call.
//! Absolute keys skip namespace qualification.
//!
//! Untyped numeric writes need the node's DataType. All such lookups of a
//! group share one extra read call made before the write.

use std::sync::Arc;

use async_trait::async_trait;
use ualink_core::{AccessError, AccessResult, BulkAccess, ReadKey, WriteKey};

use crate::address::AddressResolver;
use crate::client::{DataValue, ReadValueId, WriteValue};
use crate::codec::{DeclaredTypeSource, Prepared, ValueCodec};
use crate::supervisor::{ConnectionSupervisor, LiveSession};
use crate::types::{AttributeId, NodeId, StatusCode};

/// [`BulkAccess`] over supervised OPC UA sessions.
#[derive(Debug, Clone)]
pub struct OpcUaBackend {
    supervisor: Arc<ConnectionSupervisor>,
}

impl OpcUaBackend {
    /// Creates a backend.
    pub fn new(supervisor: Arc<ConnectionSupervisor>) -> Self {
        Self { supervisor }
    }

    /// Returns the supervisor.
    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }
}

fn parse_attribute(key: &ReadKey) -> AccessResult<AttributeId> {
    key.attribute()
        .parse()
        .map_err(|_| AccessError::invalid_key(key.to_string(), format!("unknown attribute '{}'", key.attribute())))
}

fn target(session: &LiveSession, key: &ReadKey) -> AccessResult<(NodeId, AttributeId)> {
    let attribute = parse_attribute(key)?;
    let node = if key.is_absolute() {
        AddressResolver::qualify(None, key.node())?
    } else {
        session.resolve(key.node())?
    };
    Ok((node, attribute))
}

fn check_status(node: &NodeId, status: StatusCode) -> AccessResult<StatusCode> {
    if status.is_bad() {
        Err(AccessError::remote_failure(node.to_string(), status.name(), status.bits()))
    } else {
        Ok(status)
    }
}

/// Slot list with one entry per key; `None` until decided.
struct Slots<T>(Vec<Option<AccessResult<T>>>);

impl<T> Slots<T> {
    fn new(len: usize) -> Self {
        Self((0..len).map(|_| None).collect())
    }

    fn set(&mut self, index: usize, result: AccessResult<T>) {
        self.0[index] = Some(result);
    }

    fn finish(self, node_of: impl Fn(usize) -> String) -> Vec<AccessResult<T>> {
        self.0
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.unwrap_or_else(|| {
                    Err(AccessError::remote_failure(
                        node_of(i),
                        StatusCode::BAD_UNEXPECTED_ERROR.name(),
                        StatusCode::BAD_UNEXPECTED_ERROR.bits(),
                    ))
                })
            })
            .collect()
    }
}

#[async_trait]
impl BulkAccess for OpcUaBackend {
    type Reading = DataValue;
    type Written = StatusCode;

    async fn read_batch(
        &self,
        server: &str,
        keys: &[ReadKey],
    ) -> AccessResult<Vec<AccessResult<DataValue>>> {
        let session = self.supervisor.acquire(server).await?;
        let mut slots = Slots::new(keys.len());
        let mut items = Vec::with_capacity(keys.len());
        let mut positions = Vec::with_capacity(keys.len());

        for (i, key) in keys.iter().enumerate() {
            match target(&session, key) {
                Ok((node, attribute)) => {
                    items.push(ReadValueId::new(node, attribute));
                    positions.push(i);
                }
                Err(e) => slots.set(i, Err(e)),
            }
        }

        if !items.is_empty() {
            let values = session.read(&items).await?;
            for ((pos, item), dv) in positions.iter().zip(&items).zip(values) {
                let result = check_status(&item.node_id, dv.status).map(|_| dv);
                slots.set(*pos, result);
            }
        }

        Ok(slots.finish(|i| keys[i].node().to_string()))
    }

    async fn write_batch(
        &self,
        server: &str,
        keys: &[WriteKey],
    ) -> AccessResult<Vec<AccessResult<StatusCode>>> {
        let session = self.supervisor.acquire(server).await?;
        let mut slots = Slots::new(keys.len());
        let mut ready: Vec<(usize, WriteValue)> = Vec::with_capacity(keys.len());
        let mut deferred = Vec::new();

        for (i, key) in keys.iter().enumerate() {
            let prepared = target(&session, key.target()).and_then(|(node, attribute)| {
                ValueCodec::prepare(key.literal(), key.type_tag(), attribute)
                    .map(|p| (node, attribute, p))
            });
            match prepared {
                Ok((node, attribute, Prepared::Ready(value))) => {
                    ready.push((i, WriteValue::new(node, attribute, value)));
                }
                Ok((node, attribute, Prepared::NeedsDeclaredType(value))) => {
                    deferred.push((i, node, attribute, value));
                }
                Err(e) => slots.set(i, Err(e)),
            }
        }

        if !deferred.is_empty() {
            let nodes: Vec<NodeId> = deferred.iter().map(|(_, n, _, _)| n.clone()).collect();
            let types = session.declared_types(&nodes).await?;
            for ((i, node, attribute, value), ty) in deferred.into_iter().zip(types) {
                match ty.and_then(|ty| ValueCodec::coerce(&value, ty)) {
                    Ok(variant) => ready.push((i, WriteValue::new(node, attribute, variant))),
                    Err(e) => slots.set(i, Err(e)),
                }
            }
            ready.sort_by_key(|(i, _)| *i);
        }

        if !ready.is_empty() {
            let (positions, items): (Vec<usize>, Vec<WriteValue>) = ready.into_iter().unzip();
            let statuses = session.write(&items).await?;
            for ((pos, item), status) in positions.iter().zip(&items).zip(statuses) {
                slots.set(*pos, check_status(&item.node_id, status));
            }
        }

        Ok(slots.finish(|i| keys[i].node().to_string()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DefaultTransportFactory, SessionSettings, SimulatedServer, Variant};
    use ualink_core::{Registry, ServerConfig};

    fn backend(server: &SimulatedServer) -> OpcUaBackend {
        let factory = DefaultTransportFactory::new().with_simulated("plant", server.clone());
        let registry = Registry::new(vec![ServerConfig::new("Plant1", "sim://plant")]).unwrap();
        OpcUaBackend::new(Arc::new(ConnectionSupervisor::new(
            &registry,
            Arc::new(factory),
            SessionSettings::default(),
        )))
    }

    #[tokio::test]
    async fn test_read_batch_mixed_outcomes() {
        let server = SimulatedServer::demo();
        let backend = backend(&server);

        let keys = vec![
            ReadKey::new("Plant1", "", "NodeClass"),
            ReadKey::new("Plant1", "ns=2;i=5", "Bogus"),
            ReadKey::new("Plant1", "ns=2;i=404", "Value"),
            ReadKey::new("Plant1", "ns=2;s=Plant.Line1.Speed", "Value"),
        ];
        let results = backend.read_batch("Plant1", &keys).await.unwrap();

        assert_eq!(results[0].as_ref().unwrap().value, Some(Variant::Int32(1)));
        assert!(matches!(results[1], Err(AccessError::InvalidKey { .. })));
        assert!(matches!(results[2], Err(AccessError::RemoteOperationFailure { .. })));
        assert_eq!(results[3].as_ref().unwrap().value, Some(Variant::Double(12.5)));

        // probe-free first acquire, one read carrying the three valid items
        let stats = server.stats();
        assert_eq!(stats.read_calls, 1);
        assert_eq!(stats.read_items, 3);
    }

    #[tokio::test]
    async fn test_write_batch_shares_type_lookup() {
        let server = SimulatedServer::demo();
        let backend = backend(&server);

        let keys = vec![
            WriteKey::new("Plant1", "ns=2;s=Plant.Line1.Speed", "Value", "20", None),
            WriteKey::new("Plant1", "ns=2;s=Plant.Line2.Counter", "Value", "7", None),
            WriteKey::new("Plant1", "ns=2;i=5", "Value", "abc", Some("Int32".into())),
            WriteKey::new("Plant1", "ns=2;s=Plant.Line1.Label", "Value", "Line A", None),
        ];
        let results = backend.write_batch("Plant1", &keys).await.unwrap();

        assert!(results[0].is_ok());
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(AccessError::UnsupportedLiteral { .. })));
        assert!(results[3].is_ok());

        assert_eq!(
            server.value(&NodeId::string(2, "Plant.Line1.Speed")),
            Some(Variant::Double(20.0))
        );
        assert_eq!(
            server.value(&NodeId::string(2, "Plant.Line2.Counter")),
            Some(Variant::UInt32(7))
        );

        let stats = server.stats();
        assert_eq!(stats.read_calls, 1);
        assert_eq!(stats.write_calls, 1);
        assert_eq!(stats.write_items, 3);
    }

    #[tokio::test]
    async fn test_unknown_server_fails_group() {
        let backend = backend(&SimulatedServer::demo());
        let err = backend
            .read_batch("Nope", &[ReadKey::new("Nope", "", "Value")])
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::UnknownServer { .. }));
    }
}
