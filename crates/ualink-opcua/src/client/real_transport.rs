// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Network OPC UA transport using the `opcua` crate.
//!
//! Sessions use security policy `None` with anonymous identity. The `opcua`
//! client is synchronous and runs its own reactor, so every call is moved
//! onto the blocking pool. A connect whose caller stopped waiting still
//! completes on that pool; the session it opens is then disconnected.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, trace};

use opcua::client::prelude::{self as ua, AttributeService, ViewService};
use opcua::sync::RwLock as UaRwLock;

use crate::client::handoff::handoff;
use crate::client::session::SessionSettings;
use crate::client::transport::{
    DataValue, ReadValueId, ReferenceDescription, UaTransport, Variant, WriteValue,
};
use crate::error::{UaError, UaResult};
use crate::types::{NodeClass, NodeId, NodeIdentifier, StatusCode};

/// Status codes reported when the underlying channel is gone.
const CHANNEL_LOST: [u32; 5] = [
    0x8005_0000, // BadCommunicationError
    0x800D_0000, // BadServerNotConnected
    0x8025_0000, // BadSessionIdInvalid
    0x8026_0000, // BadSessionClosed
    0x808A_0000, // BadNotConnected
];

type SharedSession = Arc<UaRwLock<ua::Session>>;

// =============================================================================
// RealTransport
// =============================================================================

/// [`UaTransport`] over an `opc.tcp://` endpoint.
pub struct RealTransport {
    endpoint: String,
    settings: SessionSettings,
    session: Option<SharedSession>,
}

impl RealTransport {
    /// Creates an unconnected transport.
    pub fn new(endpoint: impl Into<String>, settings: &SessionSettings) -> Self {
        Self {
            endpoint: endpoint.into(),
            settings: settings.clone(),
            session: None,
        }
    }

    fn session(&self) -> UaResult<SharedSession> {
        self.session.clone().ok_or(UaError::NotConnected)
    }

    fn service_error(&self, service: &'static str, status: ua::StatusCode) -> UaError {
        let bits = status.bits();
        if CHANNEL_LOST.contains(&(bits & 0xFFFF_0000)) {
            UaError::lost(&self.endpoint)
        } else {
            UaError::service(service, StatusCode(bits))
        }
    }

    async fn blocking<T, F>(&self, f: F) -> UaResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> UaResult<T> + Send + 'static,
    {
        tokio::task::spawn_blocking(f)
            .await
            .map_err(|e| UaError::protocol(format!("blocking task failed: {}", e)))?
    }
}

fn build_client(settings: &SessionSettings) -> Option<ua::Client> {
    ua::ClientBuilder::new()
        .application_name(settings.application_name.as_str())
        .application_uri(settings.application_uri.as_str())
        .session_retry_limit(settings.session_retry_limit)
        .session_timeout(session_timeout_ms(settings))
        .trust_server_certs(true)
        .client()
}

fn release_session(session: SharedSession) {
    debug!("Disconnecting session opened after its caller gave up");
    session.read().disconnect();
}

/// Requested idle session lifetime in the client library's milliseconds.
fn session_timeout_ms(settings: &SessionSettings) -> u32 {
    u32::try_from(settings.session_timeout.as_millis()).unwrap_or(u32::MAX)
}

#[async_trait]
impl UaTransport for RealTransport {
    async fn connect(&mut self) -> UaResult<()> {
        info!(endpoint = %self.endpoint, "Connecting to OPC UA server");

        let endpoint = self.endpoint.clone();
        let settings = self.settings.clone();
        let (sender, receiver) = handoff(release_session);
        self.blocking(move || {
            let mut client = build_client(&settings)
                .ok_or_else(|| UaError::refused(&endpoint, "failed to build client"))?;

            let endpoints = client
                .get_server_endpoints_from_url(endpoint.as_str())
                .map_err(|e| UaError::refused(&endpoint, e.to_string()))?;

            let description = endpoints
                .iter()
                .find(|e| {
                    e.security_policy_uri.as_ref() == ua::SecurityPolicy::None.to_uri()
                        && e.security_mode == ua::MessageSecurityMode::None
                })
                .cloned()
                .ok_or_else(|| {
                    UaError::refused(&endpoint, "server offers no unsecured endpoint")
                })?;

            let session = client
                .connect_to_endpoint(description, ua::IdentityToken::Anonymous)
                .map_err(|e| UaError::refused(&endpoint, e.to_string()))?;

            if sender.deliver(session) {
                Ok(())
            } else {
                Err(UaError::refused(&endpoint, "connect abandoned by caller"))
            }
        })
        .await?;

        let session = receiver.take().ok_or(UaError::NotConnected)?;
        self.session = Some(session);
        info!(endpoint = %self.endpoint, "Connected to OPC UA server");
        Ok(())
    }

    async fn disconnect(&mut self) -> UaResult<()> {
        if let Some(session) = self.session.take() {
            debug!(endpoint = %self.endpoint, "Disconnecting from OPC UA server");
            self.blocking(move || {
                session.read().disconnect();
                Ok(())
            })
            .await?;
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read(&self, items: &[ReadValueId]) -> UaResult<Vec<DataValue>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let session = self.session()?;
        let request: Vec<ua::ReadValueId> = items
            .iter()
            .map(|item| ua::ReadValueId {
                node_id: to_ua_node_id(&item.node_id),
                attribute_id: item.attribute.value(),
                index_range: ua::UAString::null(),
                data_encoding: ua::QualifiedName::null(),
            })
            .collect();

        trace!(count = items.len(), "Read request");
        let response = self
            .blocking(move || {
                Ok(session
                    .read()
                    .read(&request, ua::TimestampsToReturn::Both, 0.0))
            })
            .await?
            .map_err(|status| self.service_error("Read", status))?;

        Ok(response.iter().map(from_ua_data_value).collect())
    }

    async fn write(&self, items: &[WriteValue]) -> UaResult<Vec<StatusCode>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let session = self.session()?;
        let request = items
            .iter()
            .map(|item| {
                Ok(ua::WriteValue {
                    node_id: to_ua_node_id(&item.node_id),
                    attribute_id: item.attribute.value(),
                    index_range: ua::UAString::null(),
                    value: ua::DataValue::new_now(to_ua_variant(&item.value)?),
                })
            })
            .collect::<UaResult<Vec<_>>>()?;

        trace!(count = items.len(), "Write request");
        let response = self
            .blocking(move || Ok(session.read().write(&request)))
            .await?
            .map_err(|status| self.service_error("Write", status))?;

        Ok(response.iter().map(|s| StatusCode(s.bits())).collect())
    }

    async fn browse(&self, nodes: &[NodeId]) -> UaResult<Vec<Vec<ReferenceDescription>>> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let session = self.session()?;
        let request: Vec<ua::BrowseDescription> = nodes
            .iter()
            .map(|node| ua::BrowseDescription {
                node_id: to_ua_node_id(node),
                browse_direction: ua::BrowseDirection::Forward,
                reference_type_id: ua::ReferenceTypeId::HierarchicalReferences.into(),
                include_subtypes: true,
                node_class_mask: 0,
                result_mask: ua::BrowseDescriptionResultMask::all().bits(),
            })
            .collect();

        trace!(count = nodes.len(), "Browse request");
        let response = self
            .blocking(move || Ok(session.read().browse(&request)))
            .await?
            .map_err(|status| self.service_error("Browse", status))?
            .unwrap_or_default();

        let mut out: Vec<Vec<ReferenceDescription>> = response
            .iter()
            .map(|result| {
                result
                    .references
                    .as_ref()
                    .map(|refs| {
                        refs.iter()
                            .map(|r| ReferenceDescription {
                                node_id: from_ua_node_id(&r.node_id.node_id),
                                browse_name: r.browse_name.name.as_ref().to_string(),
                                display_name: r.display_name.text.as_ref().to_string(),
                                node_class: NodeClass::from_value(r.node_class as u32),
                            })
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .collect();
        out.resize_with(nodes.len(), Vec::new);
        Ok(out)
    }
}

impl std::fmt::Debug for RealTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealTransport")
            .field("endpoint", &self.endpoint)
            .field("connected", &self.session.is_some())
            .finish()
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn to_ua_node_id(node_id: &NodeId) -> ua::NodeId {
    let ns = node_id.namespace_index;
    match &node_id.identifier {
        NodeIdentifier::Numeric(v) => ua::NodeId::new(ns, *v),
        NodeIdentifier::String(v) => ua::NodeId::new(ns, v.clone()),
        NodeIdentifier::Guid(v) => ua::NodeId::new(ns, ua::Guid::from(*v)),
        NodeIdentifier::Opaque(v) => ua::NodeId::new(ns, ua::ByteString::from(v.as_slice())),
    }
}

fn from_ua_node_id(node_id: &ua::NodeId) -> NodeId {
    let ns = node_id.namespace;
    match &node_id.identifier {
        ua::Identifier::Numeric(v) => NodeId::numeric(ns, *v),
        ua::Identifier::String(v) => NodeId::string(ns, v.as_ref()),
        ua::Identifier::Guid(v) => NodeId::guid(ns, uuid::Uuid::from_bytes(*v.as_bytes())),
        ua::Identifier::ByteString(v) => NodeId::opaque(ns, v.value.clone().unwrap_or_default()),
    }
}

fn from_ua_time(t: &ua::DateTime) -> DateTime<Utc> {
    t.as_chrono()
}

fn from_ua_data_value(dv: &ua::DataValue) -> DataValue {
    DataValue {
        value: dv.value.as_ref().map(from_ua_variant),
        status: StatusCode(dv.status.map(|s| s.bits()).unwrap_or(0)),
        source_timestamp: dv.source_timestamp.as_ref().map(from_ua_time),
        server_timestamp: dv.server_timestamp.as_ref().map(from_ua_time),
    }
}

fn from_ua_variant(variant: &ua::Variant) -> Variant {
    use ua::Variant as V;

    match variant {
        V::Empty => Variant::Empty,
        V::Boolean(v) => Variant::Boolean(*v),
        V::SByte(v) => Variant::SByte(*v),
        V::Byte(v) => Variant::Byte(*v),
        V::Int16(v) => Variant::Int16(*v),
        V::UInt16(v) => Variant::UInt16(*v),
        V::Int32(v) => Variant::Int32(*v),
        V::UInt32(v) => Variant::UInt32(*v),
        V::Int64(v) => Variant::Int64(*v),
        V::UInt64(v) => Variant::UInt64(*v),
        V::Float(v) => Variant::Float(*v),
        V::Double(v) => Variant::Double(*v),
        V::String(v) => Variant::String(v.as_ref().to_string()),
        V::DateTime(v) => Variant::DateTime(from_ua_time(v)),
        V::Guid(v) => Variant::Guid(uuid::Uuid::from_bytes(*v.as_bytes())),
        V::ByteString(v) => Variant::ByteString(v.value.clone().unwrap_or_default()),
        V::NodeId(v) => Variant::NodeId(from_ua_node_id(v)),
        V::StatusCode(v) => Variant::StatusCode(StatusCode(v.bits())),
        V::QualifiedName(v) => Variant::QualifiedName {
            namespace_index: v.namespace_index,
            name: v.name.as_ref().to_string(),
        },
        V::LocalizedText(v) => Variant::LocalizedText {
            locale: v.locale.value().clone().filter(|l| !l.is_empty()),
            text: v.text.as_ref().to_string(),
        },
        V::Array(arr) => Variant::Array(arr.values.iter().map(from_ua_variant).collect()),
        other => Variant::String(format!("{:?}", other)),
    }
}

fn to_ua_variant(value: &Variant) -> UaResult<ua::Variant> {
    use ua::Variant as V;

    Ok(match value {
        Variant::Empty => V::Empty,
        Variant::Boolean(v) => V::Boolean(*v),
        Variant::SByte(v) => V::SByte(*v),
        Variant::Byte(v) => V::Byte(*v),
        Variant::Int16(v) => V::Int16(*v),
        Variant::UInt16(v) => V::UInt16(*v),
        Variant::Int32(v) => V::Int32(*v),
        Variant::UInt32(v) => V::UInt32(*v),
        Variant::Int64(v) => V::Int64(*v),
        Variant::UInt64(v) => V::UInt64(*v),
        Variant::Float(v) => V::Float(*v),
        Variant::Double(v) => V::Double(*v),
        Variant::String(v) => V::String(ua::UAString::from(v.as_str())),
        Variant::DateTime(v) => V::DateTime(Box::new(ua::DateTime::from(*v))),
        Variant::Guid(v) => V::Guid(Box::new(ua::Guid::from(*v))),
        Variant::ByteString(v) => V::ByteString(ua::ByteString::from(v.as_slice())),
        Variant::NodeId(v) => V::NodeId(Box::new(to_ua_node_id(v))),
        Variant::StatusCode(v) => V::StatusCode(ua::StatusCode::from_bits_truncate(v.0)),
        Variant::QualifiedName {
            namespace_index,
            name,
        } => V::QualifiedName(Box::new(ua::QualifiedName::new(
            *namespace_index,
            name.as_str(),
        ))),
        Variant::LocalizedText { locale, text } => V::LocalizedText(Box::new(
            ua::LocalizedText::new(locale.as_deref().unwrap_or(""), text.as_str()),
        )),
        Variant::Array(items) => {
            let values = items.iter().map(to_ua_variant).collect::<UaResult<Vec<_>>>()?;
            let element = values
                .first()
                .map(|v| v.type_id())
                .unwrap_or(ua::VariantTypeId::Empty);
            let array = ua::Array::new(element, values)
                .map_err(|_| UaError::protocol("array elements must share one type"))?;
            V::Array(Box::new(array))
        }
    })
}
