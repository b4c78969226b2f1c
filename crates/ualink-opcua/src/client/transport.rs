// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA transport abstraction layer.
//!
//! [`UaTransport`] is the seam between the access layer and whatever speaks
//! the wire protocol. It offers exactly the bulk primitives the layer needs:
//! a positionally aligned multi-item read, the write analogue, and a
//! multi-node browse.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UaResult;
use crate::types::{AttributeId, NodeClass, NodeId, StatusCode, VariantType};

// =============================================================================
// Variant
// =============================================================================

/// A typed OPC UA value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Variant {
    /// No value.
    Empty,
    /// Boolean.
    Boolean(bool),
    /// Signed 8-bit integer.
    SByte(i8),
    /// Unsigned 8-bit integer.
    Byte(u8),
    /// Signed 16-bit integer.
    Int16(i16),
    /// Unsigned 16-bit integer.
    UInt16(u16),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// GUID.
    Guid(Uuid),
    /// Raw bytes.
    ByteString(Vec<u8>),
    /// Node identifier.
    NodeId(NodeId),
    /// Status code.
    StatusCode(StatusCode),
    /// Namespace-qualified name.
    QualifiedName {
        /// Namespace index.
        namespace_index: u16,
        /// Name.
        name: String,
    },
    /// Text with optional locale.
    LocalizedText {
        /// Locale, e.g. `en-US`.
        locale: Option<String>,
        /// Text.
        text: String,
    },
    /// One-dimensional array.
    Array(Vec<Variant>),
}

impl Variant {
    /// Creates localized text without a locale.
    pub fn text(text: impl Into<String>) -> Self {
        Self::LocalizedText {
            locale: None,
            text: text.into(),
        }
    }

    /// Returns the wire type tag. `Empty` and arrays have none.
    pub fn variant_type(&self) -> Option<VariantType> {
        Some(match self {
            Self::Boolean(_) => VariantType::Boolean,
            Self::SByte(_) => VariantType::SByte,
            Self::Byte(_) => VariantType::Byte,
            Self::Int16(_) => VariantType::Int16,
            Self::UInt16(_) => VariantType::UInt16,
            Self::Int32(_) => VariantType::Int32,
            Self::UInt32(_) => VariantType::UInt32,
            Self::Int64(_) => VariantType::Int64,
            Self::UInt64(_) => VariantType::UInt64,
            Self::Float(_) => VariantType::Float,
            Self::Double(_) => VariantType::Double,
            Self::String(_) => VariantType::String,
            Self::DateTime(_) => VariantType::DateTime,
            Self::Guid(_) => VariantType::Guid,
            Self::ByteString(_) => VariantType::ByteString,
            Self::NodeId(_) => VariantType::NodeId,
            Self::StatusCode(_) => VariantType::StatusCode,
            Self::QualifiedName { .. } => VariantType::QualifiedName,
            Self::LocalizedText { .. } => VariantType::LocalizedText,
            Self::Empty | Self::Array(_) => return None,
        })
    }

    /// Returns the value as an `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::SByte(v) => Some(i64::from(*v)),
            Self::Byte(v) => Some(i64::from(*v)),
            Self::Int16(v) => Some(i64::from(*v)),
            Self::UInt16(v) => Some(i64::from(*v)),
            Self::Int32(v) => Some(i64::from(*v)),
            Self::UInt32(v) => Some(i64::from(*v)),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::UInt64(v) => Some(*v as f64),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Returns the text of strings, localized text, and qualified names.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            Self::LocalizedText { text, .. } => Some(text),
            Self::QualifiedName { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the node id payload.
    pub fn as_node_id(&self) -> Option<&NodeId> {
        match self {
            Self::NodeId(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to a plain JSON value for display.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Empty => Json::Null,
            Self::Boolean(v) => Json::from(*v),
            Self::Float(v) => Json::from(f64::from(*v)),
            Self::Double(v) => Json::from(*v),
            Self::UInt64(v) => Json::from(*v),
            Self::String(v) => Json::from(v.as_str()),
            Self::DateTime(v) => Json::from(v.to_rfc3339()),
            Self::Array(items) => Json::Array(items.iter().map(Variant::to_json).collect()),
            other => match other.as_i64() {
                Some(v) => Json::from(v),
                None => Json::from(other.to_string()),
            },
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::SByte(v) => write!(f, "{}", v),
            Self::Byte(v) => write!(f, "{}", v),
            Self::Int16(v) => write!(f, "{}", v),
            Self::UInt16(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::ByteString(v) => write!(f, "<{} bytes>", v.len()),
            Self::NodeId(v) => write!(f, "{}", v),
            Self::StatusCode(v) => write!(f, "{}", v),
            Self::QualifiedName {
                namespace_index,
                name,
            } => write!(f, "{}:{}", namespace_index, name),
            Self::LocalizedText { text, .. } => write!(f, "{}", text),
            Self::Array(v) => write!(f, "[{} items]", v.len()),
        }
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A read result: value, status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValue {
    /// The value, absent on bad status.
    pub value: Option<Variant>,
    /// Item status.
    pub status: StatusCode,
    /// Timestamp assigned by the data source.
    pub source_timestamp: Option<DateTime<Utc>>,
    /// Timestamp assigned by the server.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value without timestamps.
    pub fn good(value: Variant) -> Self {
        Self {
            value: Some(value),
            status: StatusCode::GOOD,
            source_timestamp: None,
            server_timestamp: None,
        }
    }

    /// Creates a valueless result with the given status.
    pub fn bad(status: StatusCode) -> Self {
        Self {
            value: None,
            status,
            source_timestamp: None,
            server_timestamp: Some(Utc::now()),
        }
    }

    /// Sets the source timestamp.
    pub fn with_source_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.source_timestamp = Some(ts);
        self
    }

    /// Sets the server timestamp.
    pub fn with_server_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.server_timestamp = Some(ts);
        self
    }

    /// Returns `true` if the status is good.
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }

    /// Returns the wire type of the value.
    pub fn variant_type(&self) -> Option<VariantType> {
        self.value.as_ref().and_then(Variant::variant_type)
    }
}

// =============================================================================
// Request / Reference records
// =============================================================================

/// One item of a bulk read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadValueId {
    /// Target node.
    pub node_id: NodeId,
    /// Target attribute.
    pub attribute: AttributeId,
}

impl ReadValueId {
    /// Creates a read item.
    pub fn new(node_id: NodeId, attribute: AttributeId) -> Self {
        Self { node_id, attribute }
    }
}

/// One item of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteValue {
    /// Target node.
    pub node_id: NodeId,
    /// Target attribute.
    pub attribute: AttributeId,
    /// Value to write.
    pub value: Variant,
}

impl WriteValue {
    /// Creates a write item.
    pub fn new(node_id: NodeId, attribute: AttributeId, value: Variant) -> Self {
        Self {
            node_id,
            attribute,
            value,
        }
    }
}

/// A hierarchical forward reference returned by browse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceDescription {
    /// The referenced node.
    pub node_id: NodeId,
    /// Browse name.
    pub browse_name: String,
    /// Display name.
    pub display_name: String,
    /// Node class, when the server reported it.
    pub node_class: Option<NodeClass>,
}

// =============================================================================
// UaTransport
// =============================================================================

/// Bulk access to one OPC UA server.
///
/// Every list-returning method is positionally aligned with its input. An
/// `Err` means the call as a whole failed. Per-item problems are reported
/// through the item's [`StatusCode`].
#[async_trait]
pub trait UaTransport: Send + Sync {
    /// Opens a session.
    async fn connect(&mut self) -> UaResult<()>;

    /// Closes the session. Closing a closed transport is not an error.
    async fn disconnect(&mut self) -> UaResult<()>;

    /// Returns `true` while a session is believed open.
    fn is_connected(&self) -> bool;

    /// Returns the endpoint URL.
    fn endpoint(&self) -> &str;

    /// Reads many attributes in one call.
    async fn read(&self, items: &[ReadValueId]) -> UaResult<Vec<DataValue>>;

    /// Writes many attributes in one call.
    async fn write(&self, items: &[WriteValue]) -> UaResult<Vec<StatusCode>>;

    /// Browses the hierarchical children of many nodes in one call.
    async fn browse(&self, nodes: &[NodeId]) -> UaResult<Vec<Vec<ReferenceDescription>>>;
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_type_tags() {
        assert_eq!(Variant::Int32(42).variant_type(), Some(VariantType::Int32));
        assert_eq!(Variant::text("x").variant_type(), Some(VariantType::LocalizedText));
        assert_eq!(Variant::Empty.variant_type(), None);
        assert_eq!(Variant::Array(vec![]).variant_type(), None);
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Variant::UInt16(7).as_i64(), Some(7));
        assert_eq!(Variant::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(Variant::Float(1.5).as_f64(), Some(1.5));
        assert_eq!(Variant::String("1".into()).as_f64(), None);
    }

    #[test]
    fn test_to_json() {
        assert_eq!(Variant::Int32(42).to_json(), serde_json::json!(42));
        assert_eq!(Variant::text("Motor").to_json(), serde_json::json!("Motor"));
        assert_eq!(
            Variant::Array(vec![Variant::Boolean(true), Variant::Empty]).to_json(),
            serde_json::json!([true, null])
        );
        assert_eq!(
            Variant::NodeId(NodeId::standard(6)).to_json(),
            serde_json::json!("i=6")
        );
    }

    #[test]
    fn test_data_value_helpers() {
        let dv = DataValue::good(Variant::Double(1.0));
        assert!(dv.is_good());
        assert_eq!(dv.variant_type(), Some(VariantType::Double));

        let dv = DataValue::bad(StatusCode::BAD_NODE_ID_UNKNOWN);
        assert!(!dv.is_good());
        assert!(dv.value.is_none());
    }
}
