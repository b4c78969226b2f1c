// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! OPC UA identifiers and enumerations.
//!
//! - **NodeId**: namespace-qualified node identifiers with the textual
//!   `ns=<idx>;{i|s|g|b}=<id>` form
//! - **VariantType**: wire type tags accompanying written values
//! - **NodeClass** / **AttributeId**: node kinds and attribute identifiers
//! - **StatusCode**: per-item operation status
//!
//! # Examples
//!
//! ```
//! use ualink_opcua::types::{AttributeId, NodeId, VariantType};
//!
//! let node: NodeId = "ns=2;s=Line1.Motor.Speed".parse().unwrap();
//! assert_eq!(node.namespace_index, 2);
//!
//! let attribute: AttributeId = "DisplayName".parse().unwrap();
//! assert_eq!(attribute.value(), 4);
//!
//! let tag: VariantType = "Int32".parse().unwrap();
//! assert!(tag.is_numeric());
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UaError;

// =============================================================================
// Well-known nodes
// =============================================================================

/// `i=84`, the address space root.
pub const ROOT_FOLDER: u32 = 84;
/// `i=85`, the Objects folder.
pub const OBJECTS_FOLDER: u32 = 85;
/// `i=2253`, the Server object.
pub const SERVER: u32 = 2253;
/// `i=2255`, Server_NamespaceArray.
pub const SERVER_NAMESPACE_ARRAY: u32 = 2255;
/// `i=2256`, Server_ServerStatus.
pub const SERVER_STATUS: u32 = 2256;
/// `i=2259`, Server_ServerStatus_State. Used as the liveness probe.
pub const SERVER_STATUS_STATE: u32 = 2259;

// =============================================================================
// NodeId
// =============================================================================

/// OPC UA node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = OPC UA standard namespace).
    pub namespace_index: u16,

    /// The node identifier.
    pub identifier: NodeIdentifier,
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: Vec<u8>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value),
        }
    }

    /// Node in namespace 0 with a numeric id.
    #[inline]
    pub fn standard(value: u32) -> Self {
        Self::numeric(0, value)
    }

    /// The address space root, `i=84`.
    pub fn root_folder() -> Self {
        Self::standard(ROOT_FOLDER)
    }

    /// Returns a copy moved into another namespace.
    pub fn with_namespace(&self, namespace_index: u16) -> Self {
        Self {
            namespace_index,
            identifier: self.identifier.clone(),
        }
    }

    /// Returns `true` if this is a string node ID.
    pub fn is_string(&self) -> bool {
        matches!(self.identifier, NodeIdentifier::String(_))
    }

    /// Returns the numeric identifier if applicable.
    pub fn as_numeric(&self) -> Option<u32> {
        match &self.identifier {
            NodeIdentifier::Numeric(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the string identifier if applicable.
    pub fn as_string(&self) -> Option<&str> {
        match &self.identifier {
            NodeIdentifier::String(v) => Some(v),
            _ => None,
        }
    }

    /// Converts to the OPC UA string format.
    ///
    /// Format: `ns=<namespace>;{i|s|g|b}=<identifier>`, with the namespace
    /// part omitted for namespace 0.
    pub fn to_opc_string(&self) -> String {
        if self.namespace_index == 0 {
            self.identifier.to_string()
        } else {
            format!("ns={};{}", self.namespace_index, self.identifier)
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_opc_string())
    }
}

impl FromStr for NodeId {
    type Err = UaError;

    /// Parses `ns=2;i=1001`, `ns=2;s=Name`, `ns=2;g=<uuid>`, `ns=2;b=<base64>`
    /// and the same forms without the `ns=` part for namespace 0.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns_str, id) = rest
                    .split_once(';')
                    .ok_or_else(|| UaError::invalid_node_id(s, "missing identifier after namespace"))?;
                let ns: u16 = ns_str
                    .parse()
                    .map_err(|_| UaError::invalid_node_id(s, "invalid namespace index"))?;
                (ns, id)
            }
            None => (0, s),
        };

        Ok(Self {
            namespace_index,
            identifier: NodeIdentifier::parse(identifier_part)
                .map_err(|message| UaError::invalid_node_id(s, message))?,
        })
    }
}

// =============================================================================
// NodeIdentifier
// =============================================================================

/// The four OPC UA identifier kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque (byte string) identifier.
    Opaque(Vec<u8>),
}

impl NodeIdentifier {
    /// Returns the single-letter prefix used in the textual form.
    pub const fn type_prefix(&self) -> char {
        match self {
            Self::Numeric(_) => 'i',
            Self::String(_) => 's',
            Self::Guid(_) => 'g',
            Self::Opaque(_) => 'b',
        }
    }

    /// Returns the identifier text without its type prefix.
    pub fn value_text(&self) -> String {
        match self {
            Self::Numeric(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Guid(v) => v.to_string(),
            Self::Opaque(v) => BASE64.encode(v),
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        if let Some(id) = s.strip_prefix("i=") {
            id.parse()
                .map(Self::Numeric)
                .map_err(|_| "invalid numeric identifier".to_string())
        } else if let Some(id) = s.strip_prefix("s=") {
            Ok(Self::String(id.to_string()))
        } else if let Some(id) = s.strip_prefix("g=") {
            Uuid::parse_str(id)
                .map(Self::Guid)
                .map_err(|e| format!("invalid GUID: {}", e))
        } else if let Some(id) = s.strip_prefix("b=") {
            BASE64
                .decode(id)
                .map(Self::Opaque)
                .map_err(|e| format!("invalid base64: {}", e))
        } else {
            Err("unknown identifier type, expected i=, s=, g= or b=".to_string())
        }
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.type_prefix(), self.value_text())
    }
}

// =============================================================================
// VariantType
// =============================================================================

/// Wire type tag of a written value.
///
/// Discriminants are the built-in DataType node ids of namespace 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VariantType {
    /// Boolean.
    Boolean,
    /// Signed 8-bit integer.
    SByte,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// UTC timestamp.
    DateTime,
    /// GUID.
    Guid,
    /// Raw bytes.
    ByteString,
    /// Node identifier.
    NodeId,
    /// Status code.
    StatusCode,
    /// Qualified name.
    QualifiedName,
    /// Localized text.
    LocalizedText,
}

impl VariantType {
    const ALL: [Self; 19] = [
        Self::Boolean,
        Self::SByte,
        Self::Byte,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float,
        Self::Double,
        Self::String,
        Self::DateTime,
        Self::Guid,
        Self::ByteString,
        Self::NodeId,
        Self::StatusCode,
        Self::QualifiedName,
        Self::LocalizedText,
    ];

    /// Returns the built-in DataType id.
    pub const fn type_id(&self) -> u32 {
        match self {
            Self::Boolean => 1,
            Self::SByte => 2,
            Self::Byte => 3,
            Self::Int16 => 4,
            Self::UInt16 => 5,
            Self::Int32 => 6,
            Self::UInt32 => 7,
            Self::Int64 => 8,
            Self::UInt64 => 9,
            Self::Float => 10,
            Self::Double => 11,
            Self::String => 12,
            Self::DateTime => 13,
            Self::Guid => 14,
            Self::ByteString => 15,
            Self::NodeId => 17,
            Self::StatusCode => 19,
            Self::QualifiedName => 20,
            Self::LocalizedText => 21,
        }
    }

    /// Maps a declared DataType node to the variant type used on the wire.
    ///
    /// The abstract numeric types (`Number`, `Integer`, `UInteger`) and
    /// `Enumeration` map to their widest concrete representation.
    pub fn from_data_type(data_type: &NodeId) -> Option<Self> {
        if data_type.namespace_index != 0 {
            return None;
        }
        match data_type.as_numeric()? {
            26 => Some(Self::Double),
            27 => Some(Self::Int64),
            28 => Some(Self::UInt64),
            29 => Some(Self::Int32),
            id => Self::ALL.iter().copied().find(|t| t.type_id() == id),
        }
    }

    /// Returns the DataType node for this tag.
    pub fn data_type_node(&self) -> NodeId {
        NodeId::standard(self.type_id())
    }

    /// Returns `true` for integer and floating-point tags.
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::SByte
                | Self::Byte
                | Self::Int16
                | Self::UInt16
                | Self::Int32
                | Self::UInt32
                | Self::Int64
                | Self::UInt64
                | Self::Float
                | Self::Double
        )
    }

    /// Returns the canonical type name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::SByte => "SByte",
            Self::Byte => "Byte",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::Double => "Double",
            Self::String => "String",
            Self::DateTime => "DateTime",
            Self::Guid => "Guid",
            Self::ByteString => "ByteString",
            Self::NodeId => "NodeId",
            Self::StatusCode => "StatusCode",
            Self::QualifiedName => "QualifiedName",
            Self::LocalizedText => "LocalizedText",
        }
    }
}

impl fmt::Display for VariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VariantType {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UaError::protocol(format!("unknown variant type '{}'", s)))
    }
}

// =============================================================================
// NodeClass
// =============================================================================

/// OPC UA node class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeClass {
    /// Object node.
    Object,
    /// Variable node.
    Variable,
    /// Method node.
    Method,
    /// Object type node.
    ObjectType,
    /// Variable type node.
    VariableType,
    /// Reference type node.
    ReferenceType,
    /// Data type node.
    DataType,
    /// View node.
    View,
}

impl NodeClass {
    /// Returns the OPC UA enumeration value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::Object => 1,
            Self::Variable => 2,
            Self::Method => 4,
            Self::ObjectType => 8,
            Self::VariableType => 16,
            Self::ReferenceType => 32,
            Self::DataType => 64,
            Self::View => 128,
        }
    }

    /// Creates from the OPC UA enumeration value.
    pub fn from_value(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Object),
            2 => Some(Self::Variable),
            4 => Some(Self::Method),
            8 => Some(Self::ObjectType),
            16 => Some(Self::VariableType),
            32 => Some(Self::ReferenceType),
            64 => Some(Self::DataType),
            128 => Some(Self::View),
            _ => None,
        }
    }

    /// Returns the name used by the NodeClass enumeration.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Object => "Object",
            Self::Variable => "Variable",
            Self::Method => "Method",
            Self::ObjectType => "ObjectType",
            Self::VariableType => "VariableType",
            Self::ReferenceType => "ReferenceType",
            Self::DataType => "DataType",
            Self::View => "View",
        }
    }
}

impl fmt::Display for NodeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NodeClass {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['_', '-'], "");
        [
            Self::Object,
            Self::Variable,
            Self::Method,
            Self::ObjectType,
            Self::VariableType,
            Self::ReferenceType,
            Self::DataType,
            Self::View,
        ]
        .into_iter()
        .find(|c| c.name().eq_ignore_ascii_case(&wanted))
        .ok_or_else(|| UaError::protocol(format!("unknown node class '{}'", s)))
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// OPC UA attribute identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AttributeId {
    /// NodeId.
    NodeId,
    /// NodeClass.
    NodeClass,
    /// BrowseName.
    BrowseName,
    /// DisplayName.
    DisplayName,
    /// Description.
    Description,
    /// WriteMask.
    WriteMask,
    /// UserWriteMask.
    UserWriteMask,
    /// IsAbstract.
    IsAbstract,
    /// Symmetric.
    Symmetric,
    /// InverseName.
    InverseName,
    /// ContainsNoLoops.
    ContainsNoLoops,
    /// EventNotifier.
    EventNotifier,
    /// Value.
    #[default]
    Value,
    /// DataType.
    DataType,
    /// ValueRank.
    ValueRank,
    /// ArrayDimensions.
    ArrayDimensions,
    /// AccessLevel.
    AccessLevel,
    /// UserAccessLevel.
    UserAccessLevel,
    /// MinimumSamplingInterval.
    MinimumSamplingInterval,
    /// Historizing.
    Historizing,
    /// Executable.
    Executable,
    /// UserExecutable.
    UserExecutable,
}

impl AttributeId {
    const ALL: [Self; 22] = [
        Self::NodeId,
        Self::NodeClass,
        Self::BrowseName,
        Self::DisplayName,
        Self::Description,
        Self::WriteMask,
        Self::UserWriteMask,
        Self::IsAbstract,
        Self::Symmetric,
        Self::InverseName,
        Self::ContainsNoLoops,
        Self::EventNotifier,
        Self::Value,
        Self::DataType,
        Self::ValueRank,
        Self::ArrayDimensions,
        Self::AccessLevel,
        Self::UserAccessLevel,
        Self::MinimumSamplingInterval,
        Self::Historizing,
        Self::Executable,
        Self::UserExecutable,
    ];

    /// Returns the OPC UA numeric value.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::WriteMask => 6,
            Self::UserWriteMask => 7,
            Self::IsAbstract => 8,
            Self::Symmetric => 9,
            Self::InverseName => 10,
            Self::ContainsNoLoops => 11,
            Self::EventNotifier => 12,
            Self::Value => 13,
            Self::DataType => 14,
            Self::ValueRank => 15,
            Self::ArrayDimensions => 16,
            Self::AccessLevel => 17,
            Self::UserAccessLevel => 18,
            Self::MinimumSamplingInterval => 19,
            Self::Historizing => 20,
            Self::Executable => 21,
            Self::UserExecutable => 22,
        }
    }

    /// Creates from the OPC UA numeric value.
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.value() == value)
    }

    /// Returns the attribute name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NodeId => "NodeId",
            Self::NodeClass => "NodeClass",
            Self::BrowseName => "BrowseName",
            Self::DisplayName => "DisplayName",
            Self::Description => "Description",
            Self::WriteMask => "WriteMask",
            Self::UserWriteMask => "UserWriteMask",
            Self::IsAbstract => "IsAbstract",
            Self::Symmetric => "Symmetric",
            Self::InverseName => "InverseName",
            Self::ContainsNoLoops => "ContainsNoLoops",
            Self::EventNotifier => "EventNotifier",
            Self::Value => "Value",
            Self::DataType => "DataType",
            Self::ValueRank => "ValueRank",
            Self::ArrayDimensions => "ArrayDimensions",
            Self::AccessLevel => "AccessLevel",
            Self::UserAccessLevel => "UserAccessLevel",
            Self::MinimumSamplingInterval => "MinimumSamplingInterval",
            Self::Historizing => "Historizing",
            Self::Executable => "Executable",
            Self::UserExecutable => "UserExecutable",
        }
    }

    /// Returns `true` for attributes whose values are localized text.
    pub const fn is_localized_text(&self) -> bool {
        matches!(self, Self::DisplayName | Self::Description | Self::InverseName)
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AttributeId {
    type Err = UaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UaError::protocol(format!("unknown attribute '{}'", s)))
    }
}

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
///
/// The top two bits carry the severity: `00` good, `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Good.
    pub const GOOD: Self = Self(0);
    /// BadUnexpectedError.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// BadInternalError.
    pub const BAD_INTERNAL_ERROR: Self = Self(0x8002_0000);
    /// BadCommunicationError.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// BadTimeout.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// BadUserAccessDenied.
    pub const BAD_USER_ACCESS_DENIED: Self = Self(0x801F_0000);
    /// BadNodeIdInvalid.
    pub const BAD_NODE_ID_INVALID: Self = Self(0x8033_0000);
    /// BadNodeIdUnknown.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// BadAttributeIdInvalid.
    pub const BAD_ATTRIBUTE_ID_INVALID: Self = Self(0x8035_0000);
    /// BadNotReadable.
    pub const BAD_NOT_READABLE: Self = Self(0x803A_0000);
    /// BadNotWritable.
    pub const BAD_NOT_WRITABLE: Self = Self(0x803B_0000);
    /// BadOutOfRange.
    pub const BAD_OUT_OF_RANGE: Self = Self(0x803C_0000);
    /// BadNotSupported.
    pub const BAD_NOT_SUPPORTED: Self = Self(0x803D_0000);
    /// BadTypeMismatch.
    pub const BAD_TYPE_MISMATCH: Self = Self(0x8074_0000);

    /// Returns the raw code.
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Returns `true` if the severity is good.
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity is uncertain.
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity is bad.
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name for known codes.
    pub fn name(&self) -> &'static str {
        match self.0 & 0xFFFF_0000 {
            0 => "Good",
            0x8001_0000 => "BadUnexpectedError",
            0x8002_0000 => "BadInternalError",
            0x8005_0000 => "BadCommunicationError",
            0x800A_0000 => "BadTimeout",
            0x801F_0000 => "BadUserAccessDenied",
            0x8033_0000 => "BadNodeIdInvalid",
            0x8034_0000 => "BadNodeIdUnknown",
            0x8035_0000 => "BadAttributeIdInvalid",
            0x803A_0000 => "BadNotReadable",
            0x803B_0000 => "BadNotWritable",
            0x803C_0000 => "BadOutOfRange",
            0x803D_0000 => "BadNotSupported",
            0x8074_0000 => "BadTypeMismatch",
            _ if self.is_good() => "Good",
            _ if self.is_uncertain() => "Uncertain",
            _ => "Bad",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_and_format() {
        let node: NodeId = "ns=2;i=5".parse().unwrap();
        assert_eq!(node, NodeId::numeric(2, 5));
        assert_eq!(node.to_opc_string(), "ns=2;i=5");

        let node: NodeId = "i=84".parse().unwrap();
        assert_eq!(node, NodeId::root_folder());
        assert_eq!(node.to_string(), "i=84");

        let node: NodeId = "ns=3;s=Plant.Line;A".parse().unwrap();
        assert_eq!(node.as_string(), Some("Plant.Line;A"));
    }

    #[test]
    fn test_node_id_zero_namespace_omitted() {
        assert_eq!(NodeId::string(0, "x").to_opc_string(), "s=x");
        assert_eq!(NodeId::string(1, "x").to_opc_string(), "ns=1;s=x");
    }

    #[test]
    fn test_node_id_parse_errors() {
        assert!("ns=2".parse::<NodeId>().is_err());
        assert!("ns=x;i=1".parse::<NodeId>().is_err());
        assert!("i=abc".parse::<NodeId>().is_err());
        assert!("q=1".parse::<NodeId>().is_err());
        assert!("Temperature".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_node_id_guid_and_opaque() {
        let node: NodeId = "ns=1;g=550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
        assert!(matches!(node.identifier, NodeIdentifier::Guid(_)));

        let node: NodeId = "b=SGVsbG8=".parse().unwrap();
        assert_eq!(node.identifier, NodeIdentifier::Opaque(b"Hello".to_vec()));
        assert_eq!(node.to_opc_string(), "b=SGVsbG8=");
    }

    #[test]
    fn test_variant_type_from_name() {
        assert_eq!("Int32".parse::<VariantType>().unwrap(), VariantType::Int32);
        assert_eq!("double".parse::<VariantType>().unwrap(), VariantType::Double);
        assert!("Decimal".parse::<VariantType>().is_err());
    }

    #[test]
    fn test_variant_type_from_data_type() {
        assert_eq!(VariantType::from_data_type(&NodeId::standard(6)), Some(VariantType::Int32));
        assert_eq!(VariantType::from_data_type(&NodeId::standard(11)), Some(VariantType::Double));
        assert_eq!(VariantType::from_data_type(&NodeId::standard(26)), Some(VariantType::Double));
        assert_eq!(VariantType::from_data_type(&NodeId::standard(29)), Some(VariantType::Int32));
        assert_eq!(VariantType::from_data_type(&NodeId::numeric(2, 6)), None);
        assert_eq!(VariantType::from_data_type(&NodeId::standard(22)), None);
    }

    #[test]
    fn test_attribute_id_names() {
        assert_eq!("NodeClass".parse::<AttributeId>().unwrap(), AttributeId::NodeClass);
        assert_eq!("value".parse::<AttributeId>().unwrap(), AttributeId::Value);
        assert_eq!(AttributeId::from_value(14), Some(AttributeId::DataType));
        assert!("Colour".parse::<AttributeId>().is_err());
    }

    #[test]
    fn test_node_class_round_trip() {
        assert_eq!(NodeClass::from_value(2), Some(NodeClass::Variable));
        assert_eq!("variable".parse::<NodeClass>().unwrap(), NodeClass::Variable);
        assert_eq!("object_type".parse::<NodeClass>().unwrap(), NodeClass::ObjectType);
        assert_eq!(NodeClass::from_value(3), None);
    }

    #[test]
    fn test_status_code_severity() {
        assert!(StatusCode::GOOD.is_good());
        assert!(StatusCode::BAD_NOT_WRITABLE.is_bad());
        assert!(StatusCode(0x4000_0000).is_uncertain());
        assert_eq!(StatusCode::BAD_NODE_ID_UNKNOWN.name(), "BadNodeIdUnknown");
        assert_eq!(StatusCode(0x80AB_0000).name(), "Bad");
    }
}
