// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Write value encoding.
//!
//! A write arrives as a literal string with an optional type tag. Encoding
//! runs in three steps:
//!
//! 1. [`parse_literal`] turns the literal into an [`AppValue`]. The first
//!    matching rule wins: date-time, float (contains `.`), integer (all
//!    digits), `true`/`false` (any case), otherwise text.
//! 2. [`ValueCodec::infer_type`] picks the wire type. An explicit tag wins
//!    outright. Timestamps, booleans and text map directly. Numbers need
//!    the node's declared DataType, which costs one remote read.
//! 3. [`ValueCodec::coerce`] converts the value to a [`Variant`] of that type.
//!
//! DisplayName, Description and InverseName are always written as
//! localized text carrying the literal verbatim.

use std::fmt;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, NaiveDateTime, Utc};
use ualink_core::{AccessError, AccessResult};

use crate::client::Variant;
use crate::types::{AttributeId, NodeId, VariantType};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

// =============================================================================
// AppValue
// =============================================================================

/// Application-level value before a wire type is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum AppValue {
    /// Point in time.
    Timestamp(DateTime<Utc>),
    /// Boolean.
    Boolean(bool),
    /// Text.
    Text(String),
    /// Integer.
    Integer(i64),
    /// Floating point.
    Float(f64),
    /// Absent value.
    Null,
}

impl AppValue {
    /// Returns `true` for integers and floats.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Float(_))
    }
}

impl fmt::Display for AppValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(v) => write!(f, "{}", v.to_rfc3339()),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Parses an untyped literal.
pub fn parse_literal(literal: &str) -> AppValue {
    if let Some(ts) = parse_timestamp(literal) {
        return AppValue::Timestamp(ts);
    }
    if literal.contains('.') {
        if let Ok(v) = literal.parse::<f64>() {
            return AppValue::Float(v);
        }
    }
    if !literal.is_empty() && literal.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(v) = literal.parse::<i64>() {
            return AppValue::Integer(v);
        }
    }
    if literal.eq_ignore_ascii_case("true") {
        return AppValue::Boolean(true);
    }
    if literal.eq_ignore_ascii_case("false") {
        return AppValue::Boolean(false);
    }
    AppValue::Text(literal.to_string())
}

fn parse_timestamp(literal: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(literal) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(literal, fmt).ok())
        .map(|naive| naive.and_utc())
}

// =============================================================================
// DeclaredTypeSource
// =============================================================================

/// Looks up the declared DataType of nodes on the remote server.
#[async_trait]
pub trait DeclaredTypeSource: Send + Sync {
    /// Reads the DataType attribute of every node in one call.
    ///
    /// The outer error fails the whole lookup. Inner errors are per node.
    async fn declared_types(&self, nodes: &[NodeId]) -> AccessResult<Vec<AccessResult<VariantType>>>;
}

// =============================================================================
// ValueCodec
// =============================================================================

/// Outcome of preparing a write without touching the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Fully encoded.
    Ready(Variant),
    /// Numeric value whose type must come from the node's DataType.
    NeedsDeclaredType(AppValue),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Known(VariantType),
    Lookup,
}

/// Stateless write encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueCodec;

impl ValueCodec {
    /// Parses a caller type tag. `None` or an empty tag means infer.
    pub fn parse_type_tag(tag: Option<&str>) -> AccessResult<Option<VariantType>> {
        match tag.map(str::trim).filter(|t| !t.is_empty()) {
            None => Ok(None),
            Some(t) => t.parse().map(Some).map_err(|_| {
                AccessError::unsupported_value_type(format!("unknown type tag '{}'", t))
            }),
        }
    }

    fn decide(value: &AppValue, explicit: Option<VariantType>) -> AccessResult<Decision> {
        if let Some(ty) = explicit {
            return Ok(Decision::Known(ty));
        }
        match value {
            AppValue::Timestamp(_) => Ok(Decision::Known(VariantType::DateTime)),
            AppValue::Boolean(_) => Ok(Decision::Known(VariantType::Boolean)),
            AppValue::Text(_) => Ok(Decision::Known(VariantType::String)),
            AppValue::Integer(_) | AppValue::Float(_) => Ok(Decision::Lookup),
            other => Err(AccessError::unsupported_value_type(format!(
                "cannot infer a wire type for '{}'",
                other
            ))),
        }
    }

    /// Chooses the wire type for `value` written to `node`.
    ///
    /// Only an untyped number consults `source`, with exactly one lookup.
    pub async fn infer_type<S>(
        value: &AppValue,
        explicit: Option<VariantType>,
        node: &NodeId,
        source: &S,
    ) -> AccessResult<VariantType>
    where
        S: DeclaredTypeSource + ?Sized,
    {
        match Self::decide(value, explicit)? {
            Decision::Known(ty) => Ok(ty),
            Decision::Lookup => source
                .declared_types(std::slice::from_ref(node))
                .await?
                .into_iter()
                .next()
                .unwrap_or_else(|| {
                    Err(AccessError::unsupported_value_type(format!(
                        "no declared type returned for {}",
                        node
                    )))
                }),
        }
    }

    /// Encodes as much of a write as possible without a server lookup.
    pub fn prepare(
        literal: &str,
        type_tag: Option<&str>,
        attribute: AttributeId,
    ) -> AccessResult<Prepared> {
        if attribute.is_localized_text() {
            return Ok(Prepared::Ready(Variant::text(literal)));
        }
        let explicit = Self::parse_type_tag(type_tag)?;
        let value = parse_literal(literal);
        match Self::decide(&value, explicit)? {
            Decision::Known(ty) => Self::coerce(&value, ty).map(Prepared::Ready),
            Decision::Lookup => Ok(Prepared::NeedsDeclaredType(value)),
        }
    }

    /// Encodes a literal write end to end.
    pub async fn encode<S>(
        literal: &str,
        type_tag: Option<&str>,
        attribute: AttributeId,
        node: &NodeId,
        source: &S,
    ) -> AccessResult<Variant>
    where
        S: DeclaredTypeSource + ?Sized,
    {
        match Self::prepare(literal, type_tag, attribute)? {
            Prepared::Ready(v) => Ok(v),
            Prepared::NeedsDeclaredType(value) => {
                let ty = Self::infer_type(&value, None, node, source).await?;
                Self::coerce(&value, ty)
            }
        }
    }

    /// Converts `value` into a variant of type `ty`.
    pub fn coerce(value: &AppValue, ty: VariantType) -> AccessResult<Variant> {
        let fail = || AccessError::unsupported_literal(value.to_string(), ty.name());

        if matches!(value, AppValue::Null) {
            return Err(fail());
        }

        let variant = match ty {
            VariantType::Boolean => match value {
                AppValue::Boolean(b) => Variant::Boolean(*b),
                AppValue::Integer(0) => Variant::Boolean(false),
                AppValue::Integer(1) => Variant::Boolean(true),
                _ => return Err(fail()),
            },
            VariantType::SByte => Variant::SByte(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::Byte => Variant::Byte(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::Int16 => Variant::Int16(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::UInt16 => Variant::UInt16(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::Int32 => Variant::Int32(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::UInt32 => Variant::UInt32(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            VariantType::Int64 => Variant::Int64(integer(value).ok_or_else(fail)?),
            VariantType::UInt64 => match value {
                AppValue::Text(s) => Variant::UInt64(s.trim().parse().map_err(|_| fail())?),
                _ => Variant::UInt64(integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?),
            },
            VariantType::Float => Variant::Float(float(value).ok_or_else(fail)? as f32),
            VariantType::Double => Variant::Double(float(value).ok_or_else(fail)?),
            VariantType::String => Variant::String(value.to_string()),
            VariantType::DateTime => match value {
                AppValue::Timestamp(ts) => Variant::DateTime(*ts),
                _ => return Err(fail()),
            },
            VariantType::Guid => match value {
                AppValue::Text(s) => Variant::Guid(s.trim().parse().map_err(|_| fail())?),
                _ => return Err(fail()),
            },
            VariantType::ByteString => match value {
                AppValue::Text(s) => Variant::ByteString(BASE64.decode(s.trim()).map_err(|_| fail())?),
                _ => return Err(fail()),
            },
            VariantType::NodeId => match value {
                AppValue::Text(s) => Variant::NodeId(s.parse::<NodeId>().map_err(|_| fail())?),
                _ => return Err(fail()),
            },
            VariantType::StatusCode => Variant::StatusCode(crate::types::StatusCode(
                integer(value).and_then(|v| v.try_into().ok()).ok_or_else(fail)?,
            )),
            VariantType::QualifiedName => Variant::QualifiedName {
                namespace_index: 0,
                name: value.to_string(),
            },
            VariantType::LocalizedText => Variant::text(value.to_string()),
        };
        Ok(variant)
    }
}

/// Integer view of a value. Whole floats and numeric text qualify.
fn integer(value: &AppValue) -> Option<i64> {
    match value {
        AppValue::Integer(v) => Some(*v),
        AppValue::Float(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Some(*v as i64),
        AppValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn float(value: &AppValue) -> Option<f64> {
    match value {
        AppValue::Integer(v) => Some(*v as f64),
        AppValue::Float(v) => Some(*v),
        AppValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        ty: VariantType,
        lookups: AtomicUsize,
    }

    impl FixedSource {
        fn new(ty: VariantType) -> Self {
            Self {
                ty,
                lookups: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DeclaredTypeSource for FixedSource {
        async fn declared_types(
            &self,
            nodes: &[NodeId],
        ) -> AccessResult<Vec<AccessResult<VariantType>>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(nodes.iter().map(|_| Ok(self.ty)).collect())
        }
    }

    #[test]
    fn test_parse_literal_rule_order() {
        assert!(matches!(parse_literal("2024-01-02T03:04:05Z"), AppValue::Timestamp(_)));
        assert!(matches!(parse_literal("2024-01-02 03:04:05"), AppValue::Timestamp(_)));
        assert_eq!(parse_literal("1.5"), AppValue::Float(1.5));
        assert_eq!(parse_literal("42"), AppValue::Integer(42));
        assert_eq!(parse_literal("TRUE"), AppValue::Boolean(true));
        assert_eq!(parse_literal("false"), AppValue::Boolean(false));
        assert_eq!(parse_literal("-5"), AppValue::Text("-5".into()));
        assert_eq!(parse_literal("1.2.3"), AppValue::Text("1.2.3".into()));
        assert_eq!(parse_literal(""), AppValue::Text(String::new()));
    }

    #[tokio::test]
    async fn test_explicit_tag_skips_lookup() {
        let source = FixedSource::new(VariantType::Double);
        let ty = ValueCodec::infer_type(
            &AppValue::Integer(42),
            Some(VariantType::Int32),
            &NodeId::numeric(2, 5),
            &source,
        )
        .await
        .unwrap();

        assert_eq!(ty, VariantType::Int32);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_untyped_number_does_one_lookup() {
        let source = FixedSource::new(VariantType::Float);
        let ty = ValueCodec::infer_type(&AppValue::Integer(42), None, &NodeId::numeric(2, 5), &source)
            .await
            .unwrap();

        assert_eq!(ty, VariantType::Float);
        assert_eq!(source.lookups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_numeric_inferred_locally() {
        let source = FixedSource::new(VariantType::Double);
        let node = NodeId::numeric(2, 5);
        for (value, expected) in [
            (AppValue::Boolean(true), VariantType::Boolean),
            (AppValue::Text("x".into()), VariantType::String),
            (AppValue::Timestamp(Utc::now()), VariantType::DateTime),
        ] {
            let ty = ValueCodec::infer_type(&value, None, &node, &source).await.unwrap();
            assert_eq!(ty, expected);
        }
        assert_eq!(source.lookups.load(Ordering::SeqCst), 0);

        let err = ValueCodec::infer_type(&AppValue::Null, None, &node, &source)
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_prepare() {
        let ready = ValueCodec::prepare("42", Some("Int32"), AttributeId::Value).unwrap();
        assert_eq!(ready, Prepared::Ready(Variant::Int32(42)));

        let deferred = ValueCodec::prepare("42", None, AttributeId::Value).unwrap();
        assert_eq!(deferred, Prepared::NeedsDeclaredType(AppValue::Integer(42)));

        let text = ValueCodec::prepare("42", None, AttributeId::Description).unwrap();
        assert_eq!(text, Prepared::Ready(Variant::text("42")));

        let bad = ValueCodec::prepare("1", Some("Decimal128"), AttributeId::Value);
        assert!(matches!(bad, Err(AccessError::UnsupportedValueType { .. })));
    }

    #[test]
    fn test_coerce_range_checked() {
        assert_eq!(
            ValueCodec::coerce(&AppValue::Integer(200), VariantType::Byte).unwrap(),
            Variant::Byte(200)
        );
        let err = ValueCodec::coerce(&AppValue::Integer(300), VariantType::Byte).unwrap_err();
        assert!(matches!(err, AccessError::UnsupportedLiteral { .. }));

        assert_eq!(
            ValueCodec::coerce(&AppValue::Text("-5".into()), VariantType::Int16).unwrap(),
            Variant::Int16(-5)
        );
        assert_eq!(
            ValueCodec::coerce(&AppValue::Integer(3), VariantType::Double).unwrap(),
            Variant::Double(3.0)
        );
        assert!(ValueCodec::coerce(&AppValue::Float(1.5), VariantType::Int32).is_err());
        assert!(ValueCodec::coerce(&AppValue::Text("abc".into()), VariantType::DateTime).is_err());
    }

    #[tokio::test]
    async fn test_encode_with_declared_type() {
        let source = FixedSource::new(VariantType::Double);
        let v = ValueCodec::encode("7", None, AttributeId::Value, &NodeId::numeric(2, 9), &source)
            .await
            .unwrap();
        assert_eq!(v, Variant::Double(7.0));
    }

    #[test]
    fn test_byte_string_from_base64_text() {
        let value = parse_literal("AQID");
        assert_eq!(value, AppValue::Text("AQID".into()));
        assert_eq!(
            ValueCodec::coerce(&value, VariantType::ByteString).unwrap(),
            Variant::ByteString(vec![1, 2, 3])
        );

        let err = ValueCodec::coerce(&AppValue::Text("not base64!".into()), VariantType::ByteString)
            .unwrap_err();
        assert!(matches!(err, AccessError::UnsupportedLiteral { .. }));
    }
}
