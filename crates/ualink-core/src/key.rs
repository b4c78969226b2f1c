// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Attribute keys and their slash-delimited wire format.
//!
//! ```text
//! read:   ServerName/NodeIdentifier/AttributeName
//! write:  ServerName/NodeIdentifier/AttributeName/LiteralValue/TypeTag
//! ```
//!
//! An empty `NodeIdentifier` addresses the server's root node. An empty
//! `TypeTag` asks the codec to infer the wire type.
//!
//! Read keys tolerate `/` inside the node identifier: the server name ends at
//! the first separator and the attribute name starts after the last one.
//! Write keys tolerate `/` inside the literal instead: the node identifier
//! and attribute name are the second and third segments, the type tag is the
//! last one, and everything in between is the literal (`2024/01/02`).
//!
//! Keys built with [`ReadKey::absolute`] carry a complete server address
//! that is used as is, without namespace qualification. Only code that
//! obtained the address from the server itself builds them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AccessError;

// =============================================================================
// ReadKey
// =============================================================================

/// Identifies one remote attribute to read.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadKey {
    server: String,
    node: String,
    attribute: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    absolute: bool,
}

impl ReadKey {
    /// Creates a read key.
    pub fn new(
        server: impl Into<String>,
        node: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            node: node.into(),
            attribute: attribute.into(),
            absolute: false,
        }
    }

    /// Creates a key for an address reported by the server, such as a
    /// browse result. The identifier bypasses namespace qualification.
    pub fn absolute(
        server: impl Into<String>,
        node: impl Into<String>,
        attribute: impl Into<String>,
    ) -> Self {
        Self {
            absolute: true,
            ..Self::new(server, node, attribute)
        }
    }

    /// Returns `true` when the node identifier is a complete address.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Returns the server name.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Returns the caller-supplied node identifier. Empty means root.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Returns the attribute name.
    pub fn attribute(&self) -> &str {
        &self.attribute
    }
}

impl FromStr for ReadKey {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (server, rest) = s
            .split_once('/')
            .ok_or_else(|| AccessError::invalid_key(s, "expected Server/NodeId/Attribute"))?;
        let (node, attribute) = rest
            .rsplit_once('/')
            .ok_or_else(|| AccessError::invalid_key(s, "expected Server/NodeId/Attribute"))?;

        if server.is_empty() {
            return Err(AccessError::invalid_key(s, "server name is empty"));
        }
        if attribute.is_empty() {
            return Err(AccessError::invalid_key(s, "attribute name is empty"));
        }

        Ok(Self::new(server, node, attribute))
    }
}

impl fmt::Display for ReadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.server, self.node, self.attribute)
    }
}

// =============================================================================
// WriteKey
// =============================================================================

/// Identifies one remote attribute to write, with its literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WriteKey {
    target: ReadKey,
    literal: String,
    type_tag: Option<String>,
}

impl WriteKey {
    /// Creates a write key.
    pub fn new(
        server: impl Into<String>,
        node: impl Into<String>,
        attribute: impl Into<String>,
        literal: impl Into<String>,
        type_tag: Option<String>,
    ) -> Self {
        Self {
            target: ReadKey::new(server, node, attribute),
            literal: literal.into(),
            type_tag: type_tag.filter(|t| !t.is_empty()),
        }
    }

    /// Returns the targeted attribute as a read key.
    pub fn target(&self) -> &ReadKey {
        &self.target
    }

    /// Returns the server name.
    pub fn server(&self) -> &str {
        self.target.server()
    }

    /// Returns the caller-supplied node identifier. Empty means root.
    pub fn node(&self) -> &str {
        self.target.node()
    }

    /// Returns the attribute name.
    pub fn attribute(&self) -> &str {
        self.target.attribute()
    }

    /// Returns the untyped literal.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    /// Returns the explicit type tag, if the caller supplied one.
    pub fn type_tag(&self) -> Option<&str> {
        self.type_tag.as_deref()
    }
}

impl FromStr for WriteKey {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || {
            AccessError::invalid_key(
                s,
                format!(
                    "expected Server/NodeId/Attribute/Value/Type, found {} segments",
                    s.split('/').count()
                ),
            )
        };
        let parts: Vec<&str> = s.splitn(4, '/').collect();
        let (server, node, attribute, tail) = match parts.as_slice() {
            [server, node, attribute, tail] => (*server, *node, *attribute, *tail),
            _ => return Err(malformed()),
        };
        let (literal, type_tag) = tail.rsplit_once('/').ok_or_else(malformed)?;

        if server.is_empty() {
            return Err(AccessError::invalid_key(s, "server name is empty"));
        }
        if attribute.is_empty() {
            return Err(AccessError::invalid_key(s, "attribute name is empty"));
        }

        Ok(Self::new(
            server,
            node,
            attribute,
            literal,
            Some(type_tag.to_string()),
        ))
    }
}

impl fmt::Display for WriteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.target,
            self.literal,
            self.type_tag.as_deref().unwrap_or("")
        )
    }
}

// =============================================================================
// AttributeKey
// =============================================================================

/// Either kind of key, as received from a textual surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeKey {
    /// A read.
    Read(ReadKey),
    /// A write.
    Write(WriteKey),
}

impl AttributeKey {
    /// Returns the server name.
    pub fn server(&self) -> &str {
        match self {
            Self::Read(k) => k.server(),
            Self::Write(k) => k.server(),
        }
    }
}

impl FromStr for AttributeKey {
    type Err = AccessError;

    /// Five segments parse as a write, anything else as a read. Callers
    /// that know the kind should parse [`WriteKey`] directly, since a write
    /// literal containing `/` adds segments.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.split('/').count() == 5 {
            s.parse().map(Self::Write)
        } else {
            s.parse().map(Self::Read)
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(k) => k.fmt(f),
            Self::Write(k) => k.fmt(f),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
