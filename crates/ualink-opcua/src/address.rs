// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Caller identifier to node address resolution.
//!
//! # Rules
//!
//! Applied in order by [`AddressResolver::resolve`]:
//!
//! | Identifier          | Namespace index | Result                           |
//! |---------------------|-----------------|----------------------------------|
//! | empty               | any             | the session's effective root     |
//! | anything            | none            | parsed unchanged                 |
//! | `ns=K;s=Tank`       | `M`             | `ns=M;s=Tank` (`s=Tank` if M=0)  |
//! | `s=Tank` / `Tank`   | `M`             | `ns=M;s=Tank` (`s=Tank` if M=0)  |
//!
//! A relative identifier without an `i=`/`s=`/`g=`/`b=` prefix is taken as a
//! string identifier.

use serde::Serialize;
use ualink_core::{AccessError, AccessResult};

use crate::types::{NodeId, NodeIdentifier};

// =============================================================================
// NamespaceContext
// =============================================================================

/// Per-session resolution state of one server.
///
/// Recomputed on every transition into `Connected` because namespace
/// indices are assigned per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceContext {
    /// Index of the configured namespace URI, if one is configured.
    pub namespace_index: Option<u16>,

    /// Address that an empty identifier resolves to.
    pub root: NodeId,
}

impl NamespaceContext {
    /// Creates a context.
    pub fn new(namespace_index: Option<u16>, root: NodeId) -> Self {
        Self {
            namespace_index,
            root,
        }
    }

    /// Context of a server with no namespace configured: pass-through
    /// resolution rooted at the address space root.
    pub fn unqualified() -> Self {
        Self::new(None, NodeId::root_folder())
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::unqualified()
    }
}

// =============================================================================
// AddressResolver
// =============================================================================

/// Stateless resolver of caller identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressResolver;

impl AddressResolver {
    /// Resolves `identifier` against `ctx`.
    pub fn resolve(ctx: &NamespaceContext, identifier: &str) -> AccessResult<NodeId> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Ok(ctx.root.clone());
        }
        Self::qualify(ctx.namespace_index, identifier)
    }

    /// Qualifies `identifier` with `namespace_index`, or parses it unchanged
    /// when no index is given.
    pub fn qualify(namespace_index: Option<u16>, identifier: &str) -> AccessResult<NodeId> {
        let identifier = identifier.trim();
        let Some(index) = namespace_index else {
            return parse(identifier);
        };

        let node = if identifier.starts_with("ns=") || has_type_prefix(identifier) {
            parse(identifier)?
        } else {
            NodeId::string(0, identifier)
        };
        Ok(node.with_namespace(index))
    }

    /// Derives a display path for `node`.
    ///
    /// Best-effort only. When the root is a dot-delimited string identifier
    /// such as `s=Plant.Area1`, the text after the last occurrence of the
    /// root's final segment (`area1`, matched case-insensitively) becomes the
    /// path, with dots turned into `/`. Any other identifier scheme yields
    /// the identifier's bare value. Servers that do not name nodes like
    /// folders get paths that mean nothing.
    pub fn derive_path(ctx: &NamespaceContext, node: &NodeId) -> String {
        let text = node.identifier.value_text();

        let segment = match &ctx.root.identifier {
            NodeIdentifier::String(root) if root.contains('.') => {
                root.rsplit('.').next().unwrap_or_default().to_ascii_lowercase()
            }
            _ => return text,
        };
        if segment.is_empty() {
            return text;
        }

        let tail = match text.to_ascii_lowercase().rfind(&segment) {
            Some(pos) => &text[pos + segment.len()..],
            None => text.as_str(),
        };
        let tail = tail.strip_prefix('.').unwrap_or(tail);
        tail.replace('.', "/")
    }
}

fn has_type_prefix(identifier: &str) -> bool {
    matches!(
        identifier.get(..2),
        Some("i=") | Some("s=") | Some("g=") | Some("b=")
    )
}

fn parse(identifier: &str) -> AccessResult<NodeId> {
    identifier
        .parse::<NodeId>()
        .map_err(|e| AccessError::invalid_address(identifier, e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
