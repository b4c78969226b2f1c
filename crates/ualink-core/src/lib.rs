// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ualink-core
//!
//! Protocol-agnostic building blocks of the ualink attribute access layer.
//!
//! - **Error**: [`AccessError`], the failure carried in every result slot
//! - **Key**: [`ReadKey`] / [`WriteKey`] and the slash-delimited wire format
//! - **Registry**: [`ServerConfig`] records and the immutable [`Registry`] snapshot
//! - **Coalescer**: [`RequestCoalescer`], which turns many keyed requests into
//!   one bulk call per server through a [`BulkAccess`] backend
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ualink_core::{ReadKey, RequestCoalescer};
//!
//! let coalescer = RequestCoalescer::new(Arc::new(backend));
//! let value = coalescer.read(ReadKey::new("Plant1", "ns=2;i=5", "Value"));
//! let class = coalescer.read_str("Plant1//NodeClass");
//!
//! coalescer.dispatch().await;
//! let (value, class) = (value.await, class.await);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod coalescer;
pub mod error;
pub mod key;
pub mod registry;

// =============================================================================
// Re-exports
// =============================================================================

pub use coalescer::{
    AttributeResult, BulkAccess, CoalescerConfig, CoalescerStatsSnapshot, DispatchSummary,
    PendingResult, RequestCoalescer,
};
pub use error::{AccessError, AccessResult, ErrorCode, ErrorSeverity};
pub use key::{AttributeKey, ReadKey, WriteKey};
pub use registry::{Registry, ServerConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
