// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ualink-bin
//!
//! Command-line front end for the ualink access layer.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                   main.rs                    │
//! └──────────────────────┬───────────────────────┘
//!                        │
//!                 ┌──────▼──────┐
//!                 │   cli.rs    │
//!                 └──────┬──────┘
//!                        │
//!        ┌───────────────┼───────────────┐
//!        ▼               ▼               ▼
//!  ┌──────────┐    ┌──────────┐    ┌──────────┐
//!  │ commands │    │ logging  │    │  output  │
//!  └────┬─────┘    └──────────┘    └──────────┘
//!       │
//!  ┌────▼─────┐
//!  │ context  │  config -> registry -> AccessLayer
//!  └──────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # List servers from ./ualink.yaml
//! ualink servers
//!
//! # Two reads and one write, one bulk call per server and kind
//! ualink read "Plant1//NodeClass" "Plant1/ns=2;i=5/Value"
//! ualink write "Plant1/ns=2;i=5/Value/42/Int32"
//!
//! # Variables up to two levels below a node, as JSON
//! ualink scan Plant1 "ns=2;s=Plant" --max-depth 2 --format json
//!
//! # Validate configuration
//! ualink -c /etc/ualink/ualink.yaml validate
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod context;
pub mod error;
pub mod logging;
pub mod output;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
