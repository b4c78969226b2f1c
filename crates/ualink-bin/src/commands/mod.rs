// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `servers`: List registered servers
//! - `read`: Read attribute keys
//! - `write`: Write attribute keys
//! - `scan`: Discover nodes below a start node
//! - `validate`: Validate configuration file
//! - `version`: Show version information

mod access;
mod scan;
mod servers;
mod validate;
mod version;

pub use access::{read, write};
pub use scan::scan;
pub use servers::servers;
pub use validate::validate;
pub use version::version;

use tracing::warn;

use crate::cli::{Cli, Commands};
use crate::context;
use crate::error::{BinError, BinResult};

/// Executes the appropriate command based on CLI arguments.
pub async fn execute(cli: Cli) -> BinResult<()> {
    match &cli.command {
        Commands::Validate(args) => validate::validate(&cli, args),
        Commands::Version => version::version(&cli),
        _ => online(&cli).await,
    }
}

/// Runs a command that talks to servers, then closes every session, also
/// when interrupted.
async fn online(cli: &Cli) -> BinResult<()> {
    let layer = context::open(cli)?;

    let command = async {
        match &cli.command {
            Commands::Servers(args) => servers::servers(cli, &layer, args).await,
            Commands::Read(args) => access::read(cli, &layer, args).await,
            Commands::Write(args) => access::write(cli, &layer, args).await,
            Commands::Scan(args) => scan::scan(cli, &layer, args).await,
            Commands::Validate(_) | Commands::Version => Ok(()),
        }
    };

    let result = tokio::select! {
        result = command => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, closing sessions");
            Err(BinError::Interrupted)
        }
    };

    layer.shutdown().await;
    result
}
