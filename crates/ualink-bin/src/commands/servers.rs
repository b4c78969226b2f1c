// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `servers` command.

use tracing::warn;
use ualink_opcua::AccessLayer;

use crate::cli::{Cli, ServersArgs};
use crate::error::BinResult;
use crate::output;

/// Executes the `servers` command.
///
/// Without `--connect` the states reflect that nothing has connected yet;
/// sessions are opened lazily.
pub async fn servers(cli: &Cli, layer: &AccessLayer, args: &ServersArgs) -> BinResult<()> {
    if args.connect {
        for (name, result) in layer.connect_all().await {
            if let Err(e) = result {
                warn!(server = %name, error = %e, "Connection failed");
            }
        }
    }

    print!("{}", output::servers(cli.format, &layer.servers())?);
    Ok(())
}
