// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `scan` command.

use ualink_opcua::{AccessLayer, NodeClass};

use crate::cli::{Cli, ScanArgs};
use crate::error::BinResult;
use crate::output;

/// Executes the `scan` command.
///
/// Variables are described with their current value; other classes are
/// listed as found.
pub async fn scan(cli: &Cli, layer: &AccessLayer, args: &ScanArgs) -> BinResult<()> {
    let kind = NodeClass::from(args.kind);

    let rendered = if kind == NodeClass::Variable {
        let described = layer
            .describe_variables(&args.server, &args.node, args.max_depth)
            .await?;
        output::variables(cli.format, &described)?
    } else {
        let nodes = layer
            .find_by_kind(&args.server, &args.node, kind, args.max_depth)
            .await?;
        output::nodes(cli.format, &nodes)?
    };

    print!("{}", rendered);
    Ok(())
}
