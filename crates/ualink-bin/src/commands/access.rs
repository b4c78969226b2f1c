// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `read` and `write` commands.
//!
//! All keys of one invocation go out in a single dispatch, so each server
//! receives one bulk call no matter how many keys name it.

use futures::future::join_all;
use tracing::debug;
use ualink_core::AttributeResult;
use ualink_opcua::AccessLayer;

use crate::cli::{Cli, ReadArgs, WriteArgs};
use crate::error::{BinError, BinResult};
use crate::output;

/// Executes the `read` command.
pub async fn read(cli: &Cli, layer: &AccessLayer, args: &ReadArgs) -> BinResult<()> {
    let pending: Vec<_> = args.keys.iter().map(|k| layer.read_str(k)).collect();
    let summary = layer.dispatch().await;
    debug!(requests = summary.requests, calls = summary.read_calls, "Read dispatch finished");

    let rows: Vec<_> = args.keys.iter().cloned().zip(join_all(pending).await).collect();
    print!("{}", output::reads(cli.format, &rows)?);
    check(&rows)
}

/// Executes the `write` command.
pub async fn write(cli: &Cli, layer: &AccessLayer, args: &WriteArgs) -> BinResult<()> {
    let pending: Vec<_> = args.keys.iter().map(|k| layer.write_str(k)).collect();
    let summary = layer.dispatch().await;
    debug!(requests = summary.requests, calls = summary.write_calls, "Write dispatch finished");

    let rows: Vec<_> = args.keys.iter().cloned().zip(join_all(pending).await).collect();
    print!("{}", output::writes(cli.format, &rows)?);
    check(&rows)
}

fn check<T>(rows: &[(String, AttributeResult<T>)]) -> BinResult<()> {
    let failed = rows.iter().filter(|(_, r)| !r.is_ok()).count();
    if failed == 0 {
        Ok(())
    } else {
        Err(BinError::PartialFailure {
            failed,
            total: rows.len(),
        })
    }
}
