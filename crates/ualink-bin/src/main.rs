// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ualink - batched attribute access for OPC UA servers.

use ualink_bin::error::report_error_and_exit;
use ualink_bin::{commands, init_logging, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.effective_log_level(), cli.log_format);

    if let Err(e) = commands::execute(cli).await {
        report_error_and_exit(e);
    }
}
