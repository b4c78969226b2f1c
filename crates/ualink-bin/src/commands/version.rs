// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use serde_json::json;

use crate::cli::{Cli, OutputFormat};
use crate::error::BinResult;

fn enabled(on: bool) -> &'static str {
    if on {
        "enabled"
    } else {
        "disabled"
    }
}

/// Executes the `version` command to display version information.
pub fn version(cli: &Cli) -> BinResult<()> {
    let real_transport = cfg!(feature = "real-transport");

    match cli.format {
        OutputFormat::Json => {
            let output = json!({
                "ualink-bin": crate::VERSION,
                "ualink-core": ualink_core::VERSION,
                "ualink-opcua": ualink_opcua::VERSION,
                "ualink-config": ualink_config::VERSION,
                "target": std::env::consts::ARCH,
                "os": std::env::consts::OS,
                "features": { "real-transport": real_transport },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Text => {
            println!("ualink - batched attribute access for OPC UA servers");
            println!();
            println!("Version Information:");
            println!("  ualink-bin:    {}", crate::VERSION);
            println!("  ualink-core:   {}", ualink_core::VERSION);
            println!("  ualink-opcua:  {}", ualink_opcua::VERSION);
            println!("  ualink-config: {}", ualink_config::VERSION);
            println!();
            println!("Build Information:");
            println!("  Target:       {}", std::env::consts::ARCH);
            println!("  OS:           {}", std::env::consts::OS);
            println!();
            println!("Features:");
            println!("  Real transport (opc.tcp://): {}", enabled(real_transport));
            println!("  Simulated transport (sim://): enabled");
            println!();
            println!("License: PolyForm Noncommercial License 1.0.0");
            println!("Copyright (c) 2025 Sylvex. All rights reserved.");
        }
    }

    Ok(())
}
