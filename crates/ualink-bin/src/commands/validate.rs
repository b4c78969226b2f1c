// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use ualink_config::UalinkConfig;

use crate::cli::{Cli, OutputFormat, ValidateArgs};
use crate::context;
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: &ValidateArgs) -> BinResult<()> {
    let (config_path, config) = context::load(cli)
        .map_err(|e| e.with_context("Configuration validation failed"))?;
    config.registry()?;

    let warnings = collect_warnings(&config);

    match cli.format {
        OutputFormat::Text => {
            println!("✓ Configuration is valid: {}", config_path.display());
            println!();
            println!("Summary:");
            println!("  Servers: {}", config.servers.len());
            for server in &config.servers {
                println!("    {} -> {}", server.name, server.endpoint_address);
            }
            println!("  Connect timeout: {}", humantime::format_duration(config.session.connect_timeout));
            println!("  Request timeout: {}", humantime::format_duration(config.session.request_timeout));
            println!("  Session timeout: {}", humantime::format_duration(config.session.session_timeout));
            println!("  Scan depth: {}", config.scan.max_depth);

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "server_count": config.servers.len(),
                    "servers": config.servers.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
                    "scan_max_depth": config.scan.max_depth,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::config(format!(
            "Strict mode: {} warning(s) found",
            warnings.len()
        )));
    }

    Ok(())
}

fn collect_warnings(config: &UalinkConfig) -> Vec<String> {
    let mut warnings = config.warnings();
    if config.servers.is_empty() {
        warnings.push("No servers configured".to_string());
    }
    warnings
}
