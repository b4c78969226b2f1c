// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Rendering of command results as text tables or JSON.

use std::time::Duration;

use serde_json::{json, Value};
use ualink_core::{AccessError, AttributeResult};
use ualink_opcua::{DataValue, ScannedNode, ServerStatus, StatusCode, VariableDescriptor};

use crate::cli::OutputFormat;
use crate::error::BinResult;

// =============================================================================
// Attribute results
// =============================================================================

/// Renders read results, one per key.
pub fn reads(format: OutputFormat, rows: &[(String, AttributeResult<DataValue>)]) -> BinResult<String> {
    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .iter()
                .map(|(key, result)| match result.outcome() {
                    Ok(dv) => json!({
                        "key": key,
                        "value": dv.value.as_ref().map(|v| v.to_json()),
                        "type": dv.variant_type().map(|t| t.name()),
                        "status": dv.status.name(),
                        "source_timestamp": dv.source_timestamp,
                        "server_timestamp": dv.server_timestamp,
                        "latency_ms": latency_ms(result.latency()),
                    }),
                    Err(e) => error_json(key, e, result.latency()),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&items)?)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (key, result) in rows {
                let line = match result.outcome() {
                    Ok(dv) => format!(
                        "{}  {} ({})  {}  {}",
                        key,
                        dv.value
                            .as_ref()
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "<empty>".to_string()),
                        dv.variant_type().map(|t| t.name()).unwrap_or("-"),
                        dv.status.name(),
                        latency_text(result.latency()),
                    ),
                    Err(e) => error_text(key, e),
                };
                out.push_str(&line);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Renders write results, one per key.
pub fn writes(format: OutputFormat, rows: &[(String, AttributeResult<StatusCode>)]) -> BinResult<String> {
    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .iter()
                .map(|(key, result)| match result.outcome() {
                    Ok(status) => json!({
                        "key": key,
                        "status": status.name(),
                        "latency_ms": latency_ms(result.latency()),
                    }),
                    Err(e) => error_json(key, e, result.latency()),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&items)?)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for (key, result) in rows {
                let line = match result.outcome() {
                    Ok(status) => {
                        format!("{}  {}  {}", key, status.name(), latency_text(result.latency()))
                    }
                    Err(e) => error_text(key, e),
                };
                out.push_str(&line);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn error_json(key: &str, error: &AccessError, latency: Option<Duration>) -> Value {
    json!({
        "key": key,
        "error": {
            "code": error.error_code().to_string(),
            "type": error.error_type(),
            "message": error.to_string(),
        },
        "latency_ms": latency_ms(latency),
    })
}

fn error_text(key: &str, error: &AccessError) -> String {
    format!("{}  ERROR [{}] {}", key, error.error_code(), error)
}

fn latency_ms(latency: Option<Duration>) -> Option<f64> {
    latency.map(|d| d.as_secs_f64() * 1000.0)
}

fn latency_text(latency: Option<Duration>) -> String {
    match latency {
        Some(d) => format!("{:.1}ms", d.as_secs_f64() * 1000.0),
        None => "-".to_string(),
    }
}

// =============================================================================
// Servers and scans
// =============================================================================

/// Renders the server list.
pub fn servers(format: OutputFormat, servers: &[ServerStatus]) -> BinResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(servers)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for s in servers {
                out.push_str(&format!("{}  {}  {}", s.name, s.endpoint_address, s.state));
                if let Some(uri) = &s.namespace_uri {
                    out.push_str(&format!("  ns={}", uri));
                }
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Renders scanned nodes.
pub fn nodes(format: OutputFormat, nodes: &[ScannedNode]) -> BinResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(nodes)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for n in nodes {
                out.push_str(&format!(
                    "{}{}  {}  {}\n",
                    "  ".repeat(n.depth.saturating_sub(1) as usize),
                    n.display_name,
                    n.node_id,
                    n.path
                ));
            }
            Ok(out)
        }
    }
}

/// Renders variable descriptors; failed descriptions are listed inline.
pub fn variables(
    format: OutputFormat,
    variables: &[Result<VariableDescriptor, AccessError>],
) -> BinResult<String> {
    match format {
        OutputFormat::Json => {
            let items: Vec<Value> = variables
                .iter()
                .map(|v| match v {
                    Ok(d) => serde_json::to_value(d).unwrap_or(Value::Null),
                    Err(e) => json!({ "error": e.to_string() }),
                })
                .collect();
            Ok(serde_json::to_string_pretty(&items)?)
        }
        OutputFormat::Text => {
            let mut out = String::new();
            for v in variables {
                match v {
                    Ok(d) => out.push_str(&format!(
                        "{}  {}  {} ({})  {}\n",
                        d.path,
                        d.node_id,
                        d.value
                            .as_ref()
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "<empty>".to_string()),
                        d.type_tag.map(|t| t.name()).unwrap_or("-"),
                        d.description.as_deref().unwrap_or(""),
                    )),
                    Err(e) => out.push_str(&format!("ERROR [{}] {}\n", e.error_code(), e)),
                }
            }
            Ok(out)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
