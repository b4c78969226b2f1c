// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI argument parsing and command definitions.
//!
//! - `servers`: List registered servers and their connection state
//! - `read`: Read attribute keys in one coalesced dispatch
//! - `write`: Write attribute keys in one coalesced dispatch
//! - `scan`: Discover nodes below a start node
//! - `validate`: Validate configuration file
//! - `version`: Show version information

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ualink_opcua::NodeClass;

// =============================================================================
// Main CLI Structure
// =============================================================================

/// ualink - batched attribute access for OPC UA servers
///
/// Every key given on one command line is coalesced into a single bulk
/// service call per server.
#[derive(Parser, Debug)]
#[command(
    name = "ualink",
    author = "Sylvex <contact@sylvex.io>",
    version = crate::VERSION,
    about = "Batched attribute access for OPC UA servers",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (default: ./ualink.yaml, then ./servers.json)
    #[arg(short, long, env = "UALINK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        short,
        long,
        default_value = "warn",
        env = "UALINK_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json, compact)
    #[arg(long, default_value = "text", env = "UALINK_LOG_FORMAT", global = true)]
    pub log_format: LogFormat,

    /// Output format for command results
    #[arg(short, long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

// =============================================================================
// Subcommands
// =============================================================================

/// Available subcommands for the ualink CLI.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// List registered servers
    Servers(ServersArgs),

    /// Read attributes
    ///
    /// Keys have the form `Server/NodeId/Attribute`; an empty NodeId means
    /// the server's root.
    Read(ReadArgs),

    /// Write attributes
    ///
    /// Keys have the form `Server/NodeId/Attribute/Value/Type`; an empty
    /// Type lets the value decide.
    Write(WriteArgs),

    /// Discover nodes below a start node
    Scan(ScanArgs),

    /// Validate the configuration file
    Validate(ValidateArgs),

    /// Show detailed version information
    Version,
}

// =============================================================================
// Command Arguments
// =============================================================================

/// Arguments for the `servers` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ServersArgs {
    /// Connect every server before listing
    #[arg(long)]
    pub connect: bool,
}

/// Arguments for the `read` command.
#[derive(Args, Debug, Clone)]
pub struct ReadArgs {
    /// Attribute keys
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,
}

/// Arguments for the `write` command.
#[derive(Args, Debug, Clone)]
pub struct WriteArgs {
    /// Attribute keys with value and type
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,
}

/// Arguments for the `scan` command.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Server name
    pub server: String,

    /// Start node (default: the server's root)
    #[arg(default_value = "")]
    pub node: String,

    /// Node class to match
    #[arg(short, long, default_value = "variable")]
    pub kind: NodeKind,

    /// Levels to descend (default: scan.max_depth from the configuration)
    #[arg(short = 'd', long)]
    pub max_depth: Option<u32>,
}

/// Arguments for the `validate` command.
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Show parsed configuration after validation
    #[arg(short, long)]
    pub show_config: bool,

    /// Strict mode: treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

// =============================================================================
// Enums
// =============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for structured logging
    Json,
    /// Compact format for minimal output
    Compact,
}

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON format for programmatic parsing
    Json,
}

/// Node classes a scan can match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum NodeKind {
    /// Variables, described with their current value
    #[default]
    Variable,
    /// Objects
    Object,
    /// Methods
    Method,
}

impl From<NodeKind> for NodeClass {
    fn from(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Variable => NodeClass::Variable,
            NodeKind::Object => NodeClass::Object,
            NodeKind::Method => NodeClass::Method,
        }
    }
}

// =============================================================================
// Helper Methods
// =============================================================================

impl Cli {
    /// Parse CLI arguments from the command line.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective log level based on flags.
    pub fn effective_log_level(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_command() {
        let cli = Cli::parse_from(["ualink", "read", "Plant1//NodeClass", "Plant1/ns=2;i=5/Value"]);
        match cli.command {
            Commands::Read(args) => assert_eq!(args.keys.len(), 2),
            other => panic!("Expected Read command, got {other:?}"),
        }
    }

    #[test]
    fn test_read_requires_keys() {
        assert!(Cli::try_parse_from(["ualink", "read"]).is_err());
    }

    #[test]
    fn test_scan_defaults() {
        let cli = Cli::parse_from(["ualink", "scan", "Plant1"]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.server, "Plant1");
                assert_eq!(args.node, "");
                assert_eq!(args.kind, NodeKind::Variable);
                assert_eq!(args.max_depth, None);
            }
            other => panic!("Expected Scan command, got {other:?}"),
        }
    }

    #[test]
    fn test_scan_options() {
        let cli = Cli::parse_from([
            "ualink", "scan", "Plant1", "ns=2;s=Plant", "--kind", "object", "-d", "2",
        ]);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.node, "ns=2;s=Plant");
                assert_eq!(NodeClass::from(args.kind), NodeClass::Object);
                assert_eq!(args.max_depth, Some(2));
            }
            other => panic!("Expected Scan command, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::parse_from([
            "ualink", "servers", "-c", "/etc/ualink.yaml", "--format", "json", "-l", "info",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ualink.yaml")));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.effective_log_level(), "info");
    }

    #[test]
    fn test_verbose_mode() {
        let cli = Cli::parse_from(["ualink", "version", "-v"]);
        assert_eq!(cli.effective_log_level(), "debug");
    }
}
