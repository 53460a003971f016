//! Command-line interface definition for the Commvault MCP server
//!
//! This module defines the CLI structure using clap's derive API,
//! providing the serve and setup commands.

use clap::{Parser, Subcommand};

/// Commvault MCP Server
///
/// Exposes the Commvault Command Center REST API as MCP tools over stdio,
/// streamable HTTP, or SSE.
#[derive(Parser, Debug, Clone)]
#[command(name = "commvault-mcp")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Command to execute; defaults to serve
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the MCP server with the transport configured in the environment
    Serve,

    /// Interactively configure environment variables and stored credentials
    Setup,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
