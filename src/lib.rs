//! Commvault MCP server library
//!
//! Exposes the Commvault Command Center REST API as MCP tools. The library
//! is organized into the following modules:
//!
//! - `api`: the authenticated HTTP client with retry and token-refresh
//!   orchestration
//! - `auth`: the token lifecycle manager, the shared-secret authorization
//!   gate, and the OAuth bearer verifier
//! - `credentials`: OS keyring storage for tokens and the server secret
//! - `config`: environment-driven server configuration
//! - `server`: rmcp wiring and transport hosting
//! - `tools`: the tool layer, organized by product area
//! - `filters`: response projections for LLM-friendly tool output
//! - `setup`: the interactive provisioning wizard
//!
//! # Example
//!
//! ```no_run
//! use commvault_mcp::config::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     config.validate()?;
//!     // Server startup would go here
//!     Ok(())
//! }
//! ```
#![recursion_limit = "256"]

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod filters;
pub mod logging;
pub mod server;
pub mod setup;
pub mod tools;

// Re-export commonly used types
pub use api::{ApiClient, ApiRequest};
pub use auth::{AuthorizationGate, Caller, TokenManager};
pub use config::{ServerConfig, TransportMode};
pub use error::{CvMcpError, Result};
pub use server::CommvaultServer;
