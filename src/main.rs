//! Commvault MCP Server
//!
//! Main entry point: loads configuration from the environment, validates
//! stored credentials, and runs the MCP server on the configured transport.
//! This is the only place that terminates the process on failure; the
//! library modules report errors and leave the decision here.

use std::sync::Arc;

use anyhow::Result;
use url::Url;

use commvault_mcp::api::{build_http_client, ApiClient};
use commvault_mcp::auth::{AuthorizationGate, JwtVerifier, TokenManager};
use commvault_mcp::cli::{Cli, Commands};
use commvault_mcp::config::{ServerConfig, TransportMode};
use commvault_mcp::credentials::{validate_startup_credentials, KeyringStore};
use commvault_mcp::error::CvMcpError;
use commvault_mcp::server::{self, CommvaultServer};
use commvault_mcp::{logging, setup};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Some(Commands::Setup) => setup::run_setup().await,
        Some(Commands::Serve) | None => {
            let _log_guard = logging::init_logging();
            serve().await
        }
    }
}

async fn serve() -> Result<()> {
    let config = ServerConfig::from_env()?;
    let http = build_http_client(config.ssl_verify)?;
    let base_url = config.api_base_url()?;

    let client = if config.use_oauth {
        // Bearer tokens are verified by the HTTP middleware and forwarded
        // to the backend as-is; no local token state exists in this mode.
        ApiClient::new_oauth(http.clone(), base_url, AuthorizationGate::disabled())
    } else {
        // Credentials are validated before any server setup so a
        // misconfigured install fails here rather than on the first call.
        let store = KeyringStore::new();
        validate_startup_credentials(&store)?;

        let renew_url = base_url
            .join("V4/AccessToken/Renew")
            .map_err(|e| CvMcpError::Config(format!("Invalid renew endpoint: {e}")))?;
        let tokens = Arc::new(TokenManager::load(
            Box::new(KeyringStore::new()),
            http.clone(),
            renew_url,
        )?);

        let gate = if config.transport.is_network() {
            AuthorizationGate::shared_secret(Arc::new(store))
        } else {
            AuthorizationGate::disabled()
        };
        ApiClient::new(http.clone(), base_url, gate, tokens)
    };

    let server = CommvaultServer::new(Arc::new(client));
    tracing::info!("Registered {} tools", server.tool_count());

    let verifier = match (&config.oauth, config.use_oauth) {
        (Some(oauth), true) => {
            let jwks_uri = Url::parse(&oauth.jwks_uri)
                .map_err(|e| CvMcpError::Config(format!("Invalid OAUTH_JWKS_URI: {e}")))?;
            Some(Arc::new(JwtVerifier::new(
                http,
                jwks_uri,
                None,
                Some(oauth.client_id.clone()),
            )))
        }
        _ => None,
    };

    match config.transport {
        TransportMode::Stdio => server::serve_stdio(server).await,
        TransportMode::StreamableHttp => {
            server::serve_streamable_http(server, &config, verifier).await
        }
        TransportMode::Sse => server::serve_sse(server, &config, verifier).await,
    }
}
