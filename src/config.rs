//! Configuration management for the Commvault MCP server
//!
//! All connection settings come from the process environment. The loader
//! returns a [`ServerConfig`] or a configuration error; only the process
//! entry point decides to terminate, which keeps the validation logic
//! unit-testable.

use std::fmt;
use std::str::FromStr;

use url::Url;

use crate::error::{CvMcpError, Result};

/// Display name announced to MCP clients
pub const SERVER_NAME: &str = "Commvault MCP Server";

/// Instructions string announced to MCP clients
pub const SERVER_INSTRUCTIONS: &str =
    "You can use this server to interact with Commvault Product";

/// Reads a required environment variable.
///
/// # Errors
///
/// Returns [`CvMcpError::Config`] naming the missing variable and pointing
/// at the setup wizard.
pub fn env_var(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| {
        CvMcpError::Config(format!(
            "{name} is not set. Run the setup command to configure the environment."
        ))
        .into()
    })
}

/// Reads an environment variable, falling back to a default when unset.
pub fn env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// How the MCP server accepts connections.
///
/// The shared-secret authorization gate applies only to the two network
/// transports; `stdio` has no network caller to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    /// Stdin/stdout framing, used when a local client spawns the server
    Stdio,
    /// Streamable HTTP transport
    StreamableHttp,
    /// Server-sent events transport
    Sse,
}

impl TransportMode {
    /// Returns `true` for the network transports (`streamable-http`, `sse`).
    pub fn is_network(self) -> bool {
        !matches!(self, TransportMode::Stdio)
    }
}

impl FromStr for TransportMode {
    type Err = CvMcpError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "stdio" => Ok(TransportMode::Stdio),
            "streamable-http" => Ok(TransportMode::StreamableHttp),
            "sse" => Ok(TransportMode::Sse),
            other => Err(CvMcpError::Config(format!(
                "Invalid transport mode: {other} (expected stdio, streamable-http, or sse)"
            ))),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransportMode::Stdio => "stdio",
            TransportMode::StreamableHttp => "streamable-http",
            TransportMode::Sse => "sse",
        };
        write!(f, "{s}")
    }
}

/// Settings for the external OAuth provider, present only when
/// `USE_OAUTH=true`.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// Authorization endpoint URL
    pub authorization_endpoint: String,
    /// Token endpoint URL
    pub token_endpoint: String,
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// JWKS endpoint used to verify inbound bearer tokens
    pub jwks_uri: String,
    /// Scopes a bearer token must carry
    pub required_scopes: Vec<String>,
    /// Externally visible base URL of this server
    pub base_url: String,
}

/// Immutable snapshot of the server configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Selected transport
    pub transport: TransportMode,
    /// Bind host, required for network transports
    pub host: Option<String>,
    /// Bind port, required for network transports
    pub port: Option<u16>,
    /// HTTP path the MCP endpoint is served under
    pub path: Option<String>,
    /// Whether inbound auth is delegated to an OAuth provider
    pub use_oauth: bool,
    /// OAuth provider settings when `use_oauth` is set
    pub oauth: Option<OAuthConfig>,
    /// Commvault Command Center base URL (`CC_SERVER_URL`)
    pub server_url: String,
    /// Whether outbound TLS certificates are verified
    pub ssl_verify: bool,
}

impl ServerConfig {
    /// Loads and validates the configuration from the process environment.
    ///
    /// Network transports require `MCP_HOST`, `MCP_PORT`, and `MCP_PATH`.
    /// OAuth mode additionally requires all five provider settings. `stdio`
    /// never uses OAuth; the flag is not even consulted there.
    ///
    /// # Errors
    ///
    /// Returns [`CvMcpError::Config`] for a missing variable, an unparsable
    /// port, or an invalid transport mode.
    pub fn from_env() -> Result<Self> {
        let transport: TransportMode = env_var("MCP_TRANSPORT_MODE")?.parse()?;
        let server_url = env_var("CC_SERVER_URL")?;
        let ssl_verify = env_var_or("SSL_VERIFY", "true").to_lowercase() == "true";

        let config = if transport.is_network() {
            let host = env_var("MCP_HOST")?;
            let port_raw = env_var("MCP_PORT")?;
            let port: u16 = port_raw.parse().map_err(|_| {
                CvMcpError::Config(format!("MCP_PORT must be a port number, got {port_raw:?}"))
            })?;
            let path = env_var("MCP_PATH")?;
            let use_oauth = env_var_or("USE_OAUTH", "false").to_lowercase() == "true";
            let oauth = if use_oauth {
                Some(OAuthConfig {
                    authorization_endpoint: env_var("OAUTH_AUTHORIZATION_ENDPOINT")?,
                    token_endpoint: env_var("OAUTH_TOKEN_ENDPOINT")?,
                    client_id: env_var("OAUTH_CLIENT_ID")?,
                    client_secret: env_var("OAUTH_CLIENT_SECRET")?,
                    jwks_uri: env_var("OAUTH_JWKS_URI")?,
                    required_scopes: env_var("OAUTH_REQUIRED_SCOPES")?
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect(),
                    base_url: env_var("OAUTH_BASE_URL")?,
                })
            } else {
                None
            };
            Self {
                transport,
                host: Some(host),
                port: Some(port),
                path: Some(path),
                use_oauth,
                oauth,
                server_url,
                ssl_verify,
            }
        } else {
            Self {
                transport,
                host: None,
                port: None,
                path: None,
                use_oauth: false,
                oauth: None,
                server_url,
                ssl_verify,
            }
        };

        config.validate()?;
        tracing::info!(
            "Configuration loaded: transport={} oauth={}",
            config.transport,
            config.use_oauth
        );
        Ok(config)
    }

    /// Validates cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CvMcpError::Config`] when a network transport is missing
    /// host/port/path or when OAuth is enabled without its settings.
    pub fn validate(&self) -> Result<()> {
        if self.transport.is_network()
            && (self.host.is_none() || self.port.is_none() || self.path.is_none())
        {
            return Err(CvMcpError::Config(
                "Host, port, and path are required for non-stdio transport modes".to_string(),
            )
            .into());
        }
        if self.use_oauth && self.oauth.is_none() {
            return Err(CvMcpError::Config(
                "All OAuth-related fields must be set when OAuth is enabled".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Base URL of the Command Center REST API.
    ///
    /// # Errors
    ///
    /// Returns an error when `CC_SERVER_URL` is not a valid URL.
    pub fn api_base_url(&self) -> Result<Url> {
        let base = format!("{}/commandcenter/api/", self.server_url.trim_end_matches('/'));
        Url::parse(&base).map_err(|e| {
            CvMcpError::Config(format!("CC_SERVER_URL is not a valid URL: {e}")).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "MCP_TRANSPORT_MODE",
            "MCP_HOST",
            "MCP_PORT",
            "MCP_PATH",
            "USE_OAUTH",
            "CC_SERVER_URL",
            "SSL_VERIFY",
            "OAUTH_AUTHORIZATION_ENDPOINT",
            "OAUTH_TOKEN_ENDPOINT",
            "OAUTH_CLIENT_ID",
            "OAUTH_CLIENT_SECRET",
            "OAUTH_JWKS_URI",
            "OAUTH_REQUIRED_SCOPES",
            "OAUTH_BASE_URL",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_transport_mode_parsing() {
        assert_eq!(
            "stdio".parse::<TransportMode>().unwrap(),
            TransportMode::Stdio
        );
        assert_eq!(
            "streamable-http".parse::<TransportMode>().unwrap(),
            TransportMode::StreamableHttp
        );
        assert_eq!("sse".parse::<TransportMode>().unwrap(), TransportMode::Sse);
        assert!("http".parse::<TransportMode>().is_err());
    }

    #[test]
    fn test_transport_mode_display_round_trip() {
        for mode in [
            TransportMode::Stdio,
            TransportMode::StreamableHttp,
            TransportMode::Sse,
        ] {
            assert_eq!(mode.to_string().parse::<TransportMode>().unwrap(), mode);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_stdio_minimal() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "stdio");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.transport, TransportMode::Stdio);
        assert!(config.host.is_none());
        assert!(!config.use_oauth);
        assert!(config.ssl_verify);
    }

    #[test]
    #[serial]
    fn test_from_env_network_requires_host_port_path() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "streamable-http");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");

        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_streamable_http() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "streamable-http");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com/");
        std::env::set_var("MCP_HOST", "127.0.0.1");
        std::env::set_var("MCP_PORT", "8000");
        std::env::set_var("MCP_PATH", "/mcp");
        std::env::set_var("SSL_VERIFY", "false");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(config.transport, TransportMode::StreamableHttp);
        assert_eq!(config.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.port, Some(8000));
        assert_eq!(config.path.as_deref(), Some("/mcp"));
        assert!(!config.ssl_verify);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid_port() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "sse");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");
        std::env::set_var("MCP_HOST", "0.0.0.0");
        std::env::set_var("MCP_PORT", "not-a-port");
        std::env::set_var("MCP_PATH", "/mcp");

        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_oauth_requires_all_fields() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "streamable-http");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");
        std::env::set_var("MCP_HOST", "127.0.0.1");
        std::env::set_var("MCP_PORT", "8000");
        std::env::set_var("MCP_PATH", "/mcp");
        std::env::set_var("USE_OAUTH", "true");
        std::env::set_var("OAUTH_AUTHORIZATION_ENDPOINT", "https://idp/authorize");
        // Token endpoint and the rest are missing.

        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_oauth_complete() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "streamable-http");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");
        std::env::set_var("MCP_HOST", "127.0.0.1");
        std::env::set_var("MCP_PORT", "8000");
        std::env::set_var("MCP_PATH", "/mcp");
        std::env::set_var("USE_OAUTH", "true");
        std::env::set_var("OAUTH_AUTHORIZATION_ENDPOINT", "https://idp/authorize");
        std::env::set_var("OAUTH_TOKEN_ENDPOINT", "https://idp/token");
        std::env::set_var("OAUTH_CLIENT_ID", "client");
        std::env::set_var("OAUTH_CLIENT_SECRET", "secret");
        std::env::set_var("OAUTH_JWKS_URI", "https://idp/jwks");
        std::env::set_var("OAUTH_REQUIRED_SCOPES", "read, write");
        std::env::set_var("OAUTH_BASE_URL", "https://mcp.example.com");

        let config = ServerConfig::from_env().unwrap();
        assert!(config.use_oauth);
        let oauth = config.oauth.unwrap();
        assert_eq!(oauth.client_id, "client");
        assert_eq!(oauth.required_scopes, vec!["read", "write"]);
    }

    #[test]
    #[serial]
    fn test_api_base_url_joins_command_center_path() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "stdio");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(
            config.api_base_url().unwrap().as_str(),
            "https://cc.example.com/commandcenter/api/"
        );
    }

    #[test]
    #[serial]
    fn test_api_base_url_trims_trailing_slash() {
        clear_env();
        std::env::set_var("MCP_TRANSPORT_MODE", "stdio");
        std::env::set_var("CC_SERVER_URL", "https://cc.example.com///");

        let config = ServerConfig::from_env().unwrap();
        assert_eq!(
            config.api_base_url().unwrap().as_str(),
            "https://cc.example.com/commandcenter/api/"
        );
    }
}
