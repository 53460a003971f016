//! MCP server wiring
//!
//! [`CommvaultServer`] registers every tool category on a merged
//! [`ToolRouter`] and implements the rmcp [`ServerHandler`]. Serving is
//! transport-specific: stdio speaks over the process pipes, the two network
//! transports are hosted on axum. In OAuth mode the HTTP router is wrapped
//! with bearer-token middleware that verifies the JWT and attaches its
//! claims to the request before MCP dispatch.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::model::{Implementation, ServerCapabilities, ServerInfo};
use rmcp::service::RequestContext;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpService,
};
use rmcp::{tool_handler, RoleServer, ServerHandler, ServiceExt};
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::auth::{Caller, JwtVerifier};
use crate::config::{ServerConfig, SERVER_INSTRUCTIONS, SERVER_NAME};
use crate::error::CvMcpError;

/// The Commvault MCP server: a tool router over the shared [`ApiClient`].
#[derive(Clone)]
pub struct CommvaultServer {
    client: Arc<ApiClient>,
    tool_router: ToolRouter<Self>,
}

impl CommvaultServer {
    /// Builds the server with every tool category registered.
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            tool_router: Self::router_jobs()
                + Self::router_clients()
                + Self::router_schedules()
                + Self::router_storage()
                + Self::router_plans()
                + Self::router_commcell()
                + Self::router_users(),
        }
    }

    /// Shared API client handle for the tool implementations.
    pub(crate) fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Extracts the inbound caller's credentials for this invocation.
    ///
    /// The HTTP transports attach the request parts to the rmcp context;
    /// stdio has no HTTP request, so the caller is anonymous there.
    pub(crate) fn caller(&self, context: &RequestContext<RoleServer>) -> Caller {
        let header = context
            .extensions
            .get::<axum::http::request::Parts>()
            .and_then(|parts| parts.headers.get(AUTHORIZATION))
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Caller::new(header)
    }

    /// Number of registered tools; used by startup logging and tests.
    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }
}

#[tool_handler]
impl ServerHandler for CommvaultServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(SERVER_INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Bearer-verification middleware for OAuth mode.
///
/// Rejects with 401 before MCP dispatch when the token is missing or fails
/// verification; on success the claims are attached to the request
/// extensions for downstream consumers.
async fn require_bearer(
    State(verifier): State<Arc<JwtVerifier>>,
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.strip_prefix("Bearer ").unwrap_or(value).to_string());

    let Some(token) = token else {
        return (StatusCode::UNAUTHORIZED, "missing bearer token").into_response();
    };

    match verifier.verify(&token).await {
        Ok(claims) => {
            tracing::debug!("Bearer token accepted for client {}", claims.client_label());
            request.extensions_mut().insert(Arc::new(claims));
            next.run(request).await
        }
        Err(e) => {
            tracing::info!("Bearer token rejected: {e}");
            (StatusCode::UNAUTHORIZED, "invalid bearer token").into_response()
        }
    }
}

/// Runs the server over stdio until the client disconnects.
pub async fn serve_stdio(server: CommvaultServer) -> crate::error::Result<()> {
    tracing::info!("Starting MCP server in stdio mode...");
    let service = server
        .serve(rmcp::transport::stdio())
        .await
        .map_err(|e| CvMcpError::Config(format!("Failed to start stdio transport: {e}")))?;
    service
        .waiting()
        .await
        .map_err(|e| CvMcpError::Config(format!("stdio transport terminated abnormally: {e}")))?;
    Ok(())
}

fn bind_params(config: &ServerConfig) -> crate::error::Result<(String, String)> {
    let (Some(host), Some(port), Some(path)) = (&config.host, config.port, &config.path) else {
        return Err(CvMcpError::Config(
            "Host, port, and path are required for non-stdio transport modes".to_string(),
        )
        .into());
    };
    let path = if path.starts_with('/') {
        path.clone()
    } else {
        format!("/{path}")
    };
    Ok((format!("{host}:{port}"), path))
}

/// Runs the server over the streamable HTTP transport.
pub async fn serve_streamable_http(
    server: CommvaultServer,
    config: &ServerConfig,
    verifier: Option<Arc<JwtVerifier>>,
) -> crate::error::Result<()> {
    let (addr, path) = bind_params(config)?;

    let service = StreamableHttpService::new(
        move || Ok(server.clone()),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mut router = axum::Router::new().nest_service(&path, service);
    if let Some(verifier) = verifier {
        router = router.layer(axum::middleware::from_fn_with_state(
            verifier,
            require_bearer,
        ));
    }

    tracing::info!("Starting MCP server in streamable-http mode on {addr}{path}...");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Runs the server over the SSE transport.
pub async fn serve_sse(
    server: CommvaultServer,
    config: &ServerConfig,
    verifier: Option<Arc<JwtVerifier>>,
) -> crate::error::Result<()> {
    let (addr, path) = bind_params(config)?;
    let bind = addr
        .parse()
        .map_err(|e| CvMcpError::Config(format!("Invalid bind address {addr}: {e}")))?;

    let (sse_server, router) = SseServer::new(SseServerConfig {
        bind,
        sse_path: path.clone(),
        post_path: format!("{path}/message"),
        ct: CancellationToken::new(),
        sse_keep_alive: None,
    });

    let router = match verifier {
        Some(verifier) => router.layer(axum::middleware::from_fn_with_state(
            verifier,
            require_bearer,
        )),
        None => router,
    };

    tracing::info!("Starting MCP server in sse mode on {addr}{path}...");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("SSE HTTP server terminated: {e}");
        }
    });

    let ct = sse_server.with_service(move || server.clone());
    ct.cancelled().await;
    Ok(())
}
