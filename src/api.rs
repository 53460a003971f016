//! Authenticated Command Center API client
//!
//! [`ApiClient`] executes one logical backend operation reliably against a
//! possibly-flaky backend: it runs the authorization gate, attaches the
//! right credential header, retries transient failures with exponential
//! backoff, and refreshes the access token once per call when the backend
//! answers 401 in legacy mode.
//!
//! The 401 path is the one genuinely tricky piece of control flow. A 401 is
//! never charged against the retry budget (backoff cannot fix an expired
//! token), and at most one refresh happens per call: a second 401 after a
//! successful refresh fails the call instead of looping.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value;
use url::Url;

use crate::auth::{AuthorizationGate, Caller, TokenManager};
use crate::error::{CvMcpError, Result};

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Per-attempt timeout built into the HTTP client. The retry budget bounds
/// the call count; this bounds each individual attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying the access token in legacy (non-OAuth) mode.
const AUTHTOKEN: &str = "authtoken";

/// Builds the process-wide HTTP client.
///
/// One client is shared by the orchestrator, the token refresh exchange,
/// and the JWKS fetcher, so all outbound traffic honors the same
/// `SSL_VERIFY` setting and per-attempt timeout.
///
/// # Errors
///
/// Returns an error when TLS initialization fails.
pub fn build_http_client(ssl_verify: bool) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .danger_accept_invalid_certs(!ssl_verify)
        .build()
        .map_err(|e| CvMcpError::Http(e).into())
}

/// Request body shapes accepted by the orchestrator.
#[derive(Debug, Clone)]
pub enum Body {
    /// Structured body; JSON-encoded, sets `Content-Type: application/json`
    /// unless the caller already provided one
    Json(Value),
    /// Pre-serialized body sent verbatim
    Raw(String),
}

/// Per-call request description. Not persisted, not shared across calls.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path, relative to the Command Center API root
    pub endpoint: String,
    /// Query parameters
    pub params: Vec<(String, String)>,
    /// Optional request body
    pub body: Option<Body>,
    /// Extra headers merged last; caller values win
    pub headers: Vec<(String, String)>,
    /// Retry budget after the initial attempt
    pub max_retries: u32,
    /// Base backoff delay; attempt `n` sleeps `retry_delay * 2^(n-1)`
    pub retry_delay: Duration,
}

impl ApiRequest {
    /// Creates a request with the default retry policy and no parameters.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// The HTTP request orchestrator.
///
/// Owns the authorization gate and (in legacy mode) a handle to the
/// [`TokenManager`]. Each call gets an independent attempt loop; the only
/// state shared across concurrent calls is the token pair, whose refresh is
/// serialized inside the manager.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    gate: AuthorizationGate,
    tokens: Option<Arc<TokenManager>>,
    use_oauth: bool,
}

impl ApiClient {
    /// Creates a client for legacy mode: requests are signed with the
    /// managed token pair and 401 responses trigger a refresh.
    pub fn new(
        http: reqwest::Client,
        base_url: Url,
        gate: AuthorizationGate,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http,
            base_url,
            gate,
            tokens: Some(tokens),
            use_oauth: false,
        }
    }

    /// Creates a client for OAuth mode: the caller's bearer token is
    /// forwarded unchanged and refresh is the upstream flow's problem.
    pub fn new_oauth(http: reqwest::Client, base_url: Url, gate: AuthorizationGate) -> Self {
        Self {
            http,
            base_url,
            gate,
            tokens: None,
            use_oauth: true,
        }
    }

    /// Handle to the token manager, when running in legacy mode.
    pub fn token_manager(&self) -> Option<&Arc<TokenManager>> {
        self.tokens.as_ref()
    }

    /// Resolves an endpoint path against the API root.
    ///
    /// Leading slashes are trimmed so that every path lands under
    /// `/commandcenter/api/` rather than replacing the whole URL path.
    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| {
                CvMcpError::Config(format!("Invalid endpoint path {endpoint:?}: {e}")).into()
            })
    }

    /// Builds the headers for one attempt.
    ///
    /// `Accept: application/json` is always present. Legacy mode attaches
    /// `Authtoken` from the managed pair; OAuth mode forwards the caller's
    /// `Authorization` header verbatim. Caller-supplied extras are merged
    /// last and may replace either.
    async fn build_headers(&self, caller: &Caller, extra: &[(String, String)]) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if self.use_oauth {
            let raw = caller.raw_header().ok_or_else(|| {
                CvMcpError::AuthorizationRejected(
                    "Authentication validation failed. Please relogin and try again.".to_string(),
                )
            })?;
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(raw).map_err(|_| {
                    CvMcpError::AuthorizationRejected(
                        "Authorization header contains invalid characters".to_string(),
                    )
                })?,
            );
        } else if let Some(tokens) = &self.tokens {
            let pair = tokens.tokens().await;
            headers.insert(
                HeaderName::from_static(AUTHTOKEN),
                HeaderValue::from_str(&pair.access).map_err(|_| {
                    CvMcpError::Config("Stored access token contains invalid characters".to_string())
                })?,
            );
        }

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                CvMcpError::Config(format!("Invalid header name {name:?}: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                CvMcpError::Config(format!("Invalid header value for {name:?}: {e}"))
            })?;
            headers.insert(name, value);
        }

        Ok(headers)
    }

    /// Executes one logical backend operation.
    ///
    /// Control flow per the design in the module docs: gate check first
    /// (no network I/O on rejection), then up to `max_retries + 1` attempts
    /// with exponential backoff between them. Non-401 HTTP errors and
    /// transport errors consume the budget; a legacy-mode 401 triggers a
    /// single token refresh and replays the same request without consuming
    /// a retry slot.
    ///
    /// On success the decoded JSON body is returned unchanged.
    ///
    /// # Errors
    ///
    /// - [`CvMcpError::AuthorizationRejected`]: gate failure, pre-network
    /// - [`CvMcpError::TokenRefreshFailed`]: refresh failed, or the backend
    ///   rejected the freshly refreshed token
    /// - [`CvMcpError::BackendStatus`]: non-retryable HTTP failure (budget
    ///   exhausted, or 401 in OAuth mode)
    /// - [`CvMcpError::Transient`]: transport failure after the budget ran
    ///   out; the raw cause is logged, not exposed
    /// - [`CvMcpError::MalformedResponse`]: 2xx response that is not JSON
    pub async fn request(&self, caller: &Caller, req: ApiRequest) -> Result<Value> {
        self.gate.authorize(caller)?;

        let url = self.endpoint_url(&req.endpoint)?;
        let mut headers = self.build_headers(caller, &req.headers).await?;

        let body_text = match &req.body {
            Some(Body::Json(value)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(serde_json::to_string(value).map_err(CvMcpError::Serialization)?)
            }
            Some(Body::Raw(text)) => Some(text.clone()),
            None => None,
        };

        tracing::info!("{} request to: {}", req.method, url);

        let mut retries: u32 = 0;
        let mut refresh_attempted = false;

        loop {
            let mut builder = self
                .http
                .request(req.method.clone(), url.clone())
                .headers(headers.clone());
            if !req.params.is_empty() {
                builder = builder.query(&req.params);
            }
            if let Some(body) = &body_text {
                builder = builder.body(body.clone());
            }

            let response = match builder.send().await {
                Ok(response) => response,
                Err(e) => {
                    retries += 1;
                    if retries > req.max_retries {
                        tracing::error!(
                            "Request to {url} failed after {retries} attempts: {e}"
                        );
                        return Err(CvMcpError::Transient(e.to_string()).into());
                    }
                    self.backoff(&req, retries, &e.to_string()).await;
                    continue;
                }
            };

            let status = response.status();
            tracing::debug!("Response status code: {status}");

            if status == StatusCode::UNAUTHORIZED {
                if self.use_oauth {
                    // No local refresh capability; the upstream OAuth flow
                    // owns token renewal.
                    return Err(CvMcpError::BackendStatus {
                        status: 401,
                        message: "Unauthorized".to_string(),
                    }
                    .into());
                }

                let tokens = self.tokens.as_ref().ok_or_else(|| {
                    CvMcpError::Config("Legacy mode requires a token manager".to_string())
                })?;

                if refresh_attempted {
                    return Err(CvMcpError::TokenRefreshFailed(
                        "The server rejected the refreshed access token. \
                         Create a new token and update the keyring."
                            .to_string(),
                    )
                    .into());
                }
                refresh_attempted = true;

                tracing::info!(
                    "Received 401 Unauthorized response. Attempting to refresh token..."
                );
                let stale = headers
                    .get(AUTHTOKEN)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();

                if tokens.refresh(&stale).await {
                    headers = self.build_headers(caller, &req.headers).await?;
                    tracing::info!("Retrying {} request with new token", req.method);
                    continue;
                }
                return Err(CvMcpError::TokenRefreshFailed(
                    "Failed to refresh token. Create a new token and update the keyring."
                        .to_string(),
                )
                .into());
            }

            if !status.is_success() {
                retries += 1;
                if retries > req.max_retries {
                    let message = response.text().await.unwrap_or_default();
                    return Err(CvMcpError::BackendStatus {
                        status: status.as_u16(),
                        message,
                    }
                    .into());
                }
                self.backoff(&req, retries, &format!("HTTP {status}")).await;
                continue;
            }

            let text = response.text().await.map_err(CvMcpError::Http)?;
            return match serde_json::from_str::<Value>(&text) {
                Ok(value) => Ok(value),
                Err(_) => {
                    let preview: String = text.chars().take(100).collect();
                    tracing::error!("Invalid JSON response: {preview}...");
                    Err(CvMcpError::MalformedResponse(preview).into())
                }
            };
        }
    }

    async fn backoff(&self, req: &ApiRequest, retries: u32, reason: &str) {
        let delay = req.retry_delay * 2u32.saturating_pow(retries - 1);
        tracing::warn!("Request failed with {reason}. Retrying in {delay:?}...");
        tokio::time::sleep(delay).await;
    }

    /// Makes a GET request to the API.
    pub async fn get(
        &self,
        caller: &Caller,
        endpoint: &str,
        params: Vec<(String, String)>,
    ) -> Result<Value> {
        let mut req = ApiRequest::new(Method::GET, endpoint);
        req.params = params;
        self.request(caller, req).await
    }

    /// Makes a POST request to the API.
    pub async fn post(
        &self,
        caller: &Caller,
        endpoint: &str,
        body: Option<Value>,
        params: Vec<(String, String)>,
    ) -> Result<Value> {
        let mut req = ApiRequest::new(Method::POST, endpoint);
        req.body = body.map(Body::Json);
        req.params = params;
        self.request(caller, req).await
    }

    /// Makes a PUT request to the API.
    pub async fn put(&self, caller: &Caller, endpoint: &str, body: Option<Value>) -> Result<Value> {
        let mut req = ApiRequest::new(Method::PUT, endpoint);
        req.body = body.map(Body::Json);
        self.request(caller, req).await
    }
}
