//! Backend token lifecycle management
//!
//! [`TokenManager`] owns the in-memory `(access, refresh)` token pair used
//! to sign Command Center requests in non-OAuth mode. The OS keyring is the
//! durable backing copy: the pair is read from it once at construction and
//! written back after every successful refresh. Durability is best-effort;
//! a failed keyring write keeps the in-memory pair, which is what the live
//! process actually signs with.
//!
//! The refresh exchange (`POST V4/AccessToken/Renew`) deliberately bypasses
//! the normal request-signing path: its whole purpose is to obtain fresh
//! auth, so it must not itself be gate-checked.

use serde_json::json;
use tokio::sync::Mutex;
use url::Url;

use crate::credentials::{SecretStore, ACCESS_TOKEN, REFRESH_TOKEN};
use crate::error::{CvMcpError, Result};

/// In-memory `(access, refresh)` token pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    /// Short-lived credential sent with each backend request
    pub access: String,
    /// Longer-lived credential exchanged for a new pair
    pub refresh: String,
}

/// Holds the live token pair and knows how to renew it.
///
/// # Thread safety
///
/// The pair sits behind an async mutex that is held across the whole
/// read-renew-write sequence, so concurrent refresh attempts cannot
/// interleave and a stale renew response can never overwrite a fresher
/// pair. Callers pass the access token they observed when the backend
/// rejected them; if the pair has already moved on, [`refresh`] returns
/// success without a second network call.
///
/// [`refresh`]: TokenManager::refresh
pub struct TokenManager {
    store: Box<dyn SecretStore>,
    http: reqwest::Client,
    renew_url: Url,
    state: Mutex<TokenPair>,
}

impl TokenManager {
    /// Loads the token pair from the credential store.
    ///
    /// `renew_url` is the absolute URL of the `V4/AccessToken/Renew`
    /// endpoint. The provided HTTP client carries the process-wide TLS
    /// verification setting, so refresh honors the same `SSL_VERIFY` value
    /// as every other backend call.
    ///
    /// # Errors
    ///
    /// Returns [`CvMcpError::Config`] when either token is missing; the
    /// server must not start in that state.
    pub fn load(
        store: Box<dyn SecretStore>,
        http: reqwest::Client,
        renew_url: Url,
    ) -> Result<Self> {
        let access = store.get(ACCESS_TOKEN)?;
        let refresh = store.get(REFRESH_TOKEN)?;
        let (Some(access), Some(refresh)) = (access, refresh) else {
            return Err(CvMcpError::Config(
                "access_token and refresh_token must be stored before running the server. \
                 Run the setup command to store them."
                    .to_string(),
            )
            .into());
        };
        Ok(Self {
            store,
            http,
            renew_url,
            state: Mutex::new(TokenPair { access, refresh }),
        })
    }

    /// Returns a snapshot of the current token pair.
    pub async fn tokens(&self) -> TokenPair {
        self.state.lock().await.clone()
    }

    /// Replaces the token pair, writing through to the credential store.
    ///
    /// Store failures are logged and swallowed: the in-memory pair is what
    /// the running process signs with, and it has already been updated.
    pub async fn set_tokens(&self, access: &str, refresh: &str) {
        let mut state = self.state.lock().await;
        state.access = access.to_string();
        state.refresh = refresh.to_string();
        Self::persist(self.store.as_ref(), &state);
    }

    fn persist(store: &dyn SecretStore, pair: &TokenPair) {
        if let Err(e) = store.set(ACCESS_TOKEN, &pair.access) {
            tracing::warn!("Failed to persist access token to the keyring: {e}");
        }
        if let Err(e) = store.set(REFRESH_TOKEN, &pair.refresh) {
            tracing::warn!("Failed to persist refresh token to the keyring: {e}");
        }
    }

    /// Exchanges the refresh token for a new pair.
    ///
    /// `stale_access` is the access token the caller was using when the
    /// backend returned 401. If the current pair no longer matches it,
    /// another call has already refreshed; this returns `true` immediately
    /// so two simultaneous 401s produce exactly one renew request.
    ///
    /// Never returns an error: every failure path (non-2xx status,
    /// transport error, response missing either token) is logged and
    /// reported as `false`. The orchestrator decides what to do next.
    pub async fn refresh(&self, stale_access: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.access != stale_access {
            tracing::debug!("Token pair already refreshed by a concurrent call");
            return true;
        }

        let payload = json!({
            "accessToken": state.access,
            "refreshToken": state.refresh,
        });

        let response = match self
            .http
            .post(self.renew_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Failed to refresh access token: {e}");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::error!(
                "Failed to refresh access token: renew endpoint returned HTTP {}",
                response.status()
            );
            return false;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to refresh access token: invalid renew response: {e}");
                return false;
            }
        };

        let access = body.get("accessToken").and_then(|v| v.as_str());
        let refresh = body.get("refreshToken").and_then(|v| v.as_str());
        let (Some(access), Some(refresh)) = (access, refresh) else {
            tracing::error!("Failed to refresh access token: no new tokens received");
            return false;
        };

        state.access = access.to_string();
        state.refresh = refresh.to_string();
        Self::persist(self.store.as_ref(), &state);

        tracing::info!("Access token refreshed successfully");
        true
    }
}
