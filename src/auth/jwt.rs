//! Bearer-token verification for OAuth mode
//!
//! Verifies inbound JWT access tokens against the provider's JWKS endpoint:
//! signature, expiry, and (when configured) issuer and audience. Scope
//! enforcement is left to the Command Center API, which re-validates the
//! forwarded token on every request.
//!
//! Keys are fetched lazily by `kid` and cached for the process lifetime; an
//! unknown `kid` triggers one re-fetch, which covers ordinary provider key
//! rotation.

use std::collections::HashMap;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use url::Url;

use crate::error::{CvMcpError, Result};

#[derive(Debug, Clone, Deserialize)]
struct Jwk {
    kid: Option<String>,
    kty: String,
    n: Option<String>,
    e: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// Claims extracted from a verified access token.
///
/// Everything beyond the registered claims is kept in `extra` so the tool
/// layer can read provider-specific fields without this module modeling
/// them.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessClaims {
    /// Subject (usually the user or service principal)
    pub sub: Option<String>,
    /// OAuth client the token was issued to
    pub client_id: Option<String>,
    /// Expiry as a Unix timestamp
    pub exp: Option<u64>,
    /// Issuer
    pub iss: Option<String>,
    /// Audience (string or array, provider-dependent)
    pub aud: Option<Value>,
    /// Space-separated granted scopes
    pub scope: Option<String>,
    /// All remaining claims
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl AccessClaims {
    /// Best-effort client identifier for log lines.
    pub fn client_label(&self) -> &str {
        self.client_id
            .as_deref()
            .or(self.sub.as_deref())
            .unwrap_or("unknown")
    }
}

/// JWKS-backed JWT verifier.
pub struct JwtVerifier {
    http: reqwest::Client,
    jwks_uri: Url,
    issuer: Option<String>,
    audience: Option<String>,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

impl JwtVerifier {
    /// Creates a verifier against the given JWKS endpoint.
    ///
    /// `issuer` and `audience` are each optional: when `None` the
    /// corresponding claim is not checked, mirroring providers that omit
    /// them from access tokens.
    pub fn new(
        http: reqwest::Client,
        jwks_uri: Url,
        issuer: Option<String>,
        audience: Option<String>,
    ) -> Self {
        Self {
            http,
            jwks_uri,
            issuer,
            audience,
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Verifies a bearer token and returns its claims.
    ///
    /// # Errors
    ///
    /// Returns [`CvMcpError::AuthorizationRejected`] for any validation
    /// failure: bad signature, expired token, issuer or audience mismatch,
    /// unknown signing key, or an unreachable JWKS endpoint.
    pub async fn verify(&self, token: &str) -> Result<AccessClaims> {
        let header = decode_header(token)
            .map_err(|e| reject(format!("JWT signature/format invalid: {e}")))?;

        if !matches!(header.alg, Algorithm::RS256) {
            return Err(reject(format!("algorithm {:?} not allowed", header.alg)));
        }
        let kid = header
            .kid
            .ok_or_else(|| reject("token header has no kid".to_string()))?;

        let key = self.key_for(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        } else {
            validation.validate_aud = false;
        }

        let data = decode::<AccessClaims>(token, &key, &validation)
            .map_err(|e| reject(format!("token validation failed: {e}")))?;

        Ok(data.claims)
    }

    /// Returns the decoding key for `kid`, fetching the JWKS document when
    /// the key is not cached yet.
    async fn key_for(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.keys.read().await.get(kid) {
            return Ok(key.clone());
        }

        let response = self
            .http
            .get(self.jwks_uri.clone())
            .send()
            .await
            .map_err(|e| reject(format!("failed to fetch JWKS: {e}")))?;
        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| reject(format!("invalid JWKS document: {e}")))?;

        let mut keys = self.keys.write().await;
        for jwk in jwks.keys {
            let (Some(id), Some(n), Some(e)) = (jwk.kid.clone(), &jwk.n, &jwk.e) else {
                continue;
            };
            if jwk.kty != "RSA" {
                continue;
            }
            match DecodingKey::from_rsa_components(n, e) {
                Ok(key) => {
                    keys.insert(id, key);
                }
                Err(err) => {
                    tracing::warn!("Skipping unusable JWK {id}: {err}");
                }
            }
        }

        keys.get(kid)
            .cloned()
            .ok_or_else(|| reject(format!("no JWKS key matches kid {kid:?}")))
    }
}

fn reject(reason: String) -> anyhow::Error {
    CvMcpError::AuthorizationRejected(reason).into()
}
