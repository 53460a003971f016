//! Inbound-caller authorization gate
//!
//! In shared-secret mode (network transports without OAuth), every tool
//! invocation must present the stored `server_secret` as a bearer token.
//! The comparison is constant-time: a secret must never be comparable by
//! timing a naive string equality. For the `stdio` transport there is no
//! network caller to authenticate and the gate is disabled; in OAuth mode
//! bearer verification happens in the HTTP middleware instead.

use std::sync::Arc;

use crate::credentials::{SecretStore, SERVER_SECRET};
use crate::error::{CvMcpError, Result};

/// Per-invocation snapshot of the inbound caller's credentials.
///
/// Carries the raw `Authorization` header value of the MCP request this
/// tool call arrived on, or `None` for transports without HTTP headers.
#[derive(Debug, Clone)]
pub struct Caller {
    authorization: Option<String>,
}

impl Caller {
    /// Wraps an inbound `Authorization` header value.
    pub fn new(authorization: Option<String>) -> Self {
        Self { authorization }
    }

    /// A caller with no credentials (stdio transport).
    pub fn anonymous() -> Self {
        Self {
            authorization: None,
        }
    }

    /// The raw header value, exactly as received.
    pub fn raw_header(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// The presented token with an optional `Bearer ` prefix removed.
    /// No other normalization is applied; comparison is case-sensitive.
    pub fn bearer(&self) -> Option<&str> {
        self.authorization
            .as_deref()
            .map(|value| value.strip_prefix("Bearer ").unwrap_or(value))
    }
}

enum GateMode {
    Disabled,
    SharedSecret { store: Arc<dyn SecretStore> },
}

/// Decides whether an inbound tool invocation may reach the backend.
pub struct AuthorizationGate {
    mode: GateMode,
}

impl AuthorizationGate {
    /// Gate that accepts every caller (stdio transport, OAuth mode).
    pub fn disabled() -> Self {
        Self {
            mode: GateMode::Disabled,
        }
    }

    /// Gate that requires the stored `server_secret` as a bearer token.
    pub fn shared_secret(store: Arc<dyn SecretStore>) -> Self {
        Self {
            mode: GateMode::SharedSecret { store },
        }
    }

    /// Checks the caller's credentials.
    ///
    /// Must run before any backend network I/O; a rejection here aborts the
    /// whole call.
    ///
    /// # Errors
    ///
    /// Returns [`CvMcpError::AuthorizationRejected`] for a missing header,
    /// a missing stored secret (also logged as a configuration error), or
    /// a mismatch.
    pub fn authorize(&self, caller: &Caller) -> Result<()> {
        let store = match &self.mode {
            GateMode::Disabled => return Ok(()),
            GateMode::SharedSecret { store } => store,
        };

        let Some(token) = caller.bearer() else {
            tracing::error!("Authentication validation failed: missing Authorization header");
            return Err(reject());
        };

        let Some(secret) = store.get(SERVER_SECRET)? else {
            tracing::error!("Server secret not found in keyring");
            return Err(reject());
        };

        if !constant_time_eq(token, &secret) {
            tracing::warn!("Authentication validation failed");
            return Err(reject());
        }

        Ok(())
    }
}

fn reject() -> anyhow::Error {
    CvMcpError::AuthorizationRejected("Invalid or missing token in request.".to_string()).into()
}

/// Compares two strings without early-returning on the first mismatch.
/// Runtime is proportional to `max(len(a), len(b))` regardless of content.
fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let mut diff = u64::try_from(a_bytes.len() ^ b_bytes.len()).unwrap_or(u64::MAX);
    let max_len = a_bytes.len().max(b_bytes.len());
    for i in 0..max_len {
        let x = a_bytes.get(i).copied().unwrap_or(0);
        let y = b_bytes.get(i).copied().unwrap_or(0);
        diff |= u64::from(x ^ y);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MemoryStore {
        values: Mutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn with_secret(secret: &str) -> Arc<Self> {
            let mut values = HashMap::new();
            values.insert(SERVER_SECRET.to_string(), secret.to_string());
            Arc::new(Self {
                values: Mutex::new(values),
            })
        }

        fn empty() -> Arc<Self> {
            Arc::new(Self {
                values: Mutex::new(HashMap::new()),
            })
        }
    }

    impl SecretStore for MemoryStore {
        fn get(&self, name: &str) -> Result<Option<String>> {
            Ok(self.values.lock().unwrap().get(name).cloned())
        }

        fn set(&self, name: &str, value: &str) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(name.to_string(), value.to_string());
            Ok(())
        }
    }

    fn rejected(result: Result<()>) -> bool {
        matches!(
            result.unwrap_err().downcast_ref::<CvMcpError>(),
            Some(CvMcpError::AuthorizationRejected(_))
        )
    }

    // -----------------------------------------------------------------------
    // constant_time_eq
    // -----------------------------------------------------------------------

    #[test]
    fn test_constant_time_eq_equal_strings() {
        assert!(constant_time_eq("abc123", "abc123"));
        assert!(constant_time_eq("", ""));
    }

    #[test]
    fn test_constant_time_eq_differing_strings() {
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc123", "ABC123"));
        assert!(!constant_time_eq("abc", "abc123"));
        assert!(!constant_time_eq("abc123", ""));
    }

    // -----------------------------------------------------------------------
    // Caller::bearer
    // -----------------------------------------------------------------------

    #[test]
    fn test_bearer_strips_prefix() {
        let caller = Caller::new(Some("Bearer abc123".to_string()));
        assert_eq!(caller.bearer(), Some("abc123"));
    }

    #[test]
    fn test_bearer_accepts_raw_token() {
        let caller = Caller::new(Some("abc123".to_string()));
        assert_eq!(caller.bearer(), Some("abc123"));
    }

    #[test]
    fn test_bearer_does_not_trim_whitespace() {
        // Only the literal `Bearer ` prefix is removed.
        let caller = Caller::new(Some("Bearer  abc123".to_string()));
        assert_eq!(caller.bearer(), Some(" abc123"));
    }

    #[test]
    fn test_anonymous_has_no_bearer() {
        assert!(Caller::anonymous().bearer().is_none());
        assert!(Caller::anonymous().raw_header().is_none());
    }

    // -----------------------------------------------------------------------
    // AuthorizationGate
    // -----------------------------------------------------------------------

    #[test]
    fn test_shared_secret_accepts_matching_bearer() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::with_secret("abc123"));
        let caller = Caller::new(Some("Bearer abc123".to_string()));
        assert!(gate.authorize(&caller).is_ok());
    }

    #[test]
    fn test_shared_secret_accepts_matching_raw_token() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::with_secret("abc123"));
        let caller = Caller::new(Some("abc123".to_string()));
        assert!(gate.authorize(&caller).is_ok());
    }

    #[test]
    fn test_shared_secret_rejects_wrong_token() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::with_secret("abc123"));
        let caller = Caller::new(Some("Bearer wrong".to_string()));
        assert!(rejected(gate.authorize(&caller)));
    }

    #[test]
    fn test_shared_secret_rejects_case_mismatch() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::with_secret("abc123"));
        let caller = Caller::new(Some("Bearer ABC123".to_string()));
        assert!(rejected(gate.authorize(&caller)));
    }

    #[test]
    fn test_shared_secret_rejects_missing_header() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::with_secret("abc123"));
        assert!(rejected(gate.authorize(&Caller::anonymous())));
    }

    #[test]
    fn test_shared_secret_rejects_when_secret_not_stored() {
        let gate = AuthorizationGate::shared_secret(MemoryStore::empty());
        let caller = Caller::new(Some("Bearer abc123".to_string()));
        assert!(rejected(gate.authorize(&caller)));
    }

    #[test]
    fn test_disabled_gate_accepts_anonymous_caller() {
        let gate = AuthorizationGate::disabled();
        assert!(gate.authorize(&Caller::anonymous()).is_ok());
    }

    #[test]
    fn test_disabled_gate_accepts_any_header() {
        let gate = AuthorizationGate::disabled();
        let caller = Caller::new(Some("Bearer whatever".to_string()));
        assert!(gate.authorize(&caller).is_ok());
    }
}
