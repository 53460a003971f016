//! Credential persistence via the OS keyring
//!
//! Backend tokens and the shared server secret are stored in the operating
//! system's native credential store (Keychain on macOS, Secret Service on
//! Linux, Windows Credential Manager on Windows) under a fixed service
//! name. The store accepts any non-empty string; validation of token
//! contents is the backend's job.
//!
//! Storage access goes through the [`SecretStore`] trait so that the token
//! manager and the authorization gate can be exercised with in-memory test
//! doubles instead of a live keyring.

use crate::error::{CvMcpError, Result};

/// Keyring service name all credentials are stored under.
pub const SERVICE_NAME: &str = "commvault-mcp-server";

/// Keyring entry name for the Command Center access token.
pub const ACCESS_TOKEN: &str = "access_token";

/// Keyring entry name for the Command Center refresh token.
pub const REFRESH_TOKEN: &str = "refresh_token";

/// Keyring entry name for the shared secret MCP clients must present.
pub const SERVER_SECRET: &str = "server_secret";

/// Named-secret storage.
///
/// `get` distinguishes "no such entry" (`Ok(None)`) from a storage error so
/// callers can treat absence as a configuration problem rather than an I/O
/// failure.
pub trait SecretStore: Send + Sync {
    /// Returns the stored value for `name`, or `None` when absent.
    fn get(&self, name: &str) -> Result<Option<String>>;

    /// Creates or replaces the value for `name`.
    fn set(&self, name: &str, value: &str) -> Result<()>;
}

/// [`SecretStore`] backed by the OS keyring.
///
/// # Examples
///
/// ```no_run
/// use commvault_mcp::credentials::{KeyringStore, SecretStore, ACCESS_TOKEN};
///
/// # fn example() -> commvault_mcp::error::Result<()> {
/// let store = KeyringStore::new();
/// store.set(ACCESS_TOKEN, "tok")?;
/// assert_eq!(store.get(ACCESS_TOKEN)?.as_deref(), Some("tok"));
/// # Ok(())
/// # }
/// ```
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    /// Creates a store for the fixed [`SERVICE_NAME`].
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Creates a store with a custom service name. Integration tests use
    /// this to avoid clobbering real credentials.
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, name: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, name)
            .map_err(|e| CvMcpError::Keyring(e).into())
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeyringStore {
    fn get(&self, name: &str) -> Result<Option<String>> {
        match self.entry(name)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CvMcpError::Keyring(e).into()),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<()> {
        self.entry(name)?
            .set_password(value)
            .map_err(|e| CvMcpError::Keyring(e).into())
    }
}

/// Fail-fast credential check for non-OAuth mode.
///
/// Verifies that the access token, refresh token, and server secret are all
/// present before the server accepts any tool invocation. The error names
/// every missing entry at once so the operator fixes them in one pass.
///
/// # Errors
///
/// Returns [`CvMcpError::Config`] listing the missing entries, or a keyring
/// error when the store itself is unreachable.
pub fn validate_startup_credentials(store: &dyn SecretStore) -> Result<()> {
    let mut missing = Vec::new();
    for name in [ACCESS_TOKEN, REFRESH_TOKEN, SERVER_SECRET] {
        if store.get(name)?.is_none() {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        tracing::info!("Authentication credentials validated successfully");
        Ok(())
    } else {
        Err(CvMcpError::Config(format!(
            "Missing required credentials: {}. Set the tokens from the command line before running the server.",
            missing.join(", ")
        ))
        .into())
    }
}
