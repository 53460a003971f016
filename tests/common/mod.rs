//! Shared helpers for integration tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use commvault_mcp::credentials::{SecretStore, ACCESS_TOKEN, REFRESH_TOKEN, SERVER_SECRET};
use commvault_mcp::error::Result;

/// In-memory [`SecretStore`] test double.
///
/// Clones share the underlying map, so a test can hand one clone to the
/// component under test and keep another to inspect write-through behavior.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with a token pair.
    pub fn with_tokens(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        store.set(ACCESS_TOKEN, access).expect("seed access token");
        store
            .set(REFRESH_TOKEN, refresh)
            .expect("seed refresh token");
        store
    }

    /// A store pre-seeded with only the shared server secret.
    pub fn with_secret(secret: &str) -> Self {
        let store = Self::new();
        store.set(SERVER_SECRET, secret).expect("seed server secret");
        store
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
