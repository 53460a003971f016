//! Interactive setup wizard
//!
//! Walks the operator through the environment file (`.env`) and the keyring
//! credentials. Existing values are offered as defaults; secrets are read
//! with hidden input and left untouched when the prompt is skipped. When an
//! OAuth discovery endpoint is supplied, the authorization/token/JWKS
//! endpoints are pre-filled from the discovery document.

use std::path::Path;

use dialoguer::{Confirm, Input, Password, Select};

use crate::credentials::{KeyringStore, SecretStore, ACCESS_TOKEN, REFRESH_TOKEN, SERVER_SECRET};
use crate::error::{CvMcpError, Result};

/// File the wizard reads and writes environment variables to.
const ENV_FILE: &str = ".env";

const TRANSPORT_MODES: [&str; 3] = ["streamable-http", "stdio", "sse"];

const OAUTH_KEYS: [&str; 8] = [
    "OAUTH_DISCOVERY_ENDPOINT",
    "OAUTH_AUTHORIZATION_ENDPOINT",
    "OAUTH_TOKEN_ENDPOINT",
    "OAUTH_CLIENT_ID",
    "OAUTH_CLIENT_SECRET",
    "OAUTH_JWKS_URI",
    "OAUTH_REQUIRED_SCOPES",
    "OAUTH_BASE_URL",
];

/// Ordered key/value environment entries. Insertion order is preserved so
/// the written file stays diffable between runs.
#[derive(Debug, Default, Clone)]
pub struct EnvFile {
    entries: Vec<(String, String)>,
}

impl EnvFile {
    /// Parses a `.env` file, ignoring blank lines and `#` comments.
    /// A missing file yields an empty set.
    pub fn load(path: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(CvMcpError::Io)?;
            for line in content.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    entries.push((key.trim().to_string(), value.trim().to_string()));
                }
            }
        }
        Ok(Self { entries })
    }

    /// Writes the entries back as `KEY=value` lines.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content = String::new();
        for (key, value) in &self.entries {
            content.push_str(&format!("{key}={value}\n"));
        }
        std::fs::write(path, content).map_err(|e| CvMcpError::Io(e).into())
    }

    /// Returns the value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Inserts or replaces the value for `key`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Removes `key` when present.
    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|(k, _)| k != key);
    }
}

/// Runs the interactive wizard.
///
/// # Errors
///
/// Returns an error when a prompt is aborted, the OAuth discovery document
/// cannot be fetched, or the environment file cannot be written.
pub async fn run_setup() -> Result<()> {
    println!("Commvault MCP Server setup");
    println!("Press Enter to keep the current value where one is shown.\n");

    let env_path = Path::new(ENV_FILE);
    let mut env = EnvFile::load(env_path)?;

    prompt_environment(&mut env).await?;
    env.save(env_path)?;
    println!("\nUpdated {ENV_FILE} file.");

    let use_oauth = env.get("USE_OAUTH").unwrap_or("false") == "true";
    if use_oauth {
        println!("\nOAuth authentication enabled - skipping keyring token setup.");
    } else {
        prompt_keyring_secrets(&KeyringStore::new())?;
    }

    println!("\nSetup complete! You can now run the MCP server (commvault-mcp serve).");
    Ok(())
}

async fn prompt_environment(env: &mut EnvFile) -> Result<()> {
    let server_url: String = Input::new()
        .with_prompt("CC_SERVER_URL")
        .with_initial_text(env.get("CC_SERVER_URL").unwrap_or(""))
        .interact_text()
        .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
    env.set("CC_SERVER_URL", server_url);

    let current_mode = env.get("MCP_TRANSPORT_MODE").unwrap_or("");
    let default_index = TRANSPORT_MODES
        .iter()
        .position(|m| *m == current_mode)
        .unwrap_or(0);
    let selection = Select::new()
        .with_prompt("MCP_TRANSPORT_MODE")
        .items(&TRANSPORT_MODES)
        .default(default_index)
        .interact()
        .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
    let transport = TRANSPORT_MODES[selection];
    env.set("MCP_TRANSPORT_MODE", transport);

    // The remaining variables only matter for network transports.
    if transport == "stdio" {
        return Ok(());
    }

    for (key, default) in [("MCP_HOST", ""), ("MCP_PORT", ""), ("MCP_PATH", "/mcp")] {
        let initial = env.get(key).unwrap_or(default).to_string();
        let value: String = Input::new()
            .with_prompt(key)
            .with_initial_text(initial)
            .interact_text()
            .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
        env.set(key, value);
    }

    let use_oauth = Confirm::new()
        .with_prompt("Use OAuth for authentication?")
        .default(env.get("USE_OAUTH").unwrap_or("false") == "true")
        .interact()
        .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;

    if use_oauth {
        env.set("USE_OAUTH", "true");
        prompt_oauth(env).await?;
    } else {
        env.set("USE_OAUTH", "false");
        for key in OAUTH_KEYS {
            env.remove(key);
        }
    }

    Ok(())
}

async fn prompt_oauth(env: &mut EnvFile) -> Result<()> {
    let discovery: String = Input::new()
        .with_prompt("OAuth Discovery Endpoint URL (blank to enter endpoints manually)")
        .with_initial_text(env.get("OAUTH_DISCOVERY_ENDPOINT").unwrap_or(""))
        .allow_empty(true)
        .interact_text()
        .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;

    if !discovery.is_empty() {
        env.set("OAUTH_DISCOVERY_ENDPOINT", discovery.clone());
        println!("Fetching OAuth configuration from discovery endpoint...");
        let document = fetch_discovery_document(&discovery).await?;
        for (env_key, doc_key) in [
            ("OAUTH_AUTHORIZATION_ENDPOINT", "authorization_endpoint"),
            ("OAUTH_TOKEN_ENDPOINT", "token_endpoint"),
            ("OAUTH_JWKS_URI", "jwks_uri"),
        ] {
            let value = document
                .get(doc_key)
                .and_then(serde_json::Value::as_str)
                .unwrap_or("");
            env.set(env_key, value);
        }
        println!("Successfully retrieved OAuth endpoints from discovery URL.");
    } else {
        for key in ["OAUTH_AUTHORIZATION_ENDPOINT", "OAUTH_TOKEN_ENDPOINT", "OAUTH_JWKS_URI"] {
            let value: String = Input::new()
                .with_prompt(key)
                .with_initial_text(env.get(key).unwrap_or(""))
                .interact_text()
                .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
            env.set(key, value);
        }
    }

    for (key, prompt) in [
        ("OAUTH_CLIENT_ID", "OAuth Client ID"),
        ("OAUTH_REQUIRED_SCOPES", "OAuth Required Scopes (comma-separated)"),
        ("OAUTH_BASE_URL", "OAuth Base URL"),
    ] {
        let value: String = Input::new()
            .with_prompt(prompt)
            .with_initial_text(env.get(key).unwrap_or(""))
            .interact_text()
            .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
        env.set(key, value);
    }

    let secret = Password::new()
        .with_prompt("OAuth Client Secret (blank to keep existing)")
        .allow_empty_password(true)
        .interact()
        .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
    if !secret.is_empty() {
        env.set("OAUTH_CLIENT_SECRET", secret);
        println!("OAuth Client Secret updated.");
    } else if env.get("OAUTH_CLIENT_SECRET").is_none() {
        return Err(CvMcpError::Config("OAuth Client Secret is required".to_string()).into());
    } else {
        println!("OAuth Client Secret unchanged.");
    }

    Ok(())
}

async fn fetch_discovery_document(url: &str) -> Result<serde_json::Value> {
    let response = reqwest::get(url).await.map_err(|e| {
        CvMcpError::Config(format!("Error fetching from discovery endpoint: {e}. Setup aborted."))
    })?;
    if !response.status().is_success() {
        return Err(CvMcpError::Config(format!(
            "Failed to fetch from discovery endpoint (HTTP {}). Setup aborted.",
            response.status()
        ))
        .into());
    }
    response.json().await.map_err(|e| {
        CvMcpError::Config(format!("Invalid discovery document: {e}. Setup aborted.")).into()
    })
}

fn prompt_keyring_secrets(store: &dyn SecretStore) -> Result<()> {
    println!("\nSecure tokens (stored in the OS keyring)");
    println!("Leave blank to keep the existing secret.");
    println!("Warning: make sure you are entering sensitive tokens in a secure terminal.\n");

    for key in [ACCESS_TOKEN, REFRESH_TOKEN, SERVER_SECRET] {
        let current = store.get(key)?;
        let display = if current.is_some() { "<hidden>" } else { "none" };
        let value = Password::new()
            .with_prompt(format!("Enter {key} [{display}]"))
            .allow_empty_password(true)
            .interact()
            .map_err(|e| CvMcpError::Config(format!("Setup aborted: {e}")))?;
        if value.is_empty() {
            println!("{key} unchanged.");
        } else {
            store.set(key, &value)?;
            println!("{key} updated.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_file_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let env = EnvFile::load(&dir.path().join(".env")).unwrap();
        assert!(env.get("CC_SERVER_URL").is_none());
    }

    #[test]
    fn test_env_file_round_trip_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");

        let mut env = EnvFile::default();
        env.set("CC_SERVER_URL", "https://cc.example.com");
        env.set("MCP_TRANSPORT_MODE", "streamable-http");
        env.set("MCP_HOST", "127.0.0.1");
        env.save(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "CC_SERVER_URL=https://cc.example.com\nMCP_TRANSPORT_MODE=streamable-http\nMCP_HOST=127.0.0.1\n"
        );

        let reloaded = EnvFile::load(&path).unwrap();
        assert_eq!(reloaded.get("MCP_HOST"), Some("127.0.0.1"));
    }

    #[test]
    fn test_env_file_load_skips_comments_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(&path, "# comment\n\nKEY=value\nBROKEN LINE\n").unwrap();

        let env = EnvFile::load(&path).unwrap();
        assert_eq!(env.get("KEY"), Some("value"));
        assert!(env.get("# comment").is_none());
        assert!(env.get("BROKEN LINE").is_none());
    }

    #[test]
    fn test_env_file_set_replaces_in_place() {
        let mut env = EnvFile::default();
        env.set("A", "1");
        env.set("B", "2");
        env.set("A", "3");
        assert_eq!(env.get("A"), Some("3"));
        assert_eq!(env.entries.len(), 2);
        assert_eq!(env.entries[0].0, "A");
    }

    #[test]
    fn test_env_file_remove() {
        let mut env = EnvFile::default();
        env.set("A", "1");
        env.remove("A");
        assert!(env.get("A").is_none());
    }
}
