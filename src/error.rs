//! Error types for the Commvault MCP server
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Commvault MCP server operations
///
/// The first six variants map one-to-one onto the failure categories the
/// server reports to tool callers. Configuration errors are fatal and only
/// surface at startup; authorization rejections happen before any backend
/// I/O; the remaining kinds describe how a backend call ended, so the tool
/// layer can branch on the variant instead of matching message text.
#[derive(Error, Debug)]
pub enum CvMcpError {
    /// Configuration errors (missing environment variables, invalid
    /// transport mode, incomplete OAuth settings, missing credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// The inbound caller failed the authorization gate
    #[error("Authorization rejected: {0}")]
    AuthorizationRejected(String),

    /// The access-token refresh flow failed; the stored credentials must be
    /// renewed out-of-band
    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    /// A backend HTTP error that is not retried, or that exhausted its
    /// retry budget
    #[error("Backend returned HTTP {status}: {message}")]
    BackendStatus {
        /// HTTP status code returned by the backend
        status: u16,
        /// Response body or status text accompanying the failure
        message: String,
    },

    /// Transport-level failure (connection error, timeout) after the retry
    /// budget ran out. The underlying cause is logged, not exposed.
    #[error("Some issue occurred while contacting the server. Please try again later.")]
    Transient(String),

    /// A 2xx response whose body was not valid JSON
    #[error("Invalid response format from server: {0}")]
    MalformedResponse(String),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Commvault MCP server operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation. Callers that
/// need to branch on the failure kind downcast to [`CvMcpError`].
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = CvMcpError::Config("CC_SERVER_URL is not set".to_string());
        assert_eq!(
            error.to_string(),
            "Configuration error: CC_SERVER_URL is not set"
        );
    }

    #[test]
    fn test_authorization_rejected_display() {
        let error = CvMcpError::AuthorizationRejected("invalid token".to_string());
        assert_eq!(error.to_string(), "Authorization rejected: invalid token");
    }

    #[test]
    fn test_token_refresh_failed_display() {
        let error = CvMcpError::TokenRefreshFailed("no new tokens received".to_string());
        assert_eq!(
            error.to_string(),
            "Token refresh failed: no new tokens received"
        );
    }

    #[test]
    fn test_backend_status_display() {
        let error = CvMcpError::BackendStatus {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        let s = error.to_string();
        assert!(s.contains("503"));
        assert!(s.contains("Service Unavailable"));
    }

    #[test]
    fn test_transient_display_is_generic() {
        // The raw cause must not leak into the user-facing message.
        let error = CvMcpError::Transient("connection reset by peer".to_string());
        assert!(!error.to_string().contains("connection reset"));
        assert!(error.to_string().contains("try again later"));
    }

    #[test]
    fn test_malformed_response_display() {
        let error = CvMcpError::MalformedResponse("<html>".to_string());
        assert!(error
            .to_string()
            .starts_with("Invalid response format from server"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: CvMcpError = io_error.into();
        assert!(matches!(error, CvMcpError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{invalid").unwrap_err();
        let error: CvMcpError = json_error.into();
        assert!(matches!(error, CvMcpError::Serialization(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CvMcpError>();
    }
}
