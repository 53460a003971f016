//! Tool implementations, organized by functionality category
//!
//! Each module contributes one `#[tool_router]` block of methods on
//! [`CommvaultServer`](crate::server::CommvaultServer); the server merges
//! the per-category routers at construction time. Tools are thin: extract
//! the caller, hit one or two endpoints through the API client, optionally
//! project the response, and surface failures as tool errors.

pub mod clients;
pub mod commcell;
pub mod jobs;
pub mod plans;
pub mod schedules;
pub mod storage;
pub mod users;

/// Logs a tool failure and converts it into the string form rmcp reports
/// to the client.
pub(crate) fn tool_error(context: &str, err: anyhow::Error) -> String {
    tracing::error!("{context}: {err}");
    err.to_string()
}
