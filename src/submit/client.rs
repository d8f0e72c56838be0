//! Per-submission HTTP session construction.
//!
//! The orchestrator opens a fresh session for every repository URL and drops
//! it when the URL is done; probe and submission traffic for one URL share
//! only that session's connection pool. No request timeout is configured:
//! a hung server stalls the owning task, nothing else.

use reqwest::Client;

use crate::user_agent;

use super::error::SubmitError;

/// Builds the HTTP session used for a single URL's probe and submission.
///
/// # Errors
///
/// Returns [`SubmitError::Session`] when the client builder fails.
pub(crate) fn build_session() -> Result<Client, SubmitError> {
    Client::builder()
        .gzip(true)
        .user_agent(user_agent::default_session_user_agent())
        .build()
        .map_err(SubmitError::session)
}
