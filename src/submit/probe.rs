//! Git smart-HTTP reachability probe.
//!
//! A repository URL is considered reachable when its `info/refs` endpoint
//! answers protocol negotiation with the upload-pack advertisement content
//! type. The probe never clones or inspects repository content, and it
//! never errors on network trouble: transport exhaustion collapses to
//! "not reachable".

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{info, instrument, warn};

use crate::user_agent;

use super::config::ArchiveConfig;
use super::error::SubmitError;
use super::normalize_repo_url;

/// Content type that identifies a git smart-HTTP server.
const UPLOAD_PACK_ADVERTISEMENT: &str = "application/x-git-upload-pack-advertisement";

/// Probes whether a URL behaves like a git smart-HTTP server.
///
/// Borrows the session owned by the orchestrator invocation; one prober
/// lives exactly as long as one URL's processing.
#[derive(Debug)]
pub struct GitProber<'a> {
    client: &'a Client,
    attempts: u32,
    retry_delay: Duration,
}

impl<'a> GitProber<'a> {
    /// Creates a prober over the given session.
    #[must_use]
    pub fn new(client: &'a Client, config: &ArchiveConfig) -> Self {
        Self {
            client,
            attempts: config.probe_attempts,
            retry_delay: config.retry_delay,
        }
    }

    /// Returns whether `url` serves the git smart-HTTP protocol.
    ///
    /// Non-http(s) schemes yield `Ok(false)` without any network call.
    /// Transport failures are retried with a fixed delay; exhaustion yields
    /// `Ok(false)` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::InvalidInput`] when `url` is empty; this is
    /// the only error path and it is raised before any network activity.
    #[instrument(skip(self))]
    pub async fn probe(&self, url: &str) -> Result<bool, SubmitError> {
        if url.is_empty() {
            return Err(SubmitError::invalid_input(
                "repository URL must be a non-empty string",
            ));
        }
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Ok(false);
        }

        let url = normalize_repo_url(url);
        let refs_url = format!("{url}info/refs");
        info!(url = %refs_url, "probing git smart-HTTP endpoint");

        let mut response = None;
        for attempt in 1..=self.attempts {
            match self
                .client
                .get(&refs_url)
                .query(&[("service", "git-upload-pack")])
                .header(USER_AGENT, user_agent::default_probe_user_agent())
                .header("Git-Protocol", "version=2")
                .send()
                .await
            {
                Ok(r) => {
                    response = Some(r);
                    break;
                }
                Err(error) => {
                    warn!(url = %refs_url, attempt, error = %error, "probe transport error");
                    if attempt < self.attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        let Some(response) = response else {
            warn!(url = %refs_url, attempts = self.attempts, "probe retries exhausted");
            return Ok(false);
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        Ok(content_type == UPLOAD_PACK_ADVERTISEMENT)
    }
}
