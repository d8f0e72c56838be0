//! Per-URL submission orchestration.
//!
//! One `process` invocation owns the whole lifecycle of a single repository
//! URL: a fresh HTTP session, the reachability probe, and the archival
//! submission. Every failure is converted into a terminal
//! [`SubmissionOutcome`]; nothing escapes to the caller.

use tracing::{error, instrument, warn};

use super::client::build_session;
use super::config::ArchiveConfig;
use super::outcome::{SubmissionOutcome, SubmitAck};
use super::probe::GitProber;
use super::submitter::ArchiveSubmitter;

/// Runs probe-then-submit for individual repository URLs.
#[derive(Debug)]
pub struct Orchestrator {
    token: String,
    config: ArchiveConfig,
}

impl Orchestrator {
    /// Creates an orchestrator holding the bearer token and pipeline config.
    #[must_use]
    pub fn new(token: impl Into<String>, config: ArchiveConfig) -> Self {
        Self {
            token: token.into(),
            config,
        }
    }

    /// Probes and, when reachable, submits one repository URL.
    ///
    /// The HTTP session is scoped to this invocation and dropped on return;
    /// no connection state is shared between URLs.
    #[instrument(skip(self))]
    pub async fn process(&self, url: &str) -> SubmissionOutcome {
        let client = match build_session() {
            Ok(client) => client,
            Err(e) => {
                error!(url = %url, error = %e, "failed to open HTTP session");
                return SubmissionOutcome::PermanentFailure;
            }
        };

        let prober = GitProber::new(&client, &self.config);
        match prober.probe(url).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(url = %url, "not a reachable git repository");
                return SubmissionOutcome::InvalidRepository;
            }
            Err(e) => {
                warn!(url = %url, error = %e, "rejected before probing");
                return SubmissionOutcome::InvalidRepository;
            }
        }

        let submitter = ArchiveSubmitter::new(&client, &self.token, &self.config);
        match submitter.submit(url).await {
            Ok(SubmitAck::Accepted {
                rate_limited: false,
                ..
            }) => SubmissionOutcome::Submitted,
            Ok(SubmitAck::Accepted {
                rate_limited: true, ..
            }) => SubmissionOutcome::RateLimitedThenSubmitted,
            Ok(SubmitAck::GaveUp) => SubmissionOutcome::PermanentFailure,
            Err(e) => {
                error!(url = %url, error = %e, "submission failed");
                SubmissionOutcome::PermanentFailure
            }
        }
    }
}
