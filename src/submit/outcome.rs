//! Per-URL submission classification.
//!
//! The orchestrator returns an explicit [`SubmissionOutcome`] for every URL
//! so callers and tests can assert on classification instead of inferring it
//! from logs.

use std::fmt;

use serde::Deserialize;

/// Terminal classification of one repository URL's submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The archival service acknowledged the save request.
    Submitted,

    /// Acknowledged after at least one rate-limit wait.
    RateLimitedThenSubmitted,

    /// The URL does not behave like a reachable git repository; nothing
    /// was submitted.
    InvalidRepository,

    /// Submission failed terminally for this run. The URL is not persisted
    /// and will be retried on the next run.
    PermanentFailure,
}

impl SubmissionOutcome {
    /// Returns true when the archival service acknowledged the submission.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Submitted | Self::RateLimitedThenSubmitted)
    }

    /// Returns the log representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::RateLimitedThenSubmitted => "rate-limited-then-submitted",
            Self::InvalidRepository => "invalid-repository",
            Self::PermanentFailure => "permanent-failure",
        }
    }
}

impl fmt::Display for SubmissionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Acknowledgment from the archival save API.
#[derive(Debug, Clone)]
pub enum SubmitAck {
    /// HTTP 200 with a JSON receipt.
    Accepted {
        /// Parsed response body.
        receipt: SaveReceipt,
        /// Whether at least one 429 wait preceded the acknowledgment.
        rate_limited: bool,
    },

    /// Transport retries were exhausted without reaching the service.
    /// Deliberate soft-fail: not an error, not a success.
    GaveUp,
}

/// Body of a successful save request.
///
/// Consumed for logging only; the pipeline does not poll `request_url` for
/// task completion. Acknowledgment is the unit of success.
#[derive(Debug, Clone, Deserialize)]
pub struct SaveReceipt {
    /// Archival task status (e.g. "not created", "pending", "succeeded").
    pub save_task_status: String,
    /// Save request status (e.g. "accepted", "rejected", "pending").
    pub save_request_status: String,
    /// URL for polling the save request, were polling ever added.
    pub request_url: String,
}
