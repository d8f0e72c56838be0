//! Configuration for the submission pipeline.
//!
//! All tunables live in [`ArchiveConfig`], constructed once and passed down
//! to the scheduler; there is no module-level process state. Tests shrink
//! the delays and point `api_base` at a mock server.

use std::time::Duration;

/// Default Software Heritage API base URL.
pub const DEFAULT_API_BASE: &str = "https://archive.softwareheritage.org";

/// Default maximum concurrent submissions.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Probe attempts before a URL is treated as unreachable.
pub const DEFAULT_PROBE_ATTEMPTS: u32 = 5;

/// Submission attempts before giving up on transport errors.
pub const DEFAULT_SUBMIT_ATTEMPTS: u32 = 10;

/// Fixed delay between transport-error retries.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Pad added on top of the server-advertised rate-limit reset time.
pub const DEFAULT_RATELIMIT_PAD: Duration = Duration::from_secs(10);

/// Delay inserted before each task dispatch, regardless of slot availability.
pub const DEFAULT_DISPATCH_DELAY: Duration = Duration::from_millis(500);

/// Tunables for probing, submission, and scheduling.
///
/// No explicit per-request timeout is configured anywhere in the pipeline;
/// a hung server stalls only the task whose session it owns.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Archival service base URL (no trailing slash).
    pub api_base: String,
    /// Transport attempts for the git reachability probe.
    pub probe_attempts: u32,
    /// Transport attempts for the archival submission.
    pub submit_attempts: u32,
    /// Fixed sleep between transport-error retries.
    pub retry_delay: Duration,
    /// Extra wait added to the advertised rate-limit reset.
    pub ratelimit_pad: Duration,
    /// Maximum concurrent submissions.
    pub concurrency: usize,
    /// Throttle applied before every task dispatch.
    pub dispatch_delay: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            probe_attempts: DEFAULT_PROBE_ATTEMPTS,
            submit_attempts: DEFAULT_SUBMIT_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            ratelimit_pad: DEFAULT_RATELIMIT_PAD,
            concurrency: DEFAULT_CONCURRENCY,
            dispatch_delay: DEFAULT_DISPATCH_DELAY,
        }
    }
}

impl ArchiveConfig {
    /// Returns the config with a different concurrency limit.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Returns the config pointed at a different archival API base URL.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}
