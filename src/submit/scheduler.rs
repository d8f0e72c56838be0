//! Bounded-concurrency scheduling of submissions with durable progress.
//!
//! The scheduler drives a worklist of repository URLs through the
//! orchestrator. Admission is semaphore-gated: a new task starts as soon as
//! any slot frees, rather than waiting for a whole batch to drain. A fixed
//! dispatch delay throttles task starts independently of slot availability.
//!
//! The scheduler is the progress ledger's only writer. Successful URLs
//! accumulate in a pending buffer that is flushed to the ledger whenever it
//! reaches the concurrency limit, and once more after the final join.
//! Failures and invalid repositories are never persisted, so they are
//! retried on the next run.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Semaphore};
use tracing::{debug, info, instrument, warn};

use crate::ledger::{Ledger, LedgerError};

use super::config::ArchiveConfig;
use super::normalize_repo_url;
use super::orchestrator::Orchestrator;
use super::outcome::SubmissionOutcome;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Error type for scheduler operations.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// No bearer token was supplied.
    #[error("missing archival service credential (pass --swh-token or set SWH_TOKEN)")]
    MissingCredential,

    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },

    /// Progress ledger operation failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Semaphore was closed unexpectedly.
    #[error("semaphore closed unexpectedly")]
    SemaphoreClosed,
}

/// Statistics from one scheduler run.
///
/// Uses atomic counters for thread-safe updates from concurrent tasks.
#[derive(Debug, Default)]
pub struct RunStats {
    submitted: AtomicUsize,
    rate_limited: AtomicUsize,
    invalid: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl RunStats {
    /// Creates a new stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of acknowledged submissions (no rate-limit wait).
    #[must_use]
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }

    /// Returns the number of submissions acknowledged after a rate-limit wait.
    #[must_use]
    pub fn rate_limited(&self) -> usize {
        self.rate_limited.load(Ordering::SeqCst)
    }

    /// Returns the number of URLs classified as not being git repositories.
    #[must_use]
    pub fn invalid(&self) -> usize {
        self.invalid.load(Ordering::SeqCst)
    }

    /// Returns the number of terminal per-URL failures.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Returns the number of URLs skipped because the ledger already had them.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::SeqCst)
    }

    /// Returns the number of URLs actually processed (everything but skips).
    #[must_use]
    pub fn processed(&self) -> usize {
        self.submitted() + self.rate_limited() + self.invalid() + self.failed()
    }

    /// Returns the number of successful submissions, rate-limited or not.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.submitted() + self.rate_limited()
    }

    fn record(&self, outcome: SubmissionOutcome) {
        let counter = match outcome {
            SubmissionOutcome::Submitted => &self.submitted,
            SubmissionOutcome::RateLimitedThenSubmitted => &self.rate_limited,
            SubmissionOutcome::InvalidRepository => &self.invalid,
            SubmissionOutcome::PermanentFailure => &self.failed,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    fn increment_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Drives a worklist of repository URLs through the orchestrator with
/// bounded concurrency and idempotent progress tracking.
///
/// # Concurrency Model
///
/// - Each submission runs in its own Tokio task
/// - A semaphore permit is acquired before starting each task; new work is
///   admitted as soon as any permit frees
/// - A fixed delay precedes every dispatch, throttling start rate
/// - Rate-limit waits happen inside individual tasks and do not block
///   siblings
///
/// # Progress Ledger
///
/// The ledger is loaded once at construction. URLs already known are never
/// dispatched. Only successful submissions are appended, with a
/// re-read-before-write pass so lines written by an external process since
/// the load are not duplicated.
#[derive(Debug)]
pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    semaphore: Arc<Semaphore>,
    config: ArchiveConfig,
    ledger: Ledger,
}

impl Scheduler {
    /// Creates a scheduler around a loaded progress ledger.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::MissingCredential`] when `token` is empty
    /// (checked here, before any network activity) and
    /// [`SchedulerError::InvalidConcurrency`] when the configured
    /// concurrency is outside 1-100.
    pub fn new(
        token: &str,
        config: ArchiveConfig,
        ledger: Ledger,
    ) -> Result<Self, SchedulerError> {
        if token.trim().is_empty() {
            return Err(SchedulerError::MissingCredential);
        }
        let concurrency = config.concurrency;
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(SchedulerError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            dispatch_delay_ms = config.dispatch_delay.as_millis(),
            api_base = %config.api_base,
            "creating scheduler"
        );

        Ok(Self {
            orchestrator: Arc::new(Orchestrator::new(token, config.clone())),
            semaphore: Arc::new(Semaphore::new(concurrency)),
            config,
            ledger,
        })
    }

    /// Returns the progress ledger.
    #[must_use]
    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Processes every worklist URL not already recorded in the ledger.
    ///
    /// Worklist iteration order is unspecified. Individual failures never
    /// abort the run; they are counted in the returned stats and retried on
    /// the next invocation.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Ledger`] when the ledger cannot be read or
    /// appended, and [`SchedulerError::SemaphoreClosed`] if the semaphore is
    /// closed.
    #[instrument(skip(self, worklist), fields(worklist = worklist.len()))]
    pub async fn run(&mut self, worklist: &HashSet<String>) -> Result<RunStats, SchedulerError> {
        let stats = Arc::new(RunStats::new());
        // Successful URLs awaiting a ledger flush.
        let pending: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let mut handles = Vec::new();

        info!(
            worklist = worklist.len(),
            known = self.ledger.len(),
            "starting submission run"
        );

        for url in worklist {
            let normalized = normalize_repo_url(url);
            if self.ledger.contains(&normalized) {
                info!(url = %url, "already archived; skipping");
                stats.increment_skipped();
                continue;
            }

            // Fixed dispatch throttle, independent of slot availability.
            tokio::time::sleep(self.config.dispatch_delay).await;

            // Acquire a permit (blocks while all slots are busy).
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| SchedulerError::SemaphoreClosed)?;

            let orchestrator = Arc::clone(&self.orchestrator);
            let task_stats = Arc::clone(&stats);
            let task_pending = Arc::clone(&pending);
            let url = url.clone();

            handles.push(tokio::spawn(async move {
                // Permit is dropped when this block exits (RAII)
                let _permit = permit;

                let outcome = orchestrator.process(&url).await;
                debug!(url = %url, outcome = %outcome, "submission finished");
                task_stats.record(outcome);
                if outcome.is_success() {
                    task_pending.lock().await.push(normalized);
                }
            }));

            self.flush_pending(&pending, false).await?;
        }

        debug!(
            task_count = handles.len(),
            "waiting for in-flight submissions"
        );

        for handle in handles {
            // Task panics are logged but don't fail the run
            if let Err(e) = handle.await {
                warn!(error = %e, "submission task panicked");
            }
        }

        self.flush_pending(&pending, true).await?;

        info!(
            submitted = stats.submitted(),
            rate_limited = stats.rate_limited(),
            invalid = stats.invalid(),
            failed = stats.failed(),
            skipped = stats.skipped(),
            "submission run complete"
        );

        // All tasks are joined, so we should hold the only Arc. If not,
        // rebuild the stats from the atomic values.
        match Arc::try_unwrap(stats) {
            Ok(stats) => Ok(stats),
            Err(arc_stats) => {
                let new_stats = RunStats::new();
                new_stats
                    .submitted
                    .store(arc_stats.submitted(), Ordering::SeqCst);
                new_stats
                    .rate_limited
                    .store(arc_stats.rate_limited(), Ordering::SeqCst);
                new_stats
                    .invalid
                    .store(arc_stats.invalid(), Ordering::SeqCst);
                new_stats.failed.store(arc_stats.failed(), Ordering::SeqCst);
                new_stats
                    .skipped
                    .store(arc_stats.skipped(), Ordering::SeqCst);
                Ok(new_stats)
            }
        }
    }

    /// Flushes buffered successes to the ledger.
    ///
    /// During dispatch the buffer is only flushed once it reaches the
    /// concurrency limit; `force` drains whatever remains after the final
    /// join.
    async fn flush_pending(
        &mut self,
        pending: &Mutex<Vec<String>>,
        force: bool,
    ) -> Result<(), SchedulerError> {
        let drained = {
            let mut guard = pending.lock().await;
            if guard.is_empty() || (!force && guard.len() < self.config.concurrency) {
                return Ok(());
            }
            std::mem::take(&mut *guard)
        };

        let appended = self.ledger.record(&drained).await?;
        debug!(flushed = drained.len(), appended, "ledger flush");
        Ok(())
    }
}
