//! Durable record of successfully submitted repository URLs.
//!
//! The ledger is a plain text file, one URL per line, append-only. The
//! scheduler is its only writer; the file is nevertheless re-read
//! immediately before each append so lines written by an external process
//! since the last read are not duplicated. No locking beyond that.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Errors that can occur reading or writing the progress ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// File system error on the ledger file.
    #[error("ledger IO error at {path}: {source}")]
    Io {
        /// The ledger file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Set of repository URLs known to have been submitted successfully.
///
/// Only successes are ever recorded; failed and invalid URLs are retried on
/// every subsequent run (no permanent blacklist).
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    known: HashSet<String>,
}

impl Ledger {
    /// Loads the ledger from `path`; a missing file yields an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] for any failure other than the file not
    /// existing.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let known = read_lines(&path).await?;
        debug!(path = %path.display(), known = known.len(), "ledger loaded");
        Ok(Self { path, known })
    }

    /// Returns whether `url` is already recorded.
    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.known.contains(url)
    }

    /// Returns the number of recorded URLs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Returns whether the ledger has no recorded URLs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends the URLs not yet present, one per line.
    ///
    /// The file is re-read first so entries appended externally since the
    /// last read are merged instead of duplicated. Returns how many lines
    /// were actually appended.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] when the file cannot be read or written.
    #[instrument(skip(self, urls), fields(path = %self.path.display()))]
    pub async fn record(&mut self, urls: &[String]) -> Result<usize, LedgerError> {
        if urls.is_empty() {
            return Ok(0);
        }

        // Merge lines written since the last read before deciding what is new.
        self.known.extend(read_lines(&self.path).await?);

        let mut fresh = Vec::new();
        for url in urls {
            if self.known.insert(url.clone()) {
                fresh.push(url.as_str());
            }
        }
        if fresh.is_empty() {
            return Ok(0);
        }

        let mut block = fresh.join("\n");
        block.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;
        file.write_all(block.as_bytes())
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;

        info!(appended = fresh.len(), total = self.known.len(), "ledger updated");
        Ok(fresh.len())
    }
}

/// Reads the ledger file into a set of trimmed, non-empty lines.
async fn read_lines(path: &Path) -> Result<HashSet<String>, LedgerError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(ToString::to_string)
            .collect()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(LedgerError::io(path, e)),
    }
}
