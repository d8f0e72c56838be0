//! Download and caching of the package index.
//!
//! The index is large (tens of MiB), so it is cached on disk and only
//! redownloaded when the cached size no longer matches the remote
//! `Content-Length` or a refresh is forced. Downloads stream chunk-wise to
//! the cache file behind a progress bar.

use std::path::PathBuf;

use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use reqwest::header::CONTENT_LENGTH;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use super::model::PackageIndex;

/// Default package index URL.
pub const DEFAULT_INDEX_URL: &str = "https://f-droid.org/repo/index-v2.json";

/// Errors that can occur acquiring the package index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Network-level error fetching the index.
    #[error("network error fetching index from {url}: {source}")]
    Network {
        /// The index URL.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The index server answered with a non-success status.
    #[error("HTTP {status} fetching index from {url}")]
    Http {
        /// The index URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error on the index cache.
    #[error("IO error on index cache {path}: {source}")]
    Io {
        /// The cache file path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cached or downloaded document could not be parsed.
    #[error("failed to parse index document: {source}")]
    Parse {
        /// The underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}

impl IndexError {
    fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    fn http(url: impl Into<String>, status: u16) -> Self {
        Self::Http {
            url: url.into(),
            status,
        }
    }

    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    fn parse(source: serde_json::Error) -> Self {
        Self::Parse { source }
    }
}

/// Where the package index lives remotely and on disk.
#[derive(Debug, Clone)]
pub struct IndexSource {
    /// Remote index URL.
    pub url: String,
    /// Local cache file path.
    pub cache_path: PathBuf,
}

impl IndexSource {
    /// Creates an index source.
    #[must_use]
    pub fn new(url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            cache_path: cache_path.into(),
        }
    }
}

impl Default for IndexSource {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_URL, "index-v2.json")
    }
}

/// Loads the package index, downloading when the cache is missing or stale.
///
/// Staleness is judged by comparing the cached file size against the
/// `Content-Length` advertised by a `HEAD` request; `refresh` forces a
/// download. A failed `HEAD` falls back to an existing cache with a warning.
///
/// # Errors
///
/// Returns [`IndexError`] when the download fails, the cache cannot be read
/// or written, or the document cannot be parsed.
#[instrument(skip(client, source), fields(url = %source.url))]
pub async fn load_or_fetch(
    client: &Client,
    source: &IndexSource,
    refresh: bool,
) -> Result<PackageIndex, IndexError> {
    let cached_size = tokio::fs::metadata(&source.cache_path)
        .await
        .map(|meta| meta.len())
        .ok();

    let use_cache = !refresh
        && match cached_size {
            None => false,
            Some(size) => match remote_content_length(client, &source.url).await {
                Some(remote) => {
                    let current = remote == size;
                    debug!(cached = size, remote, current, "index freshness check");
                    current
                }
                None => {
                    warn!(url = %source.url, "index HEAD failed; using cached copy");
                    true
                }
            },
        };

    if !use_cache {
        download_index(client, source).await?;
    }

    let data = tokio::fs::read(&source.cache_path)
        .await
        .map_err(|e| IndexError::io(&source.cache_path, e))?;
    let index = PackageIndex::from_slice(&data).map_err(IndexError::parse)?;
    info!(packages = index.packages.len(), "package index loaded");
    Ok(index)
}

/// Fetches the remote index size from a `HEAD` request's `Content-Length`.
async fn remote_content_length(client: &Client, url: &str) -> Option<u64> {
    let response = client.head(url).send().await.ok()?;
    if !response.status().is_success() {
        warn!(url = %url, status = response.status().as_u16(), "index HEAD status not OK");
        return None;
    }
    response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Downloads the index to the cache path, streaming behind a progress bar.
async fn download_index(client: &Client, source: &IndexSource) -> Result<(), IndexError> {
    info!(url = %source.url, "downloading package index");

    let response = client
        .get(&source.url)
        .send()
        .await
        .map_err(|e| IndexError::network(&source.url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IndexError::http(&source.url, status.as_u16()));
    }

    let result = stream_to_cache(response, source).await;

    if result.is_err() {
        // Don't leave a partial cache behind; a truncated file would pass
        // the size check only by coincidence, but parsing it never will.
        debug!(path = %source.cache_path.display(), "removing partial index cache after error");
        let _ = tokio::fs::remove_file(&source.cache_path).await;
    }

    result
}

/// Streams the response body to the cache file, reporting progress.
async fn stream_to_cache(response: reqwest::Response, source: &IndexSource) -> Result<(), IndexError> {
    let progress = match response.content_length() {
        Some(total) => ProgressBar::new(total),
        None => ProgressBar::new_spinner(),
    };
    if let Ok(style) = ProgressStyle::with_template("{bytes}/{total_bytes} {wide_bar} {bytes_per_sec}")
    {
        progress.set_style(style);
    }

    let mut file = tokio::fs::File::create(&source.cache_path)
        .await
        .map_err(|e| IndexError::io(&source.cache_path, e))?;

    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| IndexError::network(&source.url, e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| IndexError::io(&source.cache_path, e))?;
        bytes_written += chunk.len() as u64;
        progress.inc(chunk.len() as u64);
    }

    file.flush()
        .await
        .map_err(|e| IndexError::io(&source.cache_path, e))?;
    progress.finish_and_clear();

    info!(
        path = %source.cache_path.display(),
        bytes = bytes_written,
        "index cached"
    );
    Ok(())
}
