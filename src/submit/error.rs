//! Error types for the submission pipeline.
//!
//! Variants carry the URL they concern so per-URL failures can be logged
//! with full context before the orchestrator converts them to outcomes.

use thiserror::Error;

/// Errors that can occur while probing or submitting a repository URL.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The input was rejected before any network activity.
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Why the input was rejected.
        reason: String,
    },

    /// HTTP session construction failed.
    #[error("failed to construct HTTP session: {source}")]
    Session {
        /// The underlying client builder error.
        #[source]
        source: reqwest::Error,
    },

    /// Network-level error (DNS resolution, connection refused, TLS, etc.)
    #[error("network error requesting {url}: {source}")]
    Network {
        /// The URL being requested.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// The archival service answered with a status that is neither 200 nor 429.
    #[error("unexpected HTTP {status} from archival service for {url}")]
    UnexpectedStatus {
        /// The submitted repository URL.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// The archival service answered 200 with a non-JSON content type.
    #[error("unexpected Content-Type {content_type:?} from archival service for {url}")]
    UnexpectedContentType {
        /// The submitted repository URL.
        url: String,
        /// The Content-Type header value received.
        content_type: String,
    },

    /// The archival service's JSON body could not be deserialized.
    #[error("malformed archival response for {url}: {source}")]
    MalformedResponse {
        /// The submitted repository URL.
        url: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

impl SubmitError {
    /// Creates an invalid-input error.
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates a session construction error.
    pub fn session(source: reqwest::Error) -> Self {
        Self::Session { source }
    }

    /// Creates a network error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an unexpected-status error.
    pub fn unexpected_status(url: impl Into<String>, status: u16) -> Self {
        Self::UnexpectedStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates an unexpected-content-type error.
    pub fn unexpected_content_type(
        url: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self::UnexpectedContentType {
            url: url.into(),
            content_type: content_type.into(),
        }
    }

    /// Creates a malformed-response error.
    pub fn malformed_response(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            source,
        }
    }
}

// We intentionally do NOT implement `From<reqwest::Error>`: the variants
// require the URL context that the source error does not provide, so the
// helper constructors are the supported construction path.
