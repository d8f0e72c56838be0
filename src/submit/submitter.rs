//! Rate-limit-aware submission to the Software Heritage save API.
//!
//! Transport errors are retried a bounded number of times with a fixed
//! delay and degrade to an explicit [`SubmitAck::GaveUp`]. HTTP 429 is a
//! scheduling signal, not an error: the submitter sleeps until the
//! advertised reset time plus a pad and retries the identical request,
//! unbounded in count and without counting against the transport retries.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, instrument, warn};

use super::config::ArchiveConfig;
use super::error::SubmitError;
use super::normalize_repo_url;
use super::outcome::{SaveReceipt, SubmitAck};

/// Header carrying the Unix timestamp at which the rate-limit window resets.
const RATELIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Header advertising the remaining rate-limit quota.
const RATELIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Submits repository URLs to the archival save API.
#[derive(Debug)]
pub struct ArchiveSubmitter<'a> {
    client: &'a Client,
    token: &'a str,
    config: &'a ArchiveConfig,
}

impl<'a> ArchiveSubmitter<'a> {
    /// Creates a submitter over the given session and bearer token.
    #[must_use]
    pub fn new(client: &'a Client, token: &'a str, config: &'a ArchiveConfig) -> Self {
        Self {
            client,
            token,
            config,
        }
    }

    /// Posts `url` to the archival save endpoint.
    ///
    /// Returns [`SubmitAck::Accepted`] on a 200/JSON acknowledgment and
    /// [`SubmitAck::GaveUp`] after exhausting transport retries. The save
    /// task is not polled to completion; acknowledgment is the unit of
    /// success.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::UnexpectedStatus`] for any status other than
    /// 200 or 429, [`SubmitError::UnexpectedContentType`] for a 200 whose
    /// body is not `application/json`, and [`SubmitError::MalformedResponse`]
    /// when the JSON body cannot be decoded.
    #[instrument(skip(self))]
    pub async fn submit(&self, url: &str) -> Result<SubmitAck, SubmitError> {
        let url = normalize_repo_url(url);
        let save_url = format!("{}/api/1/origin/save/git/url/{url}", self.config.api_base);

        let mut transport_failures = 0u32;
        let mut rate_limited = false;

        let response = loop {
            let response = match self
                .client
                .post(&save_url)
                .bearer_auth(self.token)
                .send()
                .await
            {
                Ok(response) => response,
                Err(error) => {
                    transport_failures += 1;
                    if transport_failures >= self.config.submit_attempts {
                        warn!(
                            url = %url,
                            attempts = transport_failures,
                            "giving up after repeated transport errors"
                        );
                        return Ok(SubmitAck::GaveUp);
                    }
                    warn!(
                        url = %url,
                        attempt = transport_failures,
                        error = %error,
                        "submission transport error"
                    );
                    tokio::time::sleep(self.config.retry_delay).await;
                    continue;
                }
            };

            if let Some(remaining) = header_str(&response, RATELIMIT_REMAINING_HEADER) {
                info!(url = %url, remaining = %remaining, "rate-limit quota");
            }

            if response.status().as_u16() == 429 {
                rate_limited = true;
                let reset = header_str(&response, RATELIMIT_RESET_HEADER)
                    .and_then(|value| value.parse::<u64>().ok());
                let wait = ratelimit_wait(reset, unix_now(), self.config.ratelimit_pad);
                warn!(url = %url, wait_secs = wait.as_secs(), "rate limited; sleeping until reset");
                tokio::time::sleep(wait).await;
                continue;
            }

            break response;
        };

        let status = response.status().as_u16();
        if status != 200 {
            return Err(SubmitError::unexpected_status(&url, status));
        }

        let content_type = header_str(&response, CONTENT_TYPE.as_str())
            .unwrap_or("")
            .to_string();
        if content_type != "application/json" {
            return Err(SubmitError::unexpected_content_type(&url, content_type));
        }

        let receipt: SaveReceipt = response
            .json()
            .await
            .map_err(|source| SubmitError::malformed_response(&url, source))?;

        info!(
            url = %url,
            save_task_status = %receipt.save_task_status,
            save_request_status = %receipt.save_request_status,
            request_url = %receipt.request_url,
            "save request acknowledged"
        );

        Ok(SubmitAck::Accepted {
            receipt,
            rate_limited,
        })
    }
}

/// Computes the sleep before retrying a rate-limited request.
///
/// The server advertises the reset as a Unix timestamp; the wait is the
/// time remaining until that instant plus a fixed pad. A missing or
/// already-passed reset degrades to the pad alone.
#[must_use]
fn ratelimit_wait(reset: Option<u64>, now: u64, pad: Duration) -> Duration {
    let until_reset = reset.unwrap_or(now).saturating_sub(now);
    Duration::from_secs(until_reset) + pad
}

fn header_str<'r>(response: &'r reqwest::Response, name: &str) -> Option<&'r str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use wiremock::matchers::{header, method, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAVE_PATH: &str = "^/api/1/origin/save/git/url/";

    fn test_config(api_base: &str) -> ArchiveConfig {
        ArchiveConfig {
            retry_delay: Duration::ZERO,
            ratelimit_pad: Duration::ZERO,
            ..ArchiveConfig::default().with_api_base(api_base)
        }
    }

    fn receipt_body() -> serde_json::Value {
        serde_json::json!({
            "save_task_status": "pending",
            "save_request_status": "accepted",
            "request_url": "https://archive.softwareheritage.org/api/1/origin/save/42/"
        })
    }

    fn closed_port_base() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}")
    }

    // ==================== Acknowledgment Tests ====================

    #[tokio::test]
    async fn test_submit_success_returns_receipt() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(receipt_body()))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "test-token", &config);

        let ack = submitter.submit("https://example.com/repo").await.unwrap();
        match ack {
            SubmitAck::Accepted {
                receipt,
                rate_limited,
            } => {
                assert!(!rate_limited);
                assert_eq!(receipt.save_task_status, "pending");
                assert_eq!(receipt.save_request_status, "accepted");
                assert!(receipt.request_url.contains("/save/42/"));
            }
            SubmitAck::GaveUp => panic!("expected Accepted, got GaveUp"),
        }
    }

    #[tokio::test]
    async fn test_submit_appends_trailing_slash_to_save_path() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(receipt_body()))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        submitter.submit("https://example.com/repo").await.unwrap();

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].url.path(),
            "/api/1/origin/save/git/url/https://example.com/repo/",
            "submitted URL must be normalized with a trailing slash"
        );
    }

    // ==================== Protocol Violation Tests ====================

    #[tokio::test]
    async fn test_submit_non_200_is_unexpected_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        let result = submitter.submit("https://example.com/repo").await;
        match result {
            Err(SubmitError::UnexpectedStatus { status, .. }) => assert_eq!(status, 403),
            other => panic!("expected UnexpectedStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_non_json_content_type_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/html")
                    .set_body_bytes(b"<html>rate limit page</html>"),
            )
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        let result = submitter.submit("https://example.com/repo").await;
        match result {
            Err(SubmitError::UnexpectedContentType { content_type, .. }) => {
                assert_eq!(content_type, "text/html");
            }
            other => panic!("expected UnexpectedContentType, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_submit_content_type_match_is_exact() {
        let mock_server = MockServer::start().await;

        // A charset suffix is not the advertised acknowledgment content type.
        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(
                    serde_json::to_vec(&receipt_body()).unwrap(),
                    "application/json; charset=utf-8",
                ),
            )
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        let result = submitter.submit("https://example.com/repo").await;
        assert!(matches!(
            result,
            Err(SubmitError::UnexpectedContentType { .. })
        ));
    }

    // ==================== Rate Limit Tests ====================

    #[tokio::test]
    async fn test_submit_retries_after_rate_limit() {
        let mock_server = MockServer::start().await;

        // First response: 429 with an already-passed reset. Second: 200.
        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header(RATELIMIT_RESET_HEADER, "0")
                    .insert_header(RATELIMIT_REMAINING_HEADER, "0"),
            )
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path_regex(SAVE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(receipt_body()))
            .expect(1)
            .with_priority(2)
            .mount(&mock_server)
            .await;

        let client = Client::new();
        let config = test_config(&mock_server.uri());
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        let ack = submitter.submit("https://example.com/repo").await.unwrap();
        match ack {
            SubmitAck::Accepted { rate_limited, .. } => {
                assert!(rate_limited, "429 wait must be reflected in the ack");
            }
            SubmitAck::GaveUp => panic!("expected Accepted after rate-limit retry"),
        }

        let requests = mock_server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2, "exactly one retry after the 429");
    }

    #[test]
    fn test_ratelimit_wait_is_reset_minus_now_plus_pad() {
        let now = 1_700_000_000;
        let wait = ratelimit_wait(Some(now + 5), now, Duration::from_secs(10));
        assert_eq!(wait, Duration::from_secs(15));
    }

    #[test]
    fn test_ratelimit_wait_clamps_past_reset_to_pad() {
        let now = 1_700_000_000;
        let wait = ratelimit_wait(Some(now - 120), now, Duration::from_secs(10));
        assert_eq!(wait, Duration::from_secs(10));
    }

    #[test]
    fn test_ratelimit_wait_missing_header_is_pad() {
        let wait = ratelimit_wait(None, 1_700_000_000, Duration::from_secs(10));
        assert_eq!(wait, Duration::from_secs(10));
    }

    // ==================== Transport Retry Tests ====================

    #[tokio::test]
    async fn test_submit_gives_up_after_transport_exhaustion() {
        let client = Client::new();
        let config = ArchiveConfig {
            submit_attempts: 3,
            retry_delay: Duration::ZERO,
            ..ArchiveConfig::default().with_api_base(closed_port_base())
        };
        let submitter = ArchiveSubmitter::new(&client, "t", &config);

        let result = submitter.submit("https://example.com/repo").await;
        assert!(
            matches!(result, Ok(SubmitAck::GaveUp)),
            "transport exhaustion must soft-fail, got {result:?}"
        );
    }
}
