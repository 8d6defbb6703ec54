// src/services/fetcher.rs

//! Rate-limited, retrying document fetcher.
//!
//! Every attempt is preceded by the configured request delay. Status 202
//! ("request queued, try again") waits the short processing backoff, 400 is
//! final, anything else that is not 200 (and transport failures) waits the
//! long error backoff. After `max_retries` retries the URL is abandoned.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Status code and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport underneath the fetcher: one GET, no retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue a GET. `Err` means the exchange itself failed (connect, read).
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(RawResponse::new(status, body.to_vec()))
    }
}

/// Pacing and retry limits for the fetcher.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub request_delay: Duration,
    pub processing_backoff: Duration,
    pub error_backoff: Duration,
    pub max_retries: u32,
}

impl RetryPolicy {
    /// A policy that never waits; for tests and dry runs.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            request_delay: Duration::ZERO,
            processing_backoff: Duration::ZERO,
            error_backoff: Duration::ZERO,
            max_retries,
        }
    }
}

impl From<&CrawlerConfig> for RetryPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            request_delay: config.request_delay(),
            processing_backoff: config.processing_backoff(),
            error_backoff: config.error_backoff(),
            max_retries: config.max_retries,
        }
    }
}

/// What to do after one attempt.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 200: hand the body to the caller
    Done(Vec<u8>),
    /// Wait `backoff` and try the same URL again
    Retry { backoff: Duration, reason: String },
    /// 400: give up without retrying
    Abort,
}

impl RetryPolicy {
    /// Classify a transport result.
    pub fn classify(&self, result: Result<RawResponse>) -> AttemptOutcome {
        match result {
            Ok(response) => match response.status {
                200 => AttemptOutcome::Done(response.body),
                202 => AttemptOutcome::Retry {
                    backoff: self.processing_backoff,
                    reason: "received 202, request queued upstream".to_string(),
                },
                400 => AttemptOutcome::Abort,
                status => AttemptOutcome::Retry {
                    backoff: self.error_backoff,
                    reason: format!("server error {status}"),
                },
            },
            Err(e) => AttemptOutcome::Retry {
                backoff: self.error_backoff,
                reason: format!("transport error: {e}"),
            },
        }
    }
}

/// Fetches documents one at a time with pacing and retries.
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch `url`, retrying per the policy.
    ///
    /// Returns `AppError::Rejected` on 400 and `AppError::RetriesExhausted`
    /// once the retry budget is spent. Neither touches any crawl state.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let mut retries = 0u32;

        loop {
            pause(self.policy.request_delay).await;

            match self.policy.classify(self.transport.get(url).await) {
                AttemptOutcome::Done(body) => {
                    log::debug!("Fetched {} ({} bytes)", url, body.len());
                    return Ok(body);
                }
                AttemptOutcome::Abort => {
                    log::warn!("Received 400 for {}, aborting", url);
                    return Err(AppError::Rejected {
                        url: url.to_string(),
                    });
                }
                AttemptOutcome::Retry { backoff, reason } => {
                    if retries >= self.policy.max_retries {
                        log::error!(
                            "Gave up on {} after {} attempts ({})",
                            url,
                            retries + 1,
                            reason
                        );
                        return Err(AppError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: retries + 1,
                        });
                    }
                    retries += 1;
                    log::warn!(
                        "{} for {}, retry {}/{} in {:?}",
                        reason,
                        url,
                        retries,
                        self.policy.max_retries,
                        backoff
                    );
                    pause(backoff).await;
                }
            }
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            request_delay: Duration::from_secs(5),
            processing_backoff: Duration::from_secs(5),
            error_backoff: Duration::from_secs(30),
            max_retries: 3,
        }
    }

    #[test]
    fn test_classify_ladder() {
        let p = policy();

        assert!(matches!(
            p.classify(Ok(RawResponse::new(200, "ok"))),
            AttemptOutcome::Done(body) if body == b"ok"
        ));
        assert!(matches!(
            p.classify(Ok(RawResponse::new(202, ""))),
            AttemptOutcome::Retry { backoff, .. } if backoff == Duration::from_secs(5)
        ));
        assert!(matches!(
            p.classify(Ok(RawResponse::new(400, ""))),
            AttemptOutcome::Abort
        ));
        for status in [429, 500, 503, 404] {
            assert!(matches!(
                p.classify(Ok(RawResponse::new(status, ""))),
                AttemptOutcome::Retry { backoff, .. } if backoff == Duration::from_secs(30)
            ));
        }
        assert!(matches!(
            p.classify(Err(AppError::Io(std::io::ErrorKind::ConnectionReset.into()))),
            AttemptOutcome::Retry { backoff, .. } if backoff == Duration::from_secs(30)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_202_retries_after_short_backoff() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("http://x/a", RawResponse::new(202, ""));
        transport.push("http://x/a", RawResponse::new(200, "<a/>"));
        let fetcher = Fetcher::new(transport.clone(), policy());

        let start = tokio::time::Instant::now();
        let body = fetcher.fetch("http://x/a").await.unwrap();

        assert_eq!(body, b"<a/>");
        assert_eq!(transport.request_count("http://x/a"), 2);
        // two request delays plus one processing backoff
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_retries_after_long_backoff() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("http://x/a", RawResponse::new(503, ""));
        transport.push("http://x/a", RawResponse::new(200, "<a/>"));
        let fetcher = Fetcher::new(transport.clone(), policy());

        let start = tokio::time::Instant::now();
        fetcher.fetch("http://x/a").await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(40));
    }

    #[tokio::test]
    async fn test_400_never_retries() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push("http://x/a", RawResponse::new(400, ""));
        transport.push("http://x/a", RawResponse::new(200, "<a/>"));
        let fetcher = Fetcher::new(transport.clone(), RetryPolicy::immediate(5));

        let err = fetcher.fetch("http://x/a").await.unwrap_err();

        assert!(matches!(err, AppError::Rejected { .. }));
        assert_eq!(transport.request_count("http://x/a"), 1);
    }

    #[tokio::test]
    async fn test_retry_budget_exhausted() {
        let transport = Arc::new(ScriptedTransport::new());
        let fetcher = Fetcher::new(transport.clone(), RetryPolicy::immediate(3));

        // unscripted URLs answer 500 forever
        let err = fetcher.fetch("http://x/missing").await.unwrap_err();

        assert!(matches!(
            err,
            AppError::RetriesExhausted { attempts: 4, .. }
        ));
        assert_eq!(transport.request_count("http://x/missing"), 4);
    }

    #[tokio::test]
    async fn test_transport_failure_is_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_failure("http://x/a");
        transport.push("http://x/a", RawResponse::new(200, "<a/>"));
        let fetcher = Fetcher::new(transport.clone(), RetryPolicy::immediate(2));

        assert_eq!(fetcher.fetch("http://x/a").await.unwrap(), b"<a/>");
        assert_eq!(transport.request_count("http://x/a"), 2);
    }
}
