//! Page fetching with bounded timeouts and exponential backoff.
//!
//! # Architecture
//!
//! - [`Fetch`]: capability "fetch(url) -> raw bytes or failure"
//! - [`HttpFetcher`]: `reqwest` implementation with a per-request timeout
//! - [`RetryFetch`]: decorator that adds retry logic to any [`Fetch`]
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```
//!
//! Every attempt carries the inner fetcher's timeout, so a fetch never
//! suspends indefinitely. When retries are exhausted the last
//! [`PipelineError::Transport`] is returned unchanged.

use crate::errors::PipelineError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Capability to download a page.
///
/// Runs are single-threaded, so the returned futures are not required to be `Send`.
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Fetch `url` and return the raw response body.
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, PipelineError>;
}

/// HTTP fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: StdDuration,
}

impl HttpFetcher {
    pub const USER_AGENT: &'static str = "AFL RSS Feed Generator/1.0";

    /// Build a fetcher whose requests each time out after `timeout`.
    pub fn new(timeout: StdDuration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(Self::USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, timeout })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "info", skip(self, url), fields(%url, timeout = ?self.timeout))]
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, PipelineError> {
        let t0 = Instant::now();
        let transport = |e: reqwest::Error| PipelineError::Transport {
            url: url.to_string(),
            reason: describe(&e),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?
            .error_for_status()
            .map_err(transport)?;
        let body = response.bytes().await.map_err(transport)?;

        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Fetched page"
        );
        Ok(body.to_vec())
    }
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {e}")
    } else if let Some(status) = e.status() {
        format!("HTTP {status}")
    } else {
        e.to_string()
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`Fetch`].
pub struct RetryFetch<T> {
    inner: T,
    /// Extra attempts after the first failure.
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: Fetch,
{
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(10),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> Fetch for RetryFetch<T>
where
    T: Fetch,
{
    #[instrument(level = "debug", skip(self, url), fields(%url))]
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, PipelineError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "fetch exhausted retries"
                        );
                        return Err(e);
                    }

                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1).min(16));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "fetch attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
pub mod testing {
    //! Canned-page fetcher for unit tests.

    use super::Fetch;
    use crate::errors::PipelineError;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use url::Url;

    #[derive(Debug, Default)]
    pub struct StubFetcher {
        pages: HashMap<String, Result<Vec<u8>, String>>,
        requests: Mutex<Vec<String>>,
    }

    fn key(url: &str) -> String {
        Url::parse(url)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
            self.pages.insert(key(url), Ok(body.into().into_bytes()));
            self
        }

        pub fn page_bytes(mut self, url: &str, body: Vec<u8>) -> Self {
            self.pages.insert(key(url), Ok(body));
            self
        }

        pub fn failing(mut self, url: &str, reason: &str) -> Self {
            self.pages.insert(key(url), Err(reason.to_string()));
            self
        }

        /// Every URL requested so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl Fetch for StubFetcher {
        async fn fetch(&self, url: &Url) -> Result<Vec<u8>, PipelineError> {
            self.requests.lock().unwrap().push(url.to_string());
            match self.pages.get(url.as_str()) {
                Some(Ok(body)) => Ok(body.clone()),
                Some(Err(reason)) => Err(PipelineError::Transport {
                    url: url.to_string(),
                    reason: reason.clone(),
                }),
                None => Err(PipelineError::Transport {
                    url: url.to_string(),
                    reason: "HTTP 404 Not Found".to_string(),
                }),
            }
        }
    }
}
