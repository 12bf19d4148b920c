//! Rate-limited HTTP fetching with bounded exponential backoff.
//!
//! Every request goes through one [`Fetcher`] so the whole run presents a single
//! client identity. Failures come back as [`FetchError`], and callers decide
//! what to do from [`FetchError::kind`] instead of reading error messages.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::HttpConfig;

/// How a failure should be treated by the unit of work that saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Worth another attempt: connect errors, timeouts, 5xx.
    Transient,
    /// The source is pushing back or unreachable; stop the current batch.
    RateLimited,
    /// Will not succeed on retry.
    Permanent,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("timeout fetching {url}")]
    Timeout { url: String },

    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("could not decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    #[error("browser error on {url}: {reason}")]
    Browser {
        url: String,
        reason: String,
        kind: FailureKind,
    },
}

impl FetchError {
    fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            Self::Timeout { url: url.to_string() }
        } else {
            Self::Network {
                url: url.to_string(),
                source,
            }
        }
    }

    pub fn browser(url: impl Into<String>, kind: FailureKind, reason: impl std::fmt::Display) -> Self {
        Self::Browser {
            url: url.into(),
            reason: reason.to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => FailureKind::Transient,
            Self::HttpStatus { status, .. } => match *status {
                429 => FailureKind::RateLimited,
                408 | 500..=599 => FailureKind::Transient,
                _ => FailureKind::Permanent,
            },
            Self::Decode { .. } => FailureKind::Permanent,
            // Exhausting retries on anything recoverable means the source is refusing us.
            Self::RetriesExhausted { last, .. } => match last.kind() {
                FailureKind::Permanent => FailureKind::Permanent,
                _ => FailureKind::RateLimited,
            },
            Self::Browser { kind, .. } => *kind,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind() == FailureKind::RateLimited
    }
}

/// Wait before the attempt following failed attempt `attempt` (0-based).
pub fn backoff_delay(attempt: u32, unit: Duration) -> Duration {
    unit.saturating_mul(2u32.saturating_pow(attempt))
}

/// Run `op` up to `attempts` times (at least once), sleeping
/// [`backoff_delay`] after each failure but the last.
pub async fn with_backoff<T, F, Fut>(url: &str, attempts: u32, unit: Duration, mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                attempt += 1;
                if attempt >= attempts {
                    warn!("❌ Giving up on {} after {} attempts: {}", url, attempts, e);
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts,
                        last: Box::new(e),
                    });
                }
                let wait = backoff_delay(attempt - 1, unit);
                warn!("🔄 Attempt {}/{} for {} failed ({}), retrying in {:?}", attempt, attempts, url, e, wait);
                sleep(wait).await;
            }
        }
    }
}

pub struct Fetcher {
    client: reqwest::Client,
    config: HttpConfig,
}

impl Fetcher {
    pub fn new(config: HttpConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,application/json;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .timeout(config.timeout)
            .build()?;

        Ok(Self { client, config })
    }

    /// Sleep the courtesy delay, then fetch `url` with retries and return the body.
    ///
    /// `delay` overrides the configured request delay for this call only.
    pub async fn fetch(&self, url: &str, delay: Option<Duration>) -> Result<String, FetchError> {
        sleep(delay.unwrap_or(self.config.request_delay)).await;
        with_backoff(url, self.config.max_retries, self.config.backoff_unit, || self.attempt(url)).await
    }

    /// [`Fetcher::fetch`] followed by JSON decoding. Decode failures are not retried.
    pub async fn fetch_json<T: DeserializeOwned>(&self, url: &str, delay: Option<Duration>) -> Result<T, FetchError> {
        let body = self.fetch(url, delay).await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| FetchError::from_reqwest(url, e))?;
        debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(body)
    }
}
