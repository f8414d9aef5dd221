//! Feed fetching with bounded retries.
//!
//! [`RetryingFetcher`] makes at most `1 + max_retries` attempts against a
//! [`FeedClient`], sleeping according to a [`BackoffPolicy`] between them.
//! Only network-class failures are retried; an undecodable body fails at once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, ErrorKind, Result};
use crate::models::{BackoffKind, FeedConfig};
use crate::utils::http;

/// Source of raw feed text.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Perform one GET and return the body on a success status.
    async fn get(&self, url: &str) -> Result<String>;
}

/// reqwest-backed feed client. Every request bypasses intermediary caches.
#[derive(Debug, Clone)]
pub struct HttpFeedClient {
    client: Client,
}

impl HttpFeedClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from feed settings.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Ok(Self::new(http::create_async_client(config)?))
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn get(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .headers(http::no_cache_headers())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| AppError::parse(format!("feed body is not UTF-8: {}", e)))
    }
}

/// Delay before a given retry.
pub trait BackoffPolicy: Send + Sync {
    /// Delay before retry number `retry` (1 for the first retry).
    fn delay(&self, retry: usize) -> Duration;
}

/// The same delay before every retry.
#[derive(Debug, Clone, Copy)]
pub struct ConstantBackoff(pub Duration);

impl Default for ConstantBackoff {
    fn default() -> Self {
        Self(Duration::from_secs(1))
    }
}

impl BackoffPolicy for ConstantBackoff {
    fn delay(&self, _retry: usize) -> Duration {
        self.0
    }
}

/// Doubling delay, capped.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub max: Duration,
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay(&self, retry: usize) -> Duration {
        let shift = retry.saturating_sub(1).min(16) as u32;
        self.base.saturating_mul(1 << shift).min(self.max)
    }
}

/// Backoff policy selected by the feed settings.
pub fn backoff_from_config(config: &FeedConfig) -> Arc<dyn BackoffPolicy> {
    match config.backoff {
        BackoffKind::Constant => Arc::new(ConstantBackoff(config.retry_delay())),
        BackoffKind::Exponential => Arc::new(ExponentialBackoff {
            base: config.retry_delay(),
            max: config.max_backoff(),
        }),
    }
}

/// Fetcher that retries network failures a bounded number of times.
#[derive(Clone)]
pub struct RetryingFetcher {
    client: Arc<dyn FeedClient>,
    backoff: Arc<dyn BackoffPolicy>,
    max_retries: usize,
}

impl RetryingFetcher {
    pub fn new(
        client: Arc<dyn FeedClient>,
        backoff: Arc<dyn BackoffPolicy>,
        max_retries: usize,
    ) -> Self {
        Self {
            client,
            backoff,
            max_retries,
        }
    }

    /// HTTP fetcher configured from feed settings.
    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(HttpFeedClient::from_config(config)?),
            backoff_from_config(config),
            config.max_retries,
        ))
    }

    pub fn max_attempts(&self) -> usize {
        self.max_retries + 1
    }

    /// Fetch `url`, retrying network failures.
    ///
    /// Fails with [`AppError::RetriesExhausted`] once every attempt has failed.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<String> {
        let max_attempts = self.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.client.get(url).await {
                Ok(body) => {
                    if attempt > 1 {
                        log::info!("Feed fetched on attempt {}/{}", attempt, max_attempts);
                    }
                    return Ok(body);
                }
                Err(e) => e,
            };

            if error.kind() != ErrorKind::Network {
                return Err(error);
            }
            if attempt >= max_attempts {
                log::error!("Feed fetch failed after {} attempt(s): {}", attempt, error);
                return Err(AppError::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let delay = self.backoff.delay(attempt);
            log::warn!(
                "Feed fetch attempt {}/{} failed: {}. Retrying in {:?}",
                attempt,
                max_attempts,
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{Reply, ScriptedFeed};

    fn fetcher(feed: &Arc<ScriptedFeed>, max_retries: usize) -> RetryingFetcher {
        RetryingFetcher::new(
            feed.clone(),
            Arc::new(ConstantBackoff(Duration::ZERO)),
            max_retries,
        )
    }

    #[tokio::test]
    async fn test_exhausts_after_all_attempts() {
        let feed = Arc::new(ScriptedFeed::always(Reply::Down));
        let result = fetcher(&feed, 2).fetch_with_retry("https://feed.test").await;

        assert_eq!(feed.calls(), 3);
        assert!(matches!(
            result,
            Err(AppError::RetriesExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_recovers_on_retry() {
        let feed = Arc::new(ScriptedFeed::new(
            vec![Reply::Status(503), Reply::Down],
            Reply::Body("a,b\n1,2".to_string()),
        ));
        let body = fetcher(&feed, 3)
            .fetch_with_retry("https://feed.test")
            .await
            .unwrap();

        assert_eq!(body, "a,b\n1,2");
        assert_eq!(feed.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_is_single_attempt() {
        let feed = Arc::new(ScriptedFeed::always(Reply::Status(500)));
        let result = fetcher(&feed, 0).fetch_with_retry("https://feed.test").await;

        assert_eq!(feed.calls(), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_parse_failure_is_not_retried() {
        let feed = Arc::new(ScriptedFeed::always(Reply::Garbled));
        let result = fetcher(&feed, 3).fetch_with_retry("https://feed.test").await;

        assert_eq!(feed.calls(), 1);
        assert!(matches!(result, Err(AppError::Parse(_))));
    }

    #[tokio::test]
    async fn test_request_carries_no_cache_headers() {
        use std::io::{Read, Write};

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).unwrap();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\nConnection: close\r\n\r\na,b")
                .unwrap();
            String::from_utf8_lossy(&buf[..n]).to_lowercase()
        });

        // plain client: the headers must come from the request itself
        let client = HttpFeedClient::new(Client::new());
        let body = client
            .get(&format!("http://{}/pub?output=csv", addr))
            .await
            .unwrap();
        let request = server.join().unwrap();

        assert_eq!(body, "a,b");
        assert!(request.contains("cache-control: no-cache"));
        assert!(request.contains("pragma: no-cache"));
    }

    #[test]
    fn test_constant_backoff() {
        let backoff = ConstantBackoff::default();
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(5), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff_caps() {
        let backoff = ExponentialBackoff {
            base: Duration::from_millis(500),
            max: Duration::from_secs(3),
        };
        assert_eq!(backoff.delay(1), Duration::from_millis(500));
        assert_eq!(backoff.delay(2), Duration::from_millis(1000));
        assert_eq!(backoff.delay(3), Duration::from_millis(2000));
        assert_eq!(backoff.delay(4), Duration::from_secs(3));
        assert_eq!(backoff.delay(100), Duration::from_secs(3));
    }

    #[test]
    fn test_backoff_from_config() {
        let mut config = FeedConfig::default();
        assert_eq!(backoff_from_config(&config).delay(3), Duration::from_secs(1));

        config.backoff = BackoffKind::Exponential;
        assert_eq!(backoff_from_config(&config).delay(3), Duration::from_secs(4));
    }
}
