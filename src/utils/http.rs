// src/utils/http.rs

//! HTTP client utilities.

use reqwest::header::{CACHE_CONTROL, HeaderMap, HeaderValue, PRAGMA};

use crate::error::Result;
use crate::models::FeedConfig;

/// Headers that ask every intermediary to revalidate with the origin.
pub fn no_cache_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// Create a configured asynchronous HTTP client for the feed.
///
/// Cache-busting headers are added per request by the feed client.
pub fn create_async_client(config: &FeedConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.timeout())
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cache_headers() {
        let headers = no_cache_headers();
        assert_eq!(headers.get(CACHE_CONTROL).unwrap(), "no-cache");
        assert_eq!(headers.get(PRAGMA).unwrap(), "no-cache");
    }

    #[test]
    fn test_client_builds_from_defaults() {
        assert!(create_async_client(&FeedConfig::default()).is_ok());
    }
}
