//! Network access to the published feed.

mod fetcher;
#[cfg(test)]
pub(crate) mod testing;

pub use fetcher::{
    BackoffPolicy, ConstantBackoff, ExponentialBackoff, FeedClient, HttpFeedClient,
    RetryingFetcher, backoff_from_config,
};
