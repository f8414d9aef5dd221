//! Scripted feed client for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::services::FeedClient;

/// Canned answer for one request.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(String),
    Status(u16),
    Down,
    Garbled,
    /// Answers with a body after a delay
    Slow(Duration, String),
    /// Never answers
    Hang,
}

/// Plays back scripted replies, then repeats a fallback reply.
pub(crate) struct ScriptedFeed {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFeed {
    pub(crate) fn new(replies: Vec<Reply>, fallback: Reply) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn always(reply: Reply) -> Self {
        Self::new(Vec::new(), reply)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of requests that were ever open at once.
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedClient for ScriptedFeed {
    async fn get(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let open = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(open, Ordering::SeqCst);

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());

        let result = match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(AppError::Status {
                status,
                url: url.to_string(),
            }),
            Reply::Down => Err(AppError::network("connection refused")),
            Reply::Garbled => Err(AppError::parse("feed body is not UTF-8")),
            Reply::Slow(delay, body) => {
                tokio::time::sleep(delay).await;
                Ok(body)
            }
            Reply::Hang => std::future::pending().await,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
