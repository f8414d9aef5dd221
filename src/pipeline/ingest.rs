//! Staleness-aware ingestion cycle.
//!
//! One [`IngestionPipeline::refresh`] call runs:
//!
//! 1. Freshness gate: a recent in-memory snapshot is re-presented, no network.
//! 2. Fetch with retries.
//! 3. Parse and compare against the in-memory snapshot.
//! 4. Commit on change: swap the snapshot, persist it, notify presentation.
//! 5. Fallback on failure: adopt the persisted entry if there is one.
//!
//! Refresh never fails to its caller. `&mut self` keeps cycles strictly
//! sequential, so the cache entry has a single writer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::{AppError, Result};
use crate::models::{CacheEntry, Config, Snapshot};
use crate::pipeline::{ChangeDetector, CsvParser};
use crate::presentation::Presenter;
use crate::services::RetryingFetcher;
use crate::storage::CacheStore;

/// What a refresh cycle ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// In-memory snapshot was recent enough; no fetch
    Fresh,
    /// Fetched records equal the current snapshot
    Unchanged,
    /// New snapshot committed
    Updated { records: usize, persisted: bool },
    /// Live refresh failed; persisted entry adopted
    Fallback { records: usize },
    /// Live refresh failed and no cache was available. An empty list is
    /// presented unless a snapshot is already held.
    Failed,
    /// Shutdown arrived while waiting on the feed
    Cancelled,
}

/// Owns the current snapshot and drives fetch, parse, compare, and persist.
pub struct IngestionPipeline {
    url: String,
    fetcher: RetryingFetcher,
    parser: CsvParser,
    detector: ChangeDetector,
    store: Arc<dyn CacheStore>,
    presenter: Arc<dyn Presenter>,
    cache_duration: Duration,
    category_field: String,
    current: Option<Arc<Snapshot>>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl IngestionPipeline {
    pub fn new(
        url: impl Into<String>,
        fetcher: RetryingFetcher,
        store: Arc<dyn CacheStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let config = Config::default();
        Self {
            url: url.into(),
            fetcher,
            parser: CsvParser::new(),
            detector: ChangeDetector::new(),
            store,
            presenter,
            cache_duration: config.refresh.cache_duration(),
            category_field: config.fields.category,
            current: None,
            shutdown: None,
        }
    }

    /// Pipeline wired to the HTTP feed described by `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CacheStore>,
        presenter: Arc<dyn Presenter>,
    ) -> Result<Self> {
        let fetcher = RetryingFetcher::from_config(&config.feed)?;
        Ok(Self::new(&config.feed.url, fetcher, store, presenter)
            .with_cache_duration(config.refresh.cache_duration())
            .with_category_field(&config.fields.category))
    }

    pub fn with_cache_duration(mut self, cache_duration: Duration) -> Self {
        self.cache_duration = cache_duration;
        self
    }

    pub fn with_category_field(mut self, field: impl Into<String>) -> Self {
        self.category_field = field.into();
        self
    }

    /// Abort the network wait of a running refresh when `true` is sent.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn cache_duration(&self) -> Duration {
        self.cache_duration
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.current.as_deref()
    }

    /// One-line cache state for diagnostics.
    pub fn status_line(&self) -> String {
        match &self.current {
            Some(s) => format!(
                "Cache state: {} record(s), last updated {}, fingerprint {}",
                s.len(),
                s.last_updated().format("%H:%M:%S"),
                s.fingerprint()
            ),
            None => "Cache state: empty".to_string(),
        }
    }

    /// Seed state from the persisted entry before the first network attempt.
    ///
    /// An undecodable entry is removed. Returns the number of records adopted.
    pub async fn seed_from_cache(&mut self) -> Option<usize> {
        match self.store.load().await {
            Ok(Some(entry)) => {
                let snapshot = entry.to_snapshot()?;
                let count = snapshot.len();
                log::info!(
                    "Loaded {} cached coupon(s) from {}",
                    count,
                    self.store.location()
                );
                self.adopt(snapshot);
                Some(count)
            }
            Ok(None) => None,
            Err(AppError::Json(e)) => {
                log::error!("Cached entry is unreadable, removing it: {}", e);
                if let Err(e) = self.store.clear().await {
                    log::warn!("Failed to remove cached entry: {}", e);
                }
                None
            }
            Err(e) => {
                log::warn!("Cache unavailable at startup: {}", e);
                None
            }
        }
    }

    /// Run one refresh cycle. Never fails; the outcome is for diagnostics.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        if let Some(current) = &self.current {
            if current.is_fresh(Utc::now(), self.cache_duration) {
                log::debug!(
                    "Snapshot is fresh ({} records), skipping fetch",
                    current.len()
                );
                self.presenter.on_snapshot_ready(current);
                return RefreshOutcome::Fresh;
            }
        }

        match self.ingest().await {
            Ok(outcome) => outcome,
            Err(AppError::Cancelled) => {
                log::info!("Refresh cancelled by shutdown");
                RefreshOutcome::Cancelled
            }
            Err(e) => {
                log::error!("Failed to load coupons: {}", e);
                let outcome = self.fall_back().await;
                if outcome == RefreshOutcome::Failed && self.current.is_none() {
                    // nothing to show at all: present an explicit empty list
                    self.publish(&Snapshot::empty(Utc::now()));
                }
                outcome
            }
        }
    }

    async fn ingest(&mut self) -> Result<RefreshOutcome> {
        let body = self.fetch().await?;
        let records = self.parser.parse(&body);
        let candidate = Snapshot::ingested(records, &body, Utc::now());

        if self
            .detector
            .is_unchanged(self.current.as_deref(), &candidate)
        {
            log::debug!(
                "Feed unchanged ({} records, fingerprint {})",
                candidate.len(),
                candidate.fingerprint()
            );
            return Ok(RefreshOutcome::Unchanged);
        }

        let diff = self
            .detector
            .summarize(self.current.as_deref(), &candidate);
        log::info!(
            "Feed changed: {} records ({:+}), {} row(s) modified (fingerprint {})",
            diff.current_count,
            diff.row_delta(),
            diff.changed_rows.len(),
            candidate.fingerprint()
        );

        let snapshot = Arc::new(candidate);
        self.current = Some(Arc::clone(&snapshot));

        let persisted = match self.store.save(&CacheEntry::from(&*snapshot)).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to persist coupons, keeping them in memory: {}", e);
                false
            }
        };

        self.publish(&snapshot);
        Ok(RefreshOutcome::Updated {
            records: snapshot.len(),
            persisted,
        })
    }

    /// Fetch the feed; only this wait is cut short by shutdown.
    async fn fetch(&mut self) -> Result<String> {
        let Some(shutdown) = self.shutdown.as_mut() else {
            return self.fetcher.fetch_with_retry(&self.url).await;
        };
        if *shutdown.borrow() {
            return Err(AppError::Cancelled);
        }

        let stop = async {
            loop {
                if shutdown.changed().await.is_err() {
                    // sender gone: no shutdown can arrive any more
                    std::future::pending::<()>().await;
                }
                if *shutdown.borrow() {
                    break;
                }
            }
        };

        // a fetch that has already finished wins over a shutdown arriving in the same poll
        tokio::select! {
            biased;
            result = self.fetcher.fetch_with_retry(&self.url) => result,
            () = stop => Err(AppError::Cancelled),
        }
    }

    async fn fall_back(&mut self) -> RefreshOutcome {
        match self.store.load().await {
            Ok(Some(entry)) => match entry.to_snapshot() {
                Some(snapshot) => {
                    let records = snapshot.len();
                    log::warn!("Serving {} cached coupon(s) after failed refresh", records);
                    self.adopt(snapshot);
                    RefreshOutcome::Fallback { records }
                }
                None => {
                    log::warn!("Cached entry holds no coupons");
                    RefreshOutcome::Failed
                }
            },
            Ok(None) => {
                log::warn!("No cached coupons available");
                RefreshOutcome::Failed
            }
            Err(e) => {
                log::warn!("Cache unavailable during fallback: {}", e);
                RefreshOutcome::Failed
            }
        }
    }

    fn adopt(&mut self, snapshot: Snapshot) {
        let snapshot = Arc::new(snapshot);
        self.current = Some(Arc::clone(&snapshot));
        self.publish(&snapshot);
    }

    fn publish(&self, snapshot: &Snapshot) {
        self.presenter
            .on_categories_ready(&snapshot.categories(&self.category_field));
        self.presenter.on_snapshot_ready(snapshot);
    }
}
