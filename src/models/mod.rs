// src/models/mod.rs

//! Domain models: coupon records, snapshots, the persisted cache entry,
//! and application configuration.

mod config;
mod coupon;

pub use config::{
    BackoffKind, Config, ENV_CACHE_DIR, ENV_FEED_URL, FeedConfig, FieldNames, LoggingConfig,
    RefreshConfig, StorageConfig,
};
pub use coupon::{CacheEntry, CouponRecord, Snapshot, categories};
