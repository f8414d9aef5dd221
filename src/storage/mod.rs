//! Durable persistence of the last-known-good snapshot.
//!
//! The cache is a single named entry holding a JSON-serialized [`CacheEntry`].
//! It is read at startup and on refresh failure, and written after every
//! change-detected ingestion.
//!
//! ```text
//! storage/
//! ├── config.toml           # Feed configuration
//! └── cuponsCache.json      # Last-known-good snapshot
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::CacheEntry;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Trait for cache entry backends.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read the entry. `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<CacheEntry>>;

    /// Replace the entry. Either the whole entry is written or the old one remains.
    async fn save(&self, entry: &CacheEntry) -> Result<()>;

    /// Remove the entry if present.
    async fn clear(&self) -> Result<()>;

    /// Human-readable location for log lines.
    fn location(&self) -> String;
}
