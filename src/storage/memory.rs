//! In-process cache store.
//!
//! Nothing survives the process. Useful for dry runs and tests; it counts
//! writes and can be told to fail them.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::CacheEntry;
use crate::storage::CacheStore;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entry: Mutex<Option<CacheEntry>>,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with an entry.
    pub fn with_entry(entry: CacheEntry) -> Self {
        Self {
            entry: Mutex::new(Some(entry)),
            ..Self::default()
        }
    }

    /// Number of successful saves.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Copy of the stored entry.
    pub fn snapshot(&self) -> Option<CacheEntry> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<CacheEntry>> {
        // A poisoned lock still holds a whole entry; writes replace it in one step.
        self.entry.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl CacheStore for MemoryStorage {
    async fn load(&self) -> Result<Option<CacheEntry>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::storage(self.location(), "read refused"));
        }
        Ok(self.lock().clone())
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::storage(self.location(), "write refused"));
        }
        *self.lock() = Some(entry.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
