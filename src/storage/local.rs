//! Local filesystem storage implementation.
//!
//! Keeps the cache entry as `{root}/{key}.json`. Writes go to a temporary
//! sibling first and are renamed into place, so a crash or cancellation
//! mid-write leaves the previous entry intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CacheEntry, StorageConfig};
use crate::storage::CacheStore;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    key: String,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            key: key.into(),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.dir, &config.cache_key)
    }

    /// Full path of the cache entry.
    pub fn entry_path(&self) -> PathBuf {
        self.path(&self.entry_key())
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn entry_key(&self) -> String {
        format!("{}.json", self.key)
    }
}

#[async_trait]
impl CacheStore for LocalStorage {
    async fn load(&self) -> Result<Option<CacheEntry>> {
        let key = self.entry_key();
        let entry = self
            .read_json::<CacheEntry>(&key)
            .await
            .map_err(|e| match e {
                // Undecodable content stays distinguishable from I/O failure
                AppError::Json(_) => e,
                other => AppError::storage(self.location(), other),
            })?;
        if entry.is_none() {
            log::debug!("No cache entry at {}", self.location());
        }
        Ok(entry)
    }

    async fn save(&self, entry: &CacheEntry) -> Result<()> {
        let key = self.entry_key();
        self.write_json(&key, entry)
            .await
            .map_err(|e| AppError::storage(self.location(), e))?;
        log::debug!(
            "Cache entry written to {} ({} records)",
            self.location(),
            entry.data.as_ref().map_or(0, Vec::len)
        );
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match tokio::fs::remove_file(self.entry_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage(self.location(), e)),
        }
    }

    fn location(&self) -> String {
        self.entry_path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CouponRecord, Snapshot};
    use chrono::Utc;
    use tempfile::TempDir;

    fn sample_entry() -> CacheEntry {
        let record: CouponRecord = [
            ("nome da loja", "Loja Teste"),
            ("Desconto", "10%"),
            ("Categoria", "Moda"),
            ("cupom", "TESTE10"),
        ]
        .into_iter()
        .collect();
        CacheEntry::from(&Snapshot::ingested(vec![record], "raw", Utc::now()))
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "cache");

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "cuponsCache");

        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_round_trip() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested"), "cuponsCache");
        let entry = sample_entry();

        storage.save(&entry).await.unwrap();
        assert!(storage.entry_path().ends_with("nested/cuponsCache.json"));
        assert!(!storage.entry_path().with_extension("tmp").exists());

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, entry);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_json_error() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "cuponsCache");
        storage
            .write_bytes("cuponsCache.json", b"{ not json")
            .await
            .unwrap();

        let err = storage.load().await.unwrap_err();
        assert!(matches!(err, AppError::Json(_)));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path(), "cuponsCache");

        storage.save(&sample_entry()).await.unwrap();
        storage.clear().await.unwrap();
        storage.clear().await.unwrap();
        assert!(storage.load().await.unwrap().is_none());
    }
}
