//! In-memory record store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use credence_core::{CacheKey, CredenceResult, StorageError, VerificationRecord};
use tokio::sync::RwLock;

use super::traits::{CacheEntry, CacheStats, RecordStore};

/// Process-local store backed by a `HashMap`.
///
/// Suitable for tests, demos and single-process deployments that accept
/// losing the cache on restart.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry directly, bypassing statistics.
    pub async fn seed(&self, entry: CacheEntry) {
        self.entries.write().await.insert(entry.key.clone(), entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &CacheKey) -> CredenceResult<Option<CacheEntry>> {
        let entry = self.entries.read().await.get(key).cloned();
        let counter = if entry.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(entry)
    }

    async fn put(&self, key: &CacheKey, record: &VerificationRecord) -> CredenceResult<()> {
        let entry = CacheEntry::new(key.clone(), record.clone());
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> CredenceResult<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn stats(&self) -> CredenceResult<CacheStats> {
        let entry_count = u64::try_from(self.entries.read().await.len())
            .map_err(|_| StorageError::TransactionFailed {
                reason: "entry count overflow".to_string(),
            })?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }
}
