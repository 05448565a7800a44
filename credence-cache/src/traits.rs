//! Record store trait and cache entry type.
//!
//! A store is a keyed upsert/read/delete surface and nothing more. It never
//! judges freshness; that policy lives in [`crate::FreshnessPolicy`] so the
//! same store answers both "is there anything at all" and "is it fresh".

use async_trait::async_trait;
use credence_core::{CacheKey, CredenceResult, Timestamp, VerificationRecord};

/// A cached verification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub record: VerificationRecord,
    /// When the record was last verified against a source.
    pub verified_at: Timestamp,
}

impl CacheEntry {
    pub fn new(key: CacheKey, record: VerificationRecord) -> Self {
        let verified_at = record.verified_at;
        Self {
            key,
            record,
            verified_at,
        }
    }
}

/// Cache store trait for pluggable implementations.
///
/// Implementations must tolerate concurrent writers for the same key;
/// last-write-wins is acceptable because a record resolved twice from the
/// same source is the same record.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read the entry for `key`, fresh or not.
    async fn get(&self, key: &CacheKey) -> CredenceResult<Option<CacheEntry>>;

    /// Upsert. Overwrites provenance and timestamp of any existing entry.
    async fn put(&self, key: &CacheKey, record: &VerificationRecord) -> CredenceResult<()>;

    /// Administrative hard delete, used to purge a known-bad entry.
    ///
    /// Returns whether an entry existed.
    async fn invalidate(&self, key: &CacheKey) -> CredenceResult<bool>;

    async fn stats(&self) -> CredenceResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of reads that found an entry.
    pub hits: u64,
    /// Number of reads that found nothing.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
