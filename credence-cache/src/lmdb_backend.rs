//! LMDB-backed record store.
//!
//! Uses the heed crate (Rust bindings for LMDB) so verified records survive
//! process restarts.
//!
//! # Value Layout
//!
//! Keys are the UTF-8 bytes of [`CacheKey::encode`]. Values are
//! `[verified_at millis: 8 bytes LE][record JSON]`, so the timestamp can be
//! read without parsing the record.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::DateTime;
use credence_core::config::megabytes_to_bytes;
use credence_core::{CacheKey, CredenceError, CredenceResult, StorageError, VerificationRecord};
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};

use super::traits::{CacheEntry, CacheStats, RecordStore};

const TIMESTAMP_LEN: usize = 8;

/// Error type for LMDB store operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    #[error("Failed to open database: {0}")]
    DbOpen(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for CredenceError {
    fn from(e: LmdbCacheError) -> Self {
        let reason = e.to_string();
        let storage = match e {
            LmdbCacheError::EnvOpen(_) | LmdbCacheError::DbOpen(_) | LmdbCacheError::Io(_) => {
                StorageError::Unreachable { reason }
            }
            LmdbCacheError::Transaction(_) | LmdbCacheError::Serialization(_) => {
                StorageError::TransactionFailed { reason }
            }
        };
        CredenceError::Storage(storage)
    }
}

/// Persistent store in a single unnamed LMDB database.
pub struct LmdbRecordStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl LmdbRecordStore {
    /// Open (or create) a store under `path`.
    ///
    /// `max_size_mb` sets the LMDB map size; writes fail once it is full.
    pub fn open<P: AsRef<Path>>(path: P, max_size_mb: usize) -> Result<Self, LmdbCacheError> {
        let map_size = megabytes_to_bytes(max_size_mb).ok_or_else(|| {
            LmdbCacheError::EnvOpen(format!("map size of {} MB overflows", max_size_mb))
        })?;

        std::fs::create_dir_all(&path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        tracing::debug!(path = %path.as_ref().display(), max_size_mb, "opened LMDB record store");

        Ok(Self {
            env,
            db,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn encode_value(record: &VerificationRecord) -> Result<Vec<u8>, LmdbCacheError> {
        let json =
            serde_json::to_vec(record).map_err(|e| LmdbCacheError::Serialization(e.to_string()))?;

        let mut bytes = Vec::with_capacity(TIMESTAMP_LEN + json.len());
        bytes.extend_from_slice(&record.verified_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&json);
        Ok(bytes)
    }

    fn decode_value(key: &CacheKey, bytes: &[u8]) -> Result<CacheEntry, StorageError> {
        let corrupt = |reason: String| StorageError::Corrupt {
            key: key.encode(),
            reason,
        };

        if bytes.len() < TIMESTAMP_LEN {
            return Err(corrupt(format!("value too short ({} bytes)", bytes.len())));
        }

        let timestamp_bytes: [u8; TIMESTAMP_LEN] = bytes[..TIMESTAMP_LEN]
            .try_into()
            .map_err(|_| corrupt("invalid timestamp header".to_string()))?;
        let millis = i64::from_le_bytes(timestamp_bytes);
        let verified_at = DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| corrupt(format!("timestamp out of range: {}", millis)))?;

        let record: VerificationRecord = serde_json::from_slice(&bytes[TIMESTAMP_LEN..])
            .map_err(|e| corrupt(e.to_string()))?;

        Ok(CacheEntry {
            key: key.clone(),
            record,
            verified_at,
        })
    }
}

#[async_trait]
impl RecordStore for LmdbRecordStore {
    async fn get(&self, key: &CacheKey) -> CredenceResult<Option<CacheEntry>> {
        let encoded_key = key.encode();

        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let bytes = self
            .db
            .get(&rtxn, encoded_key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        match bytes {
            Some(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Self::decode_value(key, bytes)?))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &CacheKey, record: &VerificationRecord) -> CredenceResult<()> {
        let encoded_key = key.encode();
        let value = Self::encode_value(record)?;

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        self.db
            .put(&mut wtxn, encoded_key.as_bytes(), &value)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(())
    }

    async fn invalidate(&self, key: &CacheKey) -> CredenceResult<bool> {
        let encoded_key = key.encode();

        let mut wtxn = self
            .env
            .write_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let deleted = self
            .db
            .delete(&mut wtxn, encoded_key.as_bytes())
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        wtxn.commit()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(deleted)
    }

    async fn stats(&self) -> CredenceResult<CacheStats> {
        let rtxn = self
            .env
            .read_txn()
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        let entry_count = self
            .db
            .len(&rtxn)
            .map_err(|e| LmdbCacheError::Transaction(e.to_string()))?;

        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use credence_core::{Provenance, Standing, VerificationQuery};
    use tempfile::TempDir;

    fn create_test_store() -> (LmdbRecordStore, TempDir) {
        let temp_dir = TempDir::new().expect("TempDir creation should succeed");
        let store = LmdbRecordStore::open(temp_dir.path(), 10).expect("store open should succeed");
        (store, temp_dir)
    }

    fn record(provenance: Provenance) -> VerificationRecord {
        VerificationRecord::new(
            "Carla Mendes Rocha",
            Some("Dermatologia"),
            Standing::Active,
            provenance,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let (store, _dir) = create_test_store();
        let key = VerificationQuery::new("88123", "PR").cache_key();
        let original = record(Provenance::OfficialRegistry);

        store.put(&key, &original).await.unwrap();
        let entry = store.get(&key).await.unwrap().expect("entry present");

        assert_eq!(entry.key, key);
        assert_eq!(entry.record, original);
        assert_eq!(
            entry.verified_at.timestamp_millis(),
            original.verified_at.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let (store, _dir) = create_test_store();
        let key = VerificationQuery::new("1", "AC").cache_key();
        assert!(store.get(&key).await.unwrap().is_none());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 0);
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_entry() {
        let (store, _dir) = create_test_store();
        let key = VerificationQuery::new("88123", "PR").cache_key();

        store.put(&key, &record(Provenance::StaticFallback)).await.unwrap();
        store.put(&key, &record(Provenance::SearchIndex)).await.unwrap();

        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.record.provenance, Provenance::SearchIndex);
        assert_eq!(store.stats().await.unwrap().entry_count, 1);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (store, _dir) = create_test_store();
        let key = VerificationQuery::new("88123", "PR").cache_key();

        store.put(&key, &record(Provenance::SearchIndex)).await.unwrap();
        assert!(store.invalidate(&key).await.unwrap());
        assert!(!store.invalidate(&key).await.unwrap());
        assert!(store.get(&key).await.unwrap().is_none());
        assert_eq!(store.stats().await.unwrap().entry_count, 0);
    }

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let key = VerificationQuery::new("88123", "PR").cache_key();
        let original = record(Provenance::OfficialRegistry);

        {
            let store = LmdbRecordStore::open(temp_dir.path(), 10).unwrap();
            store.put(&key, &original).await.unwrap();
        }

        let store = LmdbRecordStore::open(temp_dir.path(), 10).unwrap();
        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.record.full_name, "CARLA MENDES ROCHA");
    }

    #[tokio::test]
    async fn test_corrupt_value_reports_key() {
        let (store, _dir) = create_test_store();
        let key = VerificationQuery::new("88123", "PR").cache_key();

        let mut wtxn = store.env.write_txn().unwrap();
        store
            .db
            .put(&mut wtxn, key.encode().as_bytes(), b"\x01\x02")
            .unwrap();
        wtxn.commit().unwrap();

        let err = store.get(&key).await.unwrap_err();
        match err {
            CredenceError::Storage(StorageError::Corrupt { key: reported, .. }) => {
                assert_eq!(reported, "PR:88123");
            }
            other => panic!("expected corrupt entry error, got {other:?}"),
        }
    }

    #[test]
    fn test_overflowing_map_size_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = LmdbRecordStore::open(temp_dir.path(), usize::MAX).err().unwrap();
        assert!(matches!(err, LmdbCacheError::EnvOpen(_)));
    }

    #[test]
    fn test_error_conversion() {
        let err: CredenceError = LmdbCacheError::EnvOpen("no space".to_string()).into();
        assert!(matches!(
            err,
            CredenceError::Storage(StorageError::Unreachable { .. })
        ));

        let err: CredenceError = LmdbCacheError::Transaction("map full".to_string()).into();
        assert!(matches!(
            err,
            CredenceError::Storage(StorageError::TransactionFailed { .. })
        ));
    }
}
