//! CREDENCE Cache - Record Stores and Freshness
//!
//! Stores keep the latest verified record per `(license, jurisdiction)`.
//! Whether a stored record may be served is decided separately by
//! [`FreshnessPolicy`]: a stale entry is treated as absent by the resolver,
//! never as a fallback.

pub mod freshness;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use freshness::{EntryFreshness, FreshnessPolicy};
pub use lmdb_backend::{LmdbCacheError, LmdbRecordStore};
pub use memory::InMemoryRecordStore;
pub use traits::{CacheEntry, CacheStats, RecordStore};
