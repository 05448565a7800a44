//! Freshness policy for cached records.
//!
//! The store returns whatever it has; this module decides whether that is
//! still trustworthy without re-verification.

use chrono::{DateTime, Utc};
use credence_core::config::DEFAULT_FRESHNESS_DAYS;
use std::time::Duration;

use super::traits::CacheEntry;

/// Result of assessing a cache entry against the freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFreshness {
    /// Usable as-is.
    Fresh { age: Duration },
    /// Too old; must be re-resolved as if absent.
    Stale { age: Duration },
}

impl EntryFreshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }

    pub fn age(&self) -> Duration {
        match self {
            Self::Fresh { age } | Self::Stale { age } => *age,
        }
    }
}

/// An entry is fresh while `now - verified_at < window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    window: Duration,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_FRESHNESS_DAYS * 24 * 60 * 60))
    }
}

impl FreshnessPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Assess an entry as of `now`.
    ///
    /// Entries stamped in the future (clock skew between writers) count as
    /// age zero.
    pub fn assess(&self, entry: &CacheEntry, now: DateTime<Utc>) -> EntryFreshness {
        let age = now
            .signed_duration_since(entry.verified_at)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if age < self.window {
            EntryFreshness::Fresh { age }
        } else {
            EntryFreshness::Stale { age }
        }
    }

    pub fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        self.assess(entry, now).is_fresh()
    }
}
