//! Per-resolution trace: what the cache said and what each provider did.

use std::time::Duration;

use credence_core::{ProviderFailure, VerificationRecord};

use crate::chain::ProviderSlot;

/// State of the cache entry when the resolution started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from cache; no provider ran.
    Fresh,
    /// An entry existed but was outside the freshness window.
    Stale,
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(ProviderFailure),
}

/// One provider attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub slot: ProviderSlot,
    pub provider: String,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, AttemptOutcome::Succeeded)
    }

    pub fn failure(&self) -> Option<&ProviderFailure> {
        match &self.outcome {
            AttemptOutcome::Failed(failure) => Some(failure),
            AttemptOutcome::Succeeded => None,
        }
    }
}

/// Result of one resolution with its trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// `None` when every provider failed.
    pub record: Option<VerificationRecord>,
    pub cache: CacheOutcome,
    /// In the order they ran.
    pub attempts: Vec<AttemptRecord>,
}

impl Resolution {
    /// Slots that were attempted, in order.
    pub fn attempted_slots(&self) -> Vec<ProviderSlot> {
        self.attempts.iter().map(|a| a.slot).collect()
    }

    pub fn is_found(&self) -> bool {
        self.record.is_some()
    }
}
