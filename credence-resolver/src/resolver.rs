//! Resolution orchestrator.
//!
//! Cache first, then the provider chain in slot order. The first provider
//! to produce a plausible hit wins; its record is written back with that
//! provider's provenance. Provider failures are recorded and logged, never
//! returned. Only internal failures (the cache) surface as errors.

use std::sync::Arc;

use chrono::Utc;
use credence_cache::{
    EntryFreshness, FreshnessPolicy, InMemoryRecordStore, LmdbRecordStore, RecordStore,
};
use credence_core::{
    collapse_whitespace, normalize_opt, CredenceError, CredenceResult, Provenance,
    ProviderFailure, ResolverConfig, Timestamp, VerificationQuery, VerificationRecord,
    MIN_NAME_LEN,
};
use credence_providers::{
    BrowserLauncher, OfficialRegistryProvider, ProviderHit, SearchIndexProvider,
    SearchIndexSource, StaticFallbackProvider, VerificationProvider,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uuid::Uuid;

use crate::chain::{ProviderChain, ProviderSlot};
use crate::trace::{AttemptOutcome, AttemptRecord, CacheOutcome, Resolution};

/// Build the record for a provider hit.
///
/// Hits whose name is shorter than the minimum are rejected; a missing
/// specialty or standing is tolerated (defaulted / `Pending`).
pub fn record_from_hit(
    hit: &ProviderHit,
    provenance: Provenance,
    verified_at: Timestamp,
) -> Result<VerificationRecord, ProviderFailure> {
    let name = collapse_whitespace(&hit.full_name);
    if name.chars().count() < MIN_NAME_LEN {
        return Err(ProviderFailure::parse(format!(
            "name too short: {:?}",
            hit.full_name
        )));
    }

    Ok(VerificationRecord::new(
        &name,
        hit.specialty.as_deref(),
        normalize_opt(hit.standing_text.as_deref()),
        provenance,
        verified_at,
    ))
}

/// The license verification resolver.
///
/// `Send + Sync`; share it as `Arc<Resolver>`. Resolutions are independent
/// and same-key resolutions are not coalesced.
pub struct Resolver {
    store: Arc<dyn RecordStore>,
    chain: ProviderChain,
    policy: FreshnessPolicy,
}

impl Resolver {
    pub fn new(store: Arc<dyn RecordStore>, chain: ProviderChain, policy: FreshnessPolicy) -> Self {
        Self {
            store,
            chain,
            policy,
        }
    }

    /// Assemble a resolver from configuration.
    ///
    /// The registry slot needs a browser; without a launcher it stays
    /// disabled even when configured on.
    pub fn from_config(
        config: &ResolverConfig,
        launcher: Option<Arc<dyn BrowserLauncher>>,
    ) -> CredenceResult<Self> {
        config.validate()?;

        let store: Arc<dyn RecordStore> = match &config.cache_path {
            Some(path) => Arc::new(LmdbRecordStore::open(path, config.cache_max_mb)?),
            None => Arc::new(InMemoryRecordStore::new()),
        };

        let mut chain = ProviderChain::new();

        if config.registry.enabled {
            match launcher {
                Some(launcher) => {
                    chain.set(
                        ProviderSlot::OfficialRegistry,
                        Arc::new(OfficialRegistryProvider::new(launcher, &config.registry)),
                    );
                }
                None => tracing::warn!("official registry enabled but no browser available"),
            }
        }

        let indexes = [
            (ProviderSlot::PrimaryIndex, &config.primary_index),
            (ProviderSlot::SecondaryIndex, &config.secondary_index),
        ];
        for (slot, source) in indexes {
            if let Some(source) = source {
                let provider =
                    SearchIndexProvider::new(SearchIndexSource::from(source), &config.user_agent)?;
                chain.set(slot, Arc::new(provider));
            }
        }

        if config.static_fallback_enabled {
            chain.set(
                ProviderSlot::StaticFallback,
                Arc::new(StaticFallbackProvider::new()),
            );
        }

        tracing::info!(
            slots = ?chain.enabled_slots(),
            persistent_cache = config.cache_path.is_some(),
            freshness_days = config.freshness_window.as_secs() / 86_400,
            "resolver configured"
        );

        Ok(Self::new(
            store,
            chain,
            FreshnessPolicy::new(config.freshness_window),
        ))
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Resolve a query. `Ok(None)` means no source knows the license.
    pub async fn resolve(
        &self,
        query: &VerificationQuery,
    ) -> CredenceResult<Option<VerificationRecord>> {
        Ok(self.resolve_traced(query).await?.record)
    }

    /// Resolve and return the full trace.
    pub async fn resolve_traced(&self, query: &VerificationQuery) -> CredenceResult<Resolution> {
        self.run(query, None).await
    }

    /// Resolve, abandoning the in-flight provider attempt when `cancel`
    /// fires. Nothing is cached after cancellation.
    pub async fn resolve_with_cancellation(
        &self,
        query: &VerificationQuery,
        cancel: &CancellationToken,
    ) -> CredenceResult<Resolution> {
        self.run(query, Some(cancel)).await
    }

    /// Administrative purge of one cached record.
    pub async fn invalidate(&self, query: &VerificationQuery) -> CredenceResult<bool> {
        query.validate()?;
        let removed = self.store.invalidate(&query.cache_key()).await?;
        tracing::info!(
            license = query.license_number(),
            jurisdiction = query.jurisdiction(),
            removed,
            "cache entry invalidated"
        );
        Ok(removed)
    }

    async fn run(
        &self,
        query: &VerificationQuery,
        cancel: Option<&CancellationToken>,
    ) -> CredenceResult<Resolution> {
        query.validate()?;

        let span = tracing::info_span!(
            "resolve",
            request_id = %Uuid::now_v7(),
            license = query.license_number(),
            jurisdiction = query.jurisdiction(),
        );

        self.run_in_span(query, cancel).instrument(span).await
    }

    async fn run_in_span(
        &self,
        query: &VerificationQuery,
        cancel: Option<&CancellationToken>,
    ) -> CredenceResult<Resolution> {
        let key = query.cache_key();

        let cache = match self.store.get(&key).await? {
            Some(entry) => match self.policy.assess(&entry, Utc::now()) {
                EntryFreshness::Fresh { age } => {
                    tracing::debug!(
                        age_secs = age.as_secs(),
                        source = %entry.record.provenance,
                        "cache hit"
                    );
                    return Ok(Resolution {
                        record: Some(entry.record.with_provenance(Provenance::Cache)),
                        cache: CacheOutcome::Fresh,
                        attempts: Vec::new(),
                    });
                }
                EntryFreshness::Stale { age } => {
                    tracing::debug!(age_secs = age.as_secs(), "stale cache entry, re-resolving");
                    CacheOutcome::Stale
                }
            },
            None => CacheOutcome::Miss,
        };

        let mut attempts = Vec::with_capacity(self.chain.len());

        for (slot, provider) in self.chain.iter() {
            let started = Instant::now();
            let result = match cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!(provider = provider.name(), %slot, "resolution cancelled");
                        return Err(CredenceError::Cancelled);
                    }
                    result = provider.attempt(query) => result,
                },
                None => provider.attempt(query).await,
            };
            let elapsed = started.elapsed();

            let result =
                result.and_then(|hit| record_from_hit(&hit, provider.provenance(), Utc::now()));

            match result {
                Ok(record) => {
                    if cancel.is_some_and(CancellationToken::is_cancelled) {
                        return Err(CredenceError::Cancelled);
                    }

                    self.store.put(&key, &record).await?;

                    tracing::info!(
                        provider = provider.name(),
                        %slot,
                        elapsed_ms = elapsed.as_millis() as u64,
                        standing = %record.standing,
                        "license resolved"
                    );
                    attempts.push(AttemptRecord {
                        slot,
                        provider: provider.name().to_string(),
                        elapsed,
                        outcome: AttemptOutcome::Succeeded,
                    });
                    return Ok(Resolution {
                        record: Some(record),
                        cache,
                        attempts,
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        provider = provider.name(),
                        %slot,
                        elapsed_ms = elapsed.as_millis() as u64,
                        kind = failure.kind(),
                        error = %failure,
                        "provider attempt failed"
                    );
                    attempts.push(AttemptRecord {
                        slot,
                        provider: provider.name().to_string(),
                        elapsed,
                        outcome: AttemptOutcome::Failed(failure),
                    });
                }
            }
        }

        tracing::info!(attempted = attempts.len(), "no provider produced a record");
        Ok(Resolution {
            record: None,
            cache,
            attempts,
        })
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("chain", &self.chain)
            .field("policy", &self.policy)
            .finish()
    }
}
