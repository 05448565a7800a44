//! CREDENCE Test Utilities
//!
//! Shared test infrastructure for the CREDENCE workspace:
//! - Scripted providers with call counting and a shared call log
//! - A record store that can be told to fail
//! - A scripted browser for driving the official registry provider
//! - Fixtures and proptest generators

pub use credence_cache::{CacheEntry, InMemoryRecordStore, RecordStore};
pub use credence_core::{
    CacheKey, CredenceError, CredenceResult, Provenance, ProviderFailure, Standing,
    StorageError, Timestamp, VerificationQuery, VerificationRecord,
};
pub use credence_providers::{ProviderHit, VerificationProvider};

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use credence_cache::CacheStats;
use credence_providers::{BrowserError, BrowserLauncher, BrowserSession, RegistrySelectors};

// ============================================================================
// CALL LOG
// ============================================================================

/// Ordered record of which providers were attempted, shared across doubles.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, name: &str) {
        if let Ok(mut calls) = self.0.lock() {
            calls.push(name.to_string());
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.0.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

// ============================================================================
// SCRIPTED PROVIDER
// ============================================================================

/// Provider that returns a fixed outcome, optionally after a delay.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    provenance: Provenance,
    outcome: Result<ProviderHit, ProviderFailure>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Option<CallLog>,
}

impl ScriptedProvider {
    pub fn succeeding(name: &str, provenance: Provenance, hit: ProviderHit) -> Self {
        Self::with_outcome(name, provenance, Ok(hit))
    }

    pub fn failing(name: &str, provenance: Provenance, failure: ProviderFailure) -> Self {
        Self::with_outcome(name, provenance, Err(failure))
    }

    fn with_outcome(
        name: &str,
        provenance: Provenance,
        outcome: Result<ProviderHit, ProviderFailure>,
    ) -> Self {
        Self {
            name: name.to_string(),
            provenance,
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
            log: None,
        }
    }

    /// Sleep before answering; cancelled along with the attempt future.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_log(mut self, log: &CallLog) -> Self {
        self.log = Some(log.clone());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VerificationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn provenance(&self) -> Provenance {
        self.provenance
    }

    async fn attempt(&self, _query: &VerificationQuery) -> Result<ProviderHit, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(log) = &self.log {
            log.push(&self.name);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

// ============================================================================
// FAILING STORE
// ============================================================================

/// In-memory store whose reads and/or writes can be made to fail.
#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemoryRecordStore,
    fail_reads: bool,
    fail_writes: bool,
    puts: AtomicUsize,
}

impl FailingStore {
    /// Every operation fails.
    pub fn unreachable() -> Self {
        Self {
            fail_reads: true,
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Reads succeed (empty), writes fail.
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// Number of `put` calls, successful or not.
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn unreachable_error() -> CredenceError {
        CredenceError::Storage(StorageError::Unreachable {
            reason: "store offline".to_string(),
        })
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn get(&self, key: &CacheKey) -> CredenceResult<Option<CacheEntry>> {
        if self.fail_reads {
            return Err(Self::unreachable_error());
        }
        self.inner.get(key).await
    }

    async fn put(&self, key: &CacheKey, record: &VerificationRecord) -> CredenceResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes {
            return Err(Self::unreachable_error());
        }
        self.inner.put(key, record).await
    }

    async fn invalidate(&self, key: &CacheKey) -> CredenceResult<bool> {
        if self.fail_writes {
            return Err(Self::unreachable_error());
        }
        self.inner.invalidate(key).await
    }

    async fn stats(&self) -> CredenceResult<CacheStats> {
        self.inner.stats().await
    }
}

// ============================================================================
// SCRIPTED BROWSER
// ============================================================================

/// Counters observed across every session a [`ScriptedLauncher`] opens.
#[derive(Debug, Default)]
pub struct SessionStats {
    pub launched: AtomicUsize,
    pub closed: AtomicUsize,
    pub aborted: AtomicUsize,
    filled: Mutex<Vec<(String, String)>>,
    visited: Mutex<Vec<String>>,
}

impl SessionStats {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn aborted(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    /// `(selector, value)` pairs passed to `fill` and `select_option`.
    pub fn filled(&self) -> Vec<(String, String)> {
        self.filled.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

/// What scripted sessions do.
#[derive(Debug, Clone)]
pub struct BrowserScript {
    /// HTML returned by `content()`.
    pub page_html: String,
    /// Selectors that match an element on the page.
    pub present_selectors: HashSet<String>,
    /// Button captions found by the text scan.
    pub button_texts: Vec<String>,
    /// Navigation and selector waits never resolve.
    pub hang: bool,
    /// `close()` never resolves.
    pub hang_on_close: bool,
    pub fail_launch: bool,
}

impl BrowserScript {
    /// A form where the first selector of every default list matches.
    pub fn registry_page(page_html: impl Into<String>) -> Self {
        let selectors = RegistrySelectors::default();
        let present_selectors = [
            &selectors.license_field,
            &selectors.jurisdiction_field,
            &selectors.submit,
        ]
        .into_iter()
        .filter_map(|list| list.first().cloned())
        .collect();

        Self {
            page_html: page_html.into(),
            present_selectors,
            button_texts: Vec::new(),
            hang: false,
            hang_on_close: false,
            fail_launch: false,
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn hanging_on_close(mut self) -> Self {
        self.hang_on_close = true;
        self
    }

    pub fn without_selector(mut self, selector: &str) -> Self {
        self.present_selectors.remove(selector);
        self
    }

    pub fn with_button_text(mut self, text: &str) -> Self {
        self.button_texts.push(text.to_string());
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }
}

/// Launcher handing out [`ScriptedSession`]s.
#[derive(Debug, Clone)]
pub struct ScriptedLauncher {
    script: BrowserScript,
    stats: Arc<SessionStats>,
}

impl ScriptedLauncher {
    pub fn new(script: BrowserScript) -> Self {
        Self {
            script,
            stats: Arc::new(SessionStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<SessionStats> {
        Arc::clone(&self.stats)
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedLauncher {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        if self.script.fail_launch {
            return Err(BrowserError::Launch("no browser executable".to_string()));
        }
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: self.script.clone(),
            stats: Arc::clone(&self.stats),
        }))
    }
}

pub struct ScriptedSession {
    script: BrowserScript,
    stats: Arc<SessionStats>,
}

impl ScriptedSession {
    fn present(&self, selector: &str) -> bool {
        self.script.present_selectors.contains(selector)
    }

    fn record_fill(&self, selector: &str, value: &str) {
        if let Ok(mut filled) = self.stats.filled.lock() {
            filled.push((selector.to_string(), value.to_string()));
        }
    }
}

#[async_trait]
impl BrowserSession for ScriptedSession {
    async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        if let Ok(mut visited) = self.stats.visited.lock() {
            visited.push(url.to_string());
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.present(selector))
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        let present = self.present(selector);
        if present {
            self.record_fill(selector, value);
        }
        Ok(present)
    }

    async fn select_option(&self, selector: &str, value: &str) -> Result<bool, BrowserError> {
        self.fill(selector, value).await
    }

    async fn click_button_with_text(&self, text: &str) -> Result<bool, BrowserError> {
        Ok(self.script.button_texts.iter().any(|t| t.contains(text)))
    }

    async fn wait_for_navigation(&self) -> Result<(), BrowserError> {
        if self.script.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_for_selector(&self, _selector: &str) -> Result<(), BrowserError> {
        if self.script.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.script.page_html.clone())
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if self.script.hang_on_close {
            std::future::pending::<()>().await;
        }
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn abort(&self) {
        self.stats.aborted.fetch_add(1, Ordering::SeqCst);
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// Results page in the council portal's markup listing one physician.
pub fn registry_results_page(license_number: &str, full_name: &str, standing: &str) -> String {
    format!(
        r#"<html><body><div class="busca-resultado">
             <div class="resultado-item">
               <h4>{full_name}</h4>
               <span>CRM: {license_number}</span>
               <div class="situacao">{standing}</div>
               <div class="especialidade">Clínica Médica</div>
             </div>
           </div></body></html>"#
    )
}

/// Hit with every field present.
pub fn full_hit(full_name: &str) -> ProviderHit {
    ProviderHit::new(full_name)
        .with_specialty("Clínica Médica")
        .with_standing("Regular")
}

/// Record verified `days_ago` days before now.
pub fn record_verified_days_ago(provenance: Provenance, days_ago: i64) -> VerificationRecord {
    VerificationRecord::new(
        "Helena Barros",
        Some("Neurologia"),
        Standing::Active,
        provenance,
        Utc::now() - chrono::Duration::days(days_ago),
    )
}

/// Cache entry for `query` verified `days_ago` days before now.
pub fn entry_verified_days_ago(query: &VerificationQuery, days_ago: i64) -> CacheEntry {
    CacheEntry::new(
        query.cache_key(),
        record_verified_days_ago(Provenance::OfficialRegistry, days_ago),
    )
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Valid queries: 1-8 digit licenses, two-letter jurisdictions.
    pub fn arb_query() -> impl Strategy<Value = VerificationQuery> {
        ("[0-9]{1,8}", "[A-Z]{2}").prop_map(|(license, uf)| VerificationQuery::new(&license, &uf))
    }

    pub fn arb_standing() -> impl Strategy<Value = Standing> {
        prop::sample::select(Standing::ALL.to_vec())
    }

    pub fn arb_provenance() -> impl Strategy<Value = Provenance> {
        prop_oneof![
            Just(Provenance::Cache),
            Just(Provenance::OfficialRegistry),
            Just(Provenance::SearchIndex),
            Just(Provenance::StaticFallback),
        ]
    }

    /// Free text as a source page would phrase a standing.
    pub fn arb_standing_text() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("Ativo".to_string()),
            Just("Situação: Regular".to_string()),
            Just("INATIVO".to_string()),
            Just("Cancelado".to_string()),
            Just("Em análise".to_string()),
            ".*",
        ]
    }

    pub fn arb_full_name() -> impl Strategy<Value = String> {
        "[A-Za-z]{4,12}( [A-Za-z]{2,12}){1,3}"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_provider_counts_and_logs() {
        let log = CallLog::new();
        let provider = ScriptedProvider::failing(
            "index-a",
            Provenance::SearchIndex,
            ProviderFailure::NotFound,
        )
        .with_log(&log);

        let query = VerificationQuery::new("1", "SP");
        assert!(provider.attempt(&query).await.is_err());
        assert!(provider.attempt(&query).await.is_err());

        assert_eq!(provider.calls(), 2);
        assert_eq!(log.calls(), vec!["index-a", "index-a"]);
    }

    #[tokio::test]
    async fn test_failing_store_modes() {
        let key = VerificationQuery::new("1", "SP").cache_key();
        let record = record_verified_days_ago(Provenance::SearchIndex, 0);

        let store = FailingStore::failing_writes();
        assert!(store.get(&key).await.unwrap().is_none());
        assert!(store.put(&key, &record).await.is_err());
        assert_eq!(store.puts(), 1);

        let store = FailingStore::unreachable();
        assert!(store.get(&key).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_session_reports_selectors() {
        let launcher = ScriptedLauncher::new(BrowserScript::registry_page("<html></html>"));
        let session = launcher.launch().await.unwrap();

        assert!(session.fill("input[name='crm']", "240110").await.unwrap());
        assert!(!session.fill("#crm", "240110").await.unwrap());
        session.close().await.unwrap();

        let stats = launcher.stats();
        assert_eq!(stats.launched(), 1);
        assert_eq!(stats.closed(), 1);
        assert_eq!(
            stats.filled(),
            vec![("input[name='crm']".to_string(), "240110".to_string())]
        );
    }
}
