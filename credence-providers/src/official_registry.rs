//! Official council registry, driven through a headless browser.
//!
//! The lookup form is JavaScript-rendered, so this provider fills and
//! submits it in a real page and then extracts the result rows from the
//! rendered HTML.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use credence_core::{
    has_active_marker, Provenance, ProviderFailure, RegistrySourceConfig, VerificationQuery,
    MIN_NAME_LEN,
};
use scraper::Html;
use tokio::time::Instant;

use crate::browser::{BrowserLauncher, BrowserSession, SessionGuard};
use crate::html::{
    contains_digit_run, contains_not_found_marker, document_text, element_text, first_text,
    is_plausible_name, labeled_value, parse_selectors, SPECIALTY_LABELS, STANDING_LABELS,
};
use crate::{ProviderHit, VerificationProvider};

const PROVIDER_NAME: &str = "official-registry";

/// Bound on the graceful browser shutdown; past it the session is aborted.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Standing text recorded when only the page-level active marker was seen.
const ACTIVE_MARKER_TEXT: &str = "Ativo";

// ============================================================================
// SELECTORS
// ============================================================================

/// Ordered selector lists for every step of the lookup.
///
/// Each list is tried front to back; the first selector that matches wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySelectors {
    pub consent: Vec<String>,
    pub license_field: Vec<String>,
    pub jurisdiction_field: Vec<String>,
    pub submit: Vec<String>,
    /// Button captions used when no submit selector matches.
    pub submit_texts: Vec<String>,
    pub result_container: Vec<String>,
    pub rows: Vec<String>,
    pub name: Vec<String>,
    pub standing: Vec<String>,
    pub specialty: Vec<String>,
    pub headings: Vec<String>,
}

fn owned(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for RegistrySelectors {
    fn default() -> Self {
        Self {
            consent: owned(&[
                "#onetrust-accept-btn-handler",
                "button.cookie-accept",
                ".lgpd-aceitar",
            ]),
            license_field: owned(&["input[name='crm']", "#crm", "input[placeholder*='CRM']"]),
            jurisdiction_field: owned(&["select[name='uf']", "#uf"]),
            submit: owned(&[
                "button[type='submit']",
                "input[type='submit']",
                ".btn-buscar",
            ]),
            submit_texts: owned(&["Pesquisar", "Buscar"]),
            result_container: owned(&[".busca-resultado", ".resultado-item", "#resultado"]),
            rows: owned(&[".resultado-item", ".busca-resultado .row", "table tbody tr"]),
            name: owned(&[".nome", "h4", "strong", "td:first-child"]),
            standing: owned(&[".situacao", "[class*='situacao']", "td:nth-child(3)"]),
            specialty: owned(&[".especialidade", "[class*='especialidade']", "td:nth-child(4)"]),
            headings: owned(&["h1", "h2", "h3", "h4"]),
        }
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Extract the record for `license_number` from a rendered results page.
///
/// Rows are scanned for one whose text contains the license number; rows
/// whose name is shorter than the minimum are skipped as noise. When no row
/// matches but the page mentions the license alongside an active marker,
/// the first heading-like element is taken as the name.
pub fn extract_registry_hit(
    html: &str,
    license_number: &str,
    selectors: &RegistrySelectors,
) -> Result<ProviderHit, ProviderFailure> {
    let document = Html::parse_document(html);

    let row_selectors = parse_selectors(&selectors.rows)?;
    let name_selectors = parse_selectors(&selectors.name)?;
    let standing_selectors = parse_selectors(&selectors.standing)?;
    let specialty_selectors = parse_selectors(&selectors.specialty)?;

    for row_selector in &row_selectors {
        for row in document.select(row_selector) {
            if !contains_digit_run(&element_text(row), license_number) {
                continue;
            }

            let Some(full_name) = first_text(row, &name_selectors, MIN_NAME_LEN)
                .filter(|name| is_plausible_name(name))
            else {
                tracing::trace!(license = license_number, "skipping noise row");
                continue;
            };

            let standing_text = first_text(row, &standing_selectors, 1)
                .or_else(|| labeled_value(row, STANDING_LABELS));
            let specialty = first_text(row, &specialty_selectors, 1)
                .or_else(|| labeled_value(row, SPECIALTY_LABELS));

            return Ok(ProviderHit {
                full_name,
                specialty,
                standing_text,
            });
        }
    }

    let body = document_text(&document);
    if contains_digit_run(&body, license_number) && has_active_marker(&body) {
        let heading_selectors = parse_selectors(&selectors.headings)?;
        if let Some(full_name) = first_text(document.root_element(), &heading_selectors, MIN_NAME_LEN)
            .filter(|name| is_plausible_name(name))
        {
            return Ok(ProviderHit {
                full_name,
                specialty: labeled_value(document.root_element(), SPECIALTY_LABELS),
                standing_text: Some(ACTIVE_MARKER_TEXT.to_string()),
            });
        }
    }

    if !contains_not_found_marker(&body) {
        tracing::debug!(
            license = license_number,
            "no matching row and no explicit not-found marker"
        );
    }
    Err(ProviderFailure::NotFound)
}

// ============================================================================
// PROVIDER
// ============================================================================

/// Browser-driven lookup against the council's public search form.
pub struct OfficialRegistryProvider {
    launcher: Arc<dyn BrowserLauncher>,
    url: String,
    timeout: Duration,
    selectors: RegistrySelectors,
}

impl OfficialRegistryProvider {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: &RegistrySourceConfig) -> Self {
        Self {
            launcher,
            url: config.url.clone(),
            timeout: config.timeout,
            selectors: RegistrySelectors::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: RegistrySelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the form flow in an open session and extract the hit.
    async fn drive(
        &self,
        session: &dyn BrowserSession,
        query: &VerificationQuery,
    ) -> Result<ProviderHit, ProviderFailure> {
        session.goto(&self.url).await?;

        // Overlay may not exist; ignore every outcome.
        for selector in &self.selectors.consent {
            match session.click(selector).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => tracing::debug!(selector = %selector, error = %e, "consent click failed"),
            }
        }

        if !fill_first(session, &self.selectors.license_field, query.license_number()).await? {
            return Err(ProviderFailure::parse("license field not found"));
        }
        if !select_first(session, &self.selectors.jurisdiction_field, query.jurisdiction()).await? {
            return Err(ProviderFailure::parse("jurisdiction field not found"));
        }
        if !self.submit(session).await? {
            return Err(ProviderFailure::parse("submit control not found"));
        }

        let container = self.selectors.result_container.join(", ");
        tokio::select! {
            Ok(()) = session.wait_for_navigation() => {}
            Ok(()) = session.wait_for_selector(&container), if !container.is_empty() => {}
            else => return Err(ProviderFailure::parse("results never appeared")),
        }

        let html = session.content().await?;
        extract_registry_hit(&html, query.license_number(), &self.selectors)
    }

    /// Primary submit selectors first, then a text scan over all buttons.
    async fn submit(&self, session: &dyn BrowserSession) -> Result<bool, ProviderFailure> {
        for selector in &self.selectors.submit {
            if session.click(selector).await? {
                return Ok(true);
            }
        }
        for text in &self.selectors.submit_texts {
            if session.click_button_with_text(text).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

async fn fill_first(
    session: &dyn BrowserSession,
    selectors: &[String],
    value: &str,
) -> Result<bool, ProviderFailure> {
    for selector in selectors {
        if session.fill(selector, value).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn select_first(
    session: &dyn BrowserSession,
    selectors: &[String],
    value: &str,
) -> Result<bool, ProviderFailure> {
    for selector in selectors {
        if session.select_option(selector, value).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[async_trait]
impl VerificationProvider for OfficialRegistryProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn provenance(&self) -> Provenance {
        Provenance::OfficialRegistry
    }

    async fn attempt(&self, query: &VerificationQuery) -> Result<ProviderHit, ProviderFailure> {
        let deadline = Instant::now() + self.timeout;
        let timed_out = ProviderFailure::Timeout {
            after: self.timeout,
        };

        let session = tokio::time::timeout_at(deadline, self.launcher.launch())
            .await
            .map_err(|_| timed_out.clone())??;
        let guard = SessionGuard::new(session);

        let outcome = tokio::time::timeout_at(deadline, self.drive(guard.session(), query))
            .await
            .unwrap_or(Err(timed_out));

        // On expiry the release future drops the guard, which aborts.
        match tokio::time::timeout(CLOSE_TIMEOUT, guard.release()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(provider = PROVIDER_NAME, error = %e, "browser session close failed")
            }
            Err(_) => tracing::warn!(
                provider = PROVIDER_NAME,
                after = ?CLOSE_TIMEOUT,
                "browser session close timed out, aborted"
            ),
        }

        outcome
    }
}

impl std::fmt::Debug for OfficialRegistryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfficialRegistryProvider")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}
