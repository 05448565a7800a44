//! Third-party search-index profile pages, fetched over plain HTTP.

use std::time::Duration;

use async_trait::async_trait;
use credence_core::config::{JURISDICTION_PLACEHOLDER, LICENSE_PLACEHOLDER};
use credence_core::{ConfigError, IndexSourceConfig, Provenance, ProviderFailure, VerificationQuery};
use reqwest::{Client, StatusCode};
use scraper::Html;

use crate::html::{
    first_text, is_plausible_name, labeled_value, parse_selectors, SPECIALTY_LABELS,
    STANDING_LABELS,
};
use crate::{ProviderHit, VerificationProvider};

/// Heading-like elements holding the profile name, most specific first.
const NAME_SELECTORS: &[&str] = &["h1", "h2", ".profile-name", "h3"];

/// One configured index site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchIndexSource {
    pub name: String,
    /// Contains `{license}` and optionally `{jurisdiction}`.
    pub url_template: String,
    pub timeout: Duration,
}

impl SearchIndexSource {
    pub fn url_for(&self, query: &VerificationQuery) -> String {
        self.url_template
            .replace(LICENSE_PLACEHOLDER, query.license_number())
            .replace(JURISDICTION_PLACEHOLDER, query.jurisdiction())
    }
}

impl From<&IndexSourceConfig> for SearchIndexSource {
    fn from(config: &IndexSourceConfig) -> Self {
        Self {
            name: config.name.clone(),
            url_template: config.url_template.clone(),
            timeout: config.timeout,
        }
    }
}

/// Extract a profile from an index page.
///
/// The first heading is the name; specialty and standing come from the
/// "Especialidade:" and "Situação:" labels. Names carrying a not-found
/// message or shorter than the minimum mean there is no profile.
pub fn extract_index_hit(html: &str) -> Result<ProviderHit, ProviderFailure> {
    let document = Html::parse_document(html);
    let name_selectors = parse_selectors(NAME_SELECTORS)?;

    let Some(full_name) = first_text(document.root_element(), &name_selectors, 1) else {
        return Err(ProviderFailure::parse("page has no heading"));
    };

    if !is_plausible_name(&full_name) {
        return Err(ProviderFailure::NotFound);
    }

    Ok(ProviderHit {
        full_name,
        specialty: labeled_value(document.root_element(), SPECIALTY_LABELS),
        standing_text: labeled_value(document.root_element(), STANDING_LABELS),
    })
}

/// HTTP GET + HTML extraction against one index site.
pub struct SearchIndexProvider {
    client: Client,
    source: SearchIndexSource,
}

impl SearchIndexProvider {
    /// Build a provider with its own client; the source timeout bounds the
    /// whole request including the body.
    pub fn new(source: SearchIndexSource, user_agent: &str) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(source.timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: format!("{}.client", source.name),
                value: user_agent.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self { client, source })
    }

    pub fn source(&self) -> &SearchIndexSource {
        &self.source
    }

    fn map_transport(&self, e: reqwest::Error) -> ProviderFailure {
        if e.is_timeout() {
            ProviderFailure::Timeout {
                after: self.source.timeout,
            }
        } else {
            ProviderFailure::transport(e.to_string())
        }
    }
}

#[async_trait]
impl VerificationProvider for SearchIndexProvider {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn provenance(&self) -> Provenance {
        Provenance::SearchIndex
    }

    async fn attempt(&self, query: &VerificationQuery) -> Result<ProviderHit, ProviderFailure> {
        let url = self.source.url_for(query);
        tracing::debug!(provider = %self.source.name, url = %url, "fetching index page");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderFailure::NotFound);
        }
        if !status.is_success() {
            return Err(ProviderFailure::transport(format!("HTTP {}", status.as_u16())));
        }

        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        extract_index_hit(&body)
    }
}

impl std::fmt::Debug for SearchIndexProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIndexProvider")
            .field("source", &self.source)
            .finish()
    }
}
