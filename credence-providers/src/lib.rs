//! CREDENCE Providers - Verification Sources
//!
//! Every source implements [`VerificationProvider`]: one `attempt` per
//! query, returning either a raw [`ProviderHit`] or a [`ProviderFailure`].
//! Providers never see the resolver or the cache and each one enforces its
//! own timeout.
//!
//! - [`OfficialRegistryProvider`] drives a headless browser through the
//!   council lookup form (see [`browser`]).
//! - [`SearchIndexProvider`] fetches a third-party profile page over HTTP.
//! - [`StaticFallbackProvider`] answers from a fixed in-memory table.

use async_trait::async_trait;
use credence_core::{Provenance, ProviderFailure, VerificationQuery};

pub mod browser;
#[cfg(feature = "chromium")]
pub mod chromium;
pub mod html;
pub mod official_registry;
pub mod search_index;
pub mod static_fallback;

pub use browser::{BrowserError, BrowserLauncher, BrowserSession, SessionGuard};
#[cfg(feature = "chromium")]
pub use chromium::ChromiumLauncher;
pub use official_registry::{OfficialRegistryProvider, RegistrySelectors};
pub use search_index::{SearchIndexProvider, SearchIndexSource};
pub use static_fallback::{StaticEntry, StaticFallbackProvider};

// ============================================================================
// PROVIDER HIT
// ============================================================================

/// Raw identity extracted by a provider, before normalization.
///
/// The resolver upper-cases the name, defaults the specialty and maps
/// `standing_text` through the status normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHit {
    pub full_name: String,
    pub specialty: Option<String>,
    pub standing_text: Option<String>,
}

impl ProviderHit {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            specialty: None,
            standing_text: None,
        }
    }

    pub fn with_specialty(mut self, specialty: impl Into<String>) -> Self {
        self.specialty = Some(specialty.into());
        self
    }

    pub fn with_standing(mut self, standing_text: impl Into<String>) -> Self {
        self.standing_text = Some(standing_text.into());
        self
    }
}

// ============================================================================
// PROVIDER TRAIT
// ============================================================================

/// A single verification source.
#[async_trait]
pub trait VerificationProvider: Send + Sync {
    /// Stable identifier used in logs and resolution traces.
    fn name(&self) -> &str;

    /// Provenance stamped on records this provider produces.
    fn provenance(&self) -> Provenance;

    /// Look up one license. Must return within the provider's own timeout.
    async fn attempt(&self, query: &VerificationQuery) -> Result<ProviderHit, ProviderFailure>;
}

#[cfg(test)]
mod prop_tests {
    use super::official_registry::{extract_registry_hit, RegistrySelectors};
    use super::search_index::extract_index_hit;
    use credence_core::MIN_NAME_LEN;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_index_extraction_is_total(markup in ".{0,200}") {
            let _ = extract_index_hit(&markup);
        }

        #[test]
        fn prop_registry_extraction_is_total(markup in ".{0,200}", license in "[0-9]{1,8}") {
            let _ = extract_registry_hit(&markup, &license, &RegistrySelectors::default());
        }

        #[test]
        fn prop_extracted_index_names_are_long_enough(name in "[A-Za-z ]{0,20}") {
            let markup = format!("<h1>{name}</h1>");
            if let Ok(hit) = extract_index_hit(&markup) {
                prop_assert!(hit.full_name.chars().count() >= MIN_NAME_LEN);
            }
        }
    }
}
