//! CREDENCE Core - Verification Types
//!
//! Value types shared by every other crate: the query, the resolved record,
//! the standing/provenance enums, the status normalizer and the error
//! taxonomy. This crate has no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config;
pub mod enums;
pub mod error;
pub mod normalize;

pub use config::{IndexSourceConfig, RegistrySourceConfig, ResolverConfig};
pub use enums::{Provenance, Standing};
pub use error::{
    ConfigError, CredenceError, CredenceResult, ProviderFailure, StorageError, ValidationError,
};
pub use normalize::{has_active_marker, normalize, normalize_opt};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Specialty reported when no source provides one.
pub const DEFAULT_SPECIALTY: &str = "Médico";

/// Names shorter than this are treated as extraction noise.
pub const MIN_NAME_LEN: usize = 4;

// ============================================================================
// QUERY
// ============================================================================

/// Immutable verification input.
///
/// Construction always normalizes: non-digits are stripped from the license
/// number and the jurisdiction is trimmed and upper-cased. Use
/// [`VerificationQuery::validate`] before resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationQuery {
    license_number: String,
    jurisdiction: String,
}

impl VerificationQuery {
    pub fn new(license_number: &str, jurisdiction: &str) -> Self {
        Self {
            license_number: license_number
                .chars()
                .filter(|c| c.is_ascii_digit())
                .collect(),
            jurisdiction: jurisdiction.trim().to_uppercase(),
        }
    }

    pub fn license_number(&self) -> &str {
        &self.license_number
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// Reject queries that cannot identify a license.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.license_number.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "license_number".to_string(),
            });
        }
        if self.jurisdiction.is_empty() {
            return Err(ValidationError::RequiredFieldMissing {
                field: "jurisdiction".to_string(),
            });
        }
        if self.jurisdiction.len() != 2 || !self.jurisdiction.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidValue {
                field: "jurisdiction".to_string(),
                reason: format!("expected a 2-letter code, got {:?}", self.jurisdiction),
            });
        }
        Ok(())
    }

    /// Identity key used by the record cache.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey {
            license_number: self.license_number.clone(),
            jurisdiction: self.jurisdiction.clone(),
        }
    }
}

impl fmt::Display for VerificationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.jurisdiction, self.license_number)
    }
}

// ============================================================================
// CACHE KEY
// ============================================================================

/// Cache identity: `(license_number, jurisdiction)`.
///
/// Only obtainable from a [`VerificationQuery`], so keys are always
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey {
    license_number: String,
    jurisdiction: String,
}

impl CacheKey {
    pub fn license_number(&self) -> &str {
        &self.license_number
    }

    pub fn jurisdiction(&self) -> &str {
        &self.jurisdiction
    }

    /// Stable string form, `"{JURISDICTION}:{license}"`, used by persistent stores.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.jurisdiction, self.license_number)
    }

    /// Parse the string form produced by [`CacheKey::encode`].
    pub fn decode(raw: &str) -> Option<Self> {
        let (jurisdiction, license_number) = raw.split_once(':')?;
        let query = VerificationQuery::new(license_number, jurisdiction);
        query.validate().ok()?;
        Some(query.cache_key())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

// ============================================================================
// RECORD
// ============================================================================

/// A resolved professional identity.
///
/// Every record carries a [`Provenance`]; there is no way to build one
/// without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Upper-cased for display consistency
    pub full_name: String,
    pub specialty: String,
    pub standing: Standing,
    pub provenance: Provenance,
    pub verified_at: Timestamp,
}

impl VerificationRecord {
    /// Build a record, applying display normalization: the name is trimmed
    /// and upper-cased, a blank specialty becomes [`DEFAULT_SPECIALTY`].
    pub fn new(
        full_name: &str,
        specialty: Option<&str>,
        standing: Standing,
        provenance: Provenance,
        verified_at: Timestamp,
    ) -> Self {
        let specialty = specialty
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SPECIALTY);

        Self {
            full_name: collapse_whitespace(full_name).to_uppercase(),
            specialty: collapse_whitespace(specialty),
            standing,
            provenance,
            verified_at,
        }
    }

    /// Same record, relabelled with another provenance.
    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Collapse runs of whitespace (including newlines from page markup) to
/// single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// UNIT TESTS
// ============================================================================
