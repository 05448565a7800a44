//! Enum types for verification records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// STANDING
// ============================================================================

/// Normalized professional standing of a license holder.
///
/// Produced by [`crate::normalize`] from whatever free text a source reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Standing {
    /// License is regular and the holder may practice
    Active,
    /// License exists but the holder is not practicing
    Inactive,
    /// Standing could not be determined and needs human review
    Pending,
    /// License was cancelled or revoked
    Cancelled,
}

impl Standing {
    /// All standing values, in declaration order.
    pub const ALL: [Standing; 4] = [
        Standing::Active,
        Standing::Inactive,
        Standing::Pending,
        Standing::Cancelled,
    ];

    /// Canonical upper-case name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Standing::Active => "ACTIVE",
            Standing::Inactive => "INACTIVE",
            Standing::Pending => "PENDING",
            Standing::Cancelled => "CANCELLED",
        }
    }

    /// Whether the holder is currently cleared to practice.
    pub fn is_active(&self) -> bool {
        matches!(self, Standing::Active)
    }
}

impl fmt::Display for Standing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Standing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Standing::Active),
            "INACTIVE" => Ok(Standing::Inactive),
            "PENDING" => Ok(Standing::Pending),
            "CANCELLED" => Ok(Standing::Cancelled),
            other => Err(format!("unknown standing: {}", other)),
        }
    }
}

// ============================================================================
// PROVENANCE
// ============================================================================

/// Which source ultimately produced a verification record.
///
/// Callers use this to decide how much to trust a record: an official
/// registry match is authoritative, a static fallback is a demo record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Served from a fresh cache entry
    Cache,
    /// Official council registry, via browser automation
    OfficialRegistry,
    /// Public search index page
    SearchIndex,
    /// Built-in table of known records
    StaticFallback,
}

impl Provenance {
    /// Canonical upper-case name, as used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "CACHE",
            Provenance::OfficialRegistry => "OFFICIAL_REGISTRY",
            Provenance::SearchIndex => "SEARCH_INDEX",
            Provenance::StaticFallback => "STATIC_FALLBACK",
        }
    }

    /// Whether this provenance came from a live external source.
    pub fn is_live(&self) -> bool {
        matches!(self, Provenance::OfficialRegistry | Provenance::SearchIndex)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CACHE" => Ok(Provenance::Cache),
            "OFFICIAL_REGISTRY" => Ok(Provenance::OfficialRegistry),
            "SEARCH_INDEX" => Ok(Provenance::SearchIndex),
            "STATIC_FALLBACK" => Ok(Provenance::StaticFallback),
            other => Err(format!("unknown provenance: {}", other)),
        }
    }
}
