//! Resolver Configuration Module
//!
//! Configuration is loaded from environment variables with defaults suitable
//! for development. Every duration is validated before a resolver is built.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// DEFAULTS
// ============================================================================

/// Cached records are trusted for this many days.
pub const DEFAULT_FRESHNESS_DAYS: u64 = 30;

/// Federal council public lookup form.
pub const DEFAULT_REGISTRY_URL: &str = "https://portal.cfm.org.br/busca-medicos/";

/// Browser automation needs page loads, rendering and a form round-trip.
pub const DEFAULT_REGISTRY_TIMEOUT_SECS: u64 = 30;

/// Plain HTTP index pages are fetched without rendering.
pub const DEFAULT_INDEX_TIMEOUT_SECS: u64 = 8;

pub const DEFAULT_CACHE_MAX_MB: usize = 64;

/// Placeholder substituted with the normalized license number.
pub const LICENSE_PLACEHOLDER: &str = "{license}";

/// Placeholder substituted with the upper-case jurisdiction code.
pub const JURISDICTION_PLACEHOLDER: &str = "{jurisdiction}";

// ============================================================================
// SOURCE CONFIGURATION
// ============================================================================

/// Configuration for one search-index source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSourceConfig {
    /// Stable name used in logs and traces.
    pub name: String,
    /// URL template containing `{license}` and optionally `{jurisdiction}`.
    pub url_template: String,
    pub timeout: Duration,
}

/// Configuration for the official registry source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySourceConfig {
    pub enabled: bool,
    pub url: String,
    /// Overall bound for one browser-driven lookup.
    pub timeout: Duration,
}

// ============================================================================
// RESOLVER CONFIGURATION
// ============================================================================

/// Resolver configuration: freshness policy, sources, cache location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Cached records younger than this are served without re-verification.
    pub freshness_window: Duration,

    pub registry: RegistrySourceConfig,

    /// Primary search index (slot A). `None` disables the slot.
    pub primary_index: Option<IndexSourceConfig>,

    /// Secondary search index (slot B). `None` disables the slot.
    pub secondary_index: Option<IndexSourceConfig>,

    pub static_fallback_enabled: bool,

    /// User agent sent by HTTP sources.
    pub user_agent: String,

    /// LMDB directory for the persistent cache. `None` keeps the cache in memory.
    pub cache_path: Option<String>,

    pub cache_max_mb: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            freshness_window: window_from_days(DEFAULT_FRESHNESS_DAYS),
            registry: RegistrySourceConfig {
                enabled: true,
                url: DEFAULT_REGISTRY_URL.to_string(),
                timeout: Duration::from_secs(DEFAULT_REGISTRY_TIMEOUT_SECS),
            },
            primary_index: None,
            secondary_index: None,
            static_fallback_enabled: true,
            user_agent: default_user_agent(),
            cache_path: None,
            cache_max_mb: DEFAULT_CACHE_MAX_MB,
        }
    }
}

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Freshness window for a day count, saturating on absurd values.
fn window_from_days(days: u64) -> Duration {
    Duration::from_secs(days.saturating_mul(SECS_PER_DAY))
}

/// Bytes in `mb` megabytes, or `None` on overflow.
pub fn megabytes_to_bytes(mb: usize) -> Option<usize> {
    mb.checked_mul(1024 * 1024)
}

fn default_user_agent() -> String {
    format!("credence/{}", env!("CARGO_PKG_VERSION"))
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| {
            let s = s.trim().to_lowercase();
            s == "true" || s == "1"
        })
        .unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl ResolverConfig {
    /// Create ResolverConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CREDENCE_FRESHNESS_DAYS`: Cache freshness window in days (default: 30)
    /// - `CREDENCE_REGISTRY_ENABLED`: "true" or "false" (default: true)
    /// - `CREDENCE_REGISTRY_URL`: Official lookup form URL
    /// - `CREDENCE_REGISTRY_TIMEOUT_SECS`: Browser lookup bound (default: 30)
    /// - `CREDENCE_INDEX_A_URL` / `CREDENCE_INDEX_B_URL`: Index URL templates (unset = disabled)
    /// - `CREDENCE_INDEX_TIMEOUT_SECS`: Index request timeout (default: 8)
    /// - `CREDENCE_STATIC_FALLBACK_ENABLED`: "true" or "false" (default: true)
    /// - `CREDENCE_USER_AGENT`: User agent for HTTP sources
    /// - `CREDENCE_CACHE_PATH`: LMDB directory (unset = in-memory cache)
    /// - `CREDENCE_CACHE_MAX_MB`: LMDB map size (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let freshness_days = env_parse("CREDENCE_FRESHNESS_DAYS", DEFAULT_FRESHNESS_DAYS);
        let index_timeout = Duration::from_secs(env_parse(
            "CREDENCE_INDEX_TIMEOUT_SECS",
            DEFAULT_INDEX_TIMEOUT_SECS,
        ));

        let index_source = |name: &str, key: &str| {
            env_string(key).map(|url_template| IndexSourceConfig {
                name: name.to_string(),
                url_template,
                timeout: index_timeout,
            })
        };

        Self {
            freshness_window: window_from_days(freshness_days),
            registry: RegistrySourceConfig {
                enabled: env_flag("CREDENCE_REGISTRY_ENABLED", true),
                url: env_string("CREDENCE_REGISTRY_URL").unwrap_or(defaults.registry.url),
                timeout: Duration::from_secs(env_parse(
                    "CREDENCE_REGISTRY_TIMEOUT_SECS",
                    DEFAULT_REGISTRY_TIMEOUT_SECS,
                )),
            },
            primary_index: index_source("search-index-a", "CREDENCE_INDEX_A_URL"),
            secondary_index: index_source("search-index-b", "CREDENCE_INDEX_B_URL"),
            static_fallback_enabled: env_flag("CREDENCE_STATIC_FALLBACK_ENABLED", true),
            user_agent: env_string("CREDENCE_USER_AGENT").unwrap_or(defaults.user_agent),
            cache_path: env_string("CREDENCE_CACHE_PATH"),
            cache_max_mb: env_parse("CREDENCE_CACHE_MAX_MB", DEFAULT_CACHE_MAX_MB),
        }
    }

    /// Configuration with every live source disabled.
    ///
    /// Only the static fallback answers; useful for demos and offline tests.
    pub fn offline() -> Self {
        let mut config = Self::default();
        config.registry.enabled = false;
        config.primary_index = None;
        config.secondary_index = None;
        config
    }

    /// Check invariants that would otherwise surface as confusing runtime
    /// behavior (zero timeouts, templates that ignore the license number).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.freshness_window.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "freshness_window".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        if self.registry.enabled {
            if self.registry.url.trim().is_empty() {
                return Err(ConfigError::MissingRequired {
                    field: "registry.url".to_string(),
                });
            }
            if self.registry.timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: "registry.timeout".to_string(),
                    value: "0".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }

        for source in [&self.primary_index, &self.secondary_index].into_iter().flatten() {
            if !source.url_template.contains(LICENSE_PLACEHOLDER) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.url_template", source.name),
                    value: source.url_template.clone(),
                    reason: format!("must contain {}", LICENSE_PLACEHOLDER),
                });
            }
            if source.timeout.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.timeout", source.name),
                    value: "0".to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }

        if self.cache_path.is_some() && self.cache_max_mb == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_mb".to_string(),
                value: "0".to_string(),
                reason: "must be positive when a cache path is set".to_string(),
            });
        }
        if megabytes_to_bytes(self.cache_max_mb).is_none() {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_mb".to_string(),
                value: self.cache_max_mb.to_string(),
                reason: "map size overflows".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(template: &str) -> IndexSourceConfig {
        IndexSourceConfig {
            name: "search-index-a".to_string(),
            url_template: template.to_string(),
            timeout: Duration::from_secs(DEFAULT_INDEX_TIMEOUT_SECS),
        }
    }

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert_eq!(config.freshness_window, Duration::from_secs(30 * 86_400));
        assert!(config.registry.enabled);
        assert_eq!(config.registry.url, DEFAULT_REGISTRY_URL);
        assert_eq!(config.registry.timeout, Duration::from_secs(30));
        assert!(config.primary_index.is_none());
        assert!(config.secondary_index.is_none());
        assert!(config.static_fallback_enabled);
        assert!(config.user_agent.starts_with("credence/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_offline_disables_live_sources() {
        let config = ResolverConfig::offline();
        assert!(!config.registry.enabled);
        assert!(config.primary_index.is_none());
        assert!(config.static_fallback_enabled);
    }

    #[test]
    fn test_validate_rejects_template_without_license() {
        let config = ResolverConfig {
            primary_index: Some(index("https://index.example/{jurisdiction}")),
            ..ResolverConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "search-index-a.url_template"));
    }

    #[test]
    fn test_validate_accepts_full_template() {
        let config = ResolverConfig {
            primary_index: Some(index("https://index.example/{jurisdiction}/{license}")),
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_freshness() {
        let config = ResolverConfig {
            freshness_window: Duration::ZERO,
            ..ResolverConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_freshness_days_saturates() {
        assert_eq!(window_from_days(30), Duration::from_secs(30 * 86_400));
        assert_eq!(window_from_days(u64::MAX), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_validate_rejects_overflowing_cache_size() {
        let config = ResolverConfig {
            cache_path: Some("/tmp/credence".to_string()),
            cache_max_mb: usize::MAX,
            ..ResolverConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "cache_max_mb"));
        assert_eq!(megabytes_to_bytes(64), Some(64 * 1024 * 1024));
    }

    #[test]
    fn test_validate_ignores_disabled_registry_url() {
        let mut config = ResolverConfig::offline();
        config.registry.url = String::new();
        assert!(config.validate().is_ok());
    }
}
