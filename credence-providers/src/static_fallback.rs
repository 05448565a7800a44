//! Fixed in-memory table of known licenses.
//!
//! Answers instantly and never fails for a known key. Used for demos and as
//! the last slot of the chain.

use std::collections::HashMap;

use async_trait::async_trait;
use credence_core::{CacheKey, Provenance, ProviderFailure, VerificationQuery};

use crate::{ProviderHit, VerificationProvider};

const PROVIDER_NAME: &str = "static-fallback";

/// One row of the static table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEntry {
    pub license_number: &'static str,
    pub jurisdiction: &'static str,
    pub full_name: &'static str,
    pub specialty: &'static str,
    pub standing_text: &'static str,
}

/// Built-in demo table.
pub const BUILTIN_ENTRIES: &[StaticEntry] = &[
    StaticEntry {
        license_number: "240110",
        jurisdiction: "SP",
        full_name: "LUCAS HENRIQUE FERREIRA DOS SANTOS",
        specialty: "Radiologia e Diagnóstico por Imagem",
        standing_text: "Ativo",
    },
    StaticEntry {
        license_number: "118523",
        jurisdiction: "SP",
        full_name: "JULIANA MARTINS OLIVEIRA",
        specialty: "Radiologia e Diagnóstico por Imagem",
        standing_text: "Ativo",
    },
    StaticEntry {
        license_number: "52847",
        jurisdiction: "RJ",
        full_name: "RICARDO ALMEIDA CARVALHO",
        specialty: "Cardiologia",
        standing_text: "Ativo",
    },
    StaticEntry {
        license_number: "33019",
        jurisdiction: "MG",
        full_name: "PATRICIA GOMES TEIXEIRA",
        specialty: "Medicina do Trabalho",
        standing_text: "Inativo",
    },
];

/// Table-backed provider.
#[derive(Debug, Clone)]
pub struct StaticFallbackProvider {
    entries: HashMap<CacheKey, ProviderHit>,
}

impl Default for StaticFallbackProvider {
    fn default() -> Self {
        Self::with_entries(BUILTIN_ENTRIES.iter().cloned())
    }
}

impl StaticFallbackProvider {
    /// Provider holding only the built-in table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider holding only `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = StaticEntry>) -> Self {
        let mut provider = Self {
            entries: HashMap::new(),
        };
        provider.extend(entries);
        provider
    }

    /// Add entries; later rows replace earlier ones for the same key.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = StaticEntry>) {
        for entry in entries {
            let key = VerificationQuery::new(entry.license_number, entry.jurisdiction).cache_key();
            let hit = ProviderHit::new(entry.full_name)
                .with_specialty(entry.specialty)
                .with_standing(entry.standing_text);
            self.entries.insert(key, hit);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VerificationProvider for StaticFallbackProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn provenance(&self) -> Provenance {
        Provenance::StaticFallback
    }

    async fn attempt(&self, query: &VerificationQuery) -> Result<ProviderHit, ProviderFailure> {
        self.entries
            .get(&query.cache_key())
            .cloned()
            .ok_or(ProviderFailure::NotFound)
    }
}
