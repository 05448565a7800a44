//! Fixed-priority provider chain.
//!
//! Providers live in named slots and are always visited in slot order,
//! whatever order they were registered in. History never reorders them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use credence_providers::VerificationProvider;

/// Position in the chain. Declaration order is priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProviderSlot {
    OfficialRegistry,
    PrimaryIndex,
    SecondaryIndex,
    StaticFallback,
}

impl ProviderSlot {
    pub const ALL: [ProviderSlot; 4] = [
        ProviderSlot::OfficialRegistry,
        ProviderSlot::PrimaryIndex,
        ProviderSlot::SecondaryIndex,
        ProviderSlot::StaticFallback,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderSlot::OfficialRegistry => "official_registry",
            ProviderSlot::PrimaryIndex => "primary_index",
            ProviderSlot::SecondaryIndex => "secondary_index",
            ProviderSlot::StaticFallback => "static_fallback",
        }
    }
}

impl fmt::Display for ProviderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Providers keyed by slot. Empty slots are disabled.
#[derive(Clone, Default)]
pub struct ProviderChain {
    slots: BTreeMap<ProviderSlot, Arc<dyn VerificationProvider>>,
}

impl ProviderChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`ProviderChain::set`].
    pub fn with(mut self, slot: ProviderSlot, provider: Arc<dyn VerificationProvider>) -> Self {
        self.set(slot, provider);
        self
    }

    /// Put a provider in a slot, returning the one it replaces.
    pub fn set(
        &mut self,
        slot: ProviderSlot,
        provider: Arc<dyn VerificationProvider>,
    ) -> Option<Arc<dyn VerificationProvider>> {
        self.slots.insert(slot, provider)
    }

    pub fn disable(&mut self, slot: ProviderSlot) -> Option<Arc<dyn VerificationProvider>> {
        self.slots.remove(&slot)
    }

    pub fn get(&self, slot: ProviderSlot) -> Option<&Arc<dyn VerificationProvider>> {
        self.slots.get(&slot)
    }

    /// Enabled providers in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderSlot, &Arc<dyn VerificationProvider>)> {
        self.slots.iter().map(|(slot, provider)| (*slot, provider))
    }

    pub fn enabled_slots(&self) -> Vec<ProviderSlot> {
        self.slots.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.slots
                    .iter()
                    .map(|(slot, provider)| (slot.as_str(), provider.name())),
            )
            .finish()
    }
}
