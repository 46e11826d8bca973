//! Process-wide node context — explicit, not ambient.
//!
//! Everything that would otherwise live in a global static (the advertised
//! capability set, the base-currency context) hangs off a [`NodeContext`]
//! that startup constructs and passes to subsystems. Both slots are
//! write-once: the startup sequencer sets them before any subsystem reads
//! them, and nothing may mutate them afterwards.

use std::sync::OnceLock;

use crate::capabilities::CapabilitySet;
use crate::error::AppError;

/// Base-currency context set before any subsystem construction reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseCurrency {
    pub code: String,
    pub name: String,
}

/// Shared read-mostly node state. Cheap to share via `Arc`.
#[derive(Debug, Default)]
pub struct NodeContext {
    capabilities: OnceLock<CapabilitySet>,
    base_currency: OnceLock<BaseCurrency>,
}

impl NodeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Establish the advertised capability set. Errors if already set.
    pub fn set_capabilities(&self, set: CapabilitySet) -> Result<(), AppError> {
        self.capabilities
            .set(set)
            .map_err(|_| AppError::Capability("capability set already established".into()))
    }

    /// The advertised capability set, once startup has established it.
    pub fn capabilities(&self) -> Option<&CapabilitySet> {
        self.capabilities.get()
    }

    /// Set the base-currency context. Errors if already set.
    pub fn set_base_currency(&self, currency: BaseCurrency) -> Result<(), AppError> {
        self.base_currency
            .set(currency)
            .map_err(|_| AppError::Capability("base currency already set".into()))
    }

    pub fn base_currency(&self) -> Option<&BaseCurrency> {
        self.base_currency.get()
    }
}
