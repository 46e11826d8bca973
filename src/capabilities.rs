//! Capability flags this node advertises to peers.
//!
//! A capability describes protocol/data support (e.g. "I can serve trade
//! statistics"). The set a node advertises is established exactly once during
//! startup — before the network subsystem announces presence — and is
//! read-only afterwards. See [`crate::context::NodeContext`].

use std::collections::BTreeSet;
use std::fmt;

/// A single advertised capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Capability {
    TradeStatistics,
    TradeStatistics2,
    AccountAgeWitness,
    CompensationRequest,
}

impl Capability {
    /// Stable wire ordinal, matching the order peers expect.
    pub fn ordinal(self) -> u32 {
        match self {
            Capability::TradeStatistics => 0,
            Capability::TradeStatistics2 => 1,
            Capability::AccountAgeWitness => 2,
            Capability::CompensationRequest => 3,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::TradeStatistics => "trade_statistics",
            Capability::TradeStatistics2 => "trade_statistics_2",
            Capability::AccountAgeWitness => "account_age_witness",
            Capability::CompensationRequest => "compensation_request",
        };
        f.write_str(name)
    }
}

/// Immutable-after-construction set of advertised capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilitySet {
    flags: BTreeSet<Capability>,
}

impl CapabilitySet {
    pub fn new(flags: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            flags: flags.into_iter().collect(),
        }
    }

    /// The full set a statistics node advertises.
    pub fn statistics_node() -> Self {
        Self::new([
            Capability::TradeStatistics,
            Capability::TradeStatistics2,
            Capability::AccountAgeWitness,
            Capability::CompensationRequest,
        ])
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.flags.contains(&cap)
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    /// Wire ordinals, ascending.
    pub fn ordinals(&self) -> Vec<u32> {
        self.flags.iter().map(|c| c.ordinal()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.flags.iter().copied()
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for cap in &self.flags {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{cap}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statistics_node_set_is_complete() {
        let set = CapabilitySet::statistics_node();
        assert_eq!(set.len(), 4);
        assert!(set.contains(Capability::TradeStatistics));
        assert!(set.contains(Capability::CompensationRequest));
        assert!(!set.is_empty());
    }

    #[test]
    fn ordinals_are_stable_and_ascending() {
        let set = CapabilitySet::statistics_node();
        assert_eq!(set.ordinals(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn duplicate_flags_collapse() {
        let set = CapabilitySet::new([
            Capability::TradeStatistics,
            Capability::TradeStatistics,
        ]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn display_lists_flags() {
        let set = CapabilitySet::new([Capability::TradeStatistics]);
        assert_eq!(set.to_string(), "trade_statistics");
    }
}
