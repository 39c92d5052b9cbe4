//! Distinct-participant tracking per asset.
//!
//! The seen set only grows: an address flips from unseen to seen exactly once
//! per asset and never reverts. Counts derived from it are exact.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::Address;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct HolderTracker {
    seen: BTreeMap<Address, BTreeSet<Address>>,
}

impl HolderTracker {
    /// Mark `address` as seen for `asset`.
    ///
    /// Returns `true` only on the first call for the pair.
    pub fn mark_seen(&mut self, asset: Address, address: Address) -> bool {
        self.seen.entry(asset).or_default().insert(address)
    }

    pub fn is_seen(&self, asset: &Address, address: &Address) -> bool {
        self.seen
            .get(asset)
            .is_some_and(|holders| holders.contains(address))
    }

    /// Number of distinct addresses seen for `asset`.
    pub fn distinct_count(&self, asset: &Address) -> usize {
        self.seen.get(asset).map_or(0, BTreeSet::len)
    }

    pub(crate) fn assets(&self) -> impl Iterator<Item = &Address> + '_ {
        self.seen.keys()
    }

    pub(crate) fn sets(&self) -> &BTreeMap<Address, BTreeSet<Address>> {
        &self.seen
    }
}
