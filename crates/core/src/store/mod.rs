//! The four bookkeeping stores and the access guard, composed into one
//! aggregate so every operation commits against all of them at once.
//!
//! Each mutating method validates every precondition before its first write,
//! so a returned error always means nothing changed.

pub mod access;
pub mod holders;
pub mod ledger;
pub mod registry;
pub mod snapshots;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Missing};
use crate::types::{Address, AssetRecord, LedgerSummary, SnapshotId, TxId};

pub use access::AccessGuard;
pub use holders::HolderTracker;
pub use ledger::TransactionLedger;
pub use registry::Registry;
pub use snapshots::SnapshotStore;

/// Complete ledger state. Also the persisted layout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerState {
    pub access: AccessGuard,
    pub registry: Registry,
    pub ledger: TransactionLedger,
    pub holders: HolderTracker,
    pub snapshots: SnapshotStore,
}

/// What a successful transfer recording changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub id: TxId,
    pub transaction_count: u64,
    /// Participants seen for the first time, with the holder count after each.
    pub new_holders: Vec<(Address, u64)>,
}

impl LedgerState {
    pub fn new(privileged: Address) -> Result<Self, LedgerError> {
        Ok(Self {
            access: AccessGuard::new(privileged)?,
            registry: Registry::default(),
            ledger: TransactionLedger::default(),
            holders: HolderTracker::default(),
            snapshots: SnapshotStore::default(),
        })
    }

    pub fn register(
        &mut self,
        caller: &Address,
        address: Address,
        name: String,
        symbol: String,
        total_supply: u128,
        now: u64,
    ) -> Result<AssetRecord, LedgerError> {
        self.access.ensure_privileged(caller)?;
        self.registry
            .register(address, name, symbol, total_supply, now)
            .cloned()
    }

    pub fn set_active(
        &mut self,
        caller: &Address,
        address: &Address,
        active: bool,
        now: u64,
    ) -> Result<AssetRecord, LedgerError> {
        self.access.ensure_privileged(caller)?;
        self.registry.set_active(address, active, now).cloned()
    }

    /// Record a transfer. Open to any caller.
    pub fn record(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
        tx_type: String,
        now: u64,
    ) -> Result<TransferOutcome, LedgerError> {
        self.registry.get(&asset)?;
        ledger::validate_transfer(&from, &to, amount)?;

        // Asset existence is established above, so the registry updates below
        // cannot fail after the append.
        let id = self.ledger.append(asset, from, to, amount, now, tx_type);
        let transaction_count = self.registry.bump_transaction_count(&asset, now)?;

        let mut new_holders = Vec::with_capacity(2);
        for participant in [from, to] {
            if self.holders.mark_seen(asset, participant) {
                let count = self.registry.bump_holder_count(&asset, now)?;
                new_holders.push((participant, count));
            }
        }

        Ok(TransferOutcome {
            id,
            transaction_count,
            new_holders,
        })
    }

    pub fn create_snapshot(
        &mut self,
        caller: &Address,
        asset: Address,
        volume_24h: u128,
        avg_tx_size: u128,
        now: u64,
    ) -> Result<SnapshotId, LedgerError> {
        self.access.ensure_privileged(caller)?;
        self.registry.get(&asset)?;
        Ok(self.snapshots.append(asset, volume_24h, avg_tx_size, now))
    }

    pub fn transfer_privilege(
        &mut self,
        caller: &Address,
        new_identity: Address,
    ) -> Result<Address, LedgerError> {
        self.access.transfer(caller, new_identity)
    }

    pub fn list_for_asset(&self, asset: &Address) -> Result<&[TxId], LedgerError> {
        if !self.registry.exists(asset) {
            return Err(LedgerError::NotFound(Missing::Asset(*asset)));
        }
        Ok(self.ledger.ids_for_asset(asset))
    }

    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            assets: self.registry.len(),
            transactions: self.ledger.len(),
            snapshots: self.snapshots.len(),
        }
    }

    /// Check every cross-store invariant. Used when accepting state from disk.
    pub fn validate(&self) -> Result<(), String> {
        if self.access.privileged().is_null() {
            return Err("privileged identity is null".into());
        }

        let order = self.registry.addresses();
        let unique: BTreeSet<&Address> = order.iter().collect();
        if unique.len() != order.len() {
            return Err("registered asset list contains duplicates".into());
        }
        let mut record_count = 0usize;
        for (key, record) in self.registry.records() {
            record_count += 1;
            if *key != record.address {
                return Err(format!("asset {} stored under key {key}", record.address));
            }
            if !unique.contains(&record.address) {
                return Err(format!("asset {} missing from registration order", record.address));
            }
            if record.address.is_null() {
                return Err("null asset address registered".into());
            }
            let distinct = self.holders.distinct_count(&record.address) as u64;
            if record.unique_holders != distinct {
                return Err(format!(
                    "asset {} reports {} holders but {} were seen",
                    record.address, record.unique_holders, distinct
                ));
            }
            let recorded = self.ledger.ids_for_asset(&record.address).len() as u64;
            if record.transaction_count != recorded {
                return Err(format!(
                    "asset {} reports {} transactions but {} are indexed",
                    record.address, record.transaction_count, recorded
                ));
            }
        }
        if record_count != order.len() {
            return Err("registration order lists unknown assets".into());
        }

        for asset in self.holders.assets() {
            if !self.registry.exists(asset) {
                return Err(format!("holders tracked for unregistered asset {asset}"));
            }
        }

        for (position, tx) in self.ledger.records().iter().enumerate() {
            if tx.id != position as TxId {
                return Err(format!("transaction at position {position} has id {}", tx.id));
            }
            if !self.registry.exists(&tx.asset) {
                return Err(format!("transaction {} references unregistered asset", tx.id));
            }
            if tx.amount == 0 || tx.from.is_null() || tx.to.is_null() {
                return Err(format!("transaction {} has invalid fields", tx.id));
            }
            let tracked = self.holders.is_seen(&tx.asset, &tx.from)
                && self.holders.is_seen(&tx.asset, &tx.to);
            if !tracked {
                return Err(format!("transaction {} participants not tracked as holders", tx.id));
            }
        }

        let mut participants: BTreeMap<Address, BTreeSet<Address>> = BTreeMap::new();
        for tx in self.ledger.records() {
            let seen = participants.entry(tx.asset).or_default();
            seen.insert(tx.from);
            seen.insert(tx.to);
        }
        for (asset, holders) in self.holders.sets() {
            if participants.get(asset) != Some(holders) {
                return Err(format!("asset {asset} tracks holders that never transacted"));
            }
        }

        let mut indexed = 0usize;
        for (asset, ids) in self.ledger.index() {
            if !ids.windows(2).all(|w| w[0] < w[1]) {
                return Err(format!("index for asset {asset} is not strictly ascending"));
            }
            for id in ids {
                let tx = self.ledger.get(*id).map_err(|e| e.to_string())?;
                if tx.asset != *asset {
                    return Err(format!("index for asset {asset} lists foreign transaction {id}"));
                }
            }
            indexed += ids.len();
        }
        if indexed as u64 != self.ledger.len() {
            return Err("per-asset index does not cover every transaction".into());
        }

        for (position, snap) in self.snapshots.records().iter().enumerate() {
            if snap.id != position as SnapshotId {
                return Err(format!("snapshot at position {position} has id {}", snap.id));
            }
            if !self.registry.exists(&snap.asset) {
                return Err(format!("snapshot {} references unregistered asset", snap.id));
            }
        }

        Ok(())
    }
}
