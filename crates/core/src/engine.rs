//! The ledger service: one serialization domain over every store.
//!
//! All mutations take a single write lock, validate, commit, then publish
//! their notifications before releasing it. Reads take the read lock and hand
//! back owned copies, so they never observe a half-applied write.

use parking_lot::RwLock;

use crate::error::{LedgerError, PersistError};
use crate::events::{EventSink, LedgerEvent, TracingSink};
use crate::store::LedgerState;
use crate::time_source::{SystemTimeSource, TimeSource};
use crate::types::{
    Address, AssetRecord, LedgerSummary, SnapshotId, SnapshotRecord, TransactionRecord, TxId,
};

pub struct Ledger<T: TimeSource = SystemTimeSource> {
    state: RwLock<LedgerState>,
    time_source: T,
    sink: Box<dyn EventSink>,
}

impl Ledger<SystemTimeSource> {
    /// Fresh ledger on the wall clock, logging events through `tracing`.
    pub fn new(privileged: Address) -> Result<Self, LedgerError> {
        Self::with_parts(privileged, SystemTimeSource, TracingSink)
    }
}

impl<T: TimeSource> Ledger<T> {
    pub fn with_parts(
        privileged: Address,
        time_source: T,
        sink: impl EventSink,
    ) -> Result<Self, LedgerError> {
        let state = LedgerState::new(privileged)?;
        Ok(Self {
            state: RwLock::new(state),
            time_source,
            sink: Box::new(sink),
        })
    }

    /// Resume from previously exported state. Rejects state that breaks any
    /// cross-store invariant.
    pub fn from_state(
        state: LedgerState,
        time_source: T,
        sink: impl EventSink,
    ) -> Result<Self, PersistError> {
        state.validate().map_err(PersistError::Corrupt)?;
        Ok(Self {
            state: RwLock::new(state),
            time_source,
            sink: Box::new(sink),
        })
    }

    // =========================================================================
    // Privileged mutations
    // =========================================================================

    pub fn register(
        &self,
        caller: &Address,
        asset: Address,
        name: &str,
        symbol: &str,
        total_supply: u128,
    ) -> Result<AssetRecord, LedgerError> {
        let mut state = self.state.write();
        let now = self.time_source.now_secs();
        let record = state
            .register(caller, asset, name.to_owned(), symbol.to_owned(), total_supply, now)
            .inspect_err(|e| tracing::debug!(%asset, error = %e, "register rejected"))?;

        tracing::info!(%asset, symbol = %record.symbol, total_supply, "asset registered");
        self.sink.publish(&LedgerEvent::AssetRegistered {
            asset,
            name: record.name.clone(),
            symbol: record.symbol.clone(),
            total_supply,
            timestamp: now,
        });
        Ok(record)
    }

    pub fn set_active(
        &self,
        caller: &Address,
        asset: &Address,
        active: bool,
    ) -> Result<AssetRecord, LedgerError> {
        let mut state = self.state.write();
        let now = self.time_source.now_secs();
        let record = state
            .set_active(caller, asset, active, now)
            .inspect_err(|e| tracing::debug!(%asset, error = %e, "set_active rejected"))?;

        tracing::info!(%asset, active, "asset status changed");
        self.sink.publish(&LedgerEvent::AssetStatusChanged {
            asset: *asset,
            active,
            timestamp: now,
        });
        Ok(record)
    }

    pub fn create_snapshot(
        &self,
        caller: &Address,
        asset: Address,
        volume_24h: u128,
        avg_tx_size: u128,
    ) -> Result<SnapshotId, LedgerError> {
        let mut state = self.state.write();
        let now = self.time_source.now_secs();
        let id = state
            .create_snapshot(caller, asset, volume_24h, avg_tx_size, now)
            .inspect_err(|e| tracing::debug!(%asset, error = %e, "create_snapshot rejected"))?;

        tracing::info!(%asset, snapshot_id = id, "snapshot created");
        self.sink.publish(&LedgerEvent::SnapshotCreated {
            snapshot_id: id,
            asset,
            volume_24h,
            avg_tx_size,
            timestamp: now,
        });
        Ok(id)
    }

    pub fn transfer_privilege(
        &self,
        caller: &Address,
        new_identity: Address,
    ) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        let now = self.time_source.now_secs();
        let previous = state
            .transfer_privilege(caller, new_identity)
            .inspect_err(|e| tracing::debug!(%caller, error = %e, "transfer_privilege rejected"))?;

        tracing::info!(%previous, new = %new_identity, "privilege transferred");
        self.sink.publish(&LedgerEvent::PrivilegeTransferred {
            previous,
            new: new_identity,
            timestamp: now,
        });
        Ok(())
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    /// Record a transfer of `amount` of `asset` from `from` to `to`.
    ///
    /// Any caller may record. Returns the assigned global transaction id.
    pub fn record(
        &self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
        tx_type: &str,
    ) -> Result<TxId, LedgerError> {
        let mut state = self.state.write();
        let now = self.time_source.now_secs();
        let outcome = state
            .record(asset, from, to, amount, tx_type.to_owned(), now)
            .inspect_err(|e| tracing::debug!(%asset, error = %e, "record rejected"))?;

        tracing::info!(
            %asset,
            tx_id = outcome.id,
            amount,
            new_holders = outcome.new_holders.len(),
            "transfer recorded"
        );
        self.sink.publish(&LedgerEvent::TransferRecorded {
            tx_id: outcome.id,
            asset,
            from,
            to,
            amount,
            tx_type: tx_type.to_owned(),
            transaction_count: outcome.transaction_count,
            timestamp: now,
        });
        for (holder, unique_holders) in outcome.new_holders {
            self.sink.publish(&LedgerEvent::HolderCountUpdated {
                asset,
                holder,
                unique_holders,
                timestamp: now,
            });
        }
        Ok(outcome.id)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn asset(&self, asset: &Address) -> Result<AssetRecord, LedgerError> {
        self.state.read().registry.get(asset).cloned()
    }

    pub fn is_registered(&self, asset: &Address) -> bool {
        self.state.read().registry.exists(asset)
    }

    pub fn transaction(&self, id: TxId) -> Result<TransactionRecord, LedgerError> {
        self.state.read().ledger.get(id).cloned()
    }

    /// Transaction ids for `asset` in recording order.
    pub fn transactions_for_asset(&self, asset: &Address) -> Result<Vec<TxId>, LedgerError> {
        self.state.read().list_for_asset(asset).map(<[TxId]>::to_vec)
    }

    /// Like [`Self::transactions_for_asset`] but resolved to full records.
    pub fn transaction_records_for_asset(
        &self,
        asset: &Address,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let state = self.state.read();
        state
            .list_for_asset(asset)?
            .iter()
            .map(|id| state.ledger.get(*id).cloned())
            .collect()
    }

    pub fn snapshot(&self, id: SnapshotId) -> Result<SnapshotRecord, LedgerError> {
        self.state.read().snapshots.get(id).cloned()
    }

    pub fn is_holder(&self, asset: &Address, address: &Address) -> bool {
        self.state.read().holders.is_seen(asset, address)
    }

    pub fn privileged(&self) -> Address {
        self.state.read().access.privileged()
    }

    pub fn asset_count(&self) -> u64 {
        self.state.read().registry.len()
    }

    pub fn transaction_count(&self) -> u64 {
        self.state.read().ledger.len()
    }

    pub fn snapshot_count(&self) -> u64 {
        self.state.read().snapshots.len()
    }

    /// All registered asset addresses in registration order.
    pub fn registered_assets(&self) -> Vec<Address> {
        self.state.read().registry.addresses().to_vec()
    }

    pub fn summary(&self) -> LedgerSummary {
        self.state.read().summary()
    }

    /// Consistent copy of the whole state, e.g. for persistence.
    pub fn export_state(&self) -> LedgerState {
        self.state.read().clone()
    }
}
