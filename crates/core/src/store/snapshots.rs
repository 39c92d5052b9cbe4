use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Missing};
use crate::types::{Address, SnapshotId, SnapshotRecord};

/// Append-only log of caller-supplied aggregate snapshots.
///
/// Ids use their own dense counter, independent of transaction ids.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotStore {
    records: Vec<SnapshotRecord>,
}

impl SnapshotStore {
    pub fn next_id(&self) -> SnapshotId {
        self.records.len() as SnapshotId
    }

    pub(crate) fn append(
        &mut self,
        asset: Address,
        volume_24h: u128,
        avg_tx_size: u128,
        timestamp: u64,
    ) -> SnapshotId {
        let id = self.next_id();
        self.records.push(SnapshotRecord {
            id,
            asset,
            volume_24h,
            avg_tx_size,
            timestamp,
        });
        id
    }

    pub fn get(&self, id: SnapshotId) -> Result<&SnapshotRecord, LedgerError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.records.get(idx))
            .ok_or(LedgerError::NotFound(Missing::Snapshot(id)))
    }

    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn records(&self) -> &[SnapshotRecord] {
        &self.records
    }
}
