//! Append-only transfer ledger with a per-asset index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Missing};
use crate::types::{Address, TransactionRecord, TxId};

/// Transfer records keyed by a global monotonic id.
///
/// Ids are dense: the record with id `n` lives at position `n`, so the next id
/// is always the current length. Nothing is ever removed or rewritten.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TransactionLedger {
    records: Vec<TransactionRecord>,
    /// Ids per asset in recording order.
    by_asset: BTreeMap<Address, Vec<TxId>>,
}

/// Checks on the transfer itself, independent of the asset.
pub fn validate_transfer(from: &Address, to: &Address, amount: u128) -> Result<(), LedgerError> {
    if from.is_null() {
        return Err(LedgerError::InvalidInput("sender address is null"));
    }
    if to.is_null() {
        return Err(LedgerError::InvalidInput("receiver address is null"));
    }
    if amount == 0 {
        return Err(LedgerError::InvalidAmount);
    }
    Ok(())
}

impl TransactionLedger {
    /// The id the next appended record will receive.
    pub fn next_id(&self) -> TxId {
        self.records.len() as TxId
    }

    /// Append a record. Callers validate first; this cannot fail.
    pub(crate) fn append(
        &mut self,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
        timestamp: u64,
        tx_type: String,
    ) -> TxId {
        let id = self.next_id();
        self.records.push(TransactionRecord {
            id,
            asset,
            from,
            to,
            amount,
            timestamp,
            tx_type,
        });
        self.by_asset.entry(asset).or_default().push(id);
        id
    }

    pub fn get(&self, id: TxId) -> Result<&TransactionRecord, LedgerError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.records.get(idx))
            .ok_or(LedgerError::NotFound(Missing::Transaction(id)))
    }

    /// Ids recorded for `asset`, oldest first. Empty when none were recorded.
    pub fn ids_for_asset(&self, asset: &Address) -> &[TxId] {
        self.by_asset.get(asset).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub(crate) fn index(&self) -> &BTreeMap<Address, Vec<TxId>> {
        &self.by_asset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn addr(seed: u8) -> Address {
        Address::new([seed; 32])
    }

    #[test]
    fn test_ids_are_global_and_dense() {
        let mut ledger = TransactionLedger::default();
        let a = ledger.append(addr(1), addr(10), addr(11), 5, 100, "transfer".into());
        let b = ledger.append(addr(2), addr(10), addr(11), 5, 100, "transfer".into());
        let c = ledger.append(addr(1), addr(11), addr(10), 7, 101, "transfer".into());
        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(ledger.next_id(), 3);
        assert_eq!(ledger.ids_for_asset(&addr(1)), &[0, 2]);
        assert_eq!(ledger.ids_for_asset(&addr(2)), &[1]);
    }

    #[test]
    fn test_get_returns_stored_record() {
        let mut ledger = TransactionLedger::default();
        let id = ledger.append(addr(1), addr(10), addr(11), 42, 900, "mint".into());
        let record = ledger.get(id).unwrap();
        assert_eq!(record.amount, 42);
        assert_eq!(record.from, addr(10));
        assert_eq!(record.to, addr(11));
        assert_eq!(record.timestamp, 900);
        assert_eq!(record.tx_type, "mint");
    }

    #[test]
    fn test_get_past_end_is_not_found() {
        let ledger = TransactionLedger::default();
        assert_eq!(
            ledger.get(0),
            Err(LedgerError::NotFound(Missing::Transaction(0)))
        );
        assert_eq!(
            ledger.get(u64::MAX),
            Err(LedgerError::NotFound(Missing::Transaction(u64::MAX)))
        );
    }

    #[test]
    fn test_unknown_asset_has_empty_index() {
        let ledger = TransactionLedger::default();
        assert!(ledger.ids_for_asset(&addr(9)).is_empty());
    }

    #[rstest]
    #[case(Address::NULL, addr(2), 1, LedgerError::InvalidInput("sender address is null"))]
    #[case(addr(1), Address::NULL, 1, LedgerError::InvalidInput("receiver address is null"))]
    #[case(addr(1), addr(2), 0, LedgerError::InvalidAmount)]
    fn test_validate_transfer_rejects(
        #[case] from: Address,
        #[case] to: Address,
        #[case] amount: u128,
        #[case] expected: LedgerError,
    ) {
        assert_eq!(validate_transfer(&from, &to, amount), Err(expected));
    }

    #[test]
    fn test_validate_transfer_allows_self_transfer() {
        assert!(validate_transfer(&addr(1), &addr(1), 1).is_ok());
    }
}
