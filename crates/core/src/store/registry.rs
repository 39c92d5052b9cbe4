//! Asset registry: metadata, derived metrics and the existence authority.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Missing};
use crate::types::{Address, AssetRecord};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Registry {
    assets: BTreeMap<Address, AssetRecord>,
    /// Registration order. Its length is the registered-asset counter.
    order: Vec<Address>,
}

impl Registry {
    /// Check everything `register` would reject, without writing.
    pub fn validate_registration(
        &self,
        address: &Address,
        name: &str,
        symbol: &str,
    ) -> Result<(), LedgerError> {
        if address.is_null() {
            return Err(LedgerError::InvalidInput("asset address is null"));
        }
        if self.exists(address) {
            return Err(LedgerError::AlreadyRegistered(*address));
        }
        if name.trim().is_empty() {
            return Err(LedgerError::InvalidInput("asset name is empty"));
        }
        if symbol.trim().is_empty() {
            return Err(LedgerError::InvalidInput("asset symbol is empty"));
        }
        Ok(())
    }

    pub(crate) fn register(
        &mut self,
        address: Address,
        name: String,
        symbol: String,
        total_supply: u128,
        now: u64,
    ) -> Result<&AssetRecord, LedgerError> {
        self.validate_registration(&address, &name, &symbol)?;
        self.order.push(address);
        let record = self.assets.entry(address).or_insert(AssetRecord {
            address,
            name,
            symbol,
            total_supply,
            transaction_count: 0,
            unique_holders: 0,
            last_updated: now,
            active: true,
        });
        Ok(record)
    }

    pub(crate) fn set_active(
        &mut self,
        address: &Address,
        active: bool,
        now: u64,
    ) -> Result<&AssetRecord, LedgerError> {
        let record = self.get_mut(address)?;
        record.active = active;
        record.last_updated = now;
        Ok(record)
    }

    pub fn get(&self, address: &Address) -> Result<&AssetRecord, LedgerError> {
        self.assets
            .get(address)
            .ok_or(LedgerError::NotFound(Missing::Asset(*address)))
    }

    pub fn exists(&self, address: &Address) -> bool {
        self.assets.contains_key(address)
    }

    /// Count one more distinct participant. Only the transfer path calls this,
    /// and only after the holder tracker reported a fresh transition.
    pub(crate) fn bump_holder_count(
        &mut self,
        address: &Address,
        now: u64,
    ) -> Result<u64, LedgerError> {
        let record = self.get_mut(address)?;
        record.unique_holders += 1;
        record.last_updated = now;
        Ok(record.unique_holders)
    }

    pub(crate) fn bump_transaction_count(
        &mut self,
        address: &Address,
        now: u64,
    ) -> Result<u64, LedgerError> {
        let record = self.get_mut(address)?;
        record.transaction_count += 1;
        record.last_updated = now;
        Ok(record.transaction_count)
    }

    /// Registered addresses in registration order.
    pub fn addresses(&self) -> &[Address] {
        &self.order
    }

    pub fn len(&self) -> u64 {
        self.order.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Records with the key each is stored under.
    pub(crate) fn records(&self) -> impl Iterator<Item = (&Address, &AssetRecord)> + '_ {
        self.assets.iter()
    }

    fn get_mut(&mut self, address: &Address) -> Result<&mut AssetRecord, LedgerError> {
        self.assets
            .get_mut(address)
            .ok_or(LedgerError::NotFound(Missing::Asset(*address)))
    }
}
