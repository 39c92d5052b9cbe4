use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::types::Address;

/// The single privileged identity gating registry and snapshot mutations.
///
/// The caller is always passed in explicitly; nothing here reads ambient state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AccessGuard {
    privileged: Address,
}

impl AccessGuard {
    pub fn new(privileged: Address) -> Result<Self, LedgerError> {
        if privileged.is_null() {
            return Err(LedgerError::InvalidInput("privileged identity is null"));
        }
        Ok(Self { privileged })
    }

    pub fn privileged(&self) -> Address {
        self.privileged
    }

    pub fn ensure_privileged(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.privileged {
            return Err(LedgerError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Hand privilege to `new_identity`. Returns the previous identity.
    pub(crate) fn transfer(
        &mut self,
        caller: &Address,
        new_identity: Address,
    ) -> Result<Address, LedgerError> {
        self.ensure_privileged(caller)?;
        if new_identity.is_null() {
            return Err(LedgerError::InvalidInput("new privileged identity is null"));
        }
        Ok(std::mem::replace(&mut self.privileged, new_identity))
    }
}
