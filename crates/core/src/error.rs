use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Address, SnapshotId, TxId};

/// What a failed lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Asset(Address),
    Transaction(TxId),
    Snapshot(SnapshotId),
}

impl fmt::Display for Missing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Missing::Asset(addr) => write!(f, "asset {addr}"),
            Missing::Transaction(id) => write!(f, "transaction {id}"),
            Missing::Snapshot(id) => write!(f, "snapshot {id}"),
        }
    }
}

/// Rejections of ledger operations. A rejected call leaves all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("asset {0} is already registered")]
    AlreadyRegistered(Address),
    #[error("{0} not found")]
    NotFound(Missing),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("transfer amount must be greater than zero")]
    InvalidAmount,
    #[error("caller {0} is not the privileged identity")]
    Unauthorized(Address),
}

/// Stable error classification exposed on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AlreadyRegistered,
    NotFound,
    InvalidInput,
    InvalidAmount,
    Unauthorized,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::AlreadyRegistered(_) => ErrorKind::AlreadyRegistered,
            LedgerError::NotFound(_) => ErrorKind::NotFound,
            LedgerError::InvalidInput(_) => ErrorKind::InvalidInput,
            LedgerError::InvalidAmount => ErrorKind::InvalidAmount,
            LedgerError::Unauthorized(_) => ErrorKind::Unauthorized,
        }
    }
}

/// Errors loading or saving a persisted ledger state.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state file violates ledger invariants: {0}")]
    Corrupt(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_subject() {
        let addr = Address::new([7u8; 32]);
        let err = LedgerError::NotFound(Missing::Asset(addr));
        assert_eq!(err.to_string(), format!("asset {addr} not found"));

        let err = LedgerError::NotFound(Missing::Transaction(12));
        assert_eq!(err.to_string(), "transaction 12 not found");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(LedgerError::InvalidAmount.kind(), ErrorKind::InvalidAmount);
        assert_eq!(
            LedgerError::Unauthorized(Address::NULL).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            LedgerError::NotFound(Missing::Snapshot(0)).kind(),
            ErrorKind::NotFound
        );
    }
}
