//! Records and identifiers shared by every store.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Global transaction identifier. Dense, starting at 0.
pub type TxId = u64;

/// Global snapshot identifier. Dense, starting at 0.
pub type SnapshotId = u64;

/// Opaque 32-byte identifier for assets, participants and callers.
///
/// Text form is 64 lowercase hex chars, optionally prefixed with `0x`.
/// The all-zero value is the null sentinel and is never a valid participant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 32]);

impl Address {
    /// The null sentinel.
    pub const NULL: Address = Address([0u8; 32]);

    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_null(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", hex::encode(self.0))
    }
}

/// Error returned when parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AddressParseError {
    #[error("invalid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("address must be exactly 32 bytes (64 hex chars), got {0} bytes")]
    Length(usize),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressParseError::Length(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Metadata and derived metrics of a registered asset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AssetRecord {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub total_supply: u128,
    /// Successful transfers recorded for this asset.
    pub transaction_count: u64,
    /// Distinct addresses ever seen as sender or receiver.
    pub unique_holders: u64,
    /// Unix seconds of the last mutation.
    pub last_updated: u64,
    pub active: bool,
}

/// A recorded transfer. Immutable once stored.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: TxId,
    pub asset: Address,
    pub from: Address,
    pub to: Address,
    pub amount: u128,
    /// Unix seconds at recording time.
    pub timestamp: u64,
    /// Free-form label supplied by the caller, e.g. "transfer" or "mint".
    pub tx_type: String,
}

/// Caller-supplied aggregate metrics for one asset at one point in time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SnapshotRecord {
    pub id: SnapshotId,
    pub asset: Address,
    pub volume_24h: u128,
    pub avg_tx_size: u128,
    pub timestamp: u64,
}

/// Aggregate counters across all stores.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LedgerSummary {
    pub assets: u64,
    pub transactions: u64,
    pub snapshots: u64,
}
