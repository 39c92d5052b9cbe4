//! Bookkeeping engine for token analytics.
//!
//! A [`Ledger`] keeps a registry of tracked assets, an append-only log of
//! recorded transfers, an exact per-asset set of addresses seen in those
//! transfers, and analytics snapshots published by a single privileged
//! identity. Every mutation is validated before anything is written, so a
//! rejected call leaves the ledger exactly as it was.
//!
//! ```
//! use token_analytics::{Address, Ledger};
//!
//! let admin = Address::new([0xAD; 32]);
//! let asset = Address::new([0x01; 32]);
//! let ledger = Ledger::new(admin).unwrap();
//!
//! ledger.register(&admin, asset, "Foo", "FOO", 1_000).unwrap();
//! let id = ledger
//!     .record(asset, Address::new([2; 32]), Address::new([3; 32]), 5, "transfer")
//!     .unwrap();
//! assert_eq!(ledger.asset(&asset).unwrap().unique_holders, 2);
//! assert_eq!(ledger.transactions_for_asset(&asset).unwrap(), vec![id]);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
#[cfg(feature = "trace")]
pub mod logging;
pub mod persist;
pub mod service;
pub mod store;
pub mod time_source;
pub mod types;

pub use engine::Ledger;
pub use error::{ErrorKind, LedgerError, Missing, PersistError};
pub use events::{BroadcastSink, EventSink, LedgerEvent, TracingSink};
pub use store::LedgerState;
pub use time_source::{SystemTimeSource, TimeSource};
pub use types::{
    Address, AssetRecord, LedgerSummary, SnapshotId, SnapshotRecord, TransactionRecord, TxId,
};
