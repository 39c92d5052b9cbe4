//! Notifications emitted after each committed mutation.
//!
//! Delivering them to indexers or dashboards is the job of an [`EventSink`];
//! the ledger only guarantees that each payload is fully determined by the
//! operation's inputs and the resulting state, and that sinks see events in
//! commit order.

use serde::Serialize;

use crate::types::{Address, SnapshotId, TxId};

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    AssetRegistered {
        asset: Address,
        name: String,
        symbol: String,
        total_supply: u128,
        timestamp: u64,
    },
    AssetStatusChanged {
        asset: Address,
        active: bool,
        timestamp: u64,
    },
    TransferRecorded {
        tx_id: TxId,
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
        tx_type: String,
        /// Asset's transaction count after this transfer.
        transaction_count: u64,
        timestamp: u64,
    },
    HolderCountUpdated {
        asset: Address,
        holder: Address,
        unique_holders: u64,
        timestamp: u64,
    },
    SnapshotCreated {
        snapshot_id: SnapshotId,
        asset: Address,
        volume_24h: u128,
        avg_tx_size: u128,
        timestamp: u64,
    },
    PrivilegeTransferred {
        previous: Address,
        new: Address,
        timestamp: u64,
    },
}

/// Receiver of ledger notifications.
///
/// Called while the ledger's write lock is held: implementations must not
/// block or call back into the ledger.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: &LedgerEvent);
}

/// Logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn publish(&self, event: &LedgerEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                tracing::info!(target: "token_analytics::events", %payload, "ledger event")
            }
            Err(e) => tracing::warn!(error = %e, "failed to encode ledger event"),
        }
    }
}

/// Fans events out to in-process subscribers over a tokio broadcast channel.
///
/// Slow subscribers lag and lose the oldest events rather than blocking the
/// ledger. Publishing with no subscribers is a no-op.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: tokio::sync::broadcast::Sender<LedgerEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LedgerEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: &LedgerEvent) {
        // Err only means nobody is listening right now.
        let _ = self.tx.send(event.clone());
    }
}

impl<S: EventSink + ?Sized> EventSink for std::sync::Arc<S> {
    fn publish(&self, event: &LedgerEvent) {
        (**self).publish(event)
    }
}

#[cfg(any(test, feature = "testing"))]
pub use memory::MemorySink;

#[cfg(any(test, feature = "testing"))]
mod memory {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{EventSink, LedgerEvent};

    /// Collects events for assertions. Clones share the same buffer.
    #[derive(Debug, Clone, Default)]
    pub struct MemorySink {
        events: Arc<Mutex<Vec<LedgerEvent>>>,
    }

    impl MemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn events(&self) -> Vec<LedgerEvent> {
            self.events.lock().clone()
        }

        pub fn take(&self) -> Vec<LedgerEvent> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl EventSink for MemorySink {
        fn publish(&self, event: &LedgerEvent) {
            self.events.lock().push(event.clone());
        }
    }
}
