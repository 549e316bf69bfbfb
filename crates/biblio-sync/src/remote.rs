//! # Remote Ledger Capability
//!
//! The injectable seam between the sync agent and whatever transport a
//! deployment uses to reach the remote store.
//!
//! ## Why a Trait
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Remote Ledger Capability                             │
//! │                                                                         │
//! │  SyncAgent ──► Arc<dyn RemoteLedger> ──► one of:                        │
//! │                                                                         │
//! │  • NoopRemote      - sync-disabled / fully offline deployments          │
//! │  • InMemoryRemote  - tests and loopback demos                           │
//! │  • (deployment)    - an HTTP/gRPC client living outside this crate      │
//! │                                                                         │
//! │  The agent never knows which. The remote is constructed at startup      │
//! │  and injected; there is no conditionally-null global.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Idempotency Contract
//! `upsert_transactions` is keyed by transaction `id` and replaces on
//! conflict. Submitting the same batch twice MUST leave the remote in the
//! same state as submitting it once - the agent relies on this to retry
//! freely after partial failures.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use biblio_core::Transaction;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Batch Acknowledgement
// =============================================================================

/// A remote acknowledgement for a submitted batch.
///
/// Remotes that only confirm whole batches ack every id; remotes that can
/// confirm subsets list exactly what they stored. The agent marks synced
/// per-acked-id either way - never optimistically.
#[derive(Debug, Clone, Default)]
pub struct BatchAck {
    /// IDs the remote durably stored.
    pub acked_ids: Vec<String>,
}

impl BatchAck {
    /// Acks every transaction in the batch (whole-batch success).
    pub fn all(batch: &[Transaction]) -> Self {
        BatchAck {
            acked_ids: batch.iter().map(|t| t.id.clone()).collect(),
        }
    }
}

// =============================================================================
// Remote Ledger Trait
// =============================================================================

/// The remote reconciliation endpoint, as seen by the sync agent.
#[async_trait]
pub trait RemoteLedger: Send + Sync {
    /// Cheap reachability probe.
    ///
    /// `false` means "defer this cycle" - it is a normal offline state,
    /// not an error.
    async fn probe(&self) -> bool;

    /// Upserts a batch of transactions, keyed by `id` (insert-or-replace).
    ///
    /// Safe to call repeatedly with the same batch.
    async fn upsert_transactions(&self, batch: &[Transaction]) -> SyncResult<BatchAck>;
}

// =============================================================================
// No-op Remote
// =============================================================================

/// A remote that is never reachable.
///
/// Used when no endpoint is configured: the kiosk runs fully offline and
/// every cycle defers, leaving records queued locally.
pub struct NoopRemote;

#[async_trait]
impl RemoteLedger for NoopRemote {
    async fn probe(&self) -> bool {
        false
    }

    async fn upsert_transactions(&self, _batch: &[Transaction]) -> SyncResult<BatchAck> {
        // Unreachable in practice: the agent probes before submitting.
        Ok(BatchAck::default())
    }
}

// =============================================================================
// In-Memory Remote
// =============================================================================

/// An in-process remote store with switchable reachability and failure.
///
/// Stores each transaction as a JSON document keyed by id, replacing on
/// conflict - the same contract a real endpoint implements. Used by the
/// agent's tests and as a loopback target for demos.
pub struct InMemoryRemote {
    store: Mutex<HashMap<String, serde_json::Value>>,
    reachable: AtomicBool,
    reject_next: AtomicBool,
}

impl InMemoryRemote {
    /// Creates a reachable, empty remote.
    pub fn new() -> Self {
        InMemoryRemote {
            store: Mutex::new(HashMap::new()),
            reachable: AtomicBool::new(true),
            reject_next: AtomicBool::new(false),
        }
    }

    /// Switches reachability (simulates the network going up/down).
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Makes the next upsert fail with a rejection (one-shot).
    pub fn reject_next(&self) {
        self.reject_next.store(true, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub async fn stored_count(&self) -> usize {
        self.store.lock().await.len()
    }

    /// Fetches a stored record by id.
    pub async fn get(&self, id: &str) -> Option<serde_json::Value> {
        self.store.lock().await.get(id).cloned()
    }
}

impl Default for InMemoryRemote {
    fn default() -> Self {
        InMemoryRemote::new()
    }
}

#[async_trait]
impl RemoteLedger for InMemoryRemote {
    async fn probe(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    async fn upsert_transactions(&self, batch: &[Transaction]) -> SyncResult<BatchAck> {
        if self.reject_next.swap(false, Ordering::SeqCst) {
            return Err(SyncError::RemoteRejected("injected failure".into()));
        }

        let mut store = self.store.lock().await;
        for txn in batch {
            let doc = serde_json::to_value(txn)?;
            // Insert-or-replace keyed by id: repeating a batch is harmless
            store.insert(txn.id.clone(), doc);
        }

        debug!(count = batch.len(), total = store.len(), "Upserted batch");

        Ok(BatchAck::all(batch))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_core::TransactionAction;
    use chrono::Utc;
    use uuid::Uuid;

    fn txn() -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            user_uid: "CARD-ALICE".to_string(),
            student_index: "UE2020001".to_string(),
            item_tag: "BOOK-1".to_string(),
            action: TransactionAction::Borrow,
            occurred_at: Utc::now(),
            device_id: "kiosk-01".to_string(),
            synced: false,
        }
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let remote = InMemoryRemote::new();
        let batch = vec![txn(), txn()];

        let ack1 = remote.upsert_transactions(&batch).await.unwrap();
        let ack2 = remote.upsert_transactions(&batch).await.unwrap();

        // Same batch twice leaves the remote in the same state as once
        assert_eq!(ack1.acked_ids, ack2.acked_ids);
        assert_eq!(remote.stored_count().await, 2);
    }

    #[tokio::test]
    async fn test_reachability_switch() {
        let remote = InMemoryRemote::new();
        assert!(remote.probe().await);

        remote.set_reachable(false);
        assert!(!remote.probe().await);
    }

    #[tokio::test]
    async fn test_reject_next_is_one_shot() {
        let remote = InMemoryRemote::new();
        let batch = vec![txn()];

        remote.reject_next();
        assert!(remote.upsert_transactions(&batch).await.is_err());
        assert_eq!(remote.stored_count().await, 0);

        // The failure does not stick
        assert!(remote.upsert_transactions(&batch).await.is_ok());
        assert_eq!(remote.stored_count().await, 1);
    }

    #[tokio::test]
    async fn test_noop_remote_is_unreachable() {
        assert!(!NoopRemote.probe().await);
    }
}
