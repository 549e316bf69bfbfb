//! # Sync Agent
//!
//! The background reconciliation loop: scans the ledger for unsynced
//! transactions and pushes them to the remote store.
//!
//! ## Agent Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncAgent Architecture                           │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                        run loop (spawned)                        │  │
//! │  │                                                                  │  │
//! │  │   tokio::select! {                                               │  │
//! │  │       interval tick (10s)  ──┐                                   │  │
//! │  │       manual trigger       ──┼──► run_cycle()                    │  │
//! │  │       shutdown             ──┘     (errors logged, never         │  │
//! │  │   }                                 surfaced to foreground)      │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  run_cycle():                                                          │
//! │  1. compare_exchange in-flight flag  → busy? Skipped                   │
//! │  2. read unsynced batch              → empty? NothingPending           │
//! │  3. probe remote (bounded timeout)   → down? Deferred                  │
//! │  4. upsert batch (bounded timeout)   → error? flags untouched          │
//! │  5. mark acked ids synced (one update), refresh status + badge         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Exactly-Once In Effect
//! The mechanism is at-least-once: a cycle that dies between upsert and
//! mark-synced resubmits the same batch next tick. The remote's
//! upsert-by-id makes the repeat harmless, so the observable effect is
//! exactly-once.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use biblio_db::Database;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteLedger;

// =============================================================================
// Sync Status
// =============================================================================

/// Current sync status for external queries (the kiosk status bar).
#[derive(Debug, Clone, Default)]
pub struct SyncStatus {
    /// Number of transactions awaiting remote confirmation.
    /// Decreases only after a confirmed ack.
    pub pending_count: i64,

    /// Last successful sync completion time.
    pub last_sync: Option<DateTime<Utc>>,

    /// Last error message (if any). Cleared on the next success.
    pub last_error: Option<String>,

    /// Total cycles that ran to completion (any outcome).
    pub cycles_run: u64,
}

// =============================================================================
// Cycle Outcome
// =============================================================================

/// What a single sync cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Another cycle was already in flight; this one did nothing.
    Skipped,
    /// Nothing was pending.
    NothingPending,
    /// Remote unreachable; records stay queued. Not an error.
    Deferred,
    /// A batch was submitted and acknowledged.
    Synced {
        /// Transactions submitted this cycle.
        submitted: usize,
        /// Transactions the remote acknowledged (marked synced locally).
        acked: usize,
    },
}

// =============================================================================
// Event Emitter Trait
// =============================================================================

/// Trait for surfacing sync events to a UI shell.
///
/// The kiosk's unsynced badge listens on `pending_changed`; sync failures
/// are observable here but never interrupt foreground operations.
pub trait SyncEventEmitter: Send + Sync {
    /// The unsynced count changed.
    fn pending_changed(&self, pending: i64);

    /// A cycle failed (will be retried on the next tick).
    fn sync_failed(&self, message: &str, retryable: bool);
}

/// No-op event emitter for headless and test use.
pub struct NoopEmitter;

impl SyncEventEmitter for NoopEmitter {
    fn pending_changed(&self, _pending: i64) {}
    fn sync_failed(&self, _message: &str, _retryable: bool) {}
}

// =============================================================================
// Sync Agent
// =============================================================================

/// The sync engine: eventually propagates every unsynced transaction to
/// the remote store.
pub struct SyncAgent {
    /// Sync configuration.
    config: Arc<SyncConfig>,

    /// Ledger database.
    db: Database,

    /// The injected remote capability.
    remote: Arc<dyn RemoteLedger>,

    /// Event emitter for UI notifications.
    emitter: Arc<dyn SyncEventEmitter>,

    /// In-flight guard: at most one cycle runs at a time.
    in_flight: Arc<AtomicBool>,

    /// Current status snapshot.
    status: Arc<RwLock<SyncStatus>>,
}

impl SyncAgent {
    /// Creates a new sync agent with a no-op emitter.
    pub fn new(config: SyncConfig, db: Database, remote: Arc<dyn RemoteLedger>) -> Self {
        Self::with_emitter(config, db, remote, Arc::new(NoopEmitter))
    }

    /// Creates a new sync agent with a custom event emitter.
    pub fn with_emitter(
        config: SyncConfig,
        db: Database,
        remote: Arc<dyn RemoteLedger>,
        emitter: Arc<dyn SyncEventEmitter>,
    ) -> Self {
        SyncAgent {
            config: Arc::new(config),
            db,
            remote,
            emitter,
            in_flight: Arc::new(AtomicBool::new(false)),
            status: Arc::new(RwLock::new(SyncStatus::default())),
        }
    }

    /// Returns the current sync status.
    pub async fn status(&self) -> SyncStatus {
        self.status.read().await.clone()
    }

    /// Runs one sync cycle.
    ///
    /// Callable directly (manual trigger path) and from the background
    /// loop; the in-flight flag makes overlapping calls harmless.
    pub async fn run_cycle(&self) -> SyncResult<CycleOutcome> {
        // Test-and-set: a cycle already in flight means skip, not wait.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync cycle already in flight, skipping");
            return Ok(CycleOutcome::Skipped);
        }

        let result = self.cycle_inner().await;

        self.in_flight.store(false, Ordering::SeqCst);
        self.record_outcome(&result).await;

        result
    }

    /// The cycle body. Runs with the in-flight flag held.
    async fn cycle_inner(&self) -> SyncResult<CycleOutcome> {
        // Read everything still awaiting confirmation, oldest first
        let pending = self
            .db
            .transactions()
            .get_unsynced(self.config.sync.batch_size)
            .await?;

        if pending.is_empty() {
            return Ok(CycleOutcome::NothingPending);
        }

        // Reachability probe, bounded. Unreachable is a deferral: records
        // stay queued and the next tick tries again.
        let probe = timeout(self.config.remote.probe_timeout(), self.remote.probe()).await;
        if !matches!(probe, Ok(true)) {
            debug!(pending = pending.len(), "Remote unreachable, deferring sync");
            return Ok(CycleOutcome::Deferred);
        }

        info!(count = pending.len(), "Submitting transaction batch");

        // Submit the whole batch as one idempotent upsert keyed by id
        let request_timeout = self.config.remote.request_timeout();
        let ack = timeout(request_timeout, self.remote.upsert_transactions(&pending))
            .await
            .map_err(|_| SyncError::Timeout(request_timeout.as_secs()))??;

        // Mark exactly the acked ids - never optimistically
        let flipped = self.db.transactions().mark_synced(&ack.acked_ids).await?;

        info!(
            submitted = pending.len(),
            acked = ack.acked_ids.len(),
            flipped,
            "Sync cycle complete"
        );

        Ok(CycleOutcome::Synced {
            submitted: pending.len(),
            acked: ack.acked_ids.len(),
        })
    }

    /// Updates the status snapshot and notifies the emitter.
    async fn record_outcome(&self, result: &SyncResult<CycleOutcome>) {
        // A skipped cycle observed nothing; leave the snapshot alone.
        if matches!(result, Ok(CycleOutcome::Skipped)) {
            return;
        }

        let pending = self.db.transactions().count_unsynced().await.unwrap_or(-1);

        let mut status = self.status.write().await;
        status.cycles_run += 1;
        status.pending_count = pending;

        match result {
            Ok(CycleOutcome::Synced { .. }) => {
                status.last_sync = Some(Utc::now());
                status.last_error = None;
                self.emitter.pending_changed(pending);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Sync cycle failed, will retry next tick");
                status.last_error = Some(e.to_string());
                self.emitter.sync_failed(&e.to_string(), e.is_retryable());
            }
        }
    }

    /// Spawns the background run loop and returns a control handle.
    ///
    /// The loop ticks on the configured interval, funnels manual triggers
    /// into the same cycle, and exits on shutdown. Cycle errors are logged
    /// and retried - they never propagate out of the task.
    pub fn spawn(self) -> SyncAgentHandle {
        let agent = Arc::new(self);
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(8);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = SyncAgentHandle {
            agent: agent.clone(),
            trigger_tx,
            shutdown_tx,
        };

        if !agent.config.is_sync_enabled() {
            info!("Sync is disabled; agent will only run on manual trigger");
        }

        tokio::spawn(async move {
            info!(
                device_id = %agent.config.device_id(),
                interval_secs = agent.config.sync.interval_secs,
                "Sync agent starting"
            );

            let mut interval = tokio::time::interval(agent.config.sync.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    // Fixed-interval tick
                    _ = interval.tick(), if agent.config.is_sync_enabled() => {
                        if let Err(e) = agent.run_cycle().await {
                            error!(?e, "Sync cycle error");
                        }
                    }

                    // Manual trigger
                    Some(()) = trigger_rx.recv() => {
                        if let Err(e) = agent.run_cycle().await {
                            error!(?e, "Manual sync error");
                        }
                    }

                    // Shutdown
                    _ = shutdown_rx.recv() => {
                        info!("Sync agent shutting down");
                        break;
                    }
                }
            }

            info!("Sync agent stopped");
        });

        handle
    }
}

// =============================================================================
// Agent Handle
// =============================================================================

/// Handle for controlling a spawned sync agent.
#[derive(Clone)]
pub struct SyncAgentHandle {
    agent: Arc<SyncAgent>,
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncAgentHandle {
    /// Requests an immediate sync cycle.
    ///
    /// The request funnels through the run loop, so it respects the same
    /// in-flight mutual exclusion as timed ticks.
    pub async fn sync_now(&self) -> SyncResult<()> {
        self.trigger_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Sync agent is not running".into()))
    }

    /// Triggers graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelError("Sync agent is not running".into()))
    }

    /// Returns the current sync status.
    pub async fn status(&self) -> SyncStatus {
        self.agent.status().await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::InMemoryRemote;
    use biblio_core::{Transaction, TransactionAction};
    use biblio_db::DbConfig;
    use chrono::Utc;
    use uuid::Uuid;

    fn txn(tag: &str) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            user_uid: "CARD-ALICE".to_string(),
            student_index: "UE2020001".to_string(),
            item_tag: tag.to_string(),
            action: TransactionAction::Borrow,
            occurred_at: Utc::now(),
            device_id: "kiosk-01".to_string(),
            synced: false,
        }
    }

    async fn agent_with_remote(remote: Arc<InMemoryRemote>) -> SyncAgent {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        SyncAgent::new(SyncConfig::default(), db, remote)
    }

    #[tokio::test]
    async fn test_empty_ledger_is_noop() {
        let remote = Arc::new(InMemoryRemote::new());
        let agent = agent_with_remote(remote.clone()).await;

        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NothingPending);
        assert_eq!(remote.stored_count().await, 0);
    }

    #[tokio::test]
    async fn test_unreachable_remote_defers() {
        // Scenario D, first half: remote down leaves everything unsynced
        // and surfaces no error
        let remote = Arc::new(InMemoryRemote::new());
        remote.set_reachable(false);
        let agent = agent_with_remote(remote.clone()).await;

        agent.db.transactions().insert(&txn("BOOK-1")).await.unwrap();
        agent.db.transactions().insert(&txn("BOOK-2")).await.unwrap();

        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Deferred);
        assert_eq!(agent.db.transactions().count_unsynced().await.unwrap(), 2);
        assert_eq!(remote.stored_count().await, 0);

        // Scenario D, second half: the next reachable tick drains the
        // same set and flips the flags
        remote.set_reachable(true);
        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Synced {
                submitted: 2,
                acked: 2
            }
        );
        assert_eq!(agent.db.transactions().count_unsynced().await.unwrap(), 0);
        assert_eq!(remote.stored_count().await, 2);

        let status = agent.status().await;
        assert_eq!(status.pending_count, 0);
        assert!(status.last_sync.is_some());
        assert!(status.last_error.is_none());
    }

    #[tokio::test]
    async fn test_rejection_leaves_flags_untouched() {
        let remote = Arc::new(InMemoryRemote::new());
        let agent = agent_with_remote(remote.clone()).await;

        agent.db.transactions().insert(&txn("BOOK-1")).await.unwrap();

        remote.reject_next();
        let err = agent.run_cycle().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(agent.db.transactions().count_unsynced().await.unwrap(), 1);
        assert!(agent.status().await.last_error.is_some());

        // The retry on the next cycle submits the same (still unsynced) set
        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Synced {
                submitted: 1,
                acked: 1
            }
        );
        assert_eq!(agent.db.transactions().count_unsynced().await.unwrap(), 0);
        assert!(agent.status().await.last_error.is_none());
    }

    #[tokio::test]
    async fn test_resubmission_is_idempotent() {
        // A cycle that dies after upsert but before mark-synced resubmits;
        // the remote state must equal a single submission
        let remote = Arc::new(InMemoryRemote::new());
        let agent = agent_with_remote(remote.clone()).await;

        let t = txn("BOOK-1");
        agent.db.transactions().insert(&t).await.unwrap();

        // First submission reaches the remote
        agent.remote.upsert_transactions(&[t.clone()]).await.unwrap();
        // Local mark-synced "failed"; the agent's cycle submits again
        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(
            outcome,
            CycleOutcome::Synced {
                submitted: 1,
                acked: 1
            }
        );

        assert_eq!(remote.stored_count().await, 1);
        assert_eq!(agent.db.transactions().count_unsynced().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_flight_cycles_are_mutually_exclusive() {
        let remote = Arc::new(InMemoryRemote::new());
        let agent = agent_with_remote(remote.clone()).await;

        // Simulate a cycle in flight: the next call must skip, not wait
        agent.in_flight.store(true, Ordering::SeqCst);
        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped);

        // Released flag lets the next cycle run
        agent.in_flight.store(false, Ordering::SeqCst);
        let outcome = agent.run_cycle().await.unwrap();
        assert_eq!(outcome, CycleOutcome::NothingPending);
    }

    #[tokio::test]
    async fn test_spawned_agent_manual_trigger_and_shutdown() {
        let remote = Arc::new(InMemoryRemote::new());
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.transactions().insert(&txn("BOOK-1")).await.unwrap();

        // Long interval so only the manual trigger can drive the cycle
        let mut config = SyncConfig::default();
        config.sync.interval_secs = 3600;

        let agent = SyncAgent::new(config, db.clone(), remote.clone());
        let handle = agent.spawn();

        handle.sync_now().await.unwrap();

        // Wait for the trigger to be processed
        for _ in 0..50 {
            if db.transactions().count_unsynced().await.unwrap() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }

        assert_eq!(db.transactions().count_unsynced().await.unwrap(), 0);
        assert_eq!(remote.stored_count().await, 1);

        handle.shutdown().await.unwrap();
    }
}
