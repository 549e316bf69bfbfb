//! # biblio-sync: Sync Engine for Biblio Kiosk
//!
//! This crate provides the synchronization layer for the lending kiosk,
//! enabling offline-first operation with background reconciliation against
//! a remote store.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Sync Agent Architecture                          │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                      SyncAgent (agent.rs)                        │  │
//! │  │                                                                  │  │
//! │  │  Spawned as a Tokio task at kiosk startup.                       │  │
//! │  │  Fixed-interval tick (default 10s) + manual trigger channel.     │  │
//! │  │  At most ONE cycle in flight (atomic test-and-set).              │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┴─────────────────────┐                  │
//! │         ▼                                           ▼                   │
//! │  ┌────────────────────────┐            ┌────────────────────────────┐  │
//! │  │  Ledger (biblio-db)    │            │  RemoteLedger (remote.rs)  │  │
//! │  │                        │            │                            │  │
//! │  │  SELECT synced = 0     │            │  probe() reachability      │  │
//! │  │  UPDATE after ack only │            │  upsert batch keyed by id  │  │
//! │  └────────────────────────┘            └────────────────────────────┘  │
//! │                                                                         │
//! │  CYCLE:                                                                │
//! │  1. Test-and-set in-flight flag (busy → skip tick)                     │
//! │  2. Read all transactions with synced = 0 (empty → no-op)              │
//! │  3. Probe remote (unreachable → deferred, not an error)                │
//! │  4. Upsert the batch, keyed by transaction id, bounded timeout         │
//! │  5. Ack → mark exactly the acked ids synced, in one update             │
//! │     Failure → leave flags untouched; next tick retries the same set    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`agent`] - the `SyncAgent`, its run loop, status, and handle
//! - [`remote`] - the injectable `RemoteLedger` capability
//! - [`http`] - reqwest-backed `RemoteLedger` adapter
//! - [`config`] - sync configuration (device id, endpoint, intervals)
//! - [`error`] - sync error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biblio_sync::{SyncAgent, SyncConfig, NoopRemote};
//! use std::sync::Arc;
//!
//! let config = SyncConfig::load_or_default(None);
//! let agent = SyncAgent::new(config, database, Arc::new(NoopRemote));
//! let handle = agent.spawn();
//!
//! // Later: manual trigger and graceful shutdown
//! handle.sync_now().await?;
//! handle.shutdown().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod agent;
pub mod config;
pub mod error;
pub mod http;
pub mod remote;

// =============================================================================
// Re-exports
// =============================================================================

pub use agent::{
    CycleOutcome, NoopEmitter, SyncAgent, SyncAgentHandle, SyncEventEmitter, SyncStatus,
};
pub use config::{DeviceConfig, RemoteSettings, SyncConfig, SyncSettings};
pub use error::{SyncError, SyncResult};
pub use http::HttpRemote;
pub use remote::{BatchAck, InMemoryRemote, NoopRemote, RemoteLedger};
