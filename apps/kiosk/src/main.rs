//! # Biblio Kiosk Daemon
//!
//! Headless kiosk process: opens the ledger, starts the sync agent, and
//! turns device scans into borrow/return operations.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kiosk Daemon                                    │
//! │                                                                         │
//! │  stdin bytes ──► LineFramer ──► ScanEvent ──► KioskSession             │
//! │                                                    │                    │
//! │                                     CardItem / ItemOnly intents         │
//! │                                                    │                    │
//! │                                              LoanEngine                 │
//! │                                          (borrow / return)              │
//! │                                                    │                    │
//! │                                              SQLite ledger              │
//! │                                                    ▲                    │
//! │                       SyncAgent (background tick) ─┘──► remote store    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The serial reader is expected to write its line protocol to this
//! process's stdin; any line-oriented bridge (socat, a udev-launched
//! helper, a test script) works.

mod config;
mod session;

use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use biblio_core::LineFramer;
use biblio_db::{Database, DbConfig};
use biblio_engine::{BorrowRequest, EngineError, LoanEngine, ReturnOutcome, StudentRef};
use biblio_sync::{HttpRemote, NoopRemote, RemoteLedger, SyncAgent, SyncConfig};

use crate::config::KioskConfig;
use crate::session::{KioskSession, PairedScan};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Biblio Kiosk...");

    // Load configuration
    let kiosk_config = KioskConfig::load(None);
    let sync_config = SyncConfig::load_or_default(None);
    info!(
        db_path = %kiosk_config.storage.database_path.display(),
        device_id = %sync_config.device_id(),
        loan_limit = kiosk_config.policy.max_active_loans,
        "Configuration loaded"
    );

    // Open the ledger (migrations run on connect)
    if let Some(parent) = kiosk_config.storage.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(DbConfig::new(&kiosk_config.storage.database_path)).await?;
    info!("Ledger opened");

    // Build the loan engine
    let engine = LoanEngine::new(
        db.clone(),
        kiosk_config.policy.clone(),
        sync_config.device_id(),
    );
    info!(
        unsynced = engine.unsynced_count().await?,
        "Loan engine ready"
    );

    // Build the remote capability and start the sync agent
    let remote: Arc<dyn RemoteLedger> = match sync_config.endpoint() {
        Some(endpoint) if sync_config.is_sync_enabled() => {
            info!(endpoint = %endpoint, "Using HTTP remote");
            Arc::new(HttpRemote::new(
                endpoint,
                sync_config.device_id(),
                sync_config.remote.request_timeout(),
            )?)
        }
        _ => {
            info!("No remote endpoint configured; running fully offline");
            Arc::new(NoopRemote)
        }
    };
    let sync_handle = SyncAgent::new(sync_config, db.clone(), remote).spawn();

    // Device bridge: read scan lines from stdin until EOF or shutdown
    run_device_loop(&engine).await;

    // Graceful shutdown
    info!("Shutting down...");
    if let Err(e) = sync_handle.shutdown().await {
        warn!(error = %e, "Sync agent was already stopped");
    }
    db.close().await;
    info!("Kiosk stopped");

    Ok(())
}

/// Reads reader bytes from stdin, frames them, and drives the engine.
async fn run_device_loop(engine: &LoanEngine) {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 256];
    let mut framer = LineFramer::new();
    let mut session = KioskSession::default();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Device bridge listening on stdin");

    loop {
        tokio::select! {
            read = stdin.read(&mut buf) => match read {
                Ok(0) => {
                    info!("Device bridge closed (EOF)");
                    break;
                }
                Ok(n) => {
                    for event in framer.push(&buf[..n]) {
                        let now = std::time::Instant::now();
                        if let Some(intent) = session.on_event(&event, now) {
                            handle_intent(engine, intent).await;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Device bridge read failed");
                    break;
                }
            },

            _ = &mut shutdown => break,
        }
    }
}

/// Executes one resolved scan intent against the engine.
///
/// Domain rejections (unknown student, limit reached, item not on loan)
/// are user feedback, logged at warn; storage failures are operator
/// problems, logged at error. Neither stops the loop.
async fn handle_intent(engine: &LoanEngine, intent: PairedScan) {
    match intent {
        PairedScan::CardItem { card_uid, item_tag } => {
            // An item already on loan is a return, whoever holds the card
            match engine.database().loans().find_active_by_item_tag(&item_tag).await {
                Ok(Some(loan)) => report_return(engine.return_loan(&loan.id).await, &item_tag),
                Ok(None) => {
                    let result = engine
                        .borrow(BorrowRequest {
                            student: StudentRef::Card(card_uid),
                            item_tag: item_tag.clone(),
                            item_title: None,
                            duration_days: None,
                        })
                        .await;
                    match result {
                        Ok(loan) => info!(
                            loan_id = %loan.id,
                            item_tag = %item_tag,
                            due_at = %loan.due_at,
                            "Borrowed"
                        ),
                        Err(e) => report_engine_error(&e, "Borrow rejected"),
                    }
                }
                Err(e) => error!(error = %e, item_tag = %item_tag, "Loan lookup failed"),
            }
        }

        PairedScan::ItemOnly { item_tag } => {
            report_return(engine.return_by_item_tag(&item_tag).await, &item_tag);
        }
    }
}

fn report_return(result: Result<ReturnOutcome, EngineError>, item_tag: &str) {
    match result {
        Ok(ReturnOutcome::Returned(loan)) => {
            info!(loan_id = %loan.id, item_tag = %item_tag, "Returned");
        }
        Ok(ReturnOutcome::AlreadyReturned) => {
            info!(item_tag = %item_tag, "Already returned");
        }
        Err(e) => report_engine_error(&e, "Return rejected"),
    }
}

fn report_engine_error(err: &EngineError, context: &str) {
    if err.is_domain() {
        warn!(reason = %err, "{}", context);
    } else {
        error!(error = %err, "{}", context);
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
