//! # biblio-db: Ledger Store for Biblio Kiosk
//!
//! This crate provides database access for the lending kiosk. It uses
//! SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Biblio Kiosk Data Flow                            │
//! │                                                                         │
//! │  LoanEngine (borrow / return)        SyncAgent (background)            │
//! │       │                                   │                             │
//! │       ▼                                   ▼                             │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     biblio-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (student.rs)  │    │  (embedded)  │  │   │
//! │  │   │               │    │ (loan.rs)     │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ (transaction  │    │ 001_init.sql │  │   │
//! │  │   │ Management    │    │     .rs)      │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode)                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (student, loan, transaction)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biblio_db::{Database, DbConfig};
//!
//! // Create database with default config
//! let config = DbConfig::new("path/to/ledger.db");
//! let db = Database::new(config).await?;
//!
//! // Use repositories
//! let student = db.students().find_by_index("UE2020001").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::loan::LoanRepository;
pub use repository::student::StudentRepository;
pub use repository::transaction::TransactionRepository;
