//! # biblio-core: Pure Domain Logic for Biblio Kiosk
//!
//! This crate is the **heart** of the lending kiosk. It contains the domain
//! model and business rules as pure code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Biblio Kiosk Architecture                          │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Device Bridge / Kiosk shell                    │   │
//! │  │    RFID scans ──► card/item events ──► borrow/return flows     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ biblio-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  policy   │  │  events   │  │ validation│  │   │
//! │  │   │  Student  │  │ LoanPolicy│  │ ScanEvent │  │   rules   │  │   │
//! │  │   │  Loan     │  │ clamping  │  │ LineFramer│  │  checks   │  │   │
//! │  │   │  TxRecord │  │           │  │           │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 biblio-db / biblio-engine / biblio-sync         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Ledger records (Student, Loan, Transaction)
//! - [`policy`] - Loan limits, durations and horizons
//! - [`events`] - Scan events and the line framer for the device bridge
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Explicit Errors**: All errors are typed, never strings or panics
//! 4. **Append-Only Audit**: the transaction stream is the record of truth;
//!    loans are a mutable projection kept for fast queries

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod events;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use biblio_core::Loan` instead of
// `use biblio_core::types::Loan`

pub use error::{CoreError, ValidationError};
pub use events::{LineFramer, ScanEvent};
pub use policy::LoanPolicy;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default number of simultaneously active loans a student may hold.
///
/// ## Why a constant?
/// The ceiling is configurable per deployment via [`LoanPolicy`], but every
/// call site needs the same fallback. Three is the library's standing rule.
pub const DEFAULT_LOAN_LIMIT: u32 = 3;

/// Default loan duration in days when the caller does not choose one.
pub const DEFAULT_LOAN_DAYS: i64 = 14;

/// Minimum loan duration in days. Requests below this are clamped, not rejected.
pub const MIN_LOAN_DAYS: i64 = 1;

/// Maximum loan duration in days. Requests above this are clamped, not rejected.
pub const MAX_LOAN_DAYS: i64 = 365;

/// Default horizon, in days, for the due-soon/overdue alerting query.
pub const DEFAULT_DUE_SOON_DAYS: i64 = 2;
