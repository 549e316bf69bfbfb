//! # biblio-engine: Loan Lifecycle Engine
//!
//! Enforces borrowing invariants and drives loan/transaction state
//! transitions on top of the ledger store.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Per (student, item) Loan State Machine                     │
//! │                                                                         │
//! │                    Borrow                  Return                       │
//! │   ┌─────────┐   (limit < 3)   ┌────────┐  (once)   ┌──────────┐        │
//! │   │ no-loan │ ──────────────► │ ACTIVE │ ────────► │ RETURNED │        │
//! │   └─────────┘                 └────────┘           └──────────┘        │
//! │                                                     (terminal)         │
//! │                                                                         │
//! │  Every transition appends exactly one immutable transaction in the     │
//! │  same database write as the projection change.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`engine`] - the [`LoanEngine`] and its operations
//! - [`locks`] - per-student mutual exclusion for the limit check
//! - [`error`] - engine error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod engine;
pub mod error;
pub mod locks;

// =============================================================================
// Re-exports
// =============================================================================

pub use engine::{BorrowRequest, LoanEngine, NewStudent, ReturnOutcome, StudentRef};
pub use error::{EngineError, EngineResult};
pub use locks::StudentLocks;
