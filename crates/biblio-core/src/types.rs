//! # Ledger Record Types
//!
//! Core record types used throughout Biblio Kiosk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Records                                  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Student      │   │      Loan       │   │  Transaction    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  index_number   │   │  student_index  │   │  student_index  │       │
//! │  │  card_uid       │   │  item_tag       │   │  action         │       │
//! │  │  full_name      │   │  due_at         │   │  synced (0→1)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   LoanStatus    │   │ TransactionAction│                            │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  Active         │   │  Borrow         │                             │
//! │  │  Returned       │   │  Return         │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Students carry both:
//! - `id`: UUID v4 - immutable local surrogate, used for database relations
//! - `index_number`: stable business key, referenced by loans and transactions
//!
//! ## Audit-of-Record
//! The transaction stream is append-only and immutable except for the
//! `synced` flag, which moves 0→1 exactly once. Loans are a derived,
//! mutable projection kept for fast "active loans" queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Student
// =============================================================================

/// A registered student who may borrow items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Student {
    /// Unique identifier (UUID v4). Local surrogate key.
    pub id: String,

    /// Index number - the stable business key (e.g., "UE2020001").
    pub index_number: String,

    /// Full display name.
    pub full_name: String,

    /// Academic programme (e.g., "BSc Computer Science").
    pub program: String,

    /// Level/year (e.g., "300").
    pub level: String,

    /// Contact phone number.
    pub phone: String,

    /// RFID card UID, when a card has been linked. Unique when present.
    pub card_uid: Option<String>,

    /// When the student was registered.
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Loan Status
// =============================================================================

/// The status of a loan.
///
/// State machine per (student, item) pair:
/// `no-loan → Active → Returned` — Returned is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// Item is borrowed and not yet returned.
    Active,
    /// Item has been returned. Terminal - no further mutation.
    Returned,
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Active
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoanStatus::Active => write!(f, "active"),
            LoanStatus::Returned => write!(f, "returned"),
        }
    }
}

// =============================================================================
// Loan
// =============================================================================

/// A loan of a single item to a single student.
///
/// Created by a successful Borrow; mutated exactly once by Return, which
/// sets `returned_at` and flips `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Loan {
    /// Unique identifier (UUID v4). Globally unique, offline-safe.
    pub id: String,

    /// The borrowing student's index number.
    pub student_index: String,

    /// Card UID snapshot at borrow time (empty when no card on file).
    pub user_uid: String,

    /// RFID tag of the borrowed item.
    pub item_tag: String,

    /// Item title snapshot at borrow time.
    pub item_title: String,

    /// When the item was borrowed.
    pub borrowed_at: DateTime<Utc>,

    /// When the item is due back.
    pub due_at: DateTime<Utc>,

    /// When the item was returned. None while the loan is active.
    pub returned_at: Option<DateTime<Utc>>,

    /// Current loan state.
    pub status: LoanStatus,

    /// Kiosk device that recorded the borrow.
    pub device_id: String,
}

impl Loan {
    /// Checks whether the loan is still active.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// Checks whether the loan is overdue relative to `now`.
    #[inline]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_active() && self.due_at < now
    }
}

// =============================================================================
// Transaction Action
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TransactionAction {
    /// Item handed out.
    Borrow,
    /// Item handed back.
    Return,
}

impl std::fmt::Display for TransactionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionAction::Borrow => write!(f, "borrow"),
            TransactionAction::Return => write!(f, "return"),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// An immutable borrow/return event - the audit-of-record.
///
/// Append-only: never updated except the `synced` flag, which transitions
/// 0→1 monotonically and is never reset. A failed sync leaves it at 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Transaction {
    /// Unique identifier (UUID v4). The remote upsert key.
    pub id: String,

    /// Card UID snapshot (empty when no card on file).
    pub user_uid: String,

    /// The student's index number.
    pub student_index: String,

    /// RFID tag of the item involved.
    pub item_tag: String,

    /// What happened.
    pub action: TransactionAction,

    /// When it happened.
    pub occurred_at: DateTime<Utc>,

    /// Kiosk device that recorded it.
    pub device_id: String,

    /// Whether this record has been confirmed by the remote store.
    pub synced: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
