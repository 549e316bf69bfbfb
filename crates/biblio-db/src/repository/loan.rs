//! # Loan Repository
//!
//! Database operations for the loan projection, including the two atomic
//! lifecycle writes.
//!
//! ## Loan Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Loan Lifecycle Writes                             │
//! │                                                                         │
//! │  1. BORROW                                                             │
//! │     └── insert_borrow()                                                │
//! │         ┌───────────────────────────────────────────────┐              │
//! │         │            SINGLE TRANSACTION                 │              │
//! │         │  INSERT INTO loans (status = 'active')        │              │
//! │         │  INSERT INTO transactions (action = 'borrow') │              │
//! │         └───────────────────────────────────────────────┘              │
//! │         Both succeed or both fail - the audit stream and the           │
//! │         projection never diverge.                                      │
//! │                                                                         │
//! │  2. RETURN                                                             │
//! │     └── mark_returned()                                                │
//! │         ┌───────────────────────────────────────────────┐              │
//! │         │            SINGLE TRANSACTION                 │              │
//! │         │  UPDATE loans SET status = 'returned'         │              │
//! │         │         WHERE id = ? AND status = 'active'    │              │
//! │         │  0 rows? → rollback, report stale (no         │              │
//! │         │            duplicate RETURN transaction)      │              │
//! │         │  1 row?  → INSERT transactions ('return')     │              │
//! │         └───────────────────────────────────────────────┘              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use biblio_core::{Loan, Transaction};

/// Columns selected for every loan query, kept in one place.
const LOAN_COLUMNS: &str = "id, student_index, user_uid, item_tag, item_title, \
                            borrowed_at, due_at, returned_at, status, device_id";

/// Repository for loan database operations.
#[derive(Debug, Clone)]
pub struct LoanRepository {
    pool: SqlitePool,
}

impl LoanRepository {
    /// Creates a new LoanRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LoanRepository { pool }
    }

    /// Gets a loan by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Counts a student's active loans.
    ///
    /// The limit check reads this; it must run under the engine's
    /// per-student lock to be race-free against concurrent borrows.
    pub async fn count_active_for(&self, student_index: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE status = 'active' AND student_index = ?1",
        )
        .bind(student_index)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Lists a student's active loans, earliest due first.
    ///
    /// Ties on due_at keep insertion order (borrowed_at, then id makes
    /// the sort total).
    pub async fn active_for_student(&self, student_index: &str) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE status = 'active' AND student_index = ?1 \
             ORDER BY due_at ASC, borrowed_at ASC, id ASC"
        ))
        .bind(student_index)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Finds the active loan for a given item tag, if any.
    ///
    /// Used by the kiosk return-by-scan flow. At most one active loan can
    /// exist per item on a single-writer kiosk.
    pub async fn find_active_by_item_tag(&self, item_tag: &str) -> DbResult<Option<Loan>> {
        let loan = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE status = 'active' AND item_tag = ?1 \
             ORDER BY borrowed_at ASC \
             LIMIT 1"
        ))
        .bind(item_tag)
        .fetch_optional(&self.pool)
        .await?;

        Ok(loan)
    }

    /// Lists active loans due at or before the cutoff, earliest due first.
    ///
    /// Backs the due-soon/overdue alerting query.
    pub async fn due_within(&self, cutoff: DateTime<Utc>) -> DbResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(&format!(
            "SELECT {LOAN_COLUMNS} FROM loans \
             WHERE status = 'active' AND due_at <= ?1 \
             ORDER BY due_at ASC, borrowed_at ASC, id ASC"
        ))
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(loans)
    }

    /// Inserts a new loan and its BORROW transaction atomically.
    ///
    /// The caller (LoanEngine) has already passed the limit check under
    /// the per-student lock; this method only guarantees the projection
    /// and the audit stream move together.
    pub async fn insert_borrow(&self, loan: &Loan, txn: &Transaction) -> DbResult<()> {
        debug!(loan_id = %loan.id, student_index = %loan.student_index, "Inserting borrow");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO loans (
                id, student_index, user_uid, item_tag, item_title,
                borrowed_at, due_at, returned_at, status, device_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.student_index)
        .bind(&loan.user_uid)
        .bind(&loan.item_tag)
        .bind(&loan.item_title)
        .bind(loan.borrowed_at)
        .bind(loan.due_at)
        .bind(loan.returned_at)
        .bind(loan.status)
        .bind(&loan.device_id)
        .execute(&mut *tx)
        .await?;

        insert_transaction(&mut tx, txn).await?;

        tx.commit().await?;

        Ok(())
    }

    /// Marks a loan returned and appends its RETURN transaction atomically.
    ///
    /// ## Returns
    /// * `Ok(true)` - the loan was active and is now returned
    /// * `Ok(false)` - the loan was not active (lost race or double scan);
    ///   nothing was written, no duplicate RETURN transaction exists
    pub async fn mark_returned(
        &self,
        loan_id: &str,
        returned_at: DateTime<Utc>,
        txn: &Transaction,
    ) -> DbResult<bool> {
        debug!(loan_id = %loan_id, "Marking loan returned");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE loans SET
                status = 'returned',
                returned_at = ?2
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(loan_id)
        .bind(returned_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_transaction(&mut tx, txn).await?;

        tx.commit().await?;

        Ok(true)
    }
}

/// Appends a transaction row inside an open database transaction.
///
/// Shared by the borrow and return writes so both lifecycle paths stamp
/// the audit stream identically.
pub(crate) async fn insert_transaction(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    txn: &Transaction,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (
            id, user_uid, student_index, item_tag, action,
            occurred_at, device_id, synced
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&txn.id)
    .bind(&txn.user_uid)
    .bind(&txn.student_index)
    .bind(&txn.item_tag)
    .bind(txn.action)
    .bind(txn.occurred_at)
    .bind(&txn.device_id)
    .bind(txn.synced)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
