//! # Transaction Repository
//!
//! The append-only audit stream and its sync flags.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (borrow / return)                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. Mutate loans projection                                     │   │
//! │  │  2. INSERT INTO transactions (..., synced = 0)                  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            BACKGROUND SYNC AGENT (async)                        │   │
//! │  │  1. SELECT * FROM transactions WHERE synced = 0                 │   │
//! │  │  2. Upsert batch to remote, keyed by id                         │   │
//! │  │  3. On confirmed ack: UPDATE ... SET synced = 1                 │   │
//! │  │     On failure: leave flags at 0, retry next tick               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  KEY GUARANTEES:                                                       │
//! │  • A transaction is never lost (it's in the local ledger)              │
//! │  • synced moves 0 → 1 exactly once, never back                         │
//! │  • Offline? Records queue up; next reachable tick drains them          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use biblio_core::Transaction;
use chrono::{DateTime, Utc};

/// Columns selected for every transaction query, kept in one place.
const TXN_COLUMNS: &str =
    "id, user_uid, student_index, item_tag, action, occurred_at, device_id, synced";

/// Repository for transaction (audit stream) operations.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TransactionRepository { pool }
    }

    /// Appends a transaction outside a lifecycle write.
    ///
    /// The borrow/return paths append through [`LoanRepository`] inside
    /// their own database transactions; this standalone insert exists for
    /// imports and tests.
    ///
    /// [`LoanRepository`]: crate::repository::loan::LoanRepository
    pub async fn insert(&self, txn: &Transaction) -> DbResult<()> {
        debug!(id = %txn.id, action = %txn.action, "Appending transaction");

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
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a transaction by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let txn = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(txn)
    }

    /// Gets transactions that have not been confirmed by the remote store.
    ///
    /// ## Returns
    /// Records where `synced = 0`, oldest first, up to `limit`.
    pub async fn get_unsynced(&self, limit: u32) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions \
             WHERE synced = 0 \
             ORDER BY occurred_at ASC, id ASC \
             LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }

    /// Marks the given transactions as synced, in one update.
    ///
    /// Only called after a confirmed remote ack; the `synced = 0` guard
    /// keeps the flag monotonic even if an id is acked twice.
    ///
    /// ## Returns
    /// Number of rows flipped 0 → 1.
    pub async fn mark_synced(&self, ids: &[String]) -> DbResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut builder: sqlx::QueryBuilder<'_, sqlx::Sqlite> =
            sqlx::QueryBuilder::new("UPDATE transactions SET synced = 1 WHERE synced = 0 AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let result = builder.build().execute(&self.pool).await?;

        debug!(flipped = result.rows_affected(), "Marked transactions synced");

        Ok(result.rows_affected())
    }

    /// Counts transactions still awaiting remote confirmation.
    ///
    /// This is the kiosk's unsynced badge: it only decreases after a
    /// confirmed remote ack.
    pub async fn count_unsynced(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE synced = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Lists transactions in an occurred_at range, oldest first.
    ///
    /// Backs the audit/history listing.
    pub async fn in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Transaction>> {
        let txns = sqlx::query_as::<_, Transaction>(&format!(
            "SELECT {TXN_COLUMNS} FROM transactions \
             WHERE occurred_at >= ?1 AND occurred_at <= ?2 \
             ORDER BY occurred_at ASC, id ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(txns)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use biblio_core::{Transaction, TransactionAction};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn txn(action: TransactionAction) -> Transaction {
        Transaction {
            id: Uuid::new_v4().to_string(),
            user_uid: "CARD-ALICE".to_string(),
            student_index: "UE2020001".to_string(),
            item_tag: "BOOK-1".to_string(),
            action,
            occurred_at: Utc::now(),
            device_id: "kiosk-01".to_string(),
            synced: false,
        }
    }

    #[tokio::test]
    async fn test_unsynced_scan_and_mark() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.transactions();

        let a = txn(TransactionAction::Borrow);
        let b = txn(TransactionAction::Return);
        repo.insert(&a).await.unwrap();
        repo.insert(&b).await.unwrap();

        assert_eq!(repo.count_unsynced().await.unwrap(), 2);
        let pending = repo.get_unsynced(100).await.unwrap();
        assert_eq!(pending.len(), 2);

        // Mark only the first; the second stays pending
        let flipped = repo.mark_synced(&[a.id.clone()]).await.unwrap();
        assert_eq!(flipped, 1);
        assert_eq!(repo.count_unsynced().await.unwrap(), 1);

        let stored = repo.get_by_id(&a.id).await.unwrap().unwrap();
        assert!(stored.synced);
    }

    #[tokio::test]
    async fn test_mark_synced_is_monotonic() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.transactions();

        let a = txn(TransactionAction::Borrow);
        repo.insert(&a).await.unwrap();

        assert_eq!(repo.mark_synced(&[a.id.clone()]).await.unwrap(), 1);
        // A second ack for the same id flips nothing
        assert_eq!(repo.mark_synced(&[a.id.clone()]).await.unwrap(), 0);
        assert!(repo.get_by_id(&a.id).await.unwrap().unwrap().synced);
    }

    #[tokio::test]
    async fn test_mark_synced_empty_batch_is_noop() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert_eq!(db.transactions().mark_synced(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_in_range() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.transactions();

        let mut old = txn(TransactionAction::Borrow);
        old.occurred_at = Utc::now() - Duration::days(30);
        let recent = txn(TransactionAction::Borrow);
        repo.insert(&old).await.unwrap();
        repo.insert(&recent).await.unwrap();

        let window = repo
            .in_range(Utc::now() - Duration::days(1), Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].id, recent.id);
    }
}
