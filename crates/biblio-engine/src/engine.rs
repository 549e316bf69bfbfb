//! # Loan Engine
//!
//! The loan lifecycle operations: registration, borrow, return, and the
//! read queries the kiosk displays.
//!
//! ## Borrow Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Borrow Operation                                 │
//! │                                                                         │
//! │  borrow(card_uid | index, item_tag, days)                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Validate item tag, resolve student      ── fail fast, no writes    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ╔═══════════════ per-student lock held ═══════════════╗               │
//! │  ║ 2. Count active loans  → LimitExceeded at ceiling   ║               │
//! │  ║ 3. due_at = now + clamp(days, 1..=365)              ║               │
//! │  ║ 4. INSERT loan + BORROW transaction (one DB write)  ║               │
//! │  ╚═════════════════════════════════════════════════════╝               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Loan { status: Active, due_at }                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use biblio_core::{
    validation, CoreError, Loan, LoanPolicy, LoanStatus, Student, Transaction, TransactionAction,
};
use biblio_db::Database;

use crate::error::{EngineError, EngineResult};
use crate::locks::StudentLocks;

// =============================================================================
// Request / Outcome Types
// =============================================================================

/// How the caller identifies a student.
///
/// The kiosk resolves by card scan; the admin screens resolve by index.
#[derive(Debug, Clone)]
pub enum StudentRef {
    /// By index number (business key).
    Index(String),
    /// By linked card UID.
    Card(String),
}

impl StudentRef {
    fn describe(&self) -> &str {
        match self {
            StudentRef::Index(s) | StudentRef::Card(s) => s,
        }
    }
}

/// A borrow request.
#[derive(Debug, Clone)]
pub struct BorrowRequest {
    /// The borrowing student.
    pub student: StudentRef,

    /// RFID tag of the item being borrowed.
    pub item_tag: String,

    /// Item title snapshot for receipts/history (optional).
    pub item_title: Option<String>,

    /// Requested duration in days. None uses the policy default;
    /// out-of-range values are clamped to [1, 365].
    pub duration_days: Option<i64>,
}

/// Registration input for a new student.
#[derive(Debug, Clone)]
pub struct NewStudent {
    pub index_number: String,
    pub full_name: String,
    pub program: String,
    pub level: String,
    pub phone: String,
    pub card_uid: Option<String>,
}

/// Outcome of a return operation.
///
/// A double return is a no-op success, not an error: the kiosk reports
/// "already returned" without creating a duplicate transaction.
#[derive(Debug, Clone)]
pub enum ReturnOutcome {
    /// The loan was active and is now returned.
    Returned(Loan),
    /// The loan was already returned; nothing was written.
    AlreadyReturned,
}

impl ReturnOutcome {
    /// True when this call performed the return.
    pub fn did_return(&self) -> bool {
        matches!(self, ReturnOutcome::Returned(_))
    }
}

// =============================================================================
// Loan Engine
// =============================================================================

/// The loan lifecycle engine.
///
/// Cloning is cheap and shares the lock map, so the foreground request
/// path and the kiosk session handler can hold their own copies.
#[derive(Debug, Clone)]
pub struct LoanEngine {
    db: Database,
    policy: LoanPolicy,
    device_id: String,
    locks: StudentLocks,
}

impl LoanEngine {
    /// Creates a new engine over an opened database.
    pub fn new(db: Database, policy: LoanPolicy, device_id: impl Into<String>) -> Self {
        LoanEngine {
            db,
            policy,
            device_id: device_id.into(),
            locks: StudentLocks::new(),
        }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    /// Returns the underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Registers a new student.
    ///
    /// Duplicate index numbers or card UIDs are rejected before the
    /// caller sees a constraint error string.
    pub async fn register_student(&self, new: NewStudent) -> EngineResult<Student> {
        validation::validate_index_number(&new.index_number)?;
        validation::validate_full_name(&new.full_name)?;
        validation::validate_phone(&new.phone)?;
        if let Some(ref uid) = new.card_uid {
            validation::validate_card_uid(uid)?;
        }

        let student = Student {
            id: Uuid::new_v4().to_string(),
            index_number: new.index_number.trim().to_string(),
            full_name: new.full_name.trim().to_string(),
            program: new.program.trim().to_string(),
            level: new.level.trim().to_string(),
            phone: new.phone.trim().to_string(),
            card_uid: new.card_uid.map(|u| u.trim().to_string()),
            created_at: Utc::now(),
        };

        match self.db.students().insert(&student).await {
            Ok(()) => {
                info!(index_number = %student.index_number, "Student registered");
                Ok(student)
            }
            Err(biblio_db::DbError::UniqueViolation { field, .. }) => Err(CoreError::Validation(
                biblio_core::ValidationError::Duplicate {
                    field,
                    value: student.index_number,
                },
            )
            .into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Resolves a student reference, failing with StudentNotFound.
    pub async fn resolve_student(&self, student_ref: &StudentRef) -> EngineResult<Student> {
        let found = match student_ref {
            StudentRef::Index(index) => self.db.students().find_by_index(index).await?,
            StudentRef::Card(uid) => self.db.students().find_by_card_uid(uid).await?,
        };

        found.ok_or_else(|| {
            CoreError::StudentNotFound(student_ref.describe().to_string()).into()
        })
    }

    // =========================================================================
    // Borrow
    // =========================================================================

    /// Records a borrow.
    ///
    /// Steps 2-4 (count, due date, insert) run under the per-student lock:
    /// two concurrent borrows for the same student cannot both pass the
    /// limit check.
    pub async fn borrow(&self, req: BorrowRequest) -> EngineResult<Loan> {
        validation::validate_item_tag(&req.item_tag)?;
        let student = self.resolve_student(&req.student).await?;
        let days = self.policy.effective_loan_days(req.duration_days);

        // Critical section: limit-check-then-insert, serialized per student
        let _guard = self.locks.acquire(&student.index_number).await;

        let active = self.db.loans().count_active_for(&student.index_number).await?;
        if active >= i64::from(self.policy.max_active_loans) {
            warn!(
                student_index = %student.index_number,
                active,
                limit = self.policy.max_active_loans,
                "Borrow rejected: loan limit reached"
            );
            return Err(CoreError::LimitExceeded {
                student_index: student.index_number,
                active: active as u32,
                limit: self.policy.max_active_loans,
            }
            .into());
        }

        let now = Utc::now();
        let user_uid = student.card_uid.clone().unwrap_or_default();

        let loan = Loan {
            id: Uuid::new_v4().to_string(),
            student_index: student.index_number.clone(),
            user_uid: user_uid.clone(),
            item_tag: req.item_tag.trim().to_string(),
            item_title: req.item_title.unwrap_or_default(),
            borrowed_at: now,
            due_at: now + Duration::days(days),
            returned_at: None,
            status: LoanStatus::Active,
            device_id: self.device_id.clone(),
        };

        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            user_uid,
            student_index: loan.student_index.clone(),
            item_tag: loan.item_tag.clone(),
            action: TransactionAction::Borrow,
            occurred_at: now,
            device_id: self.device_id.clone(),
            synced: false,
        };

        self.db.loans().insert_borrow(&loan, &txn).await?;

        info!(
            loan_id = %loan.id,
            student_index = %loan.student_index,
            item_tag = %loan.item_tag,
            due_at = %loan.due_at,
            "Borrow recorded"
        );

        Ok(loan)
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Records a return.
    ///
    /// Returning a non-active loan is a no-op success: the loan table and
    /// the transaction stream are left untouched.
    pub async fn return_loan(&self, loan_id: &str) -> EngineResult<ReturnOutcome> {
        let loan = self
            .db
            .loans()
            .get_by_id(loan_id)
            .await?
            .ok_or_else(|| CoreError::LoanNotFound(loan_id.to_string()))?;

        if loan.status != LoanStatus::Active {
            debug!(loan_id = %loan_id, "Return is a no-op: loan already returned");
            return Ok(ReturnOutcome::AlreadyReturned);
        }

        let now = Utc::now();
        let txn = Transaction {
            id: Uuid::new_v4().to_string(),
            user_uid: loan.user_uid.clone(),
            student_index: loan.student_index.clone(),
            item_tag: loan.item_tag.clone(),
            action: TransactionAction::Return,
            occurred_at: now,
            device_id: self.device_id.clone(),
            synced: false,
        };

        // The conditional UPDATE catches a racing return between our read
        // and this write; the loser inserts no duplicate transaction.
        if !self.db.loans().mark_returned(loan_id, now, &txn).await? {
            debug!(loan_id = %loan_id, "Return lost the race: loan already returned");
            return Ok(ReturnOutcome::AlreadyReturned);
        }

        info!(
            loan_id = %loan_id,
            student_index = %loan.student_index,
            item_tag = %loan.item_tag,
            "Return recorded"
        );

        let mut returned = loan;
        returned.status = LoanStatus::Returned;
        returned.returned_at = Some(now);
        Ok(ReturnOutcome::Returned(returned))
    }

    /// Records a return for the active loan on an item tag.
    ///
    /// The kiosk flow: an item is scanned without a loan id in hand.
    pub async fn return_by_item_tag(&self, item_tag: &str) -> EngineResult<ReturnOutcome> {
        let loan = self
            .db
            .loans()
            .find_active_by_item_tag(item_tag)
            .await?
            .ok_or_else(|| CoreError::LoanNotFound(item_tag.to_string()))?;

        self.return_loan(&loan.id).await
    }

    // =========================================================================
    // Read Queries
    // =========================================================================

    /// Lists a student's active loans, earliest due first.
    pub async fn active_loans_for(&self, student_ref: &StudentRef) -> EngineResult<Vec<Loan>> {
        let student = self.resolve_student(student_ref).await?;
        Ok(self
            .db
            .loans()
            .active_for_student(&student.index_number)
            .await?)
    }

    /// Lists all active loans due within the horizon (or overdue),
    /// earliest due first.
    ///
    /// `horizon_days = None` uses the policy's due-soon horizon.
    pub async fn due_soon_or_overdue(&self, horizon_days: Option<i64>) -> EngineResult<Vec<Loan>> {
        let horizon = horizon_days.unwrap_or(self.policy.due_soon_horizon_days);
        let cutoff = Utc::now() + Duration::days(horizon);
        Ok(self.db.loans().due_within(cutoff).await?)
    }

    /// Number of transactions not yet confirmed by the remote store.
    ///
    /// This is the kiosk's unsynced badge.
    pub async fn unsynced_count(&self) -> EngineResult<i64> {
        Ok(self.db.transactions().count_unsynced().await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use biblio_db::DbConfig;

    async fn test_engine() -> LoanEngine {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        LoanEngine::new(db, LoanPolicy::default(), "kiosk-01")
    }

    async fn register_alice(engine: &LoanEngine) -> Student {
        engine
            .register_student(NewStudent {
                index_number: "UE2020001".to_string(),
                full_name: "Alice Mensah".to_string(),
                program: "BSc Computer Science".to_string(),
                level: "300".to_string(),
                phone: "+233241234567".to_string(),
                card_uid: Some("CARD-ALICE".to_string()),
            })
            .await
            .unwrap()
    }

    fn borrow_req(student: StudentRef, tag: &str, days: Option<i64>) -> BorrowRequest {
        BorrowRequest {
            student,
            item_tag: tag.to_string(),
            item_title: Some("A Title".to_string()),
            duration_days: days,
        }
    }

    #[tokio::test]
    async fn test_borrow_by_card_creates_loan_and_transaction() {
        // Scenario A: first borrow succeeds with due_at = now + 14d
        let engine = test_engine().await;
        register_alice(&engine).await;

        let loan = engine
            .borrow(borrow_req(
                StudentRef::Card("CARD-ALICE".to_string()),
                "BOOK-1",
                Some(14),
            ))
            .await
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.student_index, "UE2020001");
        let expected_due = loan.borrowed_at + Duration::days(14);
        assert_eq!(loan.due_at, expected_due);

        assert_eq!(engine.unsynced_count().await.unwrap(), 1);
        let active = engine
            .active_loans_for(&StudentRef::Index("UE2020001".to_string()))
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn test_borrow_unknown_student_fails_without_writes() {
        let engine = test_engine().await;

        let err = engine
            .borrow(borrow_req(
                StudentRef::Card("CARD-NOBODY".to_string()),
                "BOOK-1",
                None,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::StudentNotFound(_))
        ));
        assert_eq!(engine.unsynced_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_borrow_clamps_duration() {
        let engine = test_engine().await;
        register_alice(&engine).await;

        let loan = engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-1",
                Some(5000),
            ))
            .await
            .unwrap();

        assert_eq!(loan.due_at, loan.borrowed_at + Duration::days(365));
    }

    #[tokio::test]
    async fn test_fourth_borrow_rejected() {
        // Scenario B: at the ceiling, the next borrow fails and writes nothing
        let engine = test_engine().await;
        register_alice(&engine).await;

        for tag in ["BOOK-1", "BOOK-2", "BOOK-3"] {
            engine
                .borrow(borrow_req(
                    StudentRef::Index("UE2020001".to_string()),
                    tag,
                    None,
                ))
                .await
                .unwrap();
        }

        let err = engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-4",
                None,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::LimitExceeded { active: 3, limit: 3, .. })
        ));

        // No loan, no transaction from the rejected call
        assert_eq!(
            engine
                .active_loans_for(&StudentRef::Index("UE2020001".to_string()))
                .await
                .unwrap()
                .len(),
            3
        );
        assert_eq!(engine.unsynced_count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_return_round_trip() {
        // Round-trip: return removes the loan from the active set and
        // stamps returned_at
        let engine = test_engine().await;
        register_alice(&engine).await;

        let loan = engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-1",
                None,
            ))
            .await
            .unwrap();

        let outcome = engine.return_loan(&loan.id).await.unwrap();
        assert!(outcome.did_return());

        let active = engine
            .active_loans_for(&StudentRef::Index("UE2020001".to_string()))
            .await
            .unwrap();
        assert!(active.is_empty());

        let stored = engine.db.loans().get_by_id(&loan.id).await.unwrap().unwrap();
        assert_eq!(stored.status, LoanStatus::Returned);
        assert!(stored.returned_at.is_some());
    }

    #[tokio::test]
    async fn test_double_return_is_noop() {
        // Scenario C: the second return changes nothing
        let engine = test_engine().await;
        register_alice(&engine).await;

        let loan = engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-1",
                None,
            ))
            .await
            .unwrap();

        assert!(engine.return_loan(&loan.id).await.unwrap().did_return());
        let count_after_first = engine.unsynced_count().await.unwrap();
        assert_eq!(count_after_first, 2); // one borrow + one return

        let outcome = engine.return_loan(&loan.id).await.unwrap();
        assert!(!outcome.did_return());
        assert_eq!(engine.unsynced_count().await.unwrap(), count_after_first);
    }

    #[tokio::test]
    async fn test_return_unknown_loan_fails() {
        let engine = test_engine().await;
        let err = engine.return_loan("no-such-loan").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(CoreError::LoanNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_return_by_item_tag() {
        let engine = test_engine().await;
        register_alice(&engine).await;

        engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-1",
                None,
            ))
            .await
            .unwrap();

        let outcome = engine.return_by_item_tag("BOOK-1").await.unwrap();
        assert!(outcome.did_return());

        // No active loan left for the tag
        let err = engine.return_by_item_tag("BOOK-1").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(CoreError::LoanNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_concurrent_borrows_cannot_exceed_limit() {
        // Scenario E: two concurrent borrows race at 2 of 3 active loans;
        // exactly one must win
        let engine = test_engine().await;
        register_alice(&engine).await;

        for tag in ["BOOK-1", "BOOK-2"] {
            engine
                .borrow(borrow_req(
                    StudentRef::Index("UE2020001".to_string()),
                    tag,
                    None,
                ))
                .await
                .unwrap();
        }

        let (a, b) = tokio::join!(
            engine.borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-3",
                None,
            )),
            engine.borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-4",
                None,
            ))
        );

        let successes = [a.is_ok(), b.is_ok()].iter().filter(|&&ok| ok).count();
        assert_eq!(successes, 1, "exactly one racing borrow must succeed");

        let active = engine
            .active_loans_for(&StudentRef::Index("UE2020001".to_string()))
            .await
            .unwrap();
        assert_eq!(active.len(), 3);
    }

    #[tokio::test]
    async fn test_due_soon_or_overdue() {
        let engine = test_engine().await;
        register_alice(&engine).await;

        engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-SOON",
                Some(1),
            ))
            .await
            .unwrap();
        engine
            .borrow(borrow_req(
                StudentRef::Index("UE2020001".to_string()),
                "BOOK-LATER",
                Some(30),
            ))
            .await
            .unwrap();

        // Policy horizon is 2 days: only BOOK-SOON is due
        let due = engine.due_soon_or_overdue(None).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].item_tag, "BOOK-SOON");

        // A wide horizon catches both
        let due = engine.due_soon_or_overdue(Some(60)).await.unwrap();
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].item_tag, "BOOK-SOON");
    }

    #[tokio::test]
    async fn test_register_duplicate_index_rejected() {
        let engine = test_engine().await;
        register_alice(&engine).await;

        let err = engine
            .register_student(NewStudent {
                index_number: "UE2020001".to_string(),
                full_name: "Someone Else".to_string(),
                program: String::new(),
                level: String::new(),
                phone: String::new(),
                card_uid: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(CoreError::Validation(
                biblio_core::ValidationError::Duplicate { .. }
            ))
        ));
    }
}
